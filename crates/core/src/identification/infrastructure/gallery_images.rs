use std::io;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;

/// Subject id encoded in a directory name such as `s12`.
pub fn subject_id_from_dir_name(name: &str) -> Option<u32> {
    name.get(1..)?.parse().ok()
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists `(subject_id, image_path)` for a directory with one
/// sub-directory per subject. Sorted by subject, then path.
pub fn scan_labeled_images(root: &Path) -> io::Result<Vec<(u32, PathBuf)>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let dir = entry?.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(subject_id) = dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(subject_id_from_dir_name)
        else {
            log::warn!("Skipping {}: not a subject directory", dir.display());
            continue;
        };
        for file in std::fs::read_dir(&dir)? {
            let path = file?.path();
            if path.is_file() && is_image_file(&path) {
                out.push((subject_id, path));
            }
        }
    }
    out.sort();
    log::debug!("Found {} labelled images under {}", out.len(), root.display());
    Ok(out)
}

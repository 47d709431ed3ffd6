use std::collections::BTreeSet;

use thiserror::Error;

use crate::eye_color::domain::palette::EyeColor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("line {line}: expected `index subject colour`, got {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("line {line}: invalid subject id {field:?}")]
    BadSubjectId { line: usize, field: String },
    #[error("gallery registry has no records")]
    Empty,
}

/// One enrolled subject and its recorded eye colour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectRecord {
    pub index: String,
    pub subject_id: u32,
    /// Label as written in the registry.
    pub color_label: String,
    /// `None` when the label names no known colour; such a subject is
    /// enrolled but never selected by colour.
    pub eye_color: Option<EyeColor>,
}

/// Read-only table of gallery subjects, loaded once per process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryRegistry {
    records: Vec<SubjectRecord>,
}

impl GalleryRegistry {
    pub fn new(records: Vec<SubjectRecord>) -> Result<Self, RegistryError> {
        if records.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { records })
    }

    /// Parses the registry text format: one record per line, fields
    /// separated by runs of whitespace, the subject field carrying a
    /// one-character prefix before its number (`0  s12  Blue`).
    ///
    /// Everything after the subject field is the colour label, so
    /// composite labels such as `Blue Green` survive. Blank lines are
    /// ignored.
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        let mut records = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let fields: Vec<&str> = raw.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let &[index, subject, ref label @ ..] = fields.as_slice() else {
                return Err(RegistryError::MalformedLine {
                    line,
                    text: raw.to_string(),
                });
            };
            if label.is_empty() {
                return Err(RegistryError::MalformedLine {
                    line,
                    text: raw.to_string(),
                });
            }
            let subject_id = subject
                .get(1..)
                .and_then(|digits| digits.parse::<u32>().ok())
                .ok_or_else(|| RegistryError::BadSubjectId {
                    line,
                    field: subject.to_string(),
                })?;
            let color_label = label.join(" ");
            let eye_color = color_label.parse::<EyeColor>().ok();
            if eye_color.is_none() {
                log::warn!(
                    "Registry line {line}: subject {subject_id} has unrecognised colour {color_label:?}; it will never match by colour"
                );
            }
            records.push(SubjectRecord {
                index: index.to_string(),
                subject_id,
                color_label,
                eye_color,
            });
        }
        Self::new(records)
    }

    pub fn records(&self) -> &[SubjectRecord] {
        &self.records
    }

    /// Every distinct subject id in the gallery.
    pub fn subject_ids(&self) -> BTreeSet<u32> {
        self.records.iter().map(|r| r.subject_id).collect()
    }

    /// Number of distinct subjects.
    pub fn gallery_size(&self) -> usize {
        self.subject_ids().len()
    }

    pub fn eye_color_of(&self, subject_id: u32) -> Option<EyeColor> {
        self.records
            .iter()
            .find(|r| r.subject_id == subject_id)
            .and_then(|r| r.eye_color)
    }
}

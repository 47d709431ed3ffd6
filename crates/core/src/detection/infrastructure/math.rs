//! Shared math utilities for detection infrastructure.
//!
//! Provides union-find clustering and the neighbour grouping that turns
//! raw sliding-window hits into final detections.

use crate::shared::geometry::Rect;

/// Relative tolerance used when deciding that two hits are the same object.
pub const GROUP_EPS: f64 = 0.2;

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: i32, q: i32| ((p - q).abs() as f64) <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.x + a.width, b.x + b.width)
        && close(a.y + a.height, b.y + b.height)
}

/// Clusters similar hits and returns one averaged rectangle per cluster
/// holding more than `min_neighbors` hits.
///
/// A surviving cluster that sits inside a stronger one is dropped. With
/// `min_neighbors == 0` the raw hits are returned untouched.
pub fn group_rectangles(hits: &[Rect], min_neighbors: u32, eps: f64) -> Vec<Rect> {
    if min_neighbors == 0 || hits.is_empty() {
        return hits.to_vec();
    }

    let n = hits.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&hits[i], &hits[j], eps) {
                union(&mut parent, i, j);
            }
        }
    }

    // root -> (sum x, sum y, sum w, sum h, count)
    let mut sums: std::collections::BTreeMap<usize, (i64, i64, i64, i64, u32)> =
        std::collections::BTreeMap::new();
    for (i, r) in hits.iter().enumerate() {
        let root = find(&mut parent, i);
        let e = sums.entry(root).or_insert((0, 0, 0, 0, 0));
        e.0 += r.x as i64;
        e.1 += r.y as i64;
        e.2 += r.width as i64;
        e.3 += r.height as i64;
        e.4 += 1;
    }

    let clusters: Vec<(Rect, u32)> = sums
        .into_values()
        .map(|(x, y, w, h, count)| {
            let avg = |v: i64| (v as f64 / count as f64).round() as i32;
            (Rect::new(avg(x), avg(y), avg(w), avg(h)), count)
        })
        .collect();

    let strong = |count: u32| count > min_neighbors;
    clusters
        .iter()
        .enumerate()
        .filter(|(_, (_, n1))| strong(*n1))
        .filter(|(i, (r1, n1))| {
            !clusters.iter().enumerate().any(|(j, (r2, n2))| {
                if j == *i || !strong(*n2) {
                    return false;
                }
                let dx = (r2.width as f64 * eps).round() as i32;
                let dy = (r2.height as f64 * eps).round() as i32;
                let inside = r1.x >= r2.x - dx
                    && r1.y >= r2.y - dy
                    && r1.x + r1.width <= r2.x + r2.width + dx
                    && r1.y + r1.height <= r2.y + r2.height + dy;
                inside && (*n2 > (*n1).max(3) || *n1 < 3)
            })
        })
        .map(|(_, (r, _))| *r)
        .collect()
}

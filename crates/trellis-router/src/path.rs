//! URL path normalisation shared by pattern compilation and lookup.

/// A `..` segment was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Traversal;

/// Split a path into its non-empty segments.
///
/// Empty segments (`//`) and `.` are dropped; `..` is rejected outright
/// rather than resolved.
pub(crate) fn split_segments(path: &str) -> Result<Vec<&str>, Traversal> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(Traversal),
            _ => segments.push(segment),
        }
    }
    Ok(segments)
}

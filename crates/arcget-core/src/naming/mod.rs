//! Local filename derivation for retrieved files.
//!
//! The server usually names the file via `Content-Disposition`; otherwise the
//! last path segment of the file id is used. Either way the result is
//! sanitized for Linux filesystems.

mod content_disposition;
mod sanitize;

pub use content_disposition::filename_from_header;
pub use sanitize::sanitize_filename;

/// Fallback when neither the header nor the file id yields a usable name.
const DEFAULT_FILENAME: &str = "retrieved.dat";

/// Derives a safe local filename for a retrieved file.
///
/// Prefers the `Content-Disposition` filename when present and parseable,
/// otherwise the last `/`-separated segment of `file_id`.
pub fn derive_filename(file_id: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(filename_from_header)
        .filter(|name| !name.is_empty())
        .or_else(|| file_id_segment(file_id));

    let raw = match candidate {
        Some(name) => name,
        None => return DEFAULT_FILENAME.to_string(),
    };

    let sanitized = sanitize_filename(&raw);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Last non-empty `/`-separated segment of a file id. File ids are frequently
/// path-shaped (`night1/obs-42.fits`).
fn file_id_segment(file_id: &str) -> Option<String> {
    file_id
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
}

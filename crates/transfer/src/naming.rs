//! Scratch file naming.
//!
//! Remote display names are arbitrary user text: they may contain path
//! separators, be `..`, or exceed the filesystem's component limit. The
//! scratch name must stay a single component inside the scratch directory.

/// Longest scratch name in bytes, leaving room for a `.partNNNN` suffix
/// under the usual 255-byte component limit.
const MAX_NAME_BYTES: usize = 200;

const FALLBACK_NAME: &str = "unnamed";

/// Derives a deterministic scratch file name from a remote display name.
///
/// - Path separators, NUL and control characters become `_`.
/// - Empty names and the `.` / `..` components become `unnamed`.
/// - Names longer than 200 bytes are cut at a char boundary.
pub fn scratch_file_name(display_name: &str) -> String {
    let mut name: String = display_name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if name.len() > MAX_NAME_BYTES {
        let mut cut = MAX_NAME_BYTES;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }

    match name.trim() {
        "" | "." | ".." => FALLBACK_NAME.to_string(),
        _ => name,
    }
}

/// Returns the file name of part `index` (1-based) of `artifact_name`.
pub fn part_file_name(artifact_name: &str, index: u32) -> String {
    format!("{artifact_name}.part{index}")
}

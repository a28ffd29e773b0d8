//! Safe local file names for downloads.

use std::sync::OnceLock;

use regex::Regex;

/// Maximum length (in characters) of a sanitized name.
pub const MAX_FILENAME_CHARS: usize = 200;

/// Name used when nothing usable is left after sanitizing.
pub const FALLBACK_FILENAME: &str = "download";

fn reserved_chars() -> &'static Regex {
    static RESERVED: OnceLock<Regex> = OnceLock::new();
    RESERVED.get_or_init(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid reserved-character pattern"))
}

/// Turn a manifest file name into something every desktop filesystem accepts.
///
/// Reserved characters become `_`, control characters are dropped, surrounding
/// whitespace and trailing dots/spaces are removed, and the result is capped
/// at [`MAX_FILENAME_CHARS`].
pub fn sanitize_filename(name: &str) -> String {
    let replaced = reserved_chars().replace_all(name, "_");
    let printable: String = replaced.chars().filter(|c| !c.is_control()).collect();
    let trimmed = printable.trim().trim_end_matches(&['.', ' '][..]);
    let capped: String = trimmed.chars().take(MAX_FILENAME_CHARS).collect();

    if capped.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        capped
    }
}

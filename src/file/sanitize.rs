//! Name sanitization for folders and stored files.

use chrono::Utc;
use rand::Rng;

use crate::{Result, StowageError};

/// Maximum length for the base part of a stored filename (in characters).
pub const MAX_BASE_NAME_LENGTH: usize = 50;

/// Maximum length for a stored file extension (in characters).
pub const MAX_EXTENSION_LENGTH: usize = 16;

/// Base name used when nothing usable is left of the original.
const FALLBACK_BASE_NAME: &str = "file";

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn replace_unsafe(s: &str) -> String {
    s.chars()
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .collect()
}

/// Map a raw folder name onto `[A-Za-z0-9_-]+`.
///
/// Surrounding whitespace is trimmed and every other character outside the
/// allowed set becomes `_`, so `"My Folder!"` turns into `"My_Folder_"`.
pub fn sanitize_folder_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StowageError::InvalidName(
            "folder name is required".to_string(),
        ));
    }

    let safe = replace_unsafe(trimmed);
    if safe.is_empty() {
        return Err(StowageError::InvalidName(
            "folder name is empty after sanitization".to_string(),
        ));
    }

    Ok(safe)
}

/// Sanitized pieces of an uploaded file's original name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeFileName {
    /// Sanitized and truncated base name, never empty.
    pub base: String,
    /// Sanitized extension without the dot, possibly empty.
    pub extension: String,
}

impl SafeFileName {
    /// Compose `base-suffix.extension` (or `base-suffix` without extension).
    pub fn stored_name(&self, suffix: &str) -> String {
        if self.extension.is_empty() {
            format!("{}-{}", self.base, suffix)
        } else {
            format!("{}-{}.{}", self.base, suffix, self.extension)
        }
    }
}

/// Split an untrusted original filename into a safe base and extension.
///
/// Any directory part sent by the client is dropped. The extension is the
/// text after the last `.`; a leading dot (`.bashrc`) does not start one.
pub fn sanitize_file_name(original_name: &str) -> SafeFileName {
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
        .trim();

    let (base, extension) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    };

    let mut base: String = replace_unsafe(base)
        .chars()
        .take(MAX_BASE_NAME_LENGTH)
        .collect();
    if base.is_empty() {
        base = FALLBACK_BASE_NAME.to_string();
    }

    let extension = replace_unsafe(extension)
        .chars()
        .take(MAX_EXTENSION_LENGTH)
        .collect();

    SafeFileName { base, extension }
}

/// Generate a per-call uniqueness token: `<unix millis>-<random 0..1e9>`.
///
/// No shared counter is involved, so concurrent callers never coordinate.
pub fn unique_suffix() -> String {
    let millis = Utc::now().timestamp_millis();
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    format!("{millis}-{random}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize_folder_name_replaces_disallowed() {
        assert_eq!(sanitize_folder_name("My Folder!").unwrap(), "My_Folder_");
        assert_eq!(sanitize_folder_name("  holiday-2024 ").unwrap(), "holiday-2024");
        assert_eq!(sanitize_folder_name("../etc").unwrap(), "___etc");
        assert_eq!(sanitize_folder_name("a/b\\c").unwrap(), "a_b_c");
    }

    #[test]
    fn test_sanitize_folder_name_unicode() {
        assert_eq!(sanitize_folder_name("写真").unwrap(), "__");
        assert_eq!(sanitize_folder_name("café").unwrap(), "caf_");
    }

    #[test]
    fn test_sanitize_folder_name_rejects_blank() {
        for raw in ["", "   ", "\t\n"] {
            assert!(matches!(
                sanitize_folder_name(raw),
                Err(StowageError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn test_sanitize_folder_name_keeps_long_names() {
        for len in [101, 255, 1000] {
            let long = "a".repeat(len);
            let once = sanitize_folder_name(&long).unwrap();
            assert_eq!(once, long);
            assert_eq!(sanitize_folder_name(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_sanitize_folder_name_idempotent() {
        let inputs = ["My Folder!", " x ", "..", "日本語 docs", "a-b_c", "tab\there", "%2e%2e"];
        for raw in inputs {
            let once = sanitize_folder_name(raw).unwrap();
            let twice = sanitize_folder_name(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_sanitize_file_name_splits_extension() {
        let safe = sanitize_file_name("photo.jpg");
        assert_eq!(safe.base, "photo");
        assert_eq!(safe.extension, "jpg");

        let safe = sanitize_file_name("archive.tar.gz");
        assert_eq!(safe.base, "archive_tar");
        assert_eq!(safe.extension, "gz");
    }

    #[test]
    fn test_sanitize_file_name_without_extension() {
        let safe = sanitize_file_name("README");
        assert_eq!(safe.base, "README");
        assert_eq!(safe.extension, "");

        let safe = sanitize_file_name(".bashrc");
        assert_eq!(safe.base, "_bashrc");
        assert_eq!(safe.extension, "");

        let safe = sanitize_file_name("trailing.");
        assert_eq!(safe.base, "trailing");
        assert_eq!(safe.extension, "");
    }

    #[test]
    fn test_sanitize_file_name_drops_directories() {
        let safe = sanitize_file_name("../../etc/passwd");
        assert_eq!(safe.base, "passwd");

        let safe = sanitize_file_name("C:\\Users\\me\\My Report.docx");
        assert_eq!(safe.base, "My_Report");
        assert_eq!(safe.extension, "docx");
    }

    #[test]
    fn test_sanitize_file_name_truncates() {
        let long = format!("{}.txt", "x".repeat(200));
        let safe = sanitize_file_name(&long);
        assert_eq!(safe.base.len(), MAX_BASE_NAME_LENGTH);
        assert_eq!(safe.extension, "txt");

        let weird_ext = format!("a.{}", "e".repeat(40));
        assert_eq!(
            sanitize_file_name(&weird_ext).extension.len(),
            MAX_EXTENSION_LENGTH
        );
    }

    #[test]
    fn test_sanitize_file_name_fallback_base() {
        assert_eq!(sanitize_file_name("").base, FALLBACK_BASE_NAME);
        assert_eq!(sanitize_file_name("dir/").base, FALLBACK_BASE_NAME);
    }

    #[test]
    fn test_sanitize_file_name_unsafe_extension() {
        let safe = sanitize_file_name("evil.p h%p");
        assert_eq!(safe.extension, "p_h_p");
    }

    #[test]
    fn test_stored_name_format() {
        let safe = sanitize_file_name("My Photo.JPG");
        assert_eq!(safe.stored_name("123-456"), "My_Photo-123-456.JPG");

        let safe = sanitize_file_name("notes");
        assert_eq!(safe.stored_name("1-2"), "notes-1-2");
    }

    #[test]
    fn test_unique_suffix_format() {
        let suffix = unique_suffix();
        let (millis, random) = suffix.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert!(random.parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[test]
    fn test_unique_suffix_distinct() {
        let suffixes: HashSet<String> = (0..100).map(|_| unique_suffix()).collect();
        assert_eq!(suffixes.len(), 100);
    }
}

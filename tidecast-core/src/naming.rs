//! Segment naming scheme.
//!
//! Pure functions mapping a session to its on-disk segment naming convention
//! and back: `<session-key>-segment-<zero-padded index>.<container>`. The
//! retrieval path uses [`is_safe_segment_name`] to reject anything that is
//! not a single normal path component before touching the filesystem.

use std::fmt;

/// Short random token grouping one acquisition's output segments.
///
/// Three random bytes rendered as lowercase hex (6 characters), generated
/// once per successful fetch after the playable file is located. Never
/// persisted; a process restart forgets every key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Generates a fresh random session key.
    pub fn generate() -> Self {
        let bytes: [u8; 3] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Wraps an existing key string, for tests and registry round-trips.
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `<key>-` prefix shared by every file of this session.
    pub fn file_prefix(&self) -> String {
        format!("{}-", self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the file name of one segment.
pub fn segment_file_name(key: &SessionKey, index: u32, container: &str) -> String {
    format!("{key}-segment-{index:03}.{container}")
}

/// Builds the `%03d` output template handed to the transcoder.
pub fn output_template(key: &SessionKey, container: &str) -> String {
    format!("{key}-segment-%03d.{container}")
}

/// Parses a segment file name back into its session key and index.
///
/// Returns `None` for names that do not follow the segment convention.
/// The index must be at least three digits: `%03d` zero-pads below 1000 and
/// widens past it, so a shorter index marks a foreign file. The container
/// extension is not validated here; sessions always use a single fixed
/// container so the prefix and index carry the identity.
pub fn parse_segment_name(name: &str) -> Option<(&str, u32)> {
    let (stem, _ext) = name.rsplit_once('.')?;
    let (key, index) = stem.rsplit_once("-segment-")?;
    if key.is_empty() || index.len() < 3 {
        return None;
    }
    let index = index.parse::<u32>().ok()?;
    Some((key, index))
}

/// Checks that a requester-supplied name is a bare file name.
///
/// Rejects empty names, absolute paths, parent-directory segments and
/// anything containing a path separator. Only names passing this check may
/// be joined against the working directory.
pub fn is_safe_segment_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return false;
    }
    let mut components = std::path::Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_six_hex_chars() {
        let key = SessionKey::generate();
        assert_eq!(key.as_str().len(), 6);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!key.as_str().chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn segment_names_round_trip() {
        let key = SessionKey::from_string("a1b2c3");
        let name = segment_file_name(&key, 7, "mp4");
        assert_eq!(name, "a1b2c3-segment-007.mp4");
        assert_eq!(parse_segment_name(&name), Some(("a1b2c3", 7)));
    }

    #[test]
    fn output_template_uses_printf_index() {
        let key = SessionKey::from_string("a1b2c3");
        assert_eq!(output_template(&key, "mp4"), "a1b2c3-segment-%03d.mp4");
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert_eq!(parse_segment_name("movie.mkv"), None);
        assert_eq!(parse_segment_name("a1b2c3-segment-.mp4"), None);
        assert_eq!(parse_segment_name("a1b2c3-segment-01.mp4"), None);
        assert_eq!(parse_segment_name("a1b2c3-segment-abc.mp4"), None);
        assert_eq!(parse_segment_name("-segment-001.mp4"), None);
    }

    #[test]
    fn parse_accepts_indices_past_999() {
        // ffmpeg widens %03d once the index no longer fits in three digits.
        assert_eq!(parse_segment_name("ff-segment-000.mp4"), Some(("ff", 0)));
        assert_eq!(parse_segment_name("ff-segment-999.mp4"), Some(("ff", 999)));
        assert_eq!(parse_segment_name("ff-segment-1000.mp4"), Some(("ff", 1000)));
        assert_eq!(
            parse_segment_name("ff-segment-12345.mp4"),
            Some(("ff", 12345))
        );
    }

    #[test]
    fn safe_name_check_rejects_traversal() {
        assert!(is_safe_segment_name("a1b2c3-segment-000.mp4"));
        assert!(!is_safe_segment_name(""));
        assert!(!is_safe_segment_name(".."));
        assert!(!is_safe_segment_name("../../etc/passwd"));
        assert!(!is_safe_segment_name("/etc/passwd"));
        assert!(!is_safe_segment_name("sub/chunk.mp4"));
        assert!(!is_safe_segment_name("sub\\chunk.mp4"));
    }
}

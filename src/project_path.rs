//! Project path encoding and decoding.
//!
//! Session directories are named by flattening a filesystem path into a
//! single path segment: separators become `-`, and a Windows drive letter
//! (`C:\`) becomes a leading `C--` marker. [`encode`] produces that form;
//! [`decode_best_effort`] inverts it on a best-effort basis, since the
//! encoding is lossy whenever the original path itself contained a literal
//! `-`.

use crate::error::MemoryNexusError;

/// Encode a decoded filesystem path into its directory-name form.
///
/// Every path separator, colon, space, and hyphen becomes a single `-`.
/// Deterministic; lossy, since none of those originals can be told apart
/// after encoding (`/Users/alice/project` becomes `-Users-alice-project`;
/// `C:\Users\alice` becomes `C--Users-alice`).
pub fn encode(decoded: &str) -> Result<String, MemoryNexusError> {
    if decoded.is_empty() {
        return Err(MemoryNexusError::InvalidPath("path must not be empty".into()));
    }
    Ok(decoded
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' | '-' => '-',
            other => other,
        })
        .collect())
}

/// Decode an encoded directory name back into a best-effort filesystem path.
///
/// Decoding is lossy: a `-` in the encoded form cannot be distinguished from
/// a separator versus a literal hyphen in the original path, so this always
/// prefers the separator interpretation.
pub fn decode_best_effort(encoded: &str) -> Result<String, MemoryNexusError> {
    if encoded.is_empty() {
        return Err(MemoryNexusError::InvalidPath("path must not be empty".into()));
    }
    let bytes = encoded.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b'-'
        && bytes[2] == b'-'
    {
        let letter = bytes[0].to_ascii_uppercase() as char;
        let tail = &encoded[3..];
        let tail_decoded = tail.replace('-', "\\");
        return Ok(format!("{letter}:\\{tail_decoded}"));
    }
    Ok(encoded.replace('-', "/"))
}

/// Last non-empty path segment, used as a display name for a project.
pub fn project_name(decoded: &str) -> String {
    decoded
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or(decoded)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_unix_path() {
        assert_eq!(encode("/Users/alice/project").unwrap(), "-Users-alice-project");
    }

    #[test]
    fn encode_windows_path() {
        assert_eq!(encode(r"C:\Users\alice").unwrap(), "C--Users-alice");
    }

    #[test]
    fn encode_empty_is_invalid() {
        assert!(encode("").is_err());
    }

    #[test]
    fn decode_unix_form() {
        assert_eq!(
            decode_best_effort("-Users-alice-project").unwrap(),
            "/Users/alice/project"
        );
    }

    #[test]
    fn decode_windows_form_case_insensitive_drive() {
        assert_eq!(
            decode_best_effort("c--Users-alice").unwrap(),
            r"C:\Users\alice"
        );
    }

    #[test]
    fn decode_empty_is_invalid() {
        assert!(decode_best_effort("").is_err());
    }

    #[test]
    fn project_name_takes_last_segment() {
        assert_eq!(project_name("/Users/alice/my-project"), "my-project");
        assert_eq!(project_name(r"C:\Users\alice\my-project"), "my-project");
    }

    #[test]
    fn project_name_trailing_slash_skips_empty_segment() {
        assert_eq!(project_name("/Users/alice/project/"), "project");
    }

    #[test]
    fn decode_lossy_path_scenario() {
        let decoded =
            decode_best_effort("C--Users-Destiny-AI-Tools-Projects-memory-nexus").unwrap();
        assert_eq!(decoded, r"C:\Users\Destiny\AI\Tools\Projects\memory\nexus");
        assert_eq!(project_name(&decoded), "nexus");
    }

    #[test]
    fn roundtrip_without_literal_hyphens() {
        let original = "/Users/alice/project";
        let encoded = encode(original).unwrap();
        let decoded = decode_best_effort(&encoded).unwrap();
        assert_eq!(decoded, original);
    }
}

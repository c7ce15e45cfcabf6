//! `file://` URIs for local media
//!
//! - Unix: /home/me/Bats/night one.wav → file://localhost/home/me/Bats/night%20one.wav
//! - Windows: C:\Bats\night.wav → file://localhost/C:/Bats/night.wav

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::Path;

/// Characters percent-encoded within a path segment (RFC 3986, conservative)
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Convert a filesystem path to a `file://localhost/...` URI
///
/// ```
/// use std::path::Path;
/// use batcall::media::uri::path_to_file_uri;
///
/// let uri = path_to_file_uri(Path::new("/recordings/Night One.wav"));
/// assert!(uri.starts_with("file://localhost/"));
/// assert!(uri.ends_with("Night%20One.wav"));
/// ```
pub fn path_to_file_uri(path: &Path) -> String {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let normalized = path.to_string_lossy().replace('\\', "/");

    // Strip the verbatim prefix canonicalize adds on Windows
    let normalized = normalized
        .strip_prefix("//?/")
        .map(str::to_string)
        .unwrap_or(normalized);

    let normalized = if has_drive_letter(&normalized) {
        format!("/{}", normalized)
    } else if !normalized.starts_with('/') {
        format!("/{}", normalized)
    } else {
        normalized
    };

    let encoded = normalized
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/");

    format!("file://localhost{}", encoded)
}

fn has_drive_letter(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_path() {
        let uri = path_to_file_uri(Path::new("/data/bats/colony.wav"));
        assert!(uri.starts_with("file://localhost/"));
        assert!(uri.ends_with("/colony.wav"));
    }

    #[test]
    fn test_special_chars_encoded() {
        let uri = path_to_file_uri(Path::new("/data/[2024] Site A & B/call #3.wav"));
        assert!(uri.contains("%5B2024%5D%20Site%20A%20%26%20B"));
        assert!(uri.ends_with("call%20%233.wav"));
    }

    #[test]
    fn test_relative_path_gets_leading_slash() {
        let uri = path_to_file_uri(Path::new("no-such-dir/clip.flac"));
        assert!(uri.starts_with("file://localhost/"));
        assert!(!uri.contains("localhostno-such-dir"));
    }

    #[test]
    fn test_drive_letter() {
        assert!(has_drive_letter("C:/Bats/night.wav"));
        assert!(has_drive_letter("d:"));
        assert!(!has_drive_letter("/home/me"));
        assert!(!has_drive_letter("recordings"));
    }
}

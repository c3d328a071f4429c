//! Filename sanitization and display-name helpers for committed artifacts.

use std::path::{Component, Path};

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Returns true when `name` ends in a plausible extension (`.ext`, 1-10
/// alphanumerics, not the whole name).
#[must_use]
pub fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(0) | None => false,
        Some(pos) => {
            let ext = &name[pos + 1..];
            !ext.is_empty() && ext.len() <= 10 && ext.chars().all(char::is_alphanumeric)
        }
    }
}

/// Appends `extension` (with leading dot) unless `name` already has one.
#[must_use]
pub fn ensure_extension(name: &str, extension: &str) -> String {
    if has_extension(name) {
        name.to_string()
    } else {
        format!("{name}{extension}")
    }
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles both:
/// - `attachment; filename="example.mp4"`
/// - `attachment; filename=example.mp4`
/// - `attachment; filename*=UTF-8''example.mp4` (RFC 5987)
#[must_use]
pub fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = header.find("filename=") {
        let value = header[pos + 9..].trim();
        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string()).filter(|name| !name.is_empty());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim();
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("clip/part:1.mp4"), "clip_part_1.mp4");
        assert_eq!(sanitize_filename("a<b>|c?.mkv"), "a_b__c_.mkv");
    }

    #[test]
    fn test_sanitize_filename_rewrites_dot_segments() {
        assert_eq!(sanitize_filename("."), "_");
        assert_eq!(sanitize_filename(".."), "__");
        assert_eq!(sanitize_filename("   "), "_");
    }

    #[test]
    fn test_sanitize_filename_preserves_unicode_and_spaces() {
        assert_eq!(sanitize_filename("Holiday 2024 (final).mp4"), "Holiday 2024 (final).mp4");
        assert_eq!(sanitize_filename("日本語.mp4"), "日本語.mp4");
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("clip.mp4"));
        assert!(has_extension("clip.final.mkv"));
        assert!(!has_extension("clip"));
        assert!(!has_extension(".hidden"));
        assert!(!has_extension("clip."));
        assert!(!has_extension("Meeting 10.30 am notes"));
    }

    #[test]
    fn test_ensure_extension() {
        assert_eq!(ensure_extension("clip", ".mp4"), "clip.mp4");
        assert_eq!(ensure_extension("clip.webm", ".mp4"), "clip.webm");
    }

    #[test]
    fn test_parse_content_disposition_variants() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="talk.mp4""#),
            Some("talk.mp4".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=talk.mp4; size=10"),
            Some("talk.mp4".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''my%20talk.mp4"),
            Some("my talk.mp4".to_string())
        );
        assert_eq!(parse_content_disposition("attachment"), None);
    }
}

//! Format-signature validation of downloaded payloads.
//!
//! Two rules are heuristics tuned to Drive's behaviour and kept as named,
//! separately tested functions: [`looks_like_html`] and
//! [`contains_ftyp_anywhere`].

use super::constants::HTML_SNIFF_LEN;
use super::error::DriveError;

/// Container formats recognized by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// ISO-BMFF with a standard `ftyp` box at offset 4.
    Mp4,
    /// EBML header with a `webm` doctype.
    WebM,
    /// EBML header (Matroska).
    Matroska,
    /// MPEG program stream pack header.
    MpegProgramStream,
    /// MPEG video sequence header.
    MpegVideo,
    /// Flash video.
    Flv,
    /// `ftyp` found away from the standard offset.
    LooseIsoBmff,
}

impl ContainerFormat {
    /// Media type recorded on the committed artifact.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 | Self::LooseIsoBmff => "video/mp4",
            Self::WebM => "video/webm",
            Self::Matroska => "video/x-matroska",
            Self::MpegProgramStream | Self::MpegVideo => "video/mpeg",
            Self::Flv => "video/x-flv",
        }
    }

    /// Extension appended to names that have none.
    #[must_use]
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Mp4 | Self::LooseIsoBmff => ".mp4",
            Self::WebM => ".webm",
            Self::Matroska => ".mkv",
            Self::MpegProgramStream | Self::MpegVideo => ".mpg",
            Self::Flv => ".flv",
        }
    }
}

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Exact leading-byte signatures, checked in order.
const SIGNATURES: &[(&[u8], ContainerFormat)] = &[
    (&[0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p'], ContainerFormat::Mp4),
    (&[0x00, 0x00, 0x00, 0x1C, b'f', b't', b'y', b'p'], ContainerFormat::Mp4),
    (&[0x00, 0x00, 0x00, 0x20, b'f', b't', b'y', b'p'], ContainerFormat::Mp4),
    (&EBML_MAGIC, ContainerFormat::Matroska),
    (&[0x00, 0x00, 0x01, 0xBA], ContainerFormat::MpegProgramStream),
    (&[0x00, 0x00, 0x01, 0xB3], ContainerFormat::MpegVideo),
    (&[b'F', b'L', b'V', 0x01], ContainerFormat::Flv),
];

/// Returns true when the first bytes read as an HTML document.
#[must_use]
pub fn looks_like_html(prefix: &[u8]) -> bool {
    let head = &prefix[..prefix.len().min(HTML_SNIFF_LEN)];
    let text = String::from_utf8_lossy(head).to_lowercase();
    text.contains("<!doctype html") || text.contains("<html") || text.contains("<head>")
}

/// Returns true when `ftyp` appears anywhere in the prefix.
///
/// Tolerates ISO-BMFF files whose first box size differs from the common
/// 0x18/0x1C/0x20 values.
#[must_use]
pub fn contains_ftyp_anywhere(prefix: &[u8]) -> bool {
    prefix.windows(4).any(|window| window == b"ftyp")
}

fn matches_signature(prefix: &[u8]) -> Option<ContainerFormat> {
    SIGNATURES
        .iter()
        .find(|(magic, _)| prefix.starts_with(magic))
        .map(|(magic, format)| {
            if *magic == EBML_MAGIC.as_slice() && contains_webm_doctype(prefix) {
                ContainerFormat::WebM
            } else {
                *format
            }
        })
}

fn contains_webm_doctype(prefix: &[u8]) -> bool {
    prefix.windows(4).any(|window| window == b"webm")
}

/// Classifies the first bytes of a downloaded file.
///
/// # Errors
///
/// Returns [`DriveError::NotAVideo`] for HTML documents and for prefixes
/// matching no known container.
pub fn sniff_container(prefix: &[u8]) -> Result<ContainerFormat, DriveError> {
    if looks_like_html(prefix) {
        return Err(DriveError::not_a_video(
            "Downloaded content is HTML, not a video. The file might be private or require authentication.",
        ));
    }
    if let Some(format) = matches_signature(prefix) {
        return Ok(format);
    }
    if contains_ftyp_anywhere(prefix) {
        return Ok(ContainerFormat::LooseIsoBmff);
    }
    Err(DriveError::not_a_video(
        "Downloaded file is not a valid video format.",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn padded(head: &[u8]) -> Vec<u8> {
        let mut buf = head.to_vec();
        buf.resize(512, 0x11);
        buf
    }

    #[test]
    fn test_mp4_ftyp_box_accepted() {
        let prefix = padded(&[0x00, 0x00, 0x00, 0x20, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm']);
        assert_eq!(sniff_container(&prefix).unwrap(), ContainerFormat::Mp4);
    }

    #[test]
    fn test_matroska_and_webm_distinguished() {
        let mkv = padded(&[0x1A, 0x45, 0xDF, 0xA3, 0x42, 0x82, 0x88, b'm', b'a', b't', b'r', b'o', b's', b'k', b'a']);
        assert_eq!(sniff_container(&mkv).unwrap(), ContainerFormat::Matroska);

        let webm = padded(&[0x1A, 0x45, 0xDF, 0xA3, 0x42, 0x82, 0x84, b'w', b'e', b'b', b'm']);
        let format = sniff_container(&webm).unwrap();
        assert_eq!(format, ContainerFormat::WebM);
        assert_eq!(format.mime_type(), "video/webm");
    }

    #[test]
    fn test_flv_accepted() {
        let prefix = padded(b"FLV\x01\x05\x00\x00\x00\x09");
        assert_eq!(sniff_container(&prefix).unwrap(), ContainerFormat::Flv);
    }

    #[test]
    fn test_mpeg_start_codes_accepted() {
        assert_eq!(
            sniff_container(&padded(&[0x00, 0x00, 0x01, 0xBA, 0x44])).unwrap(),
            ContainerFormat::MpegProgramStream
        );
        assert_eq!(
            sniff_container(&padded(&[0x00, 0x00, 0x01, 0xB3, 0x14])).unwrap(),
            ContainerFormat::MpegVideo
        );
    }

    #[test]
    fn test_ftyp_at_nonstandard_offset_accepted() {
        let prefix = padded(&[0x00, 0x00, 0x00, 0x24, b'f', b't', b'y', b'p', b'M', b'4', b'V', b' ']);
        assert_eq!(sniff_container(&prefix).unwrap(), ContainerFormat::LooseIsoBmff);
        assert!(contains_ftyp_anywhere(&prefix));
    }

    #[test]
    fn test_all_zero_prefix_rejected() {
        let prefix = [0u8; 512];
        assert!(matches!(
            sniff_container(&prefix),
            Err(DriveError::NotAVideo { .. })
        ));
    }

    #[test]
    fn test_html_doctype_rejected_case_insensitive() {
        for head in [
            "<!DOCTYPE html><html><body>Sign in</body></html>",
            "\n  <HTML lang=en>",
            "<head><title>x</title></head>",
        ] {
            let err = sniff_container(&padded(head.as_bytes())).unwrap_err();
            assert!(err.to_string().contains("HTML"), "head: {head:?}");
        }
    }

    #[test]
    fn test_html_after_sniff_window_not_flagged_as_html() {
        let mut prefix = vec![0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p'];
        prefix.resize(200, 0x20);
        prefix.extend_from_slice(b"<html>");
        assert!(!looks_like_html(&prefix));
        assert_eq!(sniff_container(&prefix).unwrap(), ContainerFormat::Mp4);
    }

    #[test]
    fn test_default_extensions() {
        assert_eq!(ContainerFormat::Mp4.default_extension(), ".mp4");
        assert_eq!(ContainerFormat::Matroska.default_extension(), ".mkv");
        assert_eq!(ContainerFormat::Flv.default_extension(), ".flv");
    }
}

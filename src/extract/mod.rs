//! Embedded-metadata extraction from raw image bytes.
//!
//! | Source | Formats | Module |
//! |---|---|---|
//! | **XMP** (`dc:title`, `dc:description`, `dc:subject`) | any file carrying an uncompressed packet | [`xmp`] |
//! | **IPTC-IIM** (ObjectName, Caption-Abstract, Keywords) | JPEG, TIFF | [`iptc`] |
//!
//! XMP is what current editors write and is always tried first. The IIM record
//! is read only when the file has no XMP packet at all; a packet without the
//! wanted properties still counts as "found" and yields empty fields.
//!
//! Formats are identified by magic bytes (`image::guess_format`), never by
//! file extension or the declared content type.

pub mod iptc;
pub mod xmp;

use crate::metadata::MetadataExtractor;
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unrecognized image format")]
    UnrecognizedFormat,
    #[error("Malformed XMP packet: {0}")]
    MalformedXmp(&'static str),
}

/// Metadata fields as found in the file, each one optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<Vec<String>>,
}

impl EmbeddedMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.subject.is_none()
    }
}

/// The production extractor: XMP first, IPTC-IIM fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedExtractor;

impl MetadataExtractor for EmbeddedExtractor {
    fn parse(&self, bytes: &[u8]) -> Result<Option<EmbeddedMetadata>, ExtractError> {
        if let Some(packet) = xmp::find_packet(bytes)? {
            return Ok(Some(xmp::parse(packet)));
        }

        let format = image::guess_format(bytes).map_err(|_| ExtractError::UnrecognizedFormat)?;
        Ok(match format {
            ImageFormat::Jpeg => iptc::from_jpeg(bytes),
            ImageFormat::Tiff => iptc::from_tiff(bytes),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_with_iptc, jpeg_with_xmp, tiff_with_iptc, xmp_packet};

    #[test]
    fn xmp_from_jpeg() {
        let packet = xmp_packet(Some("Misool"), Some("Raja Ampat"), None);
        let meta = EmbeddedExtractor.parse(&jpeg_with_xmp(&packet)).unwrap().unwrap();
        assert_eq!(meta.title.as_deref(), Some("Misool"));
        assert_eq!(meta.description.as_deref(), Some("Raja Ampat"));
        assert_eq!(meta.subject, None);
    }

    #[test]
    fn xmp_wins_over_iptc() {
        let mut jpeg = jpeg_with_iptc(&[(5, "From IPTC")]);
        let packet = xmp_packet(Some("From XMP"), None, None);
        // Splice the XMP segment right after SOI
        let xmp_jpeg = jpeg_with_xmp(&packet);
        let app1 = &xmp_jpeg[2..xmp_jpeg.len() - 2];
        jpeg.splice(2..2, app1.iter().copied());

        let meta = EmbeddedExtractor.parse(&jpeg).unwrap().unwrap();
        assert_eq!(meta.title.as_deref(), Some("From XMP"));
    }

    #[test]
    fn iptc_fallback_for_jpeg_and_tiff() {
        let jpeg = jpeg_with_iptc(&[(120, "Requin baleine")]);
        let meta = EmbeddedExtractor.parse(&jpeg).unwrap().unwrap();
        assert_eq!(meta.description.as_deref(), Some("Requin baleine"));

        let tiff = tiff_with_iptc(&[(25, "raja ampat")], false);
        let meta = EmbeddedExtractor.parse(&tiff).unwrap().unwrap();
        assert_eq!(meta.subject, Some(vec!["raja ampat".to_string()]));
    }

    #[test]
    fn image_without_metadata() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9];
        assert_eq!(EmbeddedExtractor.parse(&jpeg), Ok(None));

        let png = b"\x89PNG\r\n\x1a\n\0\0\0\0IEND";
        assert_eq!(EmbeddedExtractor.parse(png), Ok(None));
    }

    #[test]
    fn not_an_image() {
        assert_eq!(
            EmbeddedExtractor.parse(b"plain text, not a picture"),
            Err(ExtractError::UnrecognizedFormat)
        );
    }
}

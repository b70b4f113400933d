/// Frame encoding for stored photos
///
/// This module handles:
/// - Encoding captured frames as JPEG data URIs
/// - Decoding stored data URIs back to JPEG bytes
/// - Writing photos out as files for export

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::session::data::Photo;

/// JPEG quality for captured frames
const JPEG_QUALITY: u8 = 80;

/// Prefix of every stored photo payload
pub const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Encode one captured frame as a base64 JPEG data URI.
/// Returns None if encoding failed.
pub fn encode_data_uri(frame: &RgbImage) -> Option<String> {
    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg_bytes), JPEG_QUALITY);
    frame.write_with_encoder(encoder).ok()?;

    let payload = base64::engine::general_purpose::STANDARD.encode(&jpeg_bytes);
    Some(format!("{}{}", DATA_URI_PREFIX, payload))
}

/// Decode a stored data URI back to raw JPEG bytes.
/// Returns None if the payload is not a JPEG data URI.
pub fn decode_data_uri(image_data: &str) -> Option<Vec<u8>> {
    let payload = image_data.strip_prefix(DATA_URI_PREFIX)?;
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

/// Write one photo's JPEG bytes into `dir`, named by capture index and
/// timestamp. Returns the path to the saved file, or None if the photo
/// could not be decoded or written.
pub fn save_photo(photo: &Photo, dir: &Path, index: usize) -> Option<PathBuf> {
    let jpeg_bytes = decode_data_uri(&photo.image_data)?;

    let file_path = dir.join(format!("{:04}_{}.jpg", index, photo.timestamp));
    std::fs::write(&file_path, jpeg_bytes).ok()?;

    Some(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::{Camera, TestPatternCamera};

    #[test]
    fn test_encode_produces_decodable_jpeg_data_uri() {
        let mut camera = TestPatternCamera::new(16, 12);
        let frame = camera.grab_frame().unwrap();

        let uri = encode_data_uri(&frame).unwrap();
        assert!(uri.starts_with(DATA_URI_PREFIX));

        // JPEG start-of-image marker survives the round trip
        let jpeg_bytes = decode_data_uri(&uri).unwrap();
        assert_eq!(&jpeg_bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_decode_rejects_foreign_payloads() {
        assert!(decode_data_uri("not a data uri").is_none());
        assert!(decode_data_uri("data:image/png;base64,AAAA").is_none());
        assert!(decode_data_uri("data:image/jpeg;base64,!!!not-base64!!!").is_none());
    }

    #[test]
    fn test_save_photo_writes_jpeg_file() {
        let mut camera = TestPatternCamera::new(16, 12);
        let frame = camera.grab_frame().unwrap();

        let photo = Photo {
            timestamp: 1_700_000_000_000,
            image_data: encode_data_uri(&frame).unwrap(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = save_photo(&photo, dir.path(), 3).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "0003_1700000000000.jpg"
        );

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, decode_data_uri(&photo.image_data).unwrap());
    }

    #[test]
    fn test_save_photo_undecodable_payload_is_none() {
        let photo = Photo {
            timestamp: 7,
            image_data: "garbage".to_string(),
        };

        let dir = tempfile::tempdir().unwrap();
        assert!(save_photo(&photo, dir.path(), 0).is_none());
    }
}

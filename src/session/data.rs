/// Shared data structures for capture sessions
///
/// These structs represent the session records that flow between
/// the capture loop and the database layer.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// A single captured photo
///
/// Immutable once created. The image payload is stored inline as a
/// base64 JPEG data URI, so a session record is self-contained.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Photo {
    /// Capture time as Unix milliseconds
    pub timestamp: i64,
    /// Encoded image payload (data:image/jpeg;base64,...)
    pub image_data: String,
}

/// A named capture session
///
/// Photos accumulate in capture order. The name is the unique catalog
/// key; saving a second session under the same name replaces the first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoSession {
    /// Unique session name (catalog key)
    pub name: String,
    /// Captured photos, insertion order = capture order
    pub photos: Vec<Photo>,
}

impl PhotoSession {
    /// Create a new session with an empty photo list
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            photos: Vec::new(),
        }
    }

    /// Append one captured photo, preserving capture order
    pub fn push_photo(&mut self, photo: Photo) {
        self.photos.push(photo);
    }

    /// Convert the photo list to a JSON string for database storage
    pub fn photos_to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.photos)
    }

    /// Rebuild a session from its name and a photo list JSON string
    /// (from the database)
    pub fn photos_from_json(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let photos = serde_json::from_str(json)?;
        Ok(Self {
            name: name.to_string(),
            photos,
        })
    }
}

/// Default session name: a fixed prefix plus the current local time,
/// the same value the capture form pre-fills.
pub fn default_session_name() -> String {
    format!("Night flow {}", Local::now().format("%Y-%m-%d %I:%M %p"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = PhotoSession::new("first light");
        assert_eq!(session.name, "first light");
        assert!(session.photos.is_empty());
    }

    #[test]
    fn test_push_preserves_capture_order() {
        let mut session = PhotoSession::new("ordered");
        for i in 0..3 {
            session.push_photo(Photo {
                timestamp: 1_700_000_000_000 + i,
                image_data: format!("data:image/jpeg;base64,frame{}", i),
            });
        }

        let timestamps: Vec<i64> = session.photos.iter().map(|p| p.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![1_700_000_000_000, 1_700_000_000_001, 1_700_000_000_002]
        );
    }

    #[test]
    fn test_photo_list_json_round_trip() {
        let mut session = PhotoSession::new("round trip");
        session.push_photo(Photo {
            timestamp: 42,
            image_data: "data:image/jpeg;base64,AAAA".to_string(),
        });

        // Serialize to JSON
        let json = session.photos_to_json().unwrap();

        // Deserialize back
        let restored = PhotoSession::photos_from_json("round trip", &json).unwrap();

        assert_eq!(session, restored);
    }

    #[test]
    fn test_default_session_name_has_prefix() {
        let name = default_session_name();
        assert!(name.starts_with("Night flow "));
        assert!(name.len() > "Night flow ".len());
    }
}

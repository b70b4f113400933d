use image::{Rgb, RgbImage};
use std::path::Path;

/// How camera access looks to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAccess {
    /// No probe attempted yet
    Unknown,
    /// Device opened successfully
    Granted,
    /// Device missing or not readable
    Denied,
}

/// An enumerated video capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Device identifier (the device node path)
    pub id: String,
    /// Human-readable label
    pub label: String,
}

/// A source of video frames.
///
/// `grab_frame` is best-effort: `None` means no frame is currently
/// available and the caller skips that capture attempt.
pub trait Camera {
    /// Human-readable source label
    fn label(&self) -> &str;

    /// Sample one frame from the live source
    fn grab_frame(&mut self) -> Option<RgbImage>;
}

/// Enumerate platform video device nodes (/dev/video*)
pub fn list_devices() -> Vec<CameraDevice> {
    let mut devices = Vec::new();

    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(_) => return devices,
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("video") {
            devices.push(CameraDevice {
                id: format!("/dev/{}", name),
                label: name,
            });
        }
    }

    devices.sort_by(|a, b| a.id.cmp(&b.id));
    devices
}

/// Pick the default device: prefer a rear-facing label, otherwise take
/// the first enumerated device
pub fn pick_default(devices: &[CameraDevice]) -> Option<&CameraDevice> {
    devices
        .iter()
        .find(|d| d.label.to_lowercase().contains("back"))
        .or_else(|| devices.first())
}

/// Probe whether a device node can be opened for capture
pub fn probe_access(device_id: &str) -> CameraAccess {
    match std::fs::OpenOptions::new()
        .read(true)
        .open(Path::new(device_id))
    {
        Ok(_) => CameraAccess::Granted,
        Err(err) => {
            eprintln!("⚠️  Error accessing camera {}: {}", device_id, err);
            CameraAccess::Denied
        }
    }
}

/// Deterministic synthetic frame source: a dark vertical gradient with
/// a bright band that moves one row per frame, so successive frames
/// differ.
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    frame_index: u32,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
        }
    }
}

impl Camera for TestPatternCamera {
    fn label(&self) -> &str {
        "test pattern"
    }

    fn grab_frame(&mut self) -> Option<RgbImage> {
        let height = self.height.max(1);
        let band_row = self.frame_index % height;

        let frame = RgbImage::from_fn(self.width, self.height, |_, y| {
            if y == band_row {
                Rgb([255, 255, 255])
            } else {
                let shade = (y * 255 / height) as u8;
                Rgb([shade / 4, shade / 4, shade])
            }
        });

        self.frame_index = self.frame_index.wrapping_add(1);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frame_dimensions() {
        let mut camera = TestPatternCamera::new(32, 24);
        let frame = camera.grab_frame().unwrap();

        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 24);
    }

    #[test]
    fn test_pattern_successive_frames_differ() {
        let mut camera = TestPatternCamera::new(16, 16);
        let first = camera.grab_frame().unwrap();
        let second = camera.grab_frame().unwrap();

        assert_ne!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_pick_default_prefers_back_label() {
        let devices = vec![
            CameraDevice {
                id: "/dev/video0".to_string(),
                label: "front camera".to_string(),
            },
            CameraDevice {
                id: "/dev/video1".to_string(),
                label: "Back camera".to_string(),
            },
        ];

        assert_eq!(pick_default(&devices).unwrap().id, "/dev/video1");
    }

    #[test]
    fn test_pick_default_falls_back_to_first() {
        let devices = vec![
            CameraDevice {
                id: "/dev/video0".to_string(),
                label: "video0".to_string(),
            },
            CameraDevice {
                id: "/dev/video1".to_string(),
                label: "video1".to_string(),
            },
        ];

        assert_eq!(pick_default(&devices).unwrap().id, "/dev/video0");
    }

    #[test]
    fn test_pick_default_empty_is_none() {
        assert!(pick_default(&[]).is_none());
    }
}

/// Frame capture module
///
/// This module handles:
/// - Camera device enumeration and frame sources (camera.rs)
/// - Encoding captured frames as stored photos (frame.rs)
/// - The timer-driven capture loop (scheduler.rs)

pub mod camera;
pub mod frame;
pub mod scheduler;

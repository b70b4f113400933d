/// Timed photo capture sessions stored in a local catalog
///
/// The library is split by concern:
/// - Session records and their SQLite catalog (session/)
/// - Camera sources, frame encoding, and the capture loop (capture/)

pub mod capture;
pub mod session;

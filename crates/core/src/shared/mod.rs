pub mod constants;
pub mod error;
pub mod frame_rate;
pub mod preset;
pub mod resolution;
pub mod video_metadata;

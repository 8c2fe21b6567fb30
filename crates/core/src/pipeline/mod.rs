pub mod read_frames;
pub mod save_frames;

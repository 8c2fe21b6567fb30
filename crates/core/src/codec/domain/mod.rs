pub mod frame_codec;

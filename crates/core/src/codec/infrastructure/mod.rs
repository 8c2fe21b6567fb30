pub mod rgb_codec;
pub mod uint16_codec;

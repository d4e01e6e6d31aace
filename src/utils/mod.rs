pub mod color;

pub use color::unpack_rgb;

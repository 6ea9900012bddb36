//! Image operations for derivative generation.
//!
//! Thin wrappers around the `image` crate used by the bit-depth,
//! format-conversion, resize, and watermark steps.

mod ops;

pub use ops::{
    composite_watermark, is_image_file, is_sixteen_bit, resize_max_edge, save_jpeg, to_eight_bit,
    IMAGE_EXTENSIONS,
};

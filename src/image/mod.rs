//! Image decoding, preprocessing, and rendering utilities.

mod load;
mod render;

pub use load::{preprocess, ImageSource};
pub use render::{render, ExportFormat, ExportedImage, RasterSurface};

/// Edge length inputs are stretched to before entering the network.
pub const DEFAULT_TARGET_SIZE: u32 = 256;

/// Number of channels after alpha stripping.
pub const RGB_CHANNELS: usize = 3;

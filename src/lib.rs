//! # stylizer
//!
//! Two-stage neural style transfer for avatar generation. A style-predictor
//! network encodes a reference image into a compact bottleneck, and a
//! style-transformer network applies that bottleneck to a content photo. The
//! result is rendered to a raster surface and exported as PNG or JPEG.
//!
//! ## Example
//!
//! ```no_run
//! use stylizer::{catalog, default_registry, Config, ExportFormat, Session};
//!
//! # fn main() -> stylizer::Result<()> {
//! let session = Session::new(default_registry()?, Config::default())?;
//!
//! session.upload_content(std::fs::read("photo.png")?)?;
//! session.select_style(catalog::resolve("/styles/mosaic.jpg"));
//! session.generate()?;
//!
//! let avatar = session.export(ExportFormat::Png)?;
//! std::fs::write(avatar.file_name(), avatar.bytes())?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;
#[cfg(feature = "proxy")]
pub mod proxy;
pub mod session;
pub mod tensor;

pub use error::{Error, Result};
pub use image::{ExportFormat, ExportedImage, ImageSource};
pub use model::{default_registry, ModelProvider, ModelRegistry};
pub use session::{Config, GenerateOutcome, Session, Status};

//! Two-stage stylization pipeline.

mod engine;
mod stylize;

pub use engine::{StylePredictor, StyleTransformer};
pub use stylize::StylizationPipeline;

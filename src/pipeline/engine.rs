//! Stage seams for the two-stage stylization network.
//!
//! The pipeline talks to the network through these traits so that graph
//! execution stays swappable; the production implementation lives next to the
//! loaded `ort` sessions.

use std::sync::Arc;

use ndarray::{Array4, ArrayView4};

use crate::error::Result;

/// First stage: encode a style image into its bottleneck representation.
pub trait StylePredictor {
    /// Run the predictor graph on a normalized `[1, size, size, 3]` style
    /// tensor, yielding the raw bottleneck, conventionally `[1, 1, 1, D]`.
    fn predict(&self, style: ArrayView4<'_, f32>) -> Result<Array4<f32>>;
}

/// Second stage: combine a content image with a style bottleneck.
pub trait StyleTransformer {
    /// Bottleneck length the loaded graph was built for.
    fn expected_bottleneck_len(&self) -> usize;

    /// Run the transformer graph, yielding the stylized `[1, h, w, 3]`
    /// raster tensor.
    fn transform(
        &self,
        content: ArrayView4<'_, f32>,
        bottleneck: ArrayView4<'_, f32>,
    ) -> Result<Array4<f32>>;
}

impl<T: StylePredictor + ?Sized> StylePredictor for Arc<T> {
    fn predict(&self, style: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        (**self).predict(style)
    }
}

impl<T: StyleTransformer + ?Sized> StyleTransformer for Arc<T> {
    fn expected_bottleneck_len(&self) -> usize {
        (**self).expected_bottleneck_len()
    }

    fn transform(
        &self,
        content: ArrayView4<'_, f32>,
        bottleneck: ArrayView4<'_, f32>,
    ) -> Result<Array4<f32>> {
        (**self).transform(content, bottleneck)
    }
}

//! Two-stage stylization orchestration.

use crate::error::{Error, Result};
use crate::pipeline::{StylePredictor, StyleTransformer};
use crate::tensor::{ImageTensor, StyleBottleneck, StylizedTensor, TensorTracker};

/// Orchestrates predictor and transformer execution and owns the lifetime of
/// every tensor created along the way.
pub struct StylizationPipeline<E> {
    engine: E,
    tracker: TensorTracker,
}

impl<E> StylizationPipeline<E>
where
    E: StylePredictor + StyleTransformer,
{
    pub fn new(engine: E, tracker: TensorTracker) -> Self {
        Self { engine, tracker }
    }

    /// Run both stages on an already-normalized content/style pair.
    ///
    /// The predictor runs first; its bottleneck is validated against the
    /// transformer's expected length before the transformer starts. The input
    /// tensors and the bottleneck are consumed and released on every exit
    /// path, so after the call (success or failure) the only live tensor is
    /// the returned one, which the caller releases after rendering.
    ///
    /// # Errors
    ///
    /// `Error::Inference` if either graph fails, `Error::ShapeMismatch` if
    /// the bottleneck does not fit the transformer or the output is not a
    /// `[1, h, w, 3]` raster.
    pub fn stylize(&self, content: ImageTensor, style: ImageTensor) -> Result<StylizedTensor> {
        tracing::debug!("running style predictor");
        let raw_bottleneck = self.engine.predict(style.view())?;
        let bottleneck = StyleBottleneck::new(raw_bottleneck, &self.tracker);
        style.release();

        let expected = self.engine.expected_bottleneck_len();
        if bottleneck.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("bottleneck of length {expected}"),
                actual: format!("length {}", bottleneck.len()),
            });
        }

        tracing::debug!("running style transformer");
        let raw_stylized = self.engine.transform(content.view(), bottleneck.view())?;
        content.release();
        bottleneck.release();

        let shape = raw_stylized.shape();
        if shape[0] != 1 || shape[3] != 3 {
            return Err(Error::ShapeMismatch {
                expected: "[1, h, w, 3] stylized tensor".to_string(),
                actual: format!("{shape:?}"),
            });
        }

        Ok(StylizedTensor::new(raw_stylized, &self.tracker))
    }

    #[must_use]
    pub fn tracker(&self) -> &TensorTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use ndarray::{Array4, ArrayView4};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    const EXPECTED_LEN: usize = 100;

    /// Deterministic stand-in for the loaded graphs. The bottleneck is the
    /// style mean, and the output scales the content by the first bottleneck
    /// coefficient.
    #[derive(Default)]
    struct FakeEngine {
        bottleneck_len: usize,
        fail_predict: AtomicBool,
        fail_transform: AtomicBool,
        bad_output_shape: AtomicBool,
        predict_calls: AtomicUsize,
        transform_calls: AtomicUsize,
    }

    impl FakeEngine {
        fn well_formed() -> Self {
            Self {
                bottleneck_len: EXPECTED_LEN,
                ..Self::default()
            }
        }
    }

    impl StylePredictor for FakeEngine {
        fn predict(&self, style: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
            self.predict_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_predict.load(Ordering::SeqCst) {
                return Err(Error::inference(
                    Stage::Predictor,
                    std::io::Error::other("predictor exploded"),
                ));
            }
            let mean = style.mean().unwrap_or(0.0);
            Ok(Array4::from_elem((1, 1, 1, self.bottleneck_len), mean))
        }
    }

    impl StyleTransformer for FakeEngine {
        fn expected_bottleneck_len(&self) -> usize {
            EXPECTED_LEN
        }

        fn transform(
            &self,
            content: ArrayView4<'_, f32>,
            bottleneck: ArrayView4<'_, f32>,
        ) -> Result<Array4<f32>> {
            self.transform_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_transform.load(Ordering::SeqCst) {
                return Err(Error::inference(
                    Stage::Transformer,
                    std::io::Error::other("transformer exploded"),
                ));
            }
            if self.bad_output_shape.load(Ordering::SeqCst) {
                return Ok(Array4::zeros((1, 8, 8, 4)));
            }
            let scale = bottleneck[[0, 0, 0, 0]];
            Ok(content.to_owned() * scale)
        }
    }

    fn inputs(tracker: &TensorTracker) -> (ImageTensor, ImageTensor) {
        let content = Array4::from_shape_fn((1, 8, 8, 3), |(_, y, x, c)| {
            (y * 24 + x * 3 + c) as f32 / 255.0
        });
        let style = Array4::from_elem((1, 8, 8, 3), 0.5);
        (
            ImageTensor::new(content, tracker),
            ImageTensor::new(style, tracker),
        )
    }

    #[test]
    fn success_leaves_only_the_result_live() {
        let engine = Arc::new(FakeEngine::well_formed());
        let tracker = TensorTracker::new();
        let pipeline = StylizationPipeline::new(Arc::clone(&engine), tracker.clone());

        let (content, style) = inputs(&tracker);
        let stylized = pipeline.stylize(content, style).unwrap();

        assert_eq!(stylized.shape(), &[1, 8, 8, 3]);
        assert_eq!(engine.predict_calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.transform_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.live(), 1);

        stylized.release();
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn predictor_failure_releases_everything() {
        let engine = Arc::new(FakeEngine::well_formed());
        engine.fail_predict.store(true, Ordering::SeqCst);
        let tracker = TensorTracker::new();
        let pipeline = StylizationPipeline::new(Arc::clone(&engine), tracker.clone());

        let (content, style) = inputs(&tracker);
        let err = pipeline.stylize(content, style).unwrap_err();

        assert!(matches!(err, Error::Inference { .. }));
        assert_eq!(engine.transform_calls.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn transformer_failure_releases_everything() {
        let engine = Arc::new(FakeEngine::well_formed());
        engine.fail_transform.store(true, Ordering::SeqCst);
        let tracker = TensorTracker::new();
        let pipeline = StylizationPipeline::new(Arc::clone(&engine), tracker.clone());

        let (content, style) = inputs(&tracker);
        let err = pipeline.stylize(content, style).unwrap_err();

        assert!(matches!(err, Error::Inference { .. }));
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn bottleneck_mismatch_never_reaches_the_transformer() {
        let engine = Arc::new(FakeEngine {
            bottleneck_len: 32,
            ..FakeEngine::default()
        });
        let tracker = TensorTracker::new();
        let pipeline = StylizationPipeline::new(Arc::clone(&engine), tracker.clone());

        let (content, style) = inputs(&tracker);
        let err = pipeline.stylize(content, style).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(engine.transform_calls.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn non_raster_output_is_a_shape_mismatch() {
        let engine = Arc::new(FakeEngine::well_formed());
        engine.bad_output_shape.store(true, Ordering::SeqCst);
        let tracker = TensorTracker::new();
        let pipeline = StylizationPipeline::new(Arc::clone(&engine), tracker.clone());

        let (content, style) = inputs(&tracker);
        let err = pipeline.stylize(content, style).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn stylize_is_deterministic() {
        let engine = Arc::new(FakeEngine::well_formed());
        let tracker = TensorTracker::new();
        let pipeline = StylizationPipeline::new(engine, tracker.clone());

        let (content_a, style_a) = inputs(&tracker);
        let (content_b, style_b) = inputs(&tracker);

        let first = pipeline.stylize(content_a, style_a).unwrap();
        let second = pipeline.stylize(content_b, style_b).unwrap();

        assert_eq!(first.view(), second.view());
    }
}

//! ONNX graph execution for the two stylization stages.

use ndarray::{Array4, ArrayView4};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result, Stage};
use crate::model::registry::{StyleModels, BOTTLENECK_LEN};
use crate::pipeline::{StylePredictor, StyleTransformer};

impl StylePredictor for StyleModels {
    fn predict(&self, style: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        let mut session = self.predictor.lock().unwrap();
        run_single(&mut session, style.to_owned(), Stage::Predictor)
    }
}

impl StyleTransformer for StyleModels {
    fn expected_bottleneck_len(&self) -> usize {
        BOTTLENECK_LEN
    }

    fn transform(
        &self,
        content: ArrayView4<'_, f32>,
        bottleneck: ArrayView4<'_, f32>,
    ) -> Result<Array4<f32>> {
        let mut session = self.transformer.lock().unwrap();
        run_pair(
            &mut session,
            content.to_owned(),
            bottleneck.to_owned(),
            Stage::Transformer,
        )
    }
}

/// Run a graph on a single input and extract the first output.
fn run_single(session: &mut Session, input: Array4<f32>, stage: Stage) -> Result<Array4<f32>> {
    let value = Tensor::from_array(input).map_err(|source| Error::inference(stage, source))?;

    let outputs = session
        .run(ort::inputs![value])
        .map_err(|source| Error::inference(stage, source))?;

    let output = outputs.values().next().ok_or_else(|| Error::ShapeMismatch {
        expected: "one graph output".to_string(),
        actual: "no output".to_string(),
    })?;

    extract_array4(&output, stage)
}

/// Run a graph on an ordered input pair and extract the first output.
/// Input order matches the reference graphs: content first, bottleneck second.
fn run_pair(
    session: &mut Session,
    first: Array4<f32>,
    second: Array4<f32>,
    stage: Stage,
) -> Result<Array4<f32>> {
    let first = Tensor::from_array(first).map_err(|source| Error::inference(stage, source))?;
    let second = Tensor::from_array(second).map_err(|source| Error::inference(stage, source))?;

    let outputs = session
        .run(ort::inputs![first, second])
        .map_err(|source| Error::inference(stage, source))?;

    let output = outputs.values().next().ok_or_else(|| Error::ShapeMismatch {
        expected: "one graph output".to_string(),
        actual: "no output".to_string(),
    })?;

    extract_array4(&output, stage)
}

/// Extract a 4-D array from an ONNX value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn extract_array4(value: &ort::value::ValueRef<'_>, stage: Stage) -> Result<Array4<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::inference(stage, source))?;

    // Safe: tensor dimensions are always non-negative and within bounds
    let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

    if dims.len() != 4 {
        return Err(Error::ShapeMismatch {
            expected: "4D tensor".to_string(),
            actual: format!("{}D tensor", dims.len()),
        });
    }

    Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), data.to_vec()).map_err(|_| {
        Error::ShapeMismatch {
            expected: format!("{dims:?}"),
            actual: "reshape failed".to_string(),
        }
    })
}

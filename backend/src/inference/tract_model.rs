use std::path::Path;

use image::RgbImage;
use log::{debug, info};
use ndarray::Array3;
use tract_onnx::prelude::*;

use super::preprocess::blob_from_image;
use super::{Inference, InferenceError, PredictionTensor};
use crate::detection::Shape;

/// Runs an exported YOLO-style ONNX detector on the CPU.
///
/// The model emits `[1, 4 + classes, rows]`; predictions are handed on
/// transposed to `[1, rows, 4 + classes]`.
pub struct TractInference {
    model: TypedRunnableModel<TypedModel>,
    input: Shape,
}

impl TractInference {
    pub fn load<P: AsRef<Path>>(model_path: P, input: Shape) -> Result<Self, InferenceError> {
        let model_path = model_path.as_ref();
        info!("Loading ONNX model from {}", model_path.display());
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                InferenceError::ModelLoad(format!("{}: {}", model_path.display(), e))
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input.height as usize, input.width as usize),
                ),
            )
            .map_err(|e| InferenceError::ModelLoad(format!("failed to set input fact: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("failed to optimize model: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::ModelLoad(format!("failed to build plan: {}", e)))?;
        info!(
            "Model ready with input {}x{}",
            input.width, input.height
        );
        Ok(Self { model, input })
    }

    fn to_prediction(output: &Tensor) -> Result<PredictionTensor, InferenceError> {
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))?;
        let &[batch, features, rows] = view.shape() else {
            return Err(InferenceError::UnexpectedOutput(format!(
                "expected a 3-d output, got shape {:?}",
                view.shape()
            )));
        };
        debug!(
            "Model output: batch {}, {} features, {} rows",
            batch, features, rows
        );
        let data: Vec<f32> = view.permuted_axes(vec![0, 2, 1]).iter().copied().collect();
        Array3::from_shape_vec((batch, rows, features), data)
            .map_err(|e| InferenceError::UnexpectedOutput(e.to_string()))
    }
}

impl Inference for TractInference {
    fn name(&self) -> &'static str {
        "tract-onnx"
    }

    fn input_shape(&self) -> Shape {
        self.input
    }

    fn predict(&self, image: &RgbImage) -> Result<PredictionTensor, InferenceError> {
        let blob = blob_from_image(image, self.input);
        let input = Tensor::from_shape(
            &[1, 3, self.input.height as usize, self.input.width as usize],
            &blob,
        )
        .map_err(|e| InferenceError::Preprocessing(e.to_string()))?;

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::UnexpectedOutput("model produced no outputs".into()))?;
        Self::to_prediction(output)
    }
}

use image::RgbImage;
use ndarray::Array3;
use thiserror::Error;

use crate::detection::Shape;

pub mod preprocess;
#[cfg(feature = "backend-tract")]
pub mod tract_model;

#[cfg(feature = "backend-tract")]
pub use tract_model::TractInference;

/// Raw model output laid out as `[batch][rows][4 + classes]`.
pub type PredictionTensor = Array3<f32>;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model loading error: {0}")]
    ModelLoad(String),
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model runtime error: {0}")]
    Runtime(String),
    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),
    #[error("Inference timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A model that turns a decoded photo into a prediction tensor.
///
/// Implementations resize to their own input resolution; the caller keeps
/// the original dimensions to map boxes back.
pub trait Inference: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolution the prediction tensor is expressed in.
    fn input_shape(&self) -> Shape;

    fn predict(&self, image: &RgbImage) -> Result<PredictionTensor, InferenceError>;
}

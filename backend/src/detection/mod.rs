pub mod decoder;
pub mod nms;
pub mod params;
pub mod pipeline;

pub use decoder::{BoxDecoder, RawCandidate, Shape};
pub use nms::{NonMaxSuppressor, iou};
pub use params::{DetectionParams, SelectionPolicy};
pub use pipeline::DetectionPipeline;

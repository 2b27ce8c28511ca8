use std::borrow::Cow;

use log::debug;
use ndarray::{ArrayView3, Axis};
use shared::Detection;

use super::decoder::{BoxDecoder, Shape};
use super::nms::NonMaxSuppressor;
use super::params::DetectionParams;

/// Decodes every row of a `[batch][rows][4 + classes]` prediction tensor
/// and suppresses overlaps, producing the final detections of one image.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    params: DetectionParams,
    labels: Vec<String>,
}

impl DetectionPipeline {
    pub fn new(params: DetectionParams, labels: Vec<String>) -> Self {
        Self { params, labels }
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Only the first batch entry is read. Output order is the order in
    /// which suppression selected the boxes.
    pub fn run(
        &self,
        tensor: ArrayView3<'_, f32>,
        image_shape: Shape,
        input_shape: Shape,
    ) -> Vec<Detection> {
        if tensor.len_of(Axis(0)) == 0 {
            return Vec::new();
        }

        let decoder = BoxDecoder::new(
            image_shape,
            input_shape,
            self.params.score_threshold,
            self.params.selection_policy,
            &self.labels,
        );

        let mut candidates = Vec::new();
        for row in tensor.index_axis(Axis(0), 0).outer_iter() {
            let row: Cow<'_, [f32]> = match row.as_slice() {
                Some(slice) => Cow::Borrowed(slice),
                None => Cow::Owned(row.to_vec()),
            };
            decoder.decode_row(&row, &mut candidates);
        }
        let candidate_count = candidates.len();

        let detections = NonMaxSuppressor::new(
            self.params.nms_score_threshold,
            self.params.nms_iou_threshold,
        )
        .suppress(candidates);

        debug!(
            "Pipeline kept {} of {} candidates from {} rows",
            detections.len(),
            candidate_count,
            tensor.len_of(Axis(1))
        );
        detections
    }
}

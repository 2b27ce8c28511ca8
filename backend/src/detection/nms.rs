use std::cmp::Ordering;

use shared::{BoundingBox, Detection};

use super::decoder::RawCandidate;

/// Intersection over union of two pixel boxes. A box without area
/// overlaps nothing.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a == 0.0 || area_b == 0.0 {
        return 0.0;
    }

    let inter_w = a.right().min(b.right()) - a.left.max(b.left) as i64;
    let inter_h = a.bottom().min(b.bottom()) - a.top.max(b.top) as i64;
    if inter_w <= 0 || inter_h <= 0 {
        return 0.0;
    }

    let intersection = inter_w as f64 * inter_h as f64;
    intersection / (area_a + area_b - intersection)
}

/// Greedy class-agnostic non-max suppression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonMaxSuppressor {
    pub score_threshold: f32,
    pub iou_threshold: f32,
}

impl NonMaxSuppressor {
    pub fn new(score_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            score_threshold,
            iou_threshold,
        }
    }

    /// Returns the kept candidates in selection order, highest confidence
    /// first, with confidences rescaled to percentages. Equal confidences
    /// keep their input order.
    pub fn suppress(&self, candidates: Vec<RawCandidate>) -> Vec<Detection> {
        let mut pending: Vec<RawCandidate> = candidates
            .into_iter()
            .filter(|c| c.raw_confidence >= self.score_threshold)
            .collect();

        pending.sort_by(|a, b| {
            b.raw_confidence
                .partial_cmp(&a.raw_confidence)
                .unwrap_or(Ordering::Equal)
        });

        let iou_threshold = self.iou_threshold as f64;
        let mut suppressed = vec![false; pending.len()];
        let mut kept = Vec::new();

        for i in 0..pending.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..pending.len() {
                if !suppressed[j] && iou(&pending[i].bbox, &pending[j].bbox) > iou_threshold {
                    suppressed[j] = true;
                }
            }
            kept.push(i);
        }

        let mut slots: Vec<Option<RawCandidate>> = pending.into_iter().map(Some).collect();
        kept.into_iter()
            .filter_map(|i| slots[i].take())
            .map(|c| Detection {
                bbox: c.bbox,
                class_label: c.class_label,
                confidence: c.raw_confidence * 100.0,
            })
            .collect()
    }
}

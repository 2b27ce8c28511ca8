use shared::BoundingBox;

use super::params::SelectionPolicy;

/// Index of the first class score inside a prediction row.
pub const CLASS_OFFSET: usize = 4;

/// Spatial size in pixels, height first like the tensors it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub height: u32,
    pub width: u32,
}

impl Shape {
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }
}

/// A box that passed the score threshold but has not been through
/// suppression yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub bbox: BoundingBox,
    pub class_label: String,
    pub raw_confidence: f32,
}

/// Maps model-input coordinates back onto the original image.
#[derive(Debug, Clone, Copy)]
pub struct BoxDecoder<'a> {
    x_factor: f64,
    y_factor: f64,
    score_threshold: f32,
    policy: SelectionPolicy,
    labels: &'a [String],
}

impl<'a> BoxDecoder<'a> {
    pub fn new(
        image_shape: Shape,
        input_shape: Shape,
        score_threshold: f32,
        policy: SelectionPolicy,
        labels: &'a [String],
    ) -> Self {
        Self {
            x_factor: image_shape.width as f64 / input_shape.width as f64,
            y_factor: image_shape.height as f64 / input_shape.height as f64,
            score_threshold,
            policy,
            labels,
        }
    }

    /// Box math shared by both policies. Values are truncated toward zero
    /// and never clamped to the image.
    pub fn decode_box(&self, cx: f32, cy: f32, w: f32, h: f32) -> BoundingBox {
        let (cx, cy, w, h) = (cx as f64, cy as f64, w as f64, h as f64);
        BoundingBox {
            left: ((cx - 0.5 * w) * self.x_factor) as i32,
            top: ((cy - 0.5 * h) * self.y_factor) as i32,
            width: (w * self.x_factor) as i32,
            height: (h * self.y_factor) as i32,
        }
    }

    /// Appends the candidates one row yields to `out`. Rows too short to
    /// carry a box and one score yield nothing.
    pub fn decode_row(&self, row: &[f32], out: &mut Vec<RawCandidate>) {
        if row.len() <= CLASS_OFFSET {
            return;
        }
        let scores = &row[CLASS_OFFSET..];
        // The reported confidence is always the row's first score field.
        let raw_confidence = scores[0];

        match self.policy {
            SelectionPolicy::SingleLabel => {
                let (class_id, best) = argmax(scores);
                if best > self.score_threshold {
                    out.push(RawCandidate {
                        bbox: self.decode_box(row[0], row[1], row[2], row[3]),
                        class_label: self.label(class_id),
                        raw_confidence,
                    });
                }
            }
            SelectionPolicy::MultiLabel => {
                let mut bbox = None;
                for (class_id, &score) in scores.iter().enumerate() {
                    if score > self.score_threshold {
                        let bbox = *bbox
                            .get_or_insert_with(|| self.decode_box(row[0], row[1], row[2], row[3]));
                        out.push(RawCandidate {
                            bbox,
                            class_label: self.label(class_id),
                            raw_confidence,
                        });
                    }
                }
            }
        }
    }

    fn label(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

/// First index holding the maximum score.
fn argmax(scores: &[f32]) -> (usize, f32) {
    let mut best = (0, scores[0]);
    for (idx, &score) in scores.iter().enumerate().skip(1) {
        if score > best.1 {
            best = (idx, score);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["damaged door", "dent", "damaged hood"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn decodes_centered_box_at_unit_scale() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        assert_eq!(
            decoder.decode_box(320.0, 320.0, 100.0, 50.0),
            BoundingBox::new(270, 295, 100, 50)
        );
    }

    #[test]
    fn scales_to_image_and_truncates() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(480, 1280),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        // x factor 2.0, y factor 0.75
        let bbox = decoder.decode_box(100.5, 201.0, 33.3, 11.0);
        assert_eq!(bbox, BoundingBox::new(167, 146, 66, 8));
    }

    #[test]
    fn boxes_may_leave_the_image() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        let bbox = decoder.decode_box(10.0, 10.0, 60.0, 60.0);
        assert_eq!(bbox, BoundingBox::new(-20, -20, 60, 60));
    }

    #[test]
    fn single_label_picks_best_class_and_reports_first_score() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        let mut out = Vec::new();
        decoder.decode_row(&[320.0, 320.0, 100.0, 50.0, 0.05, 0.7, 0.3], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_label, "dent");
        assert_eq!(out[0].raw_confidence, 0.05);
    }

    #[test]
    fn single_label_rejects_rows_at_threshold() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        let mut out = Vec::new();
        decoder.decode_row(&[320.0, 320.0, 100.0, 50.0, 0.1, 0.05, 0.1], &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn single_label_ties_go_to_first_class() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        let mut out = Vec::new();
        decoder.decode_row(&[320.0, 320.0, 10.0, 10.0, 0.2, 0.6, 0.6], &mut out);
        assert_eq!(out[0].class_label, "dent");
    }

    #[test]
    fn multi_label_emits_every_qualifying_class() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::MultiLabel,
            &labels,
        );
        let mut out = Vec::new();
        decoder.decode_row(&[320.0, 320.0, 100.0, 50.0, 0.4, 0.05, 0.3], &mut out);
        let classes: Vec<_> = out.iter().map(|c| c.class_label.as_str()).collect();
        assert_eq!(classes, vec!["damaged door", "damaged hood"]);
        assert!(out.iter().all(|c| c.raw_confidence == 0.4));
        assert_eq!(out[0].bbox, out[1].bbox);
    }

    #[test]
    fn unknown_class_index_gets_placeholder_label() {
        let labels = vec!["dent".to_string()];
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.1,
            SelectionPolicy::SingleLabel,
            &labels,
        );
        let mut out = Vec::new();
        decoder.decode_row(&[1.0, 1.0, 1.0, 1.0, 0.0, 0.9], &mut out);
        assert_eq!(out[0].class_label, "class_1");
    }

    #[test]
    fn short_rows_yield_nothing() {
        let labels = labels();
        let decoder = BoxDecoder::new(
            Shape::new(640, 640),
            Shape::new(640, 640),
            0.0,
            SelectionPolicy::MultiLabel,
            &labels,
        );
        let mut out = Vec::new();
        decoder.decode_row(&[1.0, 2.0, 3.0, 4.0], &mut out);
        assert!(out.is_empty());
    }
}

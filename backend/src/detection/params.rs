use serde::{Deserialize, Serialize};

/// How a prediction row turns its class scores into candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Only the best-scoring class of a row may become a candidate.
    #[default]
    SingleLabel,
    /// Every class above the score threshold becomes its own candidate.
    MultiLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub score_threshold: f32,
    pub nms_iou_threshold: f32,
    pub nms_score_threshold: f32,
    pub selection_policy: SelectionPolicy,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            score_threshold: 0.1,
            nms_iou_threshold: 0.0,
            nms_score_threshold: 0.0,
            selection_policy: SelectionPolicy::SingleLabel,
        }
    }
}

impl DetectionParams {
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }
}

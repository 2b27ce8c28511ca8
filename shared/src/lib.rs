use std::collections::BTreeMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use uuid::Uuid;

/// Stage of an inspection that currently accepts detections.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr,
    EnumString, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Pickup,
    Return,
}

/// Axis-aligned box in absolute image pixels. Travels on the wire as
/// `[left, top, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
#[display(fmt = "[{}, {}, {}, {}]", left, top, width, height)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Edges are widened to `i64`; boxes decoded far outside the frame sit
    /// at the ends of the `i32` range.
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    pub fn area(&self) -> f64 {
        if self.width <= 0 || self.height <= 0 {
            0.0
        } else {
            self.width as f64 * self.height as f64
        }
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([left, top, width, height]: [i32; 4]) -> Self {
        Self::new(left, top, width, height)
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.left, b.top, b.width, b.height]
    }
}

/// One labeled damage found in one image. `confidence` is a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display(fmt = "${}-${}", min, max)]
pub struct RepairCostRange {
    pub min: u64,
    pub max: u64,
}

impl RepairCostRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }
}

/// Detections of a single image as parallel arrays, the shape callers
/// render boxes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDetections {
    pub boxes: Vec<BoundingBox>,
    pub confidences: Vec<f32>,
    pub classes: Vec<String>,
    pub repair_costs: Vec<RepairCostRange>,
}

impl ImageDetections {
    pub fn push(&mut self, detection: &Detection, cost: RepairCostRange) {
        self.boxes.push(detection.bbox);
        self.confidences.push(detection.confidence);
        self.classes.push(detection.class_label.clone());
        self.repair_costs.push(cost);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StartInspectionResponse {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DetectionResponse {
    pub session_id: Uuid,
    pub phase: Phase,
    pub detections_count: usize,
    pub current_detection: ImageDetections,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SwitchPhaseResponse {
    pub session_id: Uuid,
    pub phase: Phase,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PhaseSummary {
    pub images_uploaded: usize,
    pub total_damages: usize,
    pub damages_by_type: BTreeMap<String, usize>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InspectionSummary {
    pub pickup_phase: PhaseSummary,
    pub return_phase: PhaseSummary,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DamageBreakdown {
    #[serde(rename = "type")]
    pub damage_type: String,
    pub count: usize,
    pub cost_range: RepairCostRange,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EstimatedRepairCost {
    pub min: u64,
    pub max: u64,
    pub average: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NewDamageReport {
    pub total_new_damages: usize,
    pub damages_breakdown: Vec<DamageBreakdown>,
    pub estimated_repair_cost: EstimatedRepairCost,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReconciliationReport {
    pub session_id: Uuid,
    pub inspection_summary: InspectionSummary,
    pub new_damages_detected: NewDamageReport,
    pub return_detections_with_boxes: Vec<ImageDetections>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiInfo {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

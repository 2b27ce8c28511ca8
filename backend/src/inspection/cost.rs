use std::collections::HashMap;

use lazy_static::lazy_static;
use shared::{Detection, ImageDetections, RepairCostRange};

/// Range charged for labels missing from the table.
pub const DEFAULT_REPAIR_COST: RepairCostRange = RepairCostRange::new(100, 500);

lazy_static! {
    static ref DEFAULT_REPAIR_COSTS: HashMap<&'static str, RepairCostRange> = {
        let mut m = HashMap::new();
        m.insert("damaged door", RepairCostRange::new(300, 1500));
        m.insert("damaged window", RepairCostRange::new(200, 400));
        m.insert("damaged headlight", RepairCostRange::new(200, 780));
        m.insert("damaged mirror", RepairCostRange::new(140, 330));
        m.insert("dent", RepairCostRange::new(150, 600));
        m.insert("damaged hood", RepairCostRange::new(300, 1500));
        m.insert("damaged bumper", RepairCostRange::new(325, 1000));
        m.insert("damaged wind shield", RepairCostRange::new(200, 500));
        m
    };
}

/// Static label to repair cost lookup. Keys are stored lowercased so that
/// lookups ignore case.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTable {
    entries: HashMap<String, RepairCostRange>,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_REPAIR_COSTS
                .iter()
                .map(|(label, range)| (label.to_string(), *range))
                .collect(),
        }
    }
}

impl CostTable {
    pub fn from_map(entries: HashMap<String, RepairCostRange>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(label, range)| (label.to_lowercase(), range))
                .collect(),
        }
    }

    pub fn estimate(&self, class_label: &str) -> RepairCostRange {
        self.entries
            .get(&class_label.to_lowercase())
            .copied()
            .unwrap_or(DEFAULT_REPAIR_COST)
    }

    /// Attaches a cost range to every detection of one image.
    pub fn price(&self, detections: &[Detection]) -> ImageDetections {
        let mut priced = ImageDetections::default();
        for detection in detections {
            priced.push(detection, self.estimate(&detection.class_label));
        }
        priced
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use std::collections::{BTreeMap, HashMap};

use shared::{
    DamageBreakdown, EstimatedRepairCost, ImageDetections, InspectionSummary, NewDamageReport,
    PhaseSummary, ReconciliationReport,
};

use super::cost::CostTable;
use super::session::InspectionSession;

/// Occurrences per damage label, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageTally {
    counts: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl DamageTally {
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tally = Self::default();
        for label in labels {
            tally.add(label, 1);
        }
        tally
    }

    /// Tally of every label across a phase's images.
    pub fn from_images(images: &[ImageDetections]) -> Self {
        Self::from_labels(
            images
                .iter()
                .flat_map(|image| image.classes.iter().map(String::as_str)),
        )
    }

    pub fn add(&mut self, label: &str, count: usize) {
        match self.index.get(label) {
            Some(&slot) => self.counts[slot].1 += count,
            None => {
                self.index.insert(label.to_string(), self.counts.len());
                self.counts.push((label.to_string(), count));
            }
        }
    }

    pub fn get(&self, label: &str) -> usize {
        self.index.get(label).map_or(0, |&slot| self.counts[slot].1)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, n)| (label.as_str(), *n))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Labels seen more often in `self` than in `baseline`, with the
    /// surplus. Instances of one label are interchangeable; where they sit
    /// in the picture plays no part.
    pub fn surplus_over(&self, baseline: &DamageTally) -> DamageTally {
        let mut surplus = DamageTally::default();
        for (label, count) in self.iter() {
            let extra = count.saturating_sub(baseline.get(label));
            if extra > 0 {
                surplus.add(label, extra);
            }
        }
        surplus
    }

    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.iter().map(|(label, n)| (label.to_string(), n)).collect()
    }
}

fn summarize(images: &[ImageDetections], tally: &DamageTally) -> PhaseSummary {
    PhaseSummary {
        images_uploaded: images.len(),
        total_damages: tally.total(),
        damages_by_type: tally.to_map(),
    }
}

/// Compares what a vehicle looked like at return against pickup and
/// prices whatever is new.
#[derive(Debug, Clone, Default)]
pub struct DamageReconciler {
    costs: CostTable,
}

impl DamageReconciler {
    pub fn new(costs: CostTable) -> Self {
        Self { costs }
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    pub fn new_damages(
        &self,
        pickup: &[ImageDetections],
        returned: &[ImageDetections],
    ) -> NewDamageReport {
        let pickup_tally = DamageTally::from_images(pickup);
        let return_tally = DamageTally::from_images(returned);
        self.price(&return_tally.surplus_over(&pickup_tally))
    }

    pub fn reconcile(&self, session: &InspectionSession) -> ReconciliationReport {
        let pickup = session.pickup_detections();
        let returned = session.return_detections();
        let pickup_tally = DamageTally::from_images(pickup);
        let return_tally = DamageTally::from_images(returned);
        let new_damages = return_tally.surplus_over(&pickup_tally);

        ReconciliationReport {
            session_id: session.id,
            inspection_summary: InspectionSummary {
                pickup_phase: summarize(pickup, &pickup_tally),
                return_phase: summarize(returned, &return_tally),
            },
            new_damages_detected: self.price(&new_damages),
            return_detections_with_boxes: returned.to_vec(),
        }
    }

    fn price(&self, new_damages: &DamageTally) -> NewDamageReport {
        let mut total_min = 0u64;
        let mut total_max = 0u64;
        let mut breakdown = Vec::new();

        for (label, count) in new_damages.iter() {
            let cost_range = self.costs.estimate(label);
            total_min += cost_range.min * count as u64;
            total_max += cost_range.max * count as u64;
            breakdown.push(DamageBreakdown {
                damage_type: label.to_string(),
                count,
                cost_range,
            });
        }

        NewDamageReport {
            total_new_damages: new_damages.total(),
            damages_breakdown: breakdown,
            estimated_repair_cost: EstimatedRepairCost {
                min: total_min,
                max: total_max,
                average: (total_min + total_max) / 2,
            },
        }
    }
}

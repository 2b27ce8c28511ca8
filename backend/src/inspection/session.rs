use chrono::{DateTime, Utc};
use shared::{ImageDetections, Phase};
use uuid::Uuid;

/// Per-vehicle inspection state. Detections land in the list of whatever
/// phase the session is in when they are recorded.
#[derive(Debug, Clone)]
pub struct InspectionSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    phase: Phase,
    pickup_detections: Vec<ImageDetections>,
    return_detections: Vec<ImageDetections>,
    // Set once the session is completed or evicted; a closed session
    // behaves as if it no longer exists.
    closed: bool,
}

impl InspectionSession {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_activity: now,
            phase: Phase::Pickup,
            pickup_detections: Vec::new(),
            return_detections: Vec::new(),
            closed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pickup_detections(&self) -> &[ImageDetections] {
        &self.pickup_detections
    }

    pub fn return_detections(&self) -> &[ImageDetections] {
        &self.return_detections
    }

    /// Appends one image worth of detections to the current phase and
    /// returns how many images that phase now holds.
    pub fn record(&mut self, detections: ImageDetections) -> usize {
        self.touch();
        let list = match self.phase {
            Phase::Pickup => &mut self.pickup_detections,
            Phase::Return => &mut self.return_detections,
        };
        list.push(detections);
        list.len()
    }

    /// Moves to the return phase. Already being there is not an error.
    pub fn switch_to_return(&mut self) -> bool {
        self.touch();
        let switched = self.phase == Phase::Pickup;
        self.phase = Phase::Return;
        switched
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_dent() -> ImageDetections {
        ImageDetections {
            boxes: vec![[0, 0, 4, 4].into()],
            confidences: vec![50.0],
            classes: vec!["dent".to_string()],
            repair_costs: vec![shared::RepairCostRange::new(150, 600)],
        }
    }

    #[test]
    fn new_session_starts_in_pickup_with_nothing_recorded() {
        let session = InspectionSession::new(Uuid::new_v4());
        assert_eq!(session.phase(), Phase::Pickup);
        assert!(session.pickup_detections().is_empty());
        assert!(session.return_detections().is_empty());
    }

    #[test]
    fn records_into_current_phase() {
        let mut session = InspectionSession::new(Uuid::new_v4());
        assert_eq!(session.record(one_dent()), 1);
        assert_eq!(session.record(ImageDetections::default()), 2);
        assert!(session.switch_to_return());
        assert_eq!(session.record(one_dent()), 1);
        assert_eq!(session.pickup_detections().len(), 2);
        assert_eq!(session.return_detections().len(), 1);
    }

    #[test]
    fn switching_twice_stays_in_return() {
        let mut session = InspectionSession::new(Uuid::new_v4());
        assert!(session.switch_to_return());
        assert!(!session.switch_to_return());
        assert_eq!(session.phase(), Phase::Return);
    }
}

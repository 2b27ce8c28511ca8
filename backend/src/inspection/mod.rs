pub mod cost;
pub mod reconcile;
pub mod service;
pub mod session;
pub mod store;

pub use cost::{CostTable, DEFAULT_REPAIR_COST};
pub use reconcile::{DamageReconciler, DamageTally};
pub use service::{InspectionService, parse_session_id};
pub use session::InspectionSession;
pub use store::{RecordOutcome, SessionStore};

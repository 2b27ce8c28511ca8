pub mod config;
pub mod detection;
pub mod error;
pub mod inference;
pub mod inspection;
pub mod routes;

pub use error::InspectionError;

//! Typed access to the prediction and station tables.

mod predictions;
mod stations;

pub use predictions::{PredictionQuery, PredictionRepository, RECENCY_WINDOW};
pub use stations::StationRepository;

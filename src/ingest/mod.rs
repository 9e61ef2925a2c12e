//! Background ingestion: the prediction poller and the station bulk loader.

mod poller;
mod stations;

pub use poller::{CycleOutcome, PollState, Poller};
pub use stations::{LoadReport, load_stations};

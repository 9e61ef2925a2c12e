pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod model;
pub mod normalize;
pub mod output;
pub mod rate_limit;
pub mod repository;
pub mod schedule;
pub mod store;

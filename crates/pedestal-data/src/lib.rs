//! Data-driven station setup: item and rule definitions plus station
//! tunables read from RON, TOML or JSON files.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, StationData, load_station_data};

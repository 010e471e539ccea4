mod analysis;
mod clients;
mod config;
mod error;
mod pipeline;
mod processing;
mod storage;
#[cfg(test)]
mod test_support;
mod types;

pub use config::*;
pub use error::PipelineError;
pub use pipeline::*;

pub use clients::energy_client::EnergyClient;
pub use clients::error::FetchError;
pub use clients::retry_client::*;
pub use clients::weather_client::{celsius_from_tenths, fahrenheit_from_tenths, WeatherClient};
pub use clients::window::FetchWindow;

pub use processing::error::ProcessingError;
pub use processing::merger::{merge_frames, MergeOutput};
pub use processing::quality::*;

pub use analysis::*;

pub use storage::error::StorageError;
pub use storage::OutputStore;

pub use types::calendar::{DayType, TemperatureBand};
pub use types::city::{city_slug, default_cities, City};
pub use types::data_kind::DataKind;
pub use types::records::*;

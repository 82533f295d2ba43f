mod api;
mod config;
mod error;
mod harvester;
mod locations;
mod measurements;
mod output;
mod types;
mod utils;

pub use error::HarvestError;
pub use harvester::*;

pub use api::client::{OpenAqClient, DEFAULT_BASE_URL};
pub use api::error::ApiError;
pub use api::transport::{ApiRequest, ApiResponse, Transport};

pub use config::{ConfigError, HarvestConfig, OutputConfig, TableFormat, API_KEY_ENV};

pub use locations::finder::LocationFinder;

pub use measurements::chunks::TimeChunks;
pub use measurements::fetcher::{FetchSettings, MeasurementFetcher, MeasurementPager};
pub use measurements::normalize::{normalize, NormalizeError, Normalized};

pub use output::error::OutputError;
pub use output::ndjson::NdjsonSink;
pub use output::table::{rows_to_dataframe, TableSink};
pub use output::{OutputSink, RowSink, SinkSummary};

pub use types::location::{
    Coordinates, LatLon, Location, LocationDescriptor, ParameterDescriptor, ParameterDetails,
    Sensor, SensorDescriptor,
};
pub use types::measurement::{MeasurementFields, MeasurementRow};
pub use types::outcome::{ChunkOutcome, SensorResolution, SkipReason};
pub use types::time_chunk::{iso_utc, TimeChunk};

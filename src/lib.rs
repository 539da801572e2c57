//! Collector for air-quality readings published by the Israeli monitoring
//! network at svivaaqm.net, which only exposes per-region and per-station
//! HTML pages.

pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod text;

pub use config::{CollectorConfig, FetchConfig, SourceDescriptor};
pub use error::{BatchError, CollectionError, FetchError, RegionError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use model::{AggregateDocument, Measurement};
pub use pipeline::collect::collect;

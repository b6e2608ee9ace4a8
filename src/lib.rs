pub mod config;
pub mod dedupe;
pub mod distance;
pub mod grid;
pub mod ingest;
pub mod matching;
pub mod merge;
pub mod model;
pub mod names;
pub mod snapshot;
pub mod utils;

pub use config::Config;
pub use dedupe::{run, RunReport, RunStats};
pub use model::{Place, Source, SourceBatch};

mod cnae;
mod company;
mod csv_source;
mod exporter;
mod kv;
mod loader;
mod lookups;
mod partner;
mod pipeline;
mod primitives;
mod tax_regime;
mod transformer;

pub use cnae::Cnae;
pub use company::Company;
pub use kv::{HighMemoryStore, KvStore, SledStore, KIND_ACTIVITY, KIND_PARTNER, KIND_SIMPLES};
pub use lookups::Lookups;
pub use partner::Partner;
pub use primitives::{clean_string, to_date, to_float, to_int};
pub use tax_regime::TaxRegime;
pub use transformer::Transformer;

use std::fmt;
use thiserror::Error;

/// A single cell that failed to decode, carrying enough context for the
/// caller to attach the field name and for the log line to show the
/// original value (§7 `DecodeError{field, raw, cause}`).
#[derive(Debug, Clone)]
pub struct DecodeError {
    pub field: &'static str,
    pub raw: String,
    pub cause: String,
}

impl DecodeError {
    pub fn new(field: &'static str, raw: &str, cause: impl fmt::Display) -> Self {
        Self {
            field,
            raw: raw.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error decoding field {}: {} (raw value: {:?})",
            self.field, self.cause, self.raw
        )
    }
}

impl std::error::Error for DecodeError {}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("error loading lookup tables: {0}")]
    LookupLoad(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("KV staging store error: {0}")]
    Kv(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Default writer-flush granularity and output-channel-capacity multiplier
/// (`batchSize` in the distilled spec's §6 configuration table).
pub const BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub data_dir: String,
    pub output: String,
    pub batch_size: usize,
    pub high_memory: bool,
    pub privacy_mode: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            output: "export.json.gz".to_string(),
            batch_size: BATCH_SIZE,
            high_memory: false,
            privacy_mode: false,
        }
    }
}

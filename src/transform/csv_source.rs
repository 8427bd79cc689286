//! CSV dialect and shard-discovery helpers shared by the loader and exporter
//! (C8): Federal Revenue shards are semicolon-delimited, quote-wrapped,
//! header-less, Latin-1-encoded CSV files split across several numbered
//! files per group.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder};
use encoding_rs::WINDOWS_1252;
use encoding_rs_io::DecodeReaderBytesBuilder;
use walkdir::WalkDir;

use super::{Result, TransformError};

/// Finds every file directly under `dir` whose upper-cased name contains
/// `pattern` (already upper-case), sorted for deterministic worker
/// assignment. This mirrors the glob conventions in the distilled spec's
/// §6 (`*CNAECSV`, `*SOCIOCSV`, `*ESTABELE*`, ...) without depending on the
/// exact casing a given release uses.
pub fn shards(dir: &str, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.to_uppercase().contains(pattern))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    found.sort();
    Ok(found)
}

/// Opens a shard as a CSV reader transcoded from Latin-1 (Windows-1252, the
/// encoding the Federal Revenue actually emits) to UTF-8, semicolon
/// delimiter, no header row. The decode happens lazily as the reader is
/// driven, so a multi-gigabyte shard is never buffered whole for
/// transcoding.
pub fn open_shard(path: &Path) -> Result<Reader<Box<dyn std::io::Read>>> {
    let file = File::open(path)?;
    let transcoded = DecodeReaderBytesBuilder::new()
        .encoding(Some(WINDOWS_1252))
        .build(file);
    let reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(Box::new(transcoded) as Box<dyn std::io::Read>);
    Ok(reader)
}

/// Reads a small reference CSV (C2's lookup tables) fully, returning decoded
/// rows. Used only for files small enough (<=10^4 rows per the distilled
/// spec) to read eagerly rather than stream.
pub fn read_small_csv(path: &Path) -> Result<Vec<csv::StringRecord>> {
    let mut reader = open_shard(path)?;
    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row.map_err(TransformError::from)?);
    }
    Ok(rows)
}

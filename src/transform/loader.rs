//! Loader (C5): scans the three non-venue enrichment shard groups in
//! parallel and groups every row into the KV staging store under its
//! 8-char CNPJ base (§4.5).

use std::path::PathBuf;
use std::sync::Arc;

use super::csv_source::{open_shard, shards};
use super::kv::{KvStore, KIND_ACTIVITY, KIND_PARTNER, KIND_SIMPLES};
use super::partner::Partner;
use super::pipeline::{worker_count, CancellationToken, Progress};
use super::tax_regime::TaxRegime;
use super::{Lookups, Result, TransformError};

/// One non-venue enrichment shard group: its discovery glob, KV kind tag,
/// and the row decoder that turns a raw record into a JSON fragment.
struct Group {
    pattern: &'static str,
    kind: u8,
    label: &'static str,
}

const GROUPS: &[Group] = &[
    Group { pattern: "EMPRECSV", kind: KIND_ACTIVITY, label: "company base attributes" },
    Group { pattern: "SOCIOCSV", kind: KIND_PARTNER, label: "partners" },
    Group { pattern: "SIMPLES.CSV", kind: KIND_SIMPLES, label: "simples/MEI" },
];

/// Loads every enrichment shard in `data_dir` into `kv`. A malformed row
/// is logged and skipped (not fatal); a shard that cannot be opened, or a
/// lookup/KV failure, cancels the whole load (§4.5/§7).
///
/// Only flushes `kv` on completion — the store stays open and readable,
/// since the export phase (C6) still needs to `get` everything staged
/// here. The store is only destroyed once export has consumed it (§3).
pub fn load_all(data_dir: &str, lookups: &Lookups, kv: Arc<dyn KvStore>) -> Result<()> {
    for group in GROUPS {
        let files = shards(data_dir, group.pattern)?;
        if files.is_empty() {
            tracing::warn!(pattern = group.pattern, "no shards found for enrichment group");
            continue;
        }
        load_group(group, files, lookups, kv.clone())?;
    }
    kv.flush()
}

fn load_group(
    group: &Group,
    files: Vec<PathBuf>,
    lookups: &Lookups,
    kv: Arc<dyn KvStore>,
) -> Result<()> {
    let token = CancellationToken::new();
    let progress = Progress::new(&format!("loading {}", group.label));
    let pool_width = worker_count(files.len());

    std::thread::scope(|scope| {
        for chunk in files.chunks(files.len().div_ceil(pool_width).max(1)) {
            let chunk = chunk.to_vec();
            let token = token.clone();
            let kv = kv.clone();
            let progress = progress.clone();
            scope.spawn(move || {
                for path in chunk {
                    if token.is_cancelled() {
                        return;
                    }
                    if let Err(e) = load_shard(group, &path, lookups, kv.as_ref(), &token, &progress) {
                        token.fail(e);
                        return;
                    }
                }
            });
        }
    });

    progress.finish(format!("{} loaded", group.label));
    token.into_result()
}

fn load_shard(
    group: &Group,
    path: &std::path::Path,
    lookups: &Lookups,
    kv: &dyn KvStore,
    token: &CancellationToken,
    progress: &Progress,
) -> Result<()> {
    let mut reader = open_shard(path)?;
    for (row_index, record) in reader.records().enumerate() {
        if token.is_cancelled() {
            break;
        }
        let record = record.map_err(TransformError::from)?;
        let base = record.get(0).unwrap_or("").trim().to_string();
        if base.is_empty() {
            continue;
        }

        let fragment = match group.kind {
            KIND_PARTNER => Partner::new(&record, lookups).map(|p| serde_json::to_vec(&p)),
            KIND_SIMPLES => TaxRegime::new(&record).map(|t| serde_json::to_vec(&t)),
            KIND_ACTIVITY => super::company::decode_base_attributes(&record).map(|f| serde_json::to_vec(&f)),
            _ => unreachable!("unknown enrichment kind tag"),
        };

        let blob = match fragment {
            Ok(Ok(blob)) => blob,
            Ok(Err(e)) => return Err(TransformError::from(e)),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    row = row_index,
                    error = %e,
                    "skipping malformed enrichment row"
                );
                continue;
            }
        };

        kv.put(&base, group.kind, blob)?;
        progress.inc(1);
    }
    Ok(())
}

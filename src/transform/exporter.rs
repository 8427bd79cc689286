//! Exporter (C6): scans every venue (`*ESTABELE*`) shard in parallel,
//! joins each row against the lookup tables and the KV staging store, and
//! streams the resulting JSON lines to a single writer.

use std::io::Write;
use std::sync::Arc;

use super::company::Company;
use super::csv_source::{open_shard, shards};
use super::kv::KvStore;
use super::pipeline::{bounded_channel, worker_count, CancellationToken, Progress};
use super::{Lookups, Result, TransformError};

/// Runs the export phase: reads every `*ESTABELE*` shard under `data_dir`,
/// joins each row, and writes one JSON object per line to `out`. `out` is
/// owned exclusively by the writer thread for the run's duration (§5).
pub fn export_all(
    data_dir: &str,
    lookups: &Lookups,
    kv: Arc<dyn KvStore>,
    privacy: bool,
    batch_size: usize,
    mut out: impl Write + Send,
) -> Result<()> {
    let files = shards(data_dir, "ESTABELE")?;
    if files.is_empty() {
        return Err(TransformError::Config(format!(
            "no venue shard matching *ESTABELE* found in {data_dir}"
        )));
    }

    let pool_width = worker_count(files.len());
    let (tx, rx) = bounded_channel::<Vec<u8>>(batch_size, pool_width);
    let token = CancellationToken::new();
    let progress = Progress::new("exporting venues");

    let writer_result = std::thread::scope(|scope| {
        let writer = scope.spawn(move || -> Result<()> {
            let mut batch = Vec::with_capacity(batch_size);
            for line in rx.iter() {
                batch.push(line);
                if batch.len() >= batch_size {
                    flush(&mut out, &mut batch)?;
                }
            }
            flush(&mut out, &mut batch)?;
            out.flush()?;
            Ok(())
        });

        for chunk in files.chunks(files.len().div_ceil(pool_width).max(1)) {
            let chunk = chunk.to_vec();
            let token = token.clone();
            let tx = tx.clone();
            let kv = kv.clone();
            let progress = progress.clone();
            scope.spawn(move || {
                for path in chunk {
                    if token.is_cancelled() {
                        return;
                    }
                    if let Err(e) =
                        export_shard(&path, lookups, kv.as_ref(), privacy, &tx, &token, &progress)
                    {
                        token.fail(e);
                        return;
                    }
                }
            });
        }
        drop(tx);

        writer.join().expect("writer thread panicked")
    });

    progress.finish("export complete");
    token.into_result()?;
    writer_result
}

fn flush(out: &mut impl Write, batch: &mut Vec<Vec<u8>>) -> Result<()> {
    for line in batch.drain(..) {
        out.write_all(&line)?;
    }
    Ok(())
}

fn export_shard(
    path: &std::path::Path,
    lookups: &Lookups,
    kv: &dyn KvStore,
    privacy: bool,
    tx: &std::sync::mpsc::SyncSender<Vec<u8>>,
    token: &CancellationToken,
    progress: &Progress,
) -> Result<()> {
    let mut reader = open_shard(path)?;
    for (row_index, record) in reader.records().enumerate() {
        if token.is_cancelled() {
            break;
        }
        let record = record.map_err(TransformError::from)?;

        let company = match Company::new(&record, lookups, kv, privacy) {
            Ok(c) => c,
            // Only a single cell failing to decode is a per-row, non-fatal
            // condition (§7). A KV store failure or a corrupt enrichment
            // fragment (`TransformError::Kv`/`Json`) is fatal to the run
            // and must not be swallowed as if it were a malformed row.
            Err(TransformError::Decode(e)) => {
                tracing::warn!(
                    file = %path.display(),
                    row = row_index,
                    error = %e,
                    "skipping malformed venue row"
                );
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut line = serde_json::to_vec(&company)?;
        line.push(b'\n');

        if tx.send(line).is_err() {
            // Writer thread exited early (it failed or the run was
            // cancelled) — nothing left to do on this worker.
            break;
        }
        progress.inc(1);
    }
    Ok(())
}

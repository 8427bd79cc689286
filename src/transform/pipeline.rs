//! Pipeline plumbing (C7): bounded channels, worker-pool sizing,
//! cooperative cancellation, and progress reporting shared by the loader
//! and exporter.
//!
//! The distilled spec describes this in terms of goroutines and channels;
//! Design Note in SPEC_FULL.md §9 endorses native OS threads plus blocking
//! channels as a faithful rendition, so the worker pool here is plain
//! `std::thread` and the bounded queue is `std::sync::mpsc::sync_channel`
//! rather than an async runtime or a third-party work-stealing pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};

use super::TransformError;

/// Caps the worker pool at one thread per shard, never more than the
/// machine's available parallelism (§5).
pub fn worker_count(shard_count: usize) -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    shard_count.clamp(1, cores)
}

/// A bounded MPSC channel sized `batch_size * workers`, the only
/// backpressure mechanism in the core pipeline (§5: "no unbounded queue").
pub fn bounded_channel<T>(batch_size: usize, workers: usize) -> (SyncSender<T>, Receiver<T>) {
    sync_channel(batch_size * workers.max(1))
}

/// Shared first-error-wins cancellation signal (§5/§7). Every worker polls
/// `is_cancelled` at its suspension points (row-read, KV op, channel send)
/// and the first worker to fail records its error and flips the flag;
/// later errors are logged at debug and dropped.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    first_error: Arc<Mutex<Option<TransformError>>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Records `err` as the run's failure if none has been recorded yet,
    /// and cancels every other worker. Returns `true` if this call won the
    /// race and its error is the one that will be reported.
    pub fn fail(&self, err: TransformError) -> bool {
        let mut slot = self.first_error.lock().unwrap();
        if slot.is_some() {
            tracing::debug!(error = %err, "dropping error after first-error-wins");
            return false;
        }
        *slot = Some(err);
        self.cancelled.store(true, Ordering::SeqCst);
        true
    }

    pub fn into_result(self) -> super::Result<()> {
        match Arc::try_unwrap(self.first_error) {
            Ok(mutex) => match mutex.into_inner().unwrap() {
                Some(err) => Err(err),
                None => Ok(()),
            },
            Err(arc) => match arc.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            },
        }
    }
}

/// A periodic count reporter. Hidden (no-op drawing) when stdout is not a
/// terminal, per `indicatif`'s own recommendation for non-interactive runs
/// (SPEC_FULL.md §4.7).
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(label: &str) -> Self {
        let bar = if atty_stdout() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg} ({pos} rows, {elapsed})")
                    .unwrap(),
            );
            bar.enable_steady_tick(std::time::Duration::from_millis(200));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(label.to_string());
        Self { bar }
    }

    pub fn inc(&self, n: u64) {
        self.bar.inc(n);
    }

    pub fn finish(&self, message: impl Into<std::borrow::Cow<'static, str>>) {
        let message = message.into();
        tracing::info!(rows = self.bar.position(), "{}", message);
        self.bar.finish_with_message(message);
    }
}

fn atty_stdout() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}

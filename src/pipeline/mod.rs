//! Pipeline orchestration
//!
//! Worker threads, the shared shutdown flag, run statistics and the
//! [`Pipeline`] controller that starts and tears them down.

pub mod controller;
pub mod decode;
pub mod shutdown;
pub mod stats;

pub use controller::{AudioBackend, Mode, Pipeline, PipelineState};
pub use decode::{DecodeStep, DecodeWorker};
pub use shutdown::ShutdownSignal;
pub use stats::{PipelineStats, StatsSnapshot};

use std::future::pending;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::PipelineError;

/// Spawn a named worker thread
pub(crate) fn spawn_worker<F>(name: &'static str, f: F) -> Result<JoinHandle<()>, PipelineError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|source| PipelineError::SpawnFailed { name, source })
}

/// Resolves when a line is read from stdin. Never resolves if stdin is
/// closed, so a detached process only stops on Ctrl-C.
fn stdin_line() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    // Detached: a blocking stdin read cannot be cancelled
    let spawned = thread::Builder::new()
        .name("stdin-watch".into())
        .spawn(move || {
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(n) if n > 0 => {
                    let _ = tx.send(());
                }
                Ok(_) => tracing::debug!("stdin closed, waiting for Ctrl-C"),
                Err(e) => tracing::debug!("stdin unreadable ({}), waiting for Ctrl-C", e),
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Failed to watch stdin: {}", e);
    }

    rx
}

/// Wait for Enter or Ctrl-C, logging statistics every `stats_interval`
pub async fn wait_for_stop(pipeline: &Pipeline, stats_interval: Duration) {
    let enter = stdin_line();
    let enter = async move {
        if enter.await.is_err() {
            pending::<()>().await;
        }
    };
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            pending::<()>().await;
        }
    };
    tokio::pin!(enter, ctrl_c);

    let mut ticker = tokio::time::interval(stats_interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut enter => {
                tracing::info!("Enter pressed, stopping");
                break;
            }
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl-C received, stopping");
                break;
            }
            _ = ticker.tick() => {
                tracing::info!("[{}] {}", pipeline.mode(), pipeline.stats());
                while let Some(e) = pipeline.check_audio_error() {
                    tracing::warn!("Audio device error: {}", e);
                }
            }
        }
    }
}

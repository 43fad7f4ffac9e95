//! Crawl orchestration
//!
//! This module contains the core control loop, including:
//! - Pure link extraction from rendered pages
//! - One-shot total-work estimation
//! - Bounded chunk execution
//! - The job orchestrator state machine

mod chunk;
mod estimator;
pub mod extract;
mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use chunk::ChunkRunner;
pub use estimator::estimate_total;
pub use orchestrator::Orchestrator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::browser::{ChromiumSession, Session};
use crate::config::Config;
use crate::events::{EventSink, JobEvent};
use crate::job::CrawlJob;
use crate::storage::HttpMediaStore;
use crate::transfer::MediaTransfer;

/// Cooperative cancellation flag for a running job
///
/// Checked between chunks and between posts; an in-flight transfer is
/// allowed to finish so no partial upload is left behind.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Wires the production components and runs one job end to end
///
/// Resource-acquisition failures (browser, HTTP clients) are the only
/// errors that kill a job outright; they still produce a `failed` event
/// before returning.
pub async fn run_job(
    config: Arc<Config>,
    target: &str,
    sink: Arc<dyn EventSink>,
    cancel: CancelToken,
) -> crate::Result<CrawlJob> {
    if let Err(e) = crate::site::validate_target(target) {
        sink.emit(JobEvent::Failed {
            message: e.to_string(),
        });
        return Err(e);
    }

    let session: Arc<ChromiumSession> =
        match ChromiumSession::launch(&config.browser, &config.crawl).await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                sink.emit(JobEvent::Failed {
                    message: format!("Could not acquire a browser session: {}", e),
                });
                return Err(e.into());
            }
        };

    let store = match HttpMediaStore::new(&config.storage) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            session.shutdown().await;
            sink.emit(JobEvent::Failed {
                message: format!("Could not build the upload client: {}", e),
            });
            return Err(e.into());
        }
    };

    let transfer = match MediaTransfer::new(store, &config.crawl) {
        Ok(transfer) => Arc::new(transfer),
        Err(e) => {
            session.shutdown().await;
            sink.emit(JobEvent::Failed {
                message: format!("Could not build the download client: {}", e),
            });
            return Err(e.into());
        }
    };

    let orchestrator = Orchestrator::new(config, session, transfer, sink, cancel, target);
    Ok(orchestrator.run().await)
}

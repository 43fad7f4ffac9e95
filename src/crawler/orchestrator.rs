//! Job orchestrator
//!
//! Owns the session for the lifetime of one job, estimates total work once,
//! then drives chunk after chunk until the content is exhausted, the
//! estimate is met, or the job is cancelled. Whatever happens, the client
//! receives exactly one terminal event and the session is released.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::browser::Session;
use crate::config::Config;
use crate::crawler::chunk::ChunkRunner;
use crate::crawler::{estimator, CancelToken};
use crate::events::{EventSink, JobEvent, Level};
use crate::job::{CrawlJob, JobState};
use crate::transfer::TransferUnit;

pub struct Orchestrator {
    config: Arc<Config>,
    session: Arc<dyn Session>,
    transfer: Arc<dyn TransferUnit>,
    sink: Arc<dyn EventSink>,
    cancel: CancelToken,
    job: CrawlJob,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        session: Arc<dyn Session>,
        transfer: Arc<dyn TransferUnit>,
        sink: Arc<dyn EventSink>,
        cancel: CancelToken,
        target: impl Into<String>,
    ) -> Self {
        Self {
            config,
            session,
            transfer,
            sink,
            cancel,
            job: CrawlJob::new(target),
        }
    }

    /// Runs the job to completion
    ///
    /// Always emits exactly one terminal event and always shuts the
    /// session down, on success and on failure alike.
    pub async fn run(mut self) -> CrawlJob {
        info!("Starting job for target '{}'", self.job.target);

        let outcome = self.execute().await;
        match outcome {
            Ok(()) => {
                info!(
                    "Job for '{}' completed with {} posts processed ({} chunk failures)",
                    self.job.target, self.job.total_processed, self.job.chunk_failures
                );
            }
            Err(e) => {
                warn!("Job for '{}' failed: {}", self.job.target, e);
                let _ = self.job.transition(JobState::Failed);
                self.sink.emit(JobEvent::Failed {
                    message: e.to_string(),
                });
            }
        }

        self.session.shutdown().await;
        self.job
    }

    async fn execute(&mut self) -> crate::Result<()> {
        crate::site::validate_target(&self.job.target)?;

        self.estimate().await?;
        self.job.transition(JobState::Running)?;
        self.run_chunks().await?;
        self.job.transition(JobState::Completed)?;

        self.sink.emit(JobEvent::Completed {
            total_processed: self.job.total_processed,
        });
        Ok(())
    }

    /// Estimating phase: one page, one look at the pagination controls
    ///
    /// Estimation failure is never fatal; the documented fallback keeps the
    /// job alive and the substitution is surfaced as a warning so a blind
    /// guess cannot masquerade as a measurement.
    async fn estimate(&mut self) -> crate::Result<()> {
        self.sink.emit(JobEvent::progress(format!(
            "Estimating total posts for '{}'",
            self.job.target
        )));

        let page = self.session.open_page().await?;
        let result = estimator::estimate_total(
            &*page,
            &self.config.site,
            &self.config.crawl,
            &self.job.target,
        )
        .await;
        page.close().await;

        let estimate = match result {
            Ok(n) => n,
            Err(e) => {
                let fallback = self.config.crawl.fallback_estimate;
                warn!(
                    "Estimation failed for '{}': {}; assuming {}",
                    self.job.target, e, fallback
                );
                self.sink.emit(JobEvent::warning(format!(
                    "Could not inspect pagination ({}); assuming a total of {}",
                    e, fallback
                )));
                fallback
            }
        };

        self.job.estimated_total = estimate;
        self.sink.emit(JobEvent::Estimation {
            estimated_total: estimate,
        });
        Ok(())
    }

    /// Running phase: sequential chunks with an advancing offset cursor
    async fn run_chunks(&mut self) -> crate::Result<()> {
        let crawl = &self.config.crawl;

        loop {
            if self.cancel.is_cancelled() {
                self.sink
                    .emit(JobEvent::warning("Cancellation requested; stopping job"));
                break;
            }

            let offset = self.job.next_offset();
            self.sink.emit(JobEvent::progress(format!(
                "Starting chunk at offset {}",
                offset
            )));

            let runner = ChunkRunner::new(
                &*self.session,
                &*self.transfer,
                &*self.sink,
                &self.cancel,
                &self.config.site,
                crawl,
            );

            let chunk_result = runner.run(&self.job.target, offset).await;
            let posts = match chunk_result {
                Ok(n) => {
                    if n == 0 {
                        self.job.record_empty_chunk();
                    }
                    n
                }
                Err(e) => {
                    // One bad chunk must not kill the job; it counts as
                    // zero progress and feeds the stall heuristic.
                    warn!("Chunk at offset {} failed: {}", offset, e);
                    self.sink.emit(JobEvent::warning(format!(
                        "Chunk at offset {} failed: {}",
                        offset, e
                    )));
                    self.job.record_chunk_failure();
                    0
                }
            };

            if posts > 0 {
                self.job.record_progress(posts);
                self.sink.emit(JobEvent::Progress {
                    message: format!("Chunk finished: {} posts processed", posts),
                    level: Level::Info,
                    total_processed: Some(self.job.total_processed),
                });

                if self.job.estimate_reached() {
                    self.sink.emit(JobEvent::progress(format!(
                        "Reached the estimated total of {} posts",
                        self.job.estimated_total
                    )));
                    break;
                }
            } else if self.job.stalled(crawl.stall_threshold) {
                if self.job.total_processed == 0 {
                    self.sink.emit(JobEvent::warning(format!(
                        "No posts found for '{}' at any offset; check the username",
                        self.job.target
                    )));
                } else {
                    self.sink.emit(JobEvent::progress(
                        "No new posts found; assuming content is exhausted",
                    ));
                }
                break;
            }

            self.sink.emit(JobEvent::progress(format!(
                "Waiting {}ms before the next chunk",
                crawl.inter_chunk_delay_ms
            )));
            tokio::time::sleep(Duration::from_millis(crawl.inter_chunk_delay_ms)).await;
        }

        Ok(())
    }
}

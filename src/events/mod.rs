//! Progress events and sinks
//!
//! The crawl core reports everything through an [`EventSink`]; the concrete
//! transport (WebSocket session, terminal log) is a front-end concern.
//! Events are emitted in the exact order the underlying work completes and
//! each sink is owned by a single job, so one client sees one linear trail.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Severity attached to progress messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
}

/// Events produced while a job runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Result of the one-shot work estimate
    Estimation { estimated_total: u64 },

    /// Free-form progress message, optionally carrying the running total
    Progress {
        message: String,
        #[serde(default)]
        level: Level,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_processed: Option<u64>,
    },

    /// A media item was mirrored to the media host
    MediaTransferred {
        permanent_url: String,
        target_id: String,
        source_url: String,
    },

    /// Terminal: the job finished
    Completed { total_processed: u64 },

    /// Terminal: the job died before it could run
    Failed { message: String },
}

impl JobEvent {
    /// Convenience constructor for an info-level progress message
    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
            level: Level::Info,
            total_processed: None,
        }
    }

    /// Convenience constructor for a warning-level progress message
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
            level: Level::Warning,
            total_processed: None,
        }
    }

    /// Returns true for `Completed` / `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Sink for job events
///
/// `emit` must not block: the crawl loop calls it inline between
/// navigations and transfers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

/// Sink backed by an unbounded channel, addressing one client session
///
/// Unbounded so emission never blocks the crawl; the receiving side (the
/// WebSocket writer) drains at its own pace. Send failures mean the client
/// is gone, which is not the crawl's problem.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: JobEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event dropped: client channel closed");
        }
    }
}

/// Sink that logs events through tracing, used by the one-shot CLI mode
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: JobEvent) {
        match &event {
            JobEvent::Estimation { estimated_total } => {
                tracing::info!("Estimated total posts: {}", estimated_total);
            }
            JobEvent::Progress {
                message,
                level,
                total_processed,
            } => {
                let suffix = total_processed
                    .map(|t| format!(" (total: {})", t))
                    .unwrap_or_default();
                match level {
                    Level::Info => tracing::info!("{}{}", message, suffix),
                    Level::Warning => tracing::warn!("{}{}", message, suffix),
                    Level::Error => tracing::error!("{}{}", message, suffix),
                }
            }
            JobEvent::MediaTransferred { permanent_url, .. } => {
                tracing::info!("Mirrored media: {}", permanent_url);
            }
            JobEvent::Completed { total_processed } => {
                tracing::info!("Job completed, {} posts processed", total_processed);
            }
            JobEvent::Failed { message } => {
                tracing::error!("Job failed: {}", message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_shape() {
        let event = JobEvent::Estimation {
            estimated_total: 150,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "estimation");
        assert_eq!(json["estimated_total"], 150);
    }

    #[test]
    fn test_progress_omits_absent_total() {
        let event = JobEvent::progress("working");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["level"], "info");
        assert!(json.get("total_processed").is_none());
    }

    #[test]
    fn test_progress_with_total() {
        let event = JobEvent::Progress {
            message: "chunk done".to_string(),
            level: Level::Info,
            total_processed: Some(40),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["total_processed"], 40);
    }

    #[test]
    fn test_media_transferred_payload() {
        let event = JobEvent::MediaTransferred {
            permanent_url: "https://media.example.com/x.jpg".to_string(),
            target_id: "creator".to_string(),
            source_url: "https://coomer.su/data/x.jpg".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "media_transferred");
        assert_eq!(json["target_id"], "creator");
    }

    #[test]
    fn test_terminal_events() {
        assert!(JobEvent::Completed { total_processed: 0 }.is_terminal());
        assert!(JobEvent::Failed {
            message: "x".to_string()
        }
        .is_terminal());
        assert!(!JobEvent::progress("x").is_terminal());
    }

    #[tokio::test]
    async fn test_channel_sink_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);

        sink.emit(JobEvent::progress("one"));
        sink.emit(JobEvent::progress("two"));
        sink.emit(JobEvent::Completed { total_processed: 2 });

        assert_eq!(rx.recv().await.unwrap(), JobEvent::progress("one"));
        assert_eq!(rx.recv().await.unwrap(), JobEvent::progress("two"));
        assert_eq!(
            rx.recv().await.unwrap(),
            JobEvent::Completed { total_processed: 2 }
        );
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink::new(tx);
        // Must not panic
        sink.emit(JobEvent::progress("into the void"));
    }
}

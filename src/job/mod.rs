//! Job state machine and progress accounting
//!
//! A [`CrawlJob`] tracks everything the orchestrator needs between chunks:
//! the estimate, the cumulative processed count (which doubles as the resume
//! cursor), and the stall counters that drive termination.

use std::fmt;

/// Lifecycle state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Inspecting pagination to estimate total work
    Estimating,

    /// Processing chunks
    Running,

    /// Finished: content exhausted, estimate reached, or cancelled
    Completed,

    /// Finished: a fatal error (e.g. session acquisition) killed the job
    Failed,
}

impl JobState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the given transition is legal
    ///
    /// The machine only ever moves forward: `Estimating -> Running`,
    /// and either state may fail; only `Running` may complete.
    pub fn can_transition(&self, to: JobState) -> bool {
        match (self, to) {
            (Self::Estimating, Self::Running) => true,
            (Self::Estimating, Self::Failed) => true,
            (Self::Running, Self::Completed) => true,
            (Self::Running, Self::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Estimating => "estimating",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One logical request to crawl a named target
///
/// Mutated only by the orchestrator; the processed count is the single
/// source of truth for the resume cursor, so no listing page is skipped or
/// repeated as long as the remote page size holds.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    /// Remote creator username
    pub target: String,

    /// Estimate set once after pagination inspection, never recomputed
    pub estimated_total: u64,

    /// Posts whose link extraction was attempted (success or failure)
    pub total_processed: u64,

    /// Chunks in a row that processed zero posts
    pub consecutive_empty_chunks: u32,

    /// Chunks that ended in an escaped error
    pub chunk_failures: u32,

    /// Current lifecycle state
    pub state: JobState,
}

impl CrawlJob {
    /// Creates a new job in the `Estimating` state
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            estimated_total: 0,
            total_processed: 0,
            consecutive_empty_chunks: 0,
            chunk_failures: 0,
            state: JobState::Estimating,
        }
    }

    /// Moves the job to a new state, rejecting illegal transitions
    pub fn transition(&mut self, to: JobState) -> Result<(), crate::SiphonError> {
        if !self.state.can_transition(to) {
            return Err(crate::SiphonError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Listing offset the next chunk starts at
    ///
    /// Always derived from the processed count, never tracked separately.
    pub fn next_offset(&self) -> u64 {
        self.total_processed
    }

    /// Records a chunk that made progress
    pub fn record_progress(&mut self, posts: u64) {
        debug_assert!(posts > 0);
        self.total_processed += posts;
        self.consecutive_empty_chunks = 0;
    }

    /// Records a chunk that processed nothing
    pub fn record_empty_chunk(&mut self) {
        self.consecutive_empty_chunks += 1;
    }

    /// Records a chunk whose execution errored out
    ///
    /// Counts as an empty chunk for stall purposes; a single chunk failure
    /// must not kill the job.
    pub fn record_chunk_failure(&mut self) {
        self.chunk_failures += 1;
        self.consecutive_empty_chunks += 1;
    }

    /// Returns true once enough consecutive chunks came back empty
    pub fn stalled(&self, threshold: u32) -> bool {
        self.consecutive_empty_chunks >= threshold
    }

    /// Returns true once the estimate has been met or exceeded
    ///
    /// A zero estimate never triggers this; exhaustion handles that case.
    pub fn estimate_reached(&self) -> bool {
        self.estimated_total > 0 && self.total_processed >= self.estimated_total
    }
}

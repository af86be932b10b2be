use std::time::Duration;

/// Largest page the listing endpoint hands out.
pub const LIST_PAGE_SIZE: u32 = 500;
/// Kept well below the remote cap of 100 sub-requests per batch; larger
/// batches trip concurrent-request limits.
pub const BATCH_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

/// Pacing knobs shared by the listing and batch fetchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub page_size: u32,
    pub page_delay: Duration,
    pub batch_size: usize,
    pub chunk_delay: Duration,
    pub retry: RetryPolicy,
}

impl FetchPolicy {
    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }

    /// No pauses at all. Used by tests against local mock servers.
    pub fn immediate() -> Self {
        Self {
            page_delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
            retry: RetryPolicy {
                initial_delay: Duration::ZERO,
                ..RetryPolicy::default()
            },
            ..Self::default()
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: LIST_PAGE_SIZE,
            page_delay: Duration::from_millis(100),
            batch_size: BATCH_SIZE,
            chunk_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

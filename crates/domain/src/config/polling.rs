use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider polling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Intervals and bounds for the two provider-side waits: a chat run
/// reaching a terminal state, and a file batch finishing ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "d_1000")]
    pub run_interval_ms: u64,
    /// Maximum time a chat request waits for its run.
    #[serde(default = "d_run_max_wait")]
    pub run_max_wait_ms: u64,
    /// Ask the provider to cancel a run that exceeded `run_max_wait_ms`.
    #[serde(default = "d_true")]
    pub cancel_on_timeout: bool,
    #[serde(default = "d_1000")]
    pub batch_interval_ms: u64,
    #[serde(default = "d_batch_max_wait")]
    pub batch_max_wait_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            run_interval_ms: d_1000(),
            run_max_wait_ms: d_run_max_wait(),
            cancel_on_timeout: true,
            batch_interval_ms: d_1000(),
            batch_max_wait_ms: d_batch_max_wait(),
        }
    }
}

/// A resolved poll interval and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollingConfig {
    pub fn run_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.run_interval_ms),
            max_wait: Duration::from_millis(self.run_max_wait_ms),
        }
    }

    pub fn batch_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.batch_interval_ms),
            max_wait: Duration::from_millis(self.batch_max_wait_ms),
        }
    }
}

fn d_1000() -> u64 {
    1000
}
fn d_run_max_wait() -> u64 {
    600_000
}
fn d_batch_max_wait() -> u64 {
    1_800_000
}
fn d_true() -> bool {
    true
}

//! Waiting on provider-side asynchronous work.
//!
//! Both waits suspend only the calling task (`tokio::time::sleep`), so many
//! requests can wait concurrently on one runtime. Both are bounded.

use std::time::Duration;

use tl_domain::config::PollPolicy;
use tl_domain::error::{Error, Result};
use tl_domain::trace::TraceEvent;
use tokio::time::Instant;

use crate::traits::{AssistantProvider, BatchStatus, FileBatch, Run, UploadFile};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of [`wait_for_run`].
#[derive(Debug, Clone)]
pub enum RunWait {
    /// The run reached a terminal status.
    Finished(Run),
    /// `max_wait` elapsed first. `run` is the last observed state.
    TimedOut { run: Run, waited: Duration },
}

/// Poll a run until it is terminal or `policy.max_wait` elapses.
///
/// When the deadline passes and `cancel_on_timeout` is set, a cancel is
/// requested; a failure to cancel is logged, not returned.
pub async fn wait_for_run(
    provider: &dyn AssistantProvider,
    thread_id: &str,
    run: Run,
    policy: &PollPolicy,
    cancel_on_timeout: bool,
) -> Result<RunWait> {
    let start = Instant::now();
    let mut run = run;
    let mut polls: u32 = 0;

    while !run.status.is_terminal() {
        let waited = start.elapsed();
        if waited >= policy.max_wait {
            tracing::warn!(
                run_id = %run.id,
                status = %run.status,
                waited_ms = waited.as_millis() as u64,
                "run did not finish in time"
            );
            if cancel_on_timeout {
                if let Err(e) = provider.cancel_run(thread_id, &run.id).await {
                    tracing::warn!(run_id = %run.id, error = %e, "cancel after timeout failed");
                }
            }
            return Ok(RunWait::TimedOut { run, waited });
        }

        tokio::time::sleep(policy.interval).await;
        run = provider.retrieve_run(thread_id, &run.id).await?;
        polls += 1;
        tracing::debug!(run_id = %run.id, status = %run.status, polls, "run polled");
    }

    TraceEvent::RunPolled {
        run_id: run.id.clone(),
        status: run.status.to_string(),
        polls,
        waited_ms: start.elapsed().as_millis() as u64,
    }
    .emit();

    Ok(RunWait::Finished(run))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File batches
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Upload `files`, add them to `vector_store_id` as one batch, and wait
/// until the batch leaves `in_progress`.
///
/// The returned batch may be `failed` or `cancelled`; callers decide what
/// that means. Exceeding `policy.max_wait` is an [`Error::Timeout`].
pub async fn upload_and_poll(
    provider: &dyn AssistantProvider,
    vector_store_id: &str,
    files: Vec<UploadFile>,
    policy: &PollPolicy,
) -> Result<FileBatch> {
    let mut file_ids = Vec::with_capacity(files.len());
    for file in files {
        let filename = file.filename.clone();
        let uploaded = provider.upload_file(file).await?;
        tracing::debug!(file_id = %uploaded.id, filename = %filename, "file uploaded");
        file_ids.push(uploaded.id);
    }

    let start = Instant::now();
    let mut batch = provider.create_file_batch(vector_store_id, file_ids).await?;
    let mut polls: u32 = 0;

    while batch.status == BatchStatus::InProgress {
        if start.elapsed() >= policy.max_wait {
            return Err(Error::Timeout(format!(
                "file batch {} still in progress after {}ms",
                batch.id,
                start.elapsed().as_millis()
            )));
        }
        tokio::time::sleep(policy.interval).await;
        batch = provider
            .retrieve_file_batch(vector_store_id, &batch.id)
            .await?;
        polls += 1;
    }

    TraceEvent::FileBatchPolled {
        batch_id: batch.id.clone(),
        status: batch.status.as_str().to_owned(),
        polls,
        waited_ms: start.elapsed().as_millis() as u64,
    }
    .emit();

    Ok(batch)
}

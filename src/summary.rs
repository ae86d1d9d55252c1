use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::inspector::Inspect;
use crate::registry::Entry;
use crate::repo_status::{RepoProblem, RepoStatus};

#[derive(Debug, Clone, Default)]
pub struct SummaryOptions {
    /// Upper bound on repositories inspected at once. `None` or `Some(0)`
    /// means no bound.
    pub max_concurrency: Option<usize>,
}

/// Inspect every entry concurrently and return the snapshots in the same
/// order as `entries`, whatever order the inspections finish in.
///
/// Entries already flagged at load time are reported without inspection,
/// and an inspection task that dies still yields a row.
pub async fn summarize<I: Inspect>(
    entries: &[Entry],
    inspector: Arc<I>,
    options: &SummaryOptions,
) -> Vec<RepoStatus> {
    let limit = options
        .max_concurrency
        .filter(|n| *n > 0)
        .map(|n| Arc::new(Semaphore::new(n)));

    let mut slots: Vec<Option<RepoStatus>> = vec![None; entries.len()];
    let mut tasks = JoinSet::new();

    for (index, entry) in entries.iter().enumerate() {
        if let Some(problem) = entry.problem {
            slots[index] = Some(RepoStatus::unavailable(&entry.name, &entry.path, problem));
            continue;
        }

        let inspector = Arc::clone(&inspector);
        let limit = limit.clone();
        let entry = entry.clone();
        tasks.spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            (index, inspector.inspect(&entry).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, status)) => {
                debug!(repo = %status.name, index, "inspected");
                slots[index] = Some(status);
            }
            Err(e) => warn!(error = %e, "inspection task failed"),
        }
    }

    slots
        .into_iter()
        .zip(entries)
        .map(|(slot, entry)| {
            slot.unwrap_or_else(|| {
                RepoStatus::unavailable(&entry.name, &entry.path, RepoProblem::InspectionFailed)
            })
        })
        .collect()
}

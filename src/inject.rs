//! Fault injection: hold workloads at zero replicas
//!
//! The Fuse operator reconciles its workloads back to their desired size, so
//! setting replicas to zero once is not enough. Each workload gets its own
//! task that re-issues the scale-down until cancelled. [`ReplicaOverride`]
//! owns those tasks together with the replica counts captured before they
//! started, and puts everything back on release.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::scale::{ReplicaScaler, WorkloadRef};
use crate::{Error, Result};

/// Original replica count of a workload, captured before injection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaSnapshot {
    /// The workload
    pub workload: WorkloadRef,
    /// Desired replicas before injection
    pub replicas: i32,
}

struct Injector {
    snapshot: ReplicaSnapshot,
    cancel: CancellationToken,
    handle: JoinHandle<u64>,
}

/// Scale `workload` to zero repeatedly until `cancel` fires
///
/// Returns the number of scale calls issued. Failed calls are logged at
/// debug level and retried on the next iteration.
pub async fn hold_at_zero(
    scaler: Arc<dyn ReplicaScaler>,
    workload: WorkloadRef,
    pause: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut iterations = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = scaler.set_replicas(&workload, 0) => {
                iterations += 1;
                match result {
                    Ok(()) => trace!(workload = %workload, "Scaled to zero"),
                    Err(e) => debug!(workload = %workload, error = %e, "Scale to zero failed"),
                }
            }
        }

        if pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
    debug!(workload = %workload, iterations, "Injector stopped");
    iterations
}

/// Scoped replica override for a set of workloads
///
/// Acquiring captures each workload's replica count and starts one injector
/// per workload. [`release`](Self::release) stops the injectors, waits for
/// them to exit, and restores the captured counts. Dropping without release
/// only cancels the injectors; the workloads stay at zero.
pub struct ReplicaOverride {
    scaler: Arc<dyn ReplicaScaler>,
    injectors: Vec<Injector>,
    released: bool,
}

impl ReplicaOverride {
    /// Capture replica counts and start holding every workload at zero
    ///
    /// If any replica read fails, no injector is started.
    #[instrument(skip(scaler, workloads), fields(workloads = workloads.len()))]
    pub async fn acquire(
        scaler: Arc<dyn ReplicaScaler>,
        workloads: Vec<WorkloadRef>,
        pause: Duration,
    ) -> Result<Self> {
        let mut snapshots = Vec::with_capacity(workloads.len());
        for workload in workloads {
            let replicas = scaler.get_replicas(&workload).await.map_err(|e| {
                Error::internal_with_context(
                    "replica snapshot",
                    format!("failed to get number of replicas of {}: {}", workload, e),
                )
            })?;
            info!(workload = %workload, replicas, "Captured original replicas");
            snapshots.push(ReplicaSnapshot { workload, replicas });
        }

        let injectors = snapshots
            .into_iter()
            .map(|snapshot| {
                let cancel = CancellationToken::new();
                let handle = tokio::spawn(hold_at_zero(
                    scaler.clone(),
                    snapshot.workload.clone(),
                    pause,
                    cancel.clone(),
                ));
                info!(workload = %snapshot.workload, "Started scale-down injector");
                Injector {
                    snapshot,
                    cancel,
                    handle,
                }
            })
            .collect();

        Ok(Self {
            scaler,
            injectors,
            released: false,
        })
    }

    /// Replica counts captured at acquisition
    pub fn snapshots(&self) -> Vec<ReplicaSnapshot> {
        self.injectors.iter().map(|i| i.snapshot.clone()).collect()
    }

    /// Stop every injector, then restore every captured replica count
    ///
    /// All restores are attempted even if one fails; the first failure is
    /// returned.
    #[instrument(skip(self))]
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let injectors = std::mem::take(&mut self.injectors);

        for injector in &injectors {
            injector.cancel.cancel();
        }

        let mut first_error = None;
        for injector in injectors {
            let workload = injector.snapshot.workload;
            match injector.handle.await {
                Ok(iterations) => {
                    info!(workload = %workload, iterations, "Scale-down injector stopped")
                }
                Err(e) => warn!(workload = %workload, error = %e, "Injector task failed"),
            }

            match self
                .scaler
                .set_replicas(&workload, injector.snapshot.replicas)
                .await
            {
                Ok(()) => info!(
                    workload = %workload,
                    replicas = injector.snapshot.replicas,
                    "Restored original replicas"
                ),
                Err(e) => {
                    error!(workload = %workload, error = %e, "Failed to restore replicas");
                    first_error.get_or_insert(Error::internal_with_context(
                        "restore",
                        format!("failed to restore replicas of {}: {}", workload, e),
                    ));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run `f` with the workloads held at zero, releasing on every exit path
    ///
    /// `f` receives the captured replica counts. The body's error takes
    /// precedence over a restore error.
    pub async fn scoped<F, Fut, T>(
        scaler: Arc<dyn ReplicaScaler>,
        workloads: Vec<WorkloadRef>,
        pause: Duration,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(Vec<ReplicaSnapshot>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = Self::acquire(scaler, workloads, pause).await?;
        let result = f(guard.snapshots()).await;
        let released = guard.release().await;
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                error!(error = %restore, "Restore failed after scenario failure");
                Err(e)
            }
        }
    }
}

impl Drop for ReplicaOverride {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for injector in &self.injectors {
            injector.cancel.cancel();
            warn!(
                workload = %injector.snapshot.workload,
                replicas = injector.snapshot.replicas,
                "Replica override dropped without release; workload not restored"
            );
        }
    }
}

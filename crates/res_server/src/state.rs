use crate::error::Result;
use parking_lot::{Mutex, MutexGuard};
use res_context::{ContextError, ResContext, Snapshot};
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::debug;

/// A snapshot waiting to be written, numbered in capture order.
pub struct Pending {
    seq: u64,
    snapshot: Snapshot,
    path: PathBuf,
}

struct Shared {
    context: Mutex<ResContext>,
    captures: AtomicU64,
    // sequence number of the snapshot currently on disk
    written: tokio::sync::Mutex<u64>,
}

/// Reservoir shared between requests.
///
/// The context mutex is only held for in-memory work. Snapshot writes take a separate async
/// lock, one at a time, and a capture older than the one already on disk is dropped.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Shared>,
}

impl AppState {
    pub fn new(context: ResContext) -> Self {
        Self {
            inner: Arc::new(Shared {
                context: Mutex::new(context),
                captures: AtomicU64::new(0),
                written: tokio::sync::Mutex::new(0),
            }),
        }
    }

    pub fn context(&self) -> MutexGuard<'_, ResContext> {
        self.inner.context.lock()
    }

    /// Numbers `snapshot`. Call with the context still locked so numbering follows state order.
    pub fn pending(&self, ctx: &ResContext, snapshot: Snapshot) -> Option<Pending> {
        let path = ctx.model_path()?.to_path_buf();
        let seq = self.inner.captures.fetch_add(1, Ordering::Relaxed) + 1;
        Some(Pending {
            seq,
            snapshot,
            path,
        })
    }

    pub async fn write(&self, pending: Pending) -> Result<()> {
        let mut written = self.inner.written.lock().await;
        if pending.seq <= *written {
            debug!(seq = pending.seq, on_disk = *written, "dropping stale snapshot");
            return Ok(());
        }
        let Pending {
            seq,
            snapshot,
            path,
        } = pending;
        tokio::task::spawn_blocking(move || res_context::persist(&snapshot, &path)).await??;
        *written = seq;
        Ok(())
    }

    /// Captures the current reservoir and writes it.
    pub async fn save(&self) -> Result<()> {
        let pending = {
            let ctx = self.context();
            let snapshot = ctx.snapshot();
            self.pending(&ctx, snapshot)
        };
        let pending = pending.ok_or(ContextError::NoModelPath)?;
        self.write(pending).await
    }
}

#[cfg(test)]
mod test {
    use super::AppState;
    use res_context::{NdArray, ResContext, ReservoirConfig};
    use serde_json::json;

    #[tokio::test]
    async fn older_capture_never_replaces_newer() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReservoirConfig::default()
            .with_size(8)
            .with_density(0.5)
            .with_model_path(dir.path().join("reservoir.json"));
        let state = AppState::new(ResContext::open(&config).unwrap());

        let first = {
            let ctx = state.context();
            state.pending(&ctx, ctx.snapshot()).unwrap()
        };
        let value = NdArray::from_json(&json!([1.0, 2.0])).unwrap();
        state.context().write("k", &value).unwrap();
        let second = {
            let ctx = state.context();
            state.pending(&ctx, ctx.snapshot()).unwrap()
        };

        state.write(second).await.unwrap();
        state.write(first).await.unwrap();

        let restored = ResContext::open(&config).unwrap();
        assert_eq!(restored.esn().state(), state.context().esn().state());
    }

    #[tokio::test]
    async fn save_without_model_path_is_rejected() {
        let config = ReservoirConfig::default().with_size(8).with_density(0.5);
        let state = AppState::new(ResContext::open(&config).unwrap());
        assert!(state.save().await.is_err());
    }
}

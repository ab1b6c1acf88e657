//! Serialized update queue.
//!
//! One worker task owns every write to the cached document. Updates are sent
//! to it over an unbounded channel and applied strictly in arrival order:
//!
//! ```text
//! update(m) ──► jobs (FIFO) ──► worker: draft = cache.clone()
//!                                       m(&mut draft)
//!                                       cache = normalize(draft)
//!                                       backend.save(cache)
//!                                       reply ──► caller
//! ```
//!
//! Readers take a snapshot of the cache and never wait for queued jobs. A job
//! that fails only fails its own caller; the worker moves on to the next one.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::backend::DocumentBackend;
use crate::document::StoreDocument;
use crate::errors::{BackendError, StoreError};
use crate::normalize::{normalize, normalize_document};

/// Future returned by an async mutator. It may borrow the draft.
pub type MutatorFuture<'a, R> = BoxFuture<'a, anyhow::Result<Option<R>>>;

/// What a successful update resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<R> {
    /// The mutator declared a result.
    Declared(R),
    /// The mutator declared nothing; this is the newly committed document.
    Document(StoreDocument),
}

impl<R> UpdateOutcome<R> {
    pub fn declared(self) -> Option<R> {
        match self {
            Self::Declared(value) => Some(value),
            Self::Document(_) => None,
        }
    }

    pub fn document(self) -> Option<StoreDocument> {
        match self {
            Self::Declared(_) => None,
            Self::Document(doc) => Some(doc),
        }
    }
}

type Job = Box<dyn FnOnce(Arc<CommitWorker>) -> BoxFuture<'static, ()> + Send>;

/// State shared by the worker task and readers.
struct CommitWorker {
    cache: Arc<RwLock<StoreDocument>>,
    backend: Arc<dyn DocumentBackend>,
    defaults: StoreDocument,
}

impl CommitWorker {
    /// Run one mutation against a private draft and commit it.
    ///
    /// The cache is only replaced after the mutator succeeded and the draft
    /// normalized, so a failing mutator leaves the last committed document in
    /// place. A failed save does not roll the cache back.
    async fn apply<R, F>(&self, mutator: F) -> Result<UpdateOutcome<R>, StoreError>
    where
        R: Send,
        F: for<'a> FnOnce(&'a mut StoreDocument) -> MutatorFuture<'a, R> + Send,
    {
        let mut draft = self.cache.read().await.clone();

        let target = &mut draft;
        let result = AssertUnwindSafe(async move { mutator(target).await })
            .catch_unwind()
            .await;
        let declared = match result {
            Ok(Ok(declared)) => declared,
            Ok(Err(err)) => return Err(StoreError::Mutator(err)),
            Err(payload) => return Err(StoreError::MutatorPanicked(panic_message(&*payload))),
        };

        let committed = normalize_document(&draft, &self.defaults).map_err(StoreError::Normalize)?;
        *self.cache.write().await = committed.clone();
        tracing::debug!(
            endorsements = committed.endorsements,
            visitors = committed.visitors,
            "committed document update"
        );

        self.backend
            .save(&committed)
            .await
            .map_err(StoreError::Persistence)?;

        Ok(match declared {
            Some(value) => UpdateOutcome::Declared(value),
            None => UpdateOutcome::Document(committed),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Load the persisted document, or create and persist defaults.
///
/// A missing or corrupt document is replaced by `defaults`. Any other read
/// error is returned so an unreadable file is never overwritten.
pub async fn load_or_create(
    backend: &dyn DocumentBackend,
    defaults: &StoreDocument,
) -> Result<StoreDocument, BackendError> {
    match backend.load().await {
        Ok(raw) => {
            tracing::info!(location = %backend.location(), "loaded document");
            return Ok(normalize(&raw, defaults));
        }
        Err(BackendError::NotFound { .. }) => {
            tracing::info!(
                location = %backend.location(),
                "no stored document, creating defaults"
            );
        }
        Err(err @ BackendError::Corrupt { .. }) => {
            tracing::warn!(
                kind = err.kind().as_str(),
                "discarding unreadable document, resetting to defaults: {err}"
            );
        }
        Err(err) => return Err(err),
    }

    let fresh = normalize_document(defaults, defaults).map_err(BackendError::Serialize)?;
    backend.save(&fresh).await?;
    Ok(fresh)
}

/// In-memory cache plus the FIFO of pending mutations.
pub struct UpdateQueue {
    cache: Arc<RwLock<StoreDocument>>,
    jobs: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl UpdateQueue {
    /// Initialize from the backend and start the worker task.
    pub async fn open(
        backend: Arc<dyn DocumentBackend>,
        defaults: StoreDocument,
    ) -> Result<Self, BackendError> {
        let initial = load_or_create(backend.as_ref(), &defaults).await?;
        Ok(Self::start(backend, defaults, initial))
    }

    fn start(
        backend: Arc<dyn DocumentBackend>,
        defaults: StoreDocument,
        initial: StoreDocument,
    ) -> Self {
        let cache = Arc::new(RwLock::new(initial));
        let worker = Arc::new(CommitWorker {
            cache: Arc::clone(&cache),
            backend,
            defaults,
        });
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                // Mutator panics are already turned into errors inside the job;
                // this only guards against a panicking backend.
                if AssertUnwindSafe(job(Arc::clone(&worker)))
                    .catch_unwind()
                    .await
                    .is_err()
                {
                    tracing::error!("update job panicked outside the mutator");
                }
            }
            tracing::debug!("update queue closed, worker exiting");
        });

        Self {
            cache,
            jobs,
            worker: handle,
        }
    }

    /// Snapshot of the last committed document. Does not wait for pending updates.
    pub async fn get(&self) -> StoreDocument {
        self.cache.read().await.clone()
    }

    /// Enqueue an async mutator and wait for its own outcome.
    ///
    /// Once enqueued the job runs even if this future is dropped.
    pub async fn update_async<R, F>(&self, mutator: F) -> Result<UpdateOutcome<R>, StoreError>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut StoreDocument) -> MutatorFuture<'a, R> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |worker: Arc<CommitWorker>| {
            async move {
                let outcome = worker.apply(mutator).await;
                if let Err(err) = &outcome {
                    tracing::warn!(kind = err.kind().as_str(), "document update failed: {err}");
                }
                // The caller may have stopped waiting; the commit stands either way.
                let _ = reply_tx.send(outcome);
            }
            .boxed()
        });

        self.jobs.send(job).map_err(|_| StoreError::Closed)?;
        reply_rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Stop accepting jobs, drain the ones already queued, and join the worker.
    pub async fn shutdown(self) {
        drop(self.jobs);
        if let Err(err) = self.worker.await {
            tracing::error!("update worker ended abnormally: {err}");
        }
    }
}

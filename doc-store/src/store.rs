//! Store facade handed to request handlers.
//!
//! A `Store` is built by the composition root and shared behind an `Arc`.
//! The backing file is not touched until the first `get()` or `update()`,
//! which loads (or creates) the document and starts the update worker.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::OnceCell;

use crate::backend::{DocumentBackend, FileBackend};
use crate::config::StoreConfig;
use crate::document::StoreDocument;
use crate::errors::{Result, StoreError};
use crate::queue::{MutatorFuture, UpdateOutcome, UpdateQueue};

/// Lazily-initialized handle to the single managed document.
pub struct Store {
    backend: Arc<dyn DocumentBackend>,
    defaults: StoreDocument,
    queue: OnceCell<UpdateQueue>,
}

impl Store {
    pub fn new(backend: Arc<dyn DocumentBackend>, defaults: StoreDocument) -> Self {
        Self {
            backend,
            defaults,
            queue: OnceCell::new(),
        }
    }

    /// Store backed by a JSON file, using the built-in defaults.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)), StoreDocument::default())
    }

    /// Store at the configured path with the configured defaults.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            Arc::new(FileBackend::new(config.resolved_data_path())),
            config.default_document(),
        )
    }

    /// Document used for first runs and as the normalization fallback.
    pub fn defaults(&self) -> &StoreDocument {
        &self.defaults
    }

    /// Whether the document has been loaded yet.
    pub fn is_initialized(&self) -> bool {
        self.queue.initialized()
    }

    async fn queue(&self) -> Result<&UpdateQueue> {
        self.queue
            .get_or_try_init(|| async {
                UpdateQueue::open(Arc::clone(&self.backend), self.defaults.clone())
                    .await
                    .map_err(StoreError::Init)
            })
            .await
    }

    /// Copy of the last committed document.
    ///
    /// Not ordered against pending updates: an update that is queued or still
    /// running is not reflected until it commits.
    pub async fn get(&self) -> Result<StoreDocument> {
        Ok(self.queue().await?.get().await)
    }

    /// Apply a synchronous mutator after every previously queued update.
    ///
    /// Returning `Ok(Some(value))` resolves to [`UpdateOutcome::Declared`];
    /// `Ok(None)` resolves to the newly committed document.
    pub async fn update<R, F>(&self, mutator: F) -> Result<UpdateOutcome<R>>
    where
        R: Send + 'static,
        F: FnOnce(&mut StoreDocument) -> anyhow::Result<Option<R>> + Send + 'static,
    {
        self.update_async(move |draft| {
            let result = mutator(draft);
            std::future::ready(result).boxed()
        })
        .await
    }

    /// Apply an async mutator. Later updates wait until it settles; reads do not.
    pub async fn update_async<R, F>(&self, mutator: F) -> Result<UpdateOutcome<R>>
    where
        R: Send + 'static,
        F: for<'a> FnOnce(&'a mut StoreDocument) -> MutatorFuture<'a, R> + Send + 'static,
    {
        self.queue().await?.update_async(mutator).await
    }

    /// Apply a mutator that declares nothing and return the committed document.
    pub async fn update_document<F>(&self, mutator: F) -> Result<StoreDocument>
    where
        F: FnOnce(&mut StoreDocument) -> anyhow::Result<()> + Send + 'static,
    {
        let outcome = self
            .update(move |draft| mutator(draft).map(|()| None::<Infallible>))
            .await?;
        match outcome {
            UpdateOutcome::Document(doc) => Ok(doc),
            UpdateOutcome::Declared(never) => match never {},
        }
    }

    /// Finish queued updates and stop the worker. A no-op if never initialized.
    pub async fn shutdown(self) {
        if let Some(queue) = self.queue.into_inner() {
            queue.shutdown().await;
        }
    }
}

//! `folio-doc-store`: single-document JSON store for the folio web API.
//!
//! Holds one document (endorsement and visitor counters, a project list, the
//! last contact timestamp) in memory and on disk. All mutations go through a
//! FIFO queue drained by one worker task, so concurrent read-modify-write
//! updates never lose increments. Missing or corrupt files self-heal to the
//! defaults; a failing mutation fails only its own caller.
//!
//! ```no_run
//! # async fn demo() -> folio_doc_store::Result<()> {
//! use folio_doc_store::Store;
//!
//! let store = Store::open_file("data/store.json");
//! store
//!     .update_document(|doc| {
//!         doc.endorsements += 1;
//!         Ok(())
//!     })
//!     .await?;
//! println!("{}", store.get().await?.endorsements);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod document;
pub mod errors;
pub mod normalize;
pub mod ops;
pub mod queue;
pub mod store;

pub use backend::{DocumentBackend, FileBackend, MemoryBackend};
pub use config::StoreConfig;
pub use document::{ProjectRecord, StoreDocument};
pub use errors::{BackendError, ConfigError, ErrorKind, Result, StoreError};
pub use queue::{MutatorFuture, UpdateOutcome};
pub use store::Store;

//! Write operations used by the web API's endpoints.
//!
//! Each is a plain mutator run through [`Store::update`]; the store itself
//! knows nothing about these rules.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::Result;
use crate::queue::UpdateOutcome;
use crate::store::Store;

/// Add `by` endorsements and return the new total.
pub async fn increment_endorsements(store: &Store, by: u64) -> Result<u64> {
    let outcome = store
        .update(move |doc| {
            doc.endorsements = doc.endorsements.saturating_add(by);
            Ok(Some(doc.endorsements))
        })
        .await?;
    Ok(match outcome {
        UpdateOutcome::Declared(total) => total,
        UpdateOutcome::Document(doc) => doc.endorsements,
    })
}

/// Add `by` visitors and return the new total.
pub async fn increment_visitors(store: &Store, by: u64) -> Result<u64> {
    let outcome = store
        .update(move |doc| {
            doc.visitors = doc.visitors.saturating_add(by);
            Ok(Some(doc.visitors))
        })
        .await?;
    Ok(match outcome {
        UpdateOutcome::Declared(total) => total,
        UpdateOutcome::Document(doc) => doc.visitors,
    })
}

/// Stamp `lastContactAt` and return the stored timestamp.
pub async fn record_contact(store: &Store, at: DateTime<Utc>) -> Result<String> {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stored = stamp.clone();
    store
        .update_document(move |doc| {
            doc.last_contact_at = Some(stored);
            Ok(())
        })
        .await?;
    Ok(stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::document::StoreDocument;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn memory_store() -> Store {
        Store::new(Arc::new(MemoryBackend::new()), StoreDocument::default())
    }

    #[tokio::test]
    async fn counters_accumulate() {
        let store = memory_store();
        assert_eq!(increment_endorsements(&store, 1).await.unwrap(), 1);
        assert_eq!(increment_endorsements(&store, 4).await.unwrap(), 5);
        assert_eq!(increment_visitors(&store, 2).await.unwrap(), 2);

        let doc = store.get().await.unwrap();
        assert_eq!((doc.endorsements, doc.visitors), (5, 2));
    }

    #[tokio::test]
    async fn counters_saturate() {
        let store = memory_store();
        store
            .update_document(|doc| {
                doc.visitors = u64::MAX - 1;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(increment_visitors(&store, 10).await.unwrap(), u64::MAX);
    }

    #[tokio::test]
    async fn contact_timestamp_is_iso_millis() {
        let store = memory_store();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let stamp = record_contact(&store, at).await.unwrap();
        assert_eq!(stamp, "2026-10-19T08:30:00.000Z");
        assert_eq!(
            store.get().await.unwrap().last_contact_at.as_deref(),
            Some("2026-10-19T08:30:00.000Z")
        );
    }
}

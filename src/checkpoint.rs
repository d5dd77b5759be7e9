use crate::store::{KeyedStore, Record, RecordKey};
use crate::types::{AnnouncerError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::info;

const CHECKPOINT_GUID: &str = "STATS/MAX";
const CHECKPOINT_SORT: &str = "REDDIT/POST";
const CREATED_UTC: &str = "CREATED_UTC";

/// Persisted watermark for one feed: the creation time of the newest post
/// already announced, held in a single attribute at a fixed composite key.
///
/// Exactly one writer advances a feed's watermark per run (caller
/// invariant), so no compare-and-swap is needed.
pub struct CheckpointStore {
    store: Arc<dyn KeyedStore>,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self { store }
    }

    fn key() -> RecordKey {
        RecordKey::new(CHECKPOINT_GUID, CHECKPOINT_SORT)
    }

    /// The current watermark, or the epoch sentinel when the feed has never
    /// been synchronized. Absence is not an error.
    pub async fn read(&self) -> Result<DateTime<Utc>> {
        let record = self.store.get(&Self::key()).await?;

        let Some(record) = record else {
            return Ok(DateTime::UNIX_EPOCH);
        };

        let raw = record
            .attributes
            .get(CREATED_UTC)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AnnouncerError::Store(format!("checkpoint record is missing {CREATED_UTC}"))
            })?;

        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AnnouncerError::Store(format!("checkpoint timestamp {raw:?}: {e}")))
    }

    /// Overwrites the watermark.
    pub async fn write(&self, watermark: DateTime<Utc>) -> Result<()> {
        // AutoSi keeps sub-second precision when a post carries it, so the
        // re-read watermark never sits below a post already announced.
        let stamp = watermark.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        info!("PUT checkpoint {}/{} = {}", CHECKPOINT_GUID, CHECKPOINT_SORT, stamp);

        self.store
            .put(Record {
                key: Self::key(),
                attributes: serde_json::json!({ CREATED_UTC: stamp }),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    #[tokio::test]
    async fn absent_checkpoint_reads_as_epoch() {
        let checkpoint = CheckpointStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(checkpoint.read().await.unwrap(), DateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let checkpoint = CheckpointStore::new(Arc::new(MemoryStore::new()));
        let stamp = Utc.timestamp_opt(1_500_000_123, 0).unwrap();

        checkpoint.write(stamp).await.unwrap();
        assert_eq!(checkpoint.read().await.unwrap(), stamp);
    }

    #[tokio::test]
    async fn second_write_overwrites() {
        let checkpoint = CheckpointStore::new(Arc::new(MemoryStore::new()));
        let first = Utc.timestamp_opt(1_000, 0).unwrap();
        let second = Utc.timestamp_opt(2_000, 0).unwrap();

        checkpoint.write(first).await.unwrap();
        checkpoint.write(second).await.unwrap();
        assert_eq!(checkpoint.read().await.unwrap(), second);
    }

    #[tokio::test]
    async fn malformed_checkpoint_is_a_store_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(Record {
                key: RecordKey::new(CHECKPOINT_GUID, CHECKPOINT_SORT),
                attributes: serde_json::json!({ CREATED_UTC: "yesterday" }),
            })
            .await
            .unwrap();

        let checkpoint = CheckpointStore::new(store);
        assert!(matches!(
            checkpoint.read().await,
            Err(AnnouncerError::Store(_))
        ));
    }
}

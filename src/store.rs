use crate::types::{AnnouncerError, Destination, Result, DESTINATION_SORT};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Composite key of one record in the keyed store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordKey {
    pub guid: String,
    pub sort: String,
}

impl RecordKey {
    pub fn new(guid: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            sort: sort.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: RecordKey,
    pub attributes: serde_json::Value,
}

/// Default atomic-group limit: the largest set of writes the backing store
/// commits as a single all-or-nothing transaction.
pub const DEFAULT_TRANSACT_LIMIT: usize = 25;

/// Keyed-store boundary. Checkpoint reads/writes, destination listing, and
/// the migrator's transactional upserts all go through this seam so tests
/// can substitute an in-memory backend.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>>;

    async fn put(&self, record: Record) -> Result<()>;

    /// Upserts the whole group atomically: either every record lands or
    /// none does. Errs without writing when the group exceeds
    /// `transact_limit`.
    async fn transact_put(&self, records: Vec<Record>) -> Result<()>;

    /// All records under one sort discriminator, ordered by guid.
    async fn list(&self, sort: &str) -> Result<Vec<Record>>;

    fn transact_limit(&self) -> usize {
        DEFAULT_TRANSACT_LIMIT
    }
}

impl Destination {
    pub fn to_record(&self) -> Result<Record> {
        Ok(Record {
            key: RecordKey::new(self.guid(), DESTINATION_SORT),
            attributes: serde_json::to_value(self)?,
        })
    }

    pub fn from_record(record: &Record) -> Result<Destination> {
        serde_json::from_value(record.attributes.clone()).map_err(|e| {
            AnnouncerError::Store(format!(
                "destination record {}/{} has unexpected shape: {e}",
                record.key.guid, record.key.sort
            ))
        })
    }
}

/// In-memory keyed store. Backs the tests, and doubles as a scratch
/// backend; a transactional failure can be injected to exercise partial
/// migration outcomes.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordKey, Record>>,
    poison_guid: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any transactional group containing this guid fails without writing.
    pub fn fail_transactions_containing(mut self, guid: impl Into<String>) -> Self {
        self.poison_guid = Some(guid.into());
        self
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, record: Record) -> Result<()> {
        self.records.write().await.insert(record.key.clone(), record);
        Ok(())
    }

    async fn transact_put(&self, records: Vec<Record>) -> Result<()> {
        let limit = self.transact_limit();
        if records.len() > limit {
            return Err(AnnouncerError::GroupTooLarge {
                len: records.len(),
                limit,
            });
        }

        if let Some(poison) = &self.poison_guid {
            if records.iter().any(|r| &r.key.guid == poison) {
                return Err(AnnouncerError::Store(format!(
                    "transactional write failed for group containing {poison}"
                )));
            }
        }

        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.key.clone(), record);
        }
        Ok(())
    }

    async fn list(&self, sort: &str) -> Result<Vec<Record>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.key.sort == sort)
            .cloned()
            .collect())
    }
}

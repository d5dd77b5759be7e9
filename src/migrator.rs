use crate::objects::ObjectStore;
use crate::store::{KeyedStore, Record};
use crate::types::{GroupReport, LegacyAuth, MigrationReport, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Migrates legacy per-workspace auth objects into the keyed store.
///
/// Records are upserted in atomic groups of the sink's transactional
/// limit; each group either all lands or none lands, groups are
/// independent of one another, and the upsert key is the destination's
/// composite key, so re-running over the same source is idempotent.
pub struct Migrator {
    source: Arc<dyn ObjectStore>,
    sink: Arc<dyn KeyedStore>,
}

impl Migrator {
    pub fn new(source: Arc<dyn ObjectStore>, sink: Arc<dyn KeyedStore>) -> Self {
        Self { source, sink }
    }

    pub async fn migrate(&self, prefix: &str) -> Result<MigrationReport> {
        let records = self.collect_records(prefix).await?;
        info!("migrating {} legacy records from {}", records.len(), prefix);

        let group_size = self.sink.transact_limit();
        let mut groups = Vec::new();

        for (index, group) in records.chunks(group_size).enumerate() {
            let keys: Vec<String> = group.iter().map(|r| r.key.guid.clone()).collect();
            for record in group {
                info!("PUT {} {}", record.key.guid, record.key.sort);
            }

            // One failed group is reported and the next still runs; there
            // is no cross-group atomicity to preserve.
            let error = match self.sink.transact_put(group.to_vec()).await {
                Ok(()) => None,
                Err(e) => {
                    warn!("group {} failed: {}", index, e);
                    Some(e.to_string())
                }
            };

            groups.push(GroupReport { index, keys, error });
        }

        Ok(MigrationReport {
            records: records.len(),
            groups,
        })
    }

    /// Reads every legacy object under the prefix and maps it to a
    /// canonical destination record. A record body that does not parse
    /// aborts the run before anything is written.
    async fn collect_records(&self, prefix: &str) -> Result<Vec<Record>> {
        let objects = self.source.list(prefix).await?;
        let mut records = Vec::with_capacity(objects.len());

        for object in objects {
            info!("GET {}", object.key);
            let body = self.source.get(&object.key).await?;
            let auth: LegacyAuth = serde_json::from_str(&body)?;
            let destination = auth.into_destination(object.last_modified);
            records.push(destination.to_record()?);
        }

        Ok(records)
    }
}

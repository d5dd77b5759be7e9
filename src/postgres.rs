use crate::store::{KeyedStore, Record, RecordKey, DEFAULT_TRANSACT_LIMIT};
use crate::types::{AnnouncerError, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::info;

/// Postgres-backed keyed store. One row per composite key with a jsonb
/// attribute document; an atomic group is one transaction of upserts.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        info!("connected to keyed store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const UPSERT: &str = r#"
INSERT INTO records (guid, sort, attributes)
VALUES ($1, $2, $3)
ON CONFLICT (guid, sort) DO UPDATE SET attributes = EXCLUDED.attributes
"#;

#[async_trait]
impl KeyedStore for PgStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        let row = sqlx::query("SELECT attributes FROM records WHERE guid = $1 AND sort = $2")
            .bind(&key.guid)
            .bind(&key.sort)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Record {
                key: key.clone(),
                attributes: row.try_get("attributes")?,
            })),
            None => Ok(None),
        }
    }

    async fn put(&self, record: Record) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(&record.key.guid)
            .bind(&record.key.sort)
            .bind(&record.attributes)
            .execute(&self.pool)
            .await?;
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

        let mut tx = self.pool.begin().await?;
        for record in &records {
            sqlx::query(UPSERT)
                .bind(&record.key.guid)
                .bind(&record.key.sort)
                .bind(&record.attributes)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, sort: &str) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            "SELECT guid, sort, attributes FROM records WHERE sort = $1 ORDER BY guid",
        )
        .bind(sort)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Record {
                    key: RecordKey::new(
                        row.try_get::<String, _>("guid")?,
                        row.try_get::<String, _>("sort")?,
                    ),
                    attributes: row.try_get("attributes")?,
                })
            })
            .collect()
    }

    fn transact_limit(&self) -> usize {
        DEFAULT_TRANSACT_LIMIT
    }
}

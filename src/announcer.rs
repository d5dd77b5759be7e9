use crate::checkpoint::CheckpointStore;
use crate::dispatcher::{self, Deliver};
use crate::fetcher::FetchFeed;
use crate::store::KeyedStore;
use crate::sync;
use crate::types::{Destination, FeedResource, Result, RunReport, DESTINATION_SORT};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// One synchronization run: read the watermark, fetch the listing once,
/// filter to the genuinely-new posts, fan them out, then advance the
/// watermark. Runs for the same feed must be serialized by the caller.
pub struct Announcer<F, D> {
    fetcher: F,
    dispatcher: D,
    store: Arc<dyn KeyedStore>,
    checkpoint: CheckpointStore,
}

impl<F, D> Announcer<F, D>
where
    F: FetchFeed,
    D: Deliver,
{
    pub fn new(fetcher: F, dispatcher: D, store: Arc<dyn KeyedStore>) -> Self {
        let checkpoint = CheckpointStore::new(store.clone());
        Self {
            fetcher,
            dispatcher,
            store,
            checkpoint,
        }
    }

    /// The active delivery targets, one per registered workspace/channel.
    pub async fn destinations(&self) -> Result<Vec<Destination>> {
        let records = self.store.list(DESTINATION_SORT).await?;
        records.iter().map(Destination::from_record).collect()
    }

    /// Executes one run. A fetch or checkpoint-read failure aborts before
    /// anything is delivered; per-destination delivery failures are
    /// collected into the report instead. The watermark advances to the
    /// newest post of the run only after every delivery has been
    /// attempted, so a crash mid-run re-delivers rather than loses posts.
    pub async fn run(&self, resource: FeedResource) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let watermark = self.checkpoint.read().await?;
        info!("run {} started: resource={} watermark={}", run_id, resource, watermark);

        let posts = self.fetcher.fetch_posts(resource).await?;
        let fresh = sync::latest(&posts, watermark);

        if fresh.is_empty() {
            info!("run {}: nothing new in {} fetched posts", run_id, posts.len());
            return Ok(RunReport {
                run_id,
                fetched: posts.len(),
                fresh: 0,
                delivered: 0,
                failures: Vec::new(),
                checkpoint: None,
            });
        }

        let destinations = self.destinations().await?;
        info!(
            "run {}: {} new posts for {} destinations",
            run_id,
            fresh.len(),
            destinations.len()
        );

        let (delivered, failures) =
            dispatcher::deliver_all(&self.dispatcher, &fresh, &destinations).await;

        // fresh is ascending, so the last post carries the new watermark.
        let newest = fresh[fresh.len() - 1].created_utc;
        if let Err(e) = self.checkpoint.write(newest).await {
            error!(
                "run {}: checkpoint write failed after dispatch; next run may re-deliver: {}",
                run_id, e
            );
            return Err(e);
        }

        info!(
            "run {} finished: {} delivered, {} failed, watermark={}",
            run_id,
            delivered,
            failures.len(),
            newest
        );

        Ok(RunReport {
            run_id,
            fetched: posts.len(),
            fresh: fresh.len(),
            delivered,
            failures,
            checkpoint: Some(newest),
        })
    }
}

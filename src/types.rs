use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a subreddit listing, in the order the feed returned it.
///
/// `id` is the Reddit fullname (`t3_...`) and is unique within one listing;
/// two posts with the same id are the same logical post regardless of when
/// they were fetched. `data` keeps the raw listing record so a message can
/// be rendered without re-fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub created_utc: DateTime<Utc>,
    pub is_self: bool,
    pub title: String,
    pub permalink: String,
    pub url: Option<String>,
    pub data: serde_json::Value,
}

impl Post {
    pub fn link(&self) -> String {
        format!("https://www.reddit.com{}", self.permalink)
    }
}

/// Sort discriminator for destination records in the keyed store.
pub const DESTINATION_SORT: &str = "SLACK/AUTH";

/// One webhook delivery target: a workspace/channel pair plus the
/// credential and URL needed to post there.
///
/// Identity is the `team_id/channel_id` composite key; re-writing the same
/// pair overwrites rather than duplicates. Field names serialize to the
/// store's wire names (`ACCESS_TOKEN`, `WEBHOOK_URL`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Destination {
    pub team_id: String,
    pub team_name: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub webhook_url: String,
    pub access_token: String,
    pub scope: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Destination {
    pub fn guid(&self) -> String {
        format!("{}/{}", self.team_id, self.channel_id)
    }
}

/// A legacy per-workspace OAuth record as stored in the object store, one
/// JSON document per object. `created_utc` is usually absent and defaults
/// to the source object's last-modified time.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyAuth {
    pub access_token: String,
    pub scope: Option<String>,
    pub team_id: String,
    pub team_name: Option<String>,
    pub incoming_webhook: IncomingWebhook,
    pub created_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingWebhook {
    pub channel: Option<String>,
    pub channel_id: String,
    pub url: String,
}

impl LegacyAuth {
    /// Canonical destination record, with the given fallback for a missing
    /// creation timestamp.
    pub fn into_destination(self, fallback_created: DateTime<Utc>) -> Destination {
        Destination {
            team_id: self.team_id,
            team_name: self.team_name,
            channel_id: self.incoming_webhook.channel_id,
            channel_name: self.incoming_webhook.channel,
            webhook_url: self.incoming_webhook.url,
            access_token: self.access_token,
            scope: self.scope,
            created_utc: self.created_utc.unwrap_or(fallback_created),
        }
    }
}

/// Listing view selector. The remote endpoint is
/// `{base}/{resource}.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FeedResource {
    #[default]
    New,
    Hot,
    Top,
}

impl FeedResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedResource::New => "new",
            FeedResource::Hot => "hot",
            FeedResource::Top => "top",
        }
    }
}

impl std::fmt::Display for FeedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com/r/brutalism".to_string(),
            user_agent: "reddit-announcer/0.1".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Outcome of one webhook call, status and body verbatim. A non-success
/// status is reportable data, never an error.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub status: u16,
    pub body: String,
}

impl DeliveryResult {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One `(post, destination)` pair that did not deliver cleanly.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub post_id: String,
    pub destination: String,
    pub status: Option<u16>,
    pub detail: String,
}

/// Summary of one sync run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub fetched: usize,
    pub fresh: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
    pub checkpoint: Option<DateTime<Utc>>,
}

/// Outcome of one atomic group in a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub index: usize,
    pub keys: Vec<String>,
    pub error: Option<String>,
}

impl GroupReport {
    pub fn committed(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub records: usize,
    pub groups: Vec<GroupReport>,
}

impl MigrationReport {
    pub fn migrated(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.committed())
            .map(|g| g.keys.len())
            .sum()
    }

    pub fn failed_groups(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| !g.committed())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnouncerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("listing parse error: {0}")]
    Parse(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction group of {len} records exceeds store limit of {limit}")]
    GroupTooLarge { len: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, AnnouncerError>;

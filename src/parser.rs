use crate::types::{AnnouncerError, Post, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

/// Listing envelope: an ordered record list under `data.children`, each
/// child wrapping the post record in its own `data` field.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: serde_json::Value,
}

/// The fields a post record must carry. Anything else stays in the raw
/// record value.
#[derive(Debug, Deserialize)]
struct RawPost {
    name: String,
    created_utc: f64,
    #[serde(default)]
    is_self: bool,
    title: String,
    permalink: String,
    url: Option<String>,
}

/// Parses a listing document into posts, preserving feed order.
///
/// Fails fast on a shape mismatch: a missing envelope, a child without the
/// required fields, or an unrepresentable timestamp is a parse error for
/// the whole listing, not a deferred per-field error.
pub fn parse_listing(body: &str) -> Result<Vec<Post>> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|e| AnnouncerError::Parse(format!("listing envelope: {e}")))?;

    let mut posts = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        posts.push(parse_post(child.data)?);
    }

    debug!("parsed {} posts from listing", posts.len());
    Ok(posts)
}

fn parse_post(data: serde_json::Value) -> Result<Post> {
    let raw: RawPost = serde_json::from_value(data.clone())
        .map_err(|e| AnnouncerError::Parse(format!("post record: {e}")))?;

    let created_utc = epoch_seconds_to_utc(raw.created_utc)
        .ok_or_else(|| AnnouncerError::Parse(format!("created_utc out of range: {}", raw.created_utc)))?;

    Ok(Post {
        id: raw.name,
        created_utc,
        is_self: raw.is_self,
        title: raw.title,
        permalink: raw.permalink,
        url: raw.url,
        data,
    })
}

fn epoch_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    DateTime::from_timestamp(seconds.trunc() as i64, (seconds.fract() * 1e9) as u32)
}

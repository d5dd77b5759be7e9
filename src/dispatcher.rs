use crate::types::{DeliveryFailure, DeliveryResult, Destination, Post, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Delivery seam: one webhook call for one `(post, destination)` pair.
/// A non-success response is a reportable result, never an `Err`; `Err` is
/// reserved for transport-level failures (and both are per-destination
/// conditions, not run-level ones).
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, post: &Post, destination: &Destination) -> Result<DeliveryResult>;
}

/// Renders a post into the webhook message body: an image block when the
/// post carries a media URL, a section block otherwise, with the fallback
/// text pointing at the post.
pub fn render_message(post: &Post) -> serde_json::Value {
    let link = post.link();
    let block = match &post.url {
        Some(media) => serde_json::json!({
            "type": "image",
            "title": { "type": "plain_text", "text": post.title, "emoji": true },
            "image_url": media,
            "alt_text": post.title,
        }),
        None => serde_json::json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*<{}|{}>*", link, post.title) },
        }),
    };

    serde_json::json!({ "text": link, "blocks": [block] })
}

pub struct WebhookDispatcher {
    client: Client,
}

impl WebhookDispatcher {
    pub fn new(user_agent: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Deliver for WebhookDispatcher {
    async fn deliver(&self, post: &Post, destination: &Destination) -> Result<DeliveryResult> {
        let url = Url::parse(&destination.webhook_url)?;
        info!("POST {} for {} -> {}", url, post.id, destination.guid());

        let response = self
            .client
            .post(url)
            .bearer_auth(&destination.access_token)
            .json(&render_message(post))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(DeliveryResult { status, body })
    }
}

/// Fans a run's new posts out to every destination. Posts are walked in
/// the order given (ascending creation time from the sync engine), so each
/// destination sees them oldest-first; a failed pair never blocks the rest.
pub async fn deliver_all<D>(
    dispatcher: &D,
    posts: &[Post],
    destinations: &[Destination],
) -> (usize, Vec<DeliveryFailure>)
where
    D: Deliver + ?Sized,
{
    let mut delivered = 0;
    let mut failures = Vec::new();

    for post in posts {
        for destination in destinations {
            match dispatcher.deliver(post, destination).await {
                Ok(result) if result.ok() => delivered += 1,
                Ok(result) => {
                    warn!(
                        "delivery of {} to {} returned {}",
                        post.id,
                        destination.guid(),
                        result.status
                    );
                    failures.push(DeliveryFailure {
                        post_id: post.id.clone(),
                        destination: destination.guid(),
                        status: Some(result.status),
                        detail: result.body,
                    });
                }
                Err(e) => {
                    warn!("delivery of {} to {} failed: {}", post.id, destination.guid(), e);
                    failures.push(DeliveryFailure {
                        post_id: post.id.clone(),
                        destination: destination.guid(),
                        status: None,
                        detail: e.to_string(),
                    });
                }
            }
        }
    }

    (delivered, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn post(url: Option<&str>) -> Post {
        Post {
            id: "t3_aaa".to_string(),
            created_utc: Utc.timestamp_opt(1_500_000_000, 0).unwrap(),
            is_self: false,
            title: "Concrete tower".to_string(),
            permalink: "/r/brutalism/comments/aaa/".to_string(),
            url: url.map(str::to_string),
            data: serde_json::json!({}),
        }
    }

    #[test]
    fn media_posts_render_an_image_block() {
        let message = render_message(&post(Some("https://i.redd.it/aaa.jpg")));

        assert_eq!(message["text"], "https://www.reddit.com/r/brutalism/comments/aaa/");
        assert_eq!(message["blocks"][0]["type"], "image");
        assert_eq!(message["blocks"][0]["image_url"], "https://i.redd.it/aaa.jpg");
        assert_eq!(message["blocks"][0]["alt_text"], "Concrete tower");
    }

    #[test]
    fn posts_without_media_render_a_section_block() {
        let message = render_message(&post(None));

        assert_eq!(message["blocks"][0]["type"], "section");
        let text = message["blocks"][0]["text"]["text"].as_str().unwrap();
        assert!(text.contains("Concrete tower"));
        assert!(text.contains("/r/brutalism/comments/aaa/"));
    }
}

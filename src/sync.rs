//! Pure filters over a fetched listing. Feed pages are small and bounded,
//! so "new since the watermark" is computed by predicate filtering over one
//! page rather than an incremental merge; nothing here performs I/O or
//! mutates the checkpoint.

use crate::types::Post;
use chrono::{DateTime, Utc};

/// Posts created strictly after `start`, in feed order.
pub fn after(posts: &[Post], start: DateTime<Utc>) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| p.created_utc > start)
        .cloned()
        .collect()
}

/// Posts created strictly before `stop`, in feed order.
pub fn before(posts: &[Post], stop: DateTime<Utc>) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| p.created_utc < stop)
        .cloned()
        .collect()
}

/// Posts created strictly between `start` and `stop`, in feed order.
pub fn between(posts: &[Post], start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| p.created_utc > start && p.created_utc < stop)
        .cloned()
        .collect()
}

/// The genuinely-new posts for one run: created after the watermark, not
/// text-only, sorted ascending by creation time. The sort is stable, so
/// posts sharing a timestamp keep their feed order. With the epoch
/// sentinel as watermark this returns every non-self post in the page,
/// which is the intended bootstrap behavior.
pub fn latest(posts: &[Post], watermark: DateTime<Utc>) -> Vec<Post> {
    let mut fresh: Vec<Post> = after(posts, watermark)
        .into_iter()
        .filter(|p| !p.is_self)
        .collect();
    fresh.sort_by_key(|p| p.created_utc);
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: &str, secs: i64, is_self: bool) -> Post {
        Post {
            id: id.to_string(),
            created_utc: Utc.timestamp_opt(secs, 0).unwrap(),
            is_self,
            title: format!("post {id}"),
            permalink: format!("/r/brutalism/comments/{id}/"),
            url: None,
            data: serde_json::json!({}),
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn after_before_and_equal_partition_the_page() {
        let posts = vec![
            post("a", 100, false),
            post("b", 200, false),
            post("c", 200, true),
            post("d", 300, false),
        ];
        let t = ts(200);

        let after_t = after(&posts, t);
        let before_t = before(&posts, t);
        let at_t: Vec<_> = posts.iter().filter(|p| p.created_utc == t).collect();

        assert_eq!(after_t.len() + before_t.len() + at_t.len(), posts.len());
        assert_eq!(after_t.iter().map(|p| &p.id).collect::<Vec<_>>(), ["d"]);
        assert_eq!(before_t.iter().map(|p| &p.id).collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn between_uses_strict_bounds() {
        let posts = vec![post("a", 100, false), post("b", 200, false), post("c", 300, false)];
        let mid = between(&posts, ts(100), ts(300));
        assert_eq!(mid.iter().map(|p| &p.id).collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn latest_sorts_ascending_and_excludes_self_posts() {
        // Feed order is newest-first, as the remote listing returns it.
        let posts = vec![
            post("d", 400, false),
            post("c", 300, true),
            post("b", 200, false),
            post("a", 100, false),
        ];

        let fresh = latest(&posts, ts(100));
        assert_eq!(fresh.iter().map(|p| &p.id).collect::<Vec<_>>(), ["b", "d"]);
        assert!(fresh.windows(2).all(|w| w[0].created_utc <= w[1].created_utc));
    }

    #[test]
    fn latest_keeps_feed_order_on_equal_timestamps() {
        let posts = vec![post("x", 200, false), post("y", 200, false)];
        let fresh = latest(&posts, ts(0));
        assert_eq!(fresh.iter().map(|p| &p.id).collect::<Vec<_>>(), ["x", "y"]);
    }

    #[test]
    fn latest_from_epoch_sentinel_returns_whole_page() {
        let posts = vec![
            post("e", 50, false),
            post("d", 40, false),
            post("c", 30, false),
            post("b", 20, false),
            post("a", 10, false),
        ];

        let fresh = latest(&posts, DateTime::UNIX_EPOCH);
        assert_eq!(
            fresh.iter().map(|p| &p.id).collect::<Vec<_>>(),
            ["a", "b", "c", "d", "e"]
        );
    }

    #[test]
    fn latest_is_pure() {
        let posts = vec![post("b", 200, false), post("a", 100, false)];
        let first = latest(&posts, ts(0));
        let second = latest(&posts, ts(0));
        assert_eq!(
            first.iter().map(|p| &p.id).collect::<Vec<_>>(),
            second.iter().map(|p| &p.id).collect::<Vec<_>>()
        );
    }
}

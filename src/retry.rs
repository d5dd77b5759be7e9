use crate::types::Result;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// External retry policy for wrapping a whole run. The core components
/// never retry internally; a caller that wants retries applies them here,
/// around the run as a unit.
pub async fn with_retries<T, F, Fut>(
    max_retries: u32,
    initial_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
        current_interval: initial_delay,
        initial_interval: initial_delay,
        max_interval: initial_delay * 32,
        multiplier: 2.0,
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                let delay = backoff.next_backoff().unwrap_or(initial_delay);
                warn!("attempt {} failed ({}), retrying in {:?}", attempt + 1, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnnouncerError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);

        let result = with_retries(3, Duration::from_millis(1), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AnnouncerError::Store("transient".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retries(2, Duration::from_millis(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AnnouncerError::Store("persistent".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

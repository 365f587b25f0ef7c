use std::{future::Future, time::Duration};

use tokio::time::{sleep, Instant};

/// Poll `condition` until it returns true or `timeout` expires.
///
/// Returns true if the condition became true within the window.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn wait_until_should_return_once_the_condition_holds() {
        let counter = Arc::new(AtomicU32::new(0));
        let condition_counter = counter.clone();
        let ok = wait_until(Duration::from_secs(5), move || {
            let counter = condition_counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst) >= 3 }
        })
        .await;
        assert!(ok);
        assert!(counter.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn wait_until_should_give_up_after_the_timeout() {
        let ok = wait_until(Duration::from_millis(50), || async { false }).await;
        assert!(!ok);
    }
}

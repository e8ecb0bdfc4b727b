//! Input debouncing.

use std::time::Duration;

use tokio::sync::watch;

/// Coalesces rapid updates into one settled value.
///
/// [`Debouncer::set`] records the latest input; [`Debouncer::settled`]
/// resolves once the input has been quiet for the configured delay.
pub struct Debouncer<T> {
    delay: Duration,
    input: watch::Sender<T>,
}

impl<T: Clone + PartialEq + Send + Sync> Debouncer<T> {
    #[must_use]
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            delay,
            input: watch::Sender::new(initial),
        }
    }

    /// Record new input. An unchanged value does not restart the quiet period.
    pub fn set(&self, value: T) {
        self.input.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Latest input, settled or not.
    #[must_use]
    pub fn latest(&self) -> T {
        self.input.borrow().clone()
    }

    /// Wait until the input has not changed for the delay, then return it.
    pub async fn settled(&self) -> T {
        let mut rx = self.input.subscribe();
        loop {
            rx.mark_unchanged();
            tokio::select! {
                () = tokio::time::sleep(self.delay) => return rx.borrow().clone(),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return rx.borrow().clone();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rapid_updates_settle_once() {
        let debouncer = Arc::new(Debouncer::new(String::new(), Duration::from_millis(300)));
        let start = Instant::now();

        let waiter = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move { debouncer.settled().await })
        };

        for text in ["s", "sh", "sho", "shoe"] {
            tokio::time::sleep(Duration::from_millis(100)).await;
            debouncer.set(text.to_string());
        }

        assert_eq!(waiter.await.unwrap(), "shoe");
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_input_settles_after_delay() {
        let debouncer = Debouncer::new("boots".to_string(), Duration::from_millis(300));
        let start = Instant::now();

        assert_eq!(debouncer.settled().await, "boots");
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn test_unchanged_value_is_ignored() {
        let debouncer = Debouncer::new(1, Duration::from_millis(10));
        let rx = debouncer.input.subscribe();

        debouncer.set(1);
        assert!(!rx.has_changed().unwrap());

        debouncer.set(2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(debouncer.latest(), 2);
    }
}

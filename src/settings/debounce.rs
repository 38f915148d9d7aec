//! Debounced persistence of the latest settings value

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{ReaderSettings, SettingsSink};
use crate::error::Result;

/// Default quiet period before a scheduled write lands
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Default)]
struct Pending {
    value: Option<ReaderSettings>,
    timer: Option<JoinHandle<()>>,
}

/// Writes the most recent value once no newer value arrived for `delay`.
///
/// Scheduling a value aborts the previous timer; only the last value of a
/// burst reaches the sink. The pending lock is held across the sink write,
/// so a flush never races an in-flight timed write. A value whose write
/// failed stays pending until a newer value or the next flush replaces it.
pub struct DebouncedWriter {
    delay: Duration,
    sink: Arc<dyn SettingsSink>,
    pending: Arc<Mutex<Pending>>,
}

impl DebouncedWriter {
    pub fn new(sink: Arc<dyn SettingsSink>, delay: Duration) -> Self {
        Self {
            delay,
            sink,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Replace the pending value and restart the timer
    pub async fn schedule(&self, value: ReaderSettings) {
        let mut pending = self.pending.lock().await;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        pending.value = Some(value);

        let shared = Arc::clone(&self.pending);
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut pending = shared.lock().await;
            pending.timer = None;
            if let Some(value) = pending.value.take() {
                match sink.save(&value).await {
                    Ok(()) => tracing::debug!("saved reader settings"),
                    Err(e) => {
                        tracing::error!("Failed to save reader settings, kept for the next flush: {}", e);
                        if pending.value.is_none() {
                            pending.value = Some(value);
                        }
                    }
                }
            }
        }));
    }

    /// Cancel the timer and write the pending value now
    pub async fn flush_now(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        let Some(value) = pending.value.take() else {
            return Ok(());
        };
        if let Err(e) = self.sink.save(&value).await {
            pending.value = Some(value);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        saved: std::sync::Mutex<Vec<ReaderSettings>>,
        failures_left: AtomicUsize,
        attempts: AtomicUsize,
    }

    impl RecordingSink {
        fn saved_themes(&self) -> Vec<String> {
            self.saved
                .lock()
                .unwrap()
                .iter()
                .map(|s| s.selected_theme.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SettingsSink for RecordingSink {
        async fn load(&self) -> Result<Option<ReaderSettings>> {
            Ok(None)
        }

        async fn save(&self, settings: &ReaderSettings) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(AppError::Internal("disk full".to_string()));
            }
            self.saved.lock().unwrap().push(settings.clone());
            Ok(())
        }
    }

    fn themed(name: &str) -> ReaderSettings {
        ReaderSettings {
            selected_theme: name.to_string(),
            ..ReaderSettings::default()
        }
    }

    fn writer() -> (Arc<RecordingSink>, DebouncedWriter) {
        let sink = Arc::new(RecordingSink::default());
        let writer = DebouncedWriter::new(sink.clone(), DEFAULT_DEBOUNCE);
        (sink, writer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_writes_last_value_once() {
        let (sink, writer) = writer();

        writer.schedule(themed("Dark")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        writer.schedule(themed("Sepia")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        writer.schedule(themed("Light")).await;

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(sink.saved_themes().is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.saved_themes(), vec!["Light"]);

        writer.flush_now().await.unwrap();
        assert_eq!(sink.saved_themes(), vec!["Light"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_now_writes_immediately() {
        let (sink, writer) = writer();

        writer.schedule(themed("Dark")).await;
        writer.flush_now().await.unwrap();
        assert_eq!(sink.saved_themes(), vec!["Dark"]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.saved_themes(), vec!["Dark"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_pending_is_noop() {
        let (sink, writer) = writer();
        writer.flush_now().await.unwrap();
        assert!(sink.saved_themes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_timed_write_is_retried_by_flush() {
        let (sink, writer) = writer();
        sink.failures_left.store(1, Ordering::SeqCst);

        writer.schedule(themed("Sepia")).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
        assert!(sink.saved_themes().is_empty());

        writer.flush_now().await.unwrap();
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.saved_themes(), vec!["Sepia"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_keeps_value() {
        let (sink, writer) = writer();
        sink.failures_left.store(1, Ordering::SeqCst);

        writer.schedule(themed("Dark")).await;
        assert!(writer.flush_now().await.is_err());
        writer.flush_now().await.unwrap();
        assert_eq!(sink.saved_themes(), vec!["Dark"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_value_wins_over_failed_one() {
        let (sink, writer) = writer();
        sink.failures_left.store(1, Ordering::SeqCst);

        writer.schedule(themed("Dark")).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        writer.schedule(themed("Light")).await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(sink.saved_themes(), vec!["Light"]);
        writer.flush_now().await.unwrap();
        assert_eq!(sink.saved_themes(), vec!["Light"]);
    }
}

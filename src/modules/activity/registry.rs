use super::report::InactivityReport;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info};

pub type SharedReport = Arc<Mutex<InactivityReport>>;

struct Entry {
    report: SharedReport,
    last_touched: Instant,
}

/// Open reports keyed by the message that displays them.
/// Bounded by entry count and by idle time; each report has its own lock.
pub struct ReportRegistry {
    reports: DashMap<serenity::MessageId, Entry>,
    capacity: usize,
    idle_limit: Duration,
}

impl ReportRegistry {
    pub fn new(capacity: usize, idle_limit: Duration) -> Self {
        Self {
            reports: DashMap::new(),
            capacity: capacity.max(1),
            idle_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn insert(&self, message_id: serenity::MessageId, report: InactivityReport) -> SharedReport {
        self.insert_at(message_id, report, Instant::now())
    }

    fn insert_at(
        &self,
        message_id: serenity::MessageId,
        report: InactivityReport,
        now: Instant,
    ) -> SharedReport {
        while self.reports.len() >= self.capacity && !self.reports.contains_key(&message_id) {
            if !self.evict_oldest() {
                break;
            }
        }

        let report = Arc::new(Mutex::new(report));
        self.reports.insert(
            message_id,
            Entry {
                report: report.clone(),
                last_touched: now,
            },
        );
        report
    }

    /// Looks a report up and marks it as used.
    pub fn get(&self, message_id: serenity::MessageId) -> Option<SharedReport> {
        self.get_at(message_id, Instant::now())
    }

    fn get_at(&self, message_id: serenity::MessageId, now: Instant) -> Option<SharedReport> {
        self.reports.get_mut(&message_id).map(|mut entry| {
            entry.last_touched = now;
            entry.report.clone()
        })
    }

    pub fn remove(&self, message_id: serenity::MessageId) -> bool {
        self.reports.remove(&message_id).is_some()
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .reports
            .iter()
            .min_by_key(|entry| entry.value().last_touched)
            .map(|entry| *entry.key());

        match oldest {
            Some(message_id) => {
                debug!("Report registry full, evicting report on message {}", message_id);
                self.reports.remove(&message_id).is_some()
            }
            None => false,
        }
    }

    /// Drops reports not used for longer than the idle limit. Returns how many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.reports.len();
        self.reports
            .retain(|_, entry| now.saturating_duration_since(entry.last_touched) < self.idle_limit);
        before - self.reports.len()
    }

    /// Periodically evicts idle reports.
    pub fn start_cleanup_runner(self: Arc<Self>) {
        let period = (self.idle_limit / 4).max(Duration::from_secs(30));
        tokio::spawn(async move {
            info!("Report cleanup runner started.");
            loop {
                sleep(period).await;
                let evicted = self.evict_idle(Instant::now());
                if evicted > 0 {
                    info!("Evicted {} idle activity report(s)", evicted);
                }
            }
        });
    }
}

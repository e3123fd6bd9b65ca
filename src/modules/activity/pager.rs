use super::error::ActivityResult;
use super::registry::SharedReport;
use super::report::Navigation;
use crate::services::localization::L10nProxy;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tracing::warn;

/// The message a report is displayed on, as seen from a navigation reaction.
#[async_trait::async_trait]
pub trait ReportMessage: Send + Sync {
    /// Replaces the message body with a freshly rendered page.
    async fn redraw(
        &self,
        components: Vec<serenity::CreateComponent<'static>>,
    ) -> ActivityResult<()>;

    /// Takes the member's navigation reaction back off the message, so the
    /// next tap on the same arrow is an add again.
    async fn clear_reaction(&self) -> ActivityResult<()>;
}

/// Report message reached through the Discord HTTP API.
pub struct HttpReportMessage<'a> {
    http: &'a serenity::Http,
    reaction: &'a serenity::Reaction,
}

impl<'a> HttpReportMessage<'a> {
    pub fn new(http: &'a serenity::Http, reaction: &'a serenity::Reaction) -> Self {
        Self { http, reaction }
    }
}

#[async_trait::async_trait]
impl ReportMessage for HttpReportMessage<'_> {
    async fn redraw(
        &self,
        components: Vec<serenity::CreateComponent<'static>>,
    ) -> ActivityResult<()> {
        self.reaction
            .channel_id
            .edit_message(
                self.http,
                self.reaction.message_id,
                serenity::EditMessage::new().components(components),
            )
            .await?;
        Ok(())
    }

    async fn clear_reaction(&self) -> ActivityResult<()> {
        self.reaction.delete(self.http).await?;
        Ok(())
    }
}

/// Moves a report one page and redraws it. The page only changes once the
/// redraw went through. Returns whether the report moved.
pub async fn turn_page(
    report: &SharedReport,
    navigation: Navigation,
    message: &dyn ReportMessage,
    l10n: &L10nProxy,
    now: DateTime<Utc>,
) -> bool {
    let mut report = report.lock().await;

    let moved = match report.target(navigation) {
        Some(target) => {
            let components = report.render_page(target, l10n, now).into_components();
            match message.redraw(components).await {
                Ok(()) => {
                    report.set_page(target);
                    true
                }
                Err(e) => {
                    warn!(
                        "Failed to redraw report of guild {} to page {}: {:?}",
                        report.guild_id,
                        target + 1,
                        e
                    );
                    false
                }
            }
        }
        None => false,
    };

    // Missing Manage Messages only costs the member a double tap
    if let Err(e) = message.clear_reaction().await {
        warn!(
            "Failed to clear {} reaction on report of guild {}: {:?}",
            navigation.symbol(),
            report.guild_id,
            e
        );
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::activity::error::ActivityError;
    use crate::modules::activity::report::InactivityReport;
    use crate::modules::activity::store::ActivityRecord;
    use crate::services::localization::LocalizationManager;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    const GUILD: serenity::GuildId = serenity::GuildId::new(21);

    /// Message double that counts calls and can be told to reject edits.
    #[derive(Default)]
    struct FakeMessage {
        reject_redraw: bool,
        reject_clear: bool,
        redraws: AtomicUsize,
        clears: AtomicUsize,
    }

    fn rejected(reason: &str) -> ActivityError {
        ActivityError::Database(sea_orm::DbErr::Custom(reason.to_string()))
    }

    #[async_trait::async_trait]
    impl ReportMessage for FakeMessage {
        async fn redraw(
            &self,
            components: Vec<serenity::CreateComponent<'static>>,
        ) -> ActivityResult<()> {
            assert!(!components.is_empty());
            self.redraws.fetch_add(1, Ordering::SeqCst);
            if self.reject_redraw {
                return Err(rejected("Unknown Message"));
            }
            Ok(())
        }

        async fn clear_reaction(&self) -> ActivityResult<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            if self.reject_clear {
                return Err(rejected("Missing Permissions"));
            }
            Ok(())
        }
    }

    fn report(count: u64) -> SharedReport {
        let now = Utc::now();
        let records = (1..=count)
            .map(|id| ActivityRecord {
                id: id as i64,
                guild_id: GUILD,
                member_id: serenity::UserId::new(id),
                member_name: format!("member-{id}"),
                last_active: now,
                description: String::new(),
            })
            .collect();
        Arc::new(Mutex::new(InactivityReport::new(GUILD, 0, records)))
    }

    fn l10n() -> L10nProxy {
        Arc::new(LocalizationManager::new()).get_proxy("en-US")
    }

    #[tokio::test]
    async fn successful_redraw_moves_the_page() {
        let report = report(20);
        let message = FakeMessage::default();

        assert!(turn_page(&report, Navigation::Next, &message, &l10n(), Utc::now()).await);

        assert_eq!(report.lock().await.page_index(), 1);
        assert_eq!(message.redraws.load(Ordering::SeqCst), 1);
        assert_eq!(message.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_redraw_keeps_the_page() {
        let report = report(20);
        let message = FakeMessage {
            reject_redraw: true,
            ..Default::default()
        };

        assert!(!turn_page(&report, Navigation::Next, &message, &l10n(), Utc::now()).await);

        assert_eq!(report.lock().await.page_index(), 0);
        assert_eq!(message.redraws.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_taps_on_one_arrow_walk_every_page() {
        // Three pages. Each tap is a fresh add because the reaction is cleared.
        let report = report(20);
        let message = FakeMessage::default();
        let l10n = l10n();

        for expected in [1, 2] {
            assert!(turn_page(&report, Navigation::Next, &message, &l10n, Utc::now()).await);
            assert_eq!(report.lock().await.page_index(), expected);
        }
        assert!(!turn_page(&report, Navigation::Next, &message, &l10n, Utc::now()).await);

        assert_eq!(report.lock().await.page_index(), 2);
        assert_eq!(message.clears.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn out_of_range_move_skips_redraw_but_clears_reaction() {
        let report = report(3);
        let message = FakeMessage::default();

        assert!(!turn_page(&report, Navigation::Previous, &message, &l10n(), Utc::now()).await);

        assert_eq!(message.redraws.load(Ordering::SeqCst), 0);
        assert_eq!(message.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_to_clear_reaction_does_not_undo_the_move() {
        let report = report(20);
        let message = FakeMessage {
            reject_clear: true,
            ..Default::default()
        };

        assert!(turn_page(&report, Navigation::Next, &message, &l10n(), Utc::now()).await);
        assert_eq!(report.lock().await.page_index(), 1);
    }
}

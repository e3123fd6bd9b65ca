use super::store::ActivityRecord;
use crate::services::localization::L10nProxy;
use chrono::{DateTime, Utc};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;

/// Records shown on one page of a report.
pub const PAGE_SIZE: usize = 8;

pub const PREVIOUS_PAGE: &str = "◀️";
pub const NEXT_PAGE: &str = "▶️";

const ACCENT_COLOR: u32 = 0xe67e22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
}

impl Navigation {
    pub fn symbol(self) -> &'static str {
        match self {
            Navigation::Previous => PREVIOUS_PAGE,
            Navigation::Next => NEXT_PAGE,
        }
    }

    /// Maps a reaction to a page move. Clients sometimes drop the variation selector.
    pub fn from_emoji(emoji: &serenity::ReactionType) -> Option<Self> {
        let serenity::ReactionType::Unicode(name) = emoji else {
            return None;
        };

        let bare = name.trim_end_matches('\u{fe0f}');
        if bare == PREVIOUS_PAGE.trim_end_matches('\u{fe0f}') {
            Some(Navigation::Previous)
        } else if bare == NEXT_PAGE.trim_end_matches('\u{fe0f}') {
            Some(Navigation::Next)
        } else {
            None
        }
    }

    pub fn reaction(self) -> serenity::ReactionType {
        serenity::ReactionType::Unicode(self.symbol().into())
    }
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS.fffffffff +ZZZZ UTC`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.9f %z %Z").to_string()
}

/// An inactivity query result bound to the message that displays it.
/// The result set is fixed at creation; only the page moves.
#[derive(Debug, Clone)]
pub struct InactivityReport {
    pub guild_id: serenity::GuildId,
    pub days_threshold: i64,
    records: Vec<ActivityRecord>,
    page_index: usize,
}

impl InactivityReport {
    pub fn new(guild_id: serenity::GuildId, days_threshold: i64, records: Vec<ActivityRecord>) -> Self {
        Self {
            guild_id,
            days_threshold,
            records,
            page_index: 0,
        }
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_count(&self) -> usize {
        self.records.len().div_ceil(PAGE_SIZE)
    }

    pub fn page(&self, index: usize) -> &[ActivityRecord] {
        let start = (index * PAGE_SIZE).min(self.records.len());
        let end = (start + PAGE_SIZE).min(self.records.len());
        &self.records[start..end]
    }

    /// The page a move would land on, or `None` when it would leave the report.
    pub fn target(&self, navigation: Navigation) -> Option<usize> {
        match navigation {
            Navigation::Previous => self.page_index.checked_sub(1),
            Navigation::Next => {
                let next = self.page_index + 1;
                (next < self.page_count()).then_some(next)
            }
        }
    }

    pub fn set_page(&mut self, index: usize) {
        if index < self.page_count() {
            self.page_index = index;
        }
    }

    /// Applies a move. Returns false when it was a no-op.
    pub fn navigate(&mut self, navigation: Navigation) -> bool {
        match self.target(navigation) {
            Some(index) => {
                self.page_index = index;
                true
            }
            None => false,
        }
    }

    pub fn render(&self, l10n: &L10nProxy, now: DateTime<Utc>) -> ReportView {
        self.render_page(self.page_index, l10n, now)
    }

    pub fn render_page(&self, index: usize, l10n: &L10nProxy, now: DateTime<Utc>) -> ReportView {
        let title = if self.days_threshold < 1 {
            l10n.t("activity-report-title-all", None)
        } else {
            let mut args = FluentArgs::new();
            args.set("days", self.days_threshold.to_string());
            l10n.t("activity-report-title-days", Some(&args))
        };

        let mut args = FluentArgs::new();
        args.set("count", self.records.len().to_string());
        let summary = l10n.t("activity-report-summary", Some(&args));

        let entries = self
            .page(index)
            .iter()
            .map(|record| {
                let mut args = FluentArgs::new();
                args.set("timestamp", format_timestamp(record.last_active));
                args.set("days", (now - record.last_active).num_days().max(0).to_string());

                let description = if record.description.is_empty() {
                    l10n.t("activity-report-no-description", None)
                } else {
                    record.description.clone()
                };

                ReportEntry {
                    heading: format!("**{}** (<@{}>)", record.member_name, record.member_id),
                    body: format!(
                        "{}\n{}",
                        l10n.t("activity-report-last-active", Some(&args)),
                        description
                    ),
                }
            })
            .collect();

        let mut args = FluentArgs::new();
        args.set("page", (index + 1).to_string());
        args.set("pages", self.page_count().to_string());
        let footer = l10n.t("activity-report-footer", Some(&args));

        ReportView {
            title,
            summary,
            entries,
            footer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub heading: String,
    pub body: String,
}

/// One rendered page, ready to be turned into message components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    pub title: String,
    pub summary: String,
    pub entries: Vec<ReportEntry>,
    pub footer: String,
}

impl ReportView {
    pub fn into_components(self) -> Vec<serenity::CreateComponent<'static>> {
        let mut inner_components = vec![];

        inner_components.push(serenity::CreateContainerComponent::TextDisplay(
            serenity::CreateTextDisplay::new(format!("## {}\n{}", self.title, self.summary)),
        ));

        inner_components.push(serenity::CreateContainerComponent::Separator(
            serenity::CreateSeparator::new(true),
        ));

        for entry in self.entries {
            inner_components.push(serenity::CreateContainerComponent::TextDisplay(
                serenity::CreateTextDisplay::new(format!("{}\n{}", entry.heading, entry.body)),
            ));
        }

        inner_components.push(serenity::CreateContainerComponent::Separator(
            serenity::CreateSeparator::new(false),
        ));

        inner_components.push(serenity::CreateContainerComponent::TextDisplay(
            serenity::CreateTextDisplay::new(format!("-# {}", self.footer)),
        ));

        vec![serenity::CreateComponent::Container(
            serenity::CreateContainer::new(inner_components).accent_color(ACCENT_COLOR),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::localization::LocalizationManager;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    const GUILD: serenity::GuildId = serenity::GuildId::new(42);

    fn records(count: u64, now: DateTime<Utc>) -> Vec<ActivityRecord> {
        (1..=count)
            .map(|id| ActivityRecord {
                id: id as i64,
                guild_id: GUILD,
                member_id: serenity::UserId::new(id),
                member_name: format!("member-{id}"),
                last_active: now - Duration::days(id as i64),
                description: format!("did thing {id}"),
            })
            .collect()
    }

    fn l10n() -> L10nProxy {
        Arc::new(LocalizationManager::new()).get_proxy("en-US")
    }

    #[test]
    fn page_count_rounds_up() {
        let now = Utc::now();
        assert_eq!(InactivityReport::new(GUILD, 1, vec![]).page_count(), 0);
        assert_eq!(InactivityReport::new(GUILD, 1, records(1, now)).page_count(), 1);
        assert_eq!(InactivityReport::new(GUILD, 1, records(8, now)).page_count(), 1);
        assert_eq!(InactivityReport::new(GUILD, 1, records(9, now)).page_count(), 2);
        assert_eq!(InactivityReport::new(GUILD, 1, records(17, now)).page_count(), 3);
    }

    #[test]
    fn pages_concatenate_to_result_set() {
        let now = Utc::now();
        for count in [0, 1, 7, 8, 9, 16, 23] {
            let report = InactivityReport::new(GUILD, 0, records(count, now));

            let mut joined = vec![];
            for index in 0..report.page_count() {
                let page = report.page(index);
                assert!(!page.is_empty() && page.len() <= PAGE_SIZE);
                joined.extend_from_slice(page);
            }

            assert_eq!(joined, report.records());
        }
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut report = InactivityReport::new(GUILD, 1, records(20, Utc::now()));

        assert!(!report.navigate(Navigation::Previous));
        assert_eq!(report.page_index(), 0);

        assert!(report.navigate(Navigation::Next));
        assert!(report.navigate(Navigation::Next));
        assert_eq!(report.page_index(), 2);

        assert!(!report.navigate(Navigation::Next));
        assert_eq!(report.page_index(), 2);

        assert!(report.navigate(Navigation::Previous));
        assert_eq!(report.page_index(), 1);
    }

    #[test]
    fn single_page_report_ignores_both_directions() {
        let now = Utc::now();
        let mut report = InactivityReport::new(GUILD, 30, records(1, now));

        assert_eq!(report.target(Navigation::Next), None);
        assert_eq!(report.target(Navigation::Previous), None);
        assert!(!report.navigate(Navigation::Next));
        assert!(!report.navigate(Navigation::Previous));
        assert_eq!(report.page_index(), 0);

        let view = report.render(&l10n(), now);
        assert_eq!(view.footer, "Page 1 of 1");
        assert_eq!(view.entries.len(), 1);
    }

    #[test]
    fn set_page_rejects_out_of_range() {
        let mut report = InactivityReport::new(GUILD, 1, records(9, Utc::now()));
        report.set_page(5);
        assert_eq!(report.page_index(), 0);
        report.set_page(1);
        assert_eq!(report.page_index(), 1);
    }

    #[test]
    fn renders_requested_page() {
        let now = Utc::now();
        let report = InactivityReport::new(GUILD, 5, records(10, now));
        let l10n = l10n();

        let view = report.render_page(1, &l10n, now);

        assert_eq!(view.title, "Members inactive for at least 5 days");
        assert_eq!(view.footer, "Page 2 of 2");
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.entries[0].heading, "**member-9** (<@9>)");
        assert!(view.entries[0].body.contains("(9 days ago)"));
        assert!(view.entries[0].body.ends_with("did thing 9"));

        let all = InactivityReport::new(GUILD, 0, records(1, now)).render(&l10n, now);
        assert_eq!(all.title, "All tracked members");
    }

    #[test]
    fn timestamp_format_is_fixed() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap() + Duration::nanoseconds(123);
        assert_eq!(format_timestamp(at), "2024-03-05 07:08:09.000000123 +0000 UTC");
    }

    #[test]
    fn reactions_map_to_navigation() {
        let prev = serenity::ReactionType::Unicode("◀️".into());
        let bare_next = serenity::ReactionType::Unicode("▶".into());
        let other = serenity::ReactionType::Unicode("👍".into());

        assert_eq!(Navigation::from_emoji(&prev), Some(Navigation::Previous));
        assert_eq!(Navigation::from_emoji(&bare_next), Some(Navigation::Next));
        assert_eq!(Navigation::from_emoji(&other), None);
    }
}

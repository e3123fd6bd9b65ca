use super::error::{ActivityError, ActivityResult};
use super::roster::{self, RosterMember, RosterSource};
use super::store::{ActivityRecord, ActivityStore};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

pub const SCAN_DESCRIPTION: &str = "Detected in a scan";

/// What a member did to be considered active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Message { channel_id: serenity::GenericChannelId },
    Reaction { channel_id: serenity::GenericChannelId },
    Join,
    Scan,
}

impl ActivityKind {
    pub fn description(&self) -> String {
        match self {
            ActivityKind::Message { channel_id } => format!("Sent a message in <#{}>", channel_id),
            ActivityKind::Reaction { channel_id } => {
                format!("Reacted to a message in <#{}>", channel_id)
            }
            ActivityKind::Join => "Joined the server".to_string(),
            ActivityKind::Scan => SCAN_DESCRIPTION.to_string(),
        }
    }
}

/// Outcome of the writes dispatched by a rescan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RescanSummary {
    pub inserted: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// A rescan whose inserts are still running.
pub struct PendingRescan {
    pub guild_id: serenity::GuildId,
    /// Roster members that had no record when the rescan started.
    pub missing: usize,
    writes: JoinSet<ActivityResult<bool>>,
}

impl PendingRescan {
    /// Waits for every insert and tallies the results.
    pub async fn finish(mut self) -> RescanSummary {
        let mut summary = RescanSummary::default();

        while let Some(joined) = self.writes.join_next().await {
            match joined.map_err(ActivityError::from).and_then(|r| r) {
                Ok(true) => summary.inserted += 1,
                Ok(false) => summary.already_present += 1,
                Err(e) => {
                    error!(
                        "Failed to insert scanned member in guild {}: {:?}",
                        self.guild_id, e
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Drains the writes in the background and logs the summary.
    pub fn finish_in_background(self) {
        tokio::spawn(async move {
            let guild_id = self.guild_id;
            let summary = self.finish().await;
            info!(
                "Rescan of guild {} finished: {} inserted, {} already present, {} failed",
                guild_id, summary.inserted, summary.already_present, summary.failed
            );
        });
    }
}

/// Roster members without a record, in roster order. Bots are never tracked.
pub fn missing_members(roster: Vec<RosterMember>, existing: &[ActivityRecord]) -> Vec<RosterMember> {
    let known: HashSet<serenity::UserId> = existing.iter().map(|r| r.member_id).collect();

    roster
        .into_iter()
        .filter(|m| !m.bot && !known.contains(&m.id))
        .collect()
}

/// Turns gateway activity into store writes.
#[derive(Clone)]
pub struct ActivityRecorder {
    store: ActivityStore,
    write_permits: Arc<Semaphore>,
}

impl ActivityRecorder {
    pub fn new(store: ActivityStore, rescan_concurrency: usize) -> Self {
        Self {
            store,
            write_permits: Arc::new(Semaphore::new(rescan_concurrency.max(1))),
        }
    }

    /// Writes the activity. Scans only fill in members that have no record yet;
    /// every other kind refreshes the record. Returns whether a row was written.
    pub async fn record(
        &self,
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
        member_name: &str,
        kind: ActivityKind,
        at: DateTime<Utc>,
    ) -> ActivityResult<bool> {
        let description = kind.description();

        if kind == ActivityKind::Scan {
            self.store
                .insert_if_absent(guild_id, member_id, member_name, at, &description)
                .await
        } else {
            self.store
                .upsert(guild_id, member_id, member_name, at, &description)
                .await?;
            Ok(true)
        }
    }

    pub async fn forget(
        &self,
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
    ) -> ActivityResult<()> {
        self.store.delete(guild_id, member_id).await?;
        Ok(())
    }

    pub async fn forget_guild(&self, guild_id: serenity::GuildId) -> ActivityResult<u64> {
        self.store.delete_all(guild_id).await
    }

    /// Adds a record for every roster member that has none. The inserts run
    /// concurrently; the returned handle reports how they went.
    pub async fn rescan(
        &self,
        guild_id: serenity::GuildId,
        source: &dyn RosterSource,
    ) -> ActivityResult<PendingRescan> {
        let roster = roster::fetch_full_roster(source, guild_id, roster::ROSTER_PAGE_SIZE).await?;
        let existing = self.store.list(guild_id).await?;
        let missing = missing_members(roster, &existing);

        info!(
            "Rescan of guild {}: {} tracked, {} missing",
            guild_id,
            existing.len(),
            missing.len()
        );

        let now = Utc::now();
        let mut writes = JoinSet::new();
        let count = missing.len();

        for member in missing {
            let recorder = self.clone();

            writes.spawn(async move {
                let _permit = recorder.write_permits.clone().acquire_owned().await?;
                recorder
                    .record(guild_id, member.id, &member.name, ActivityKind::Scan, now)
                    .await
            });
        }

        Ok(PendingRescan {
            guild_id,
            missing: count,
            writes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::activity::roster::tests::{FakeRoster, roster_member};
    use chrono::Duration;

    const GUILD: serenity::GuildId = serenity::GuildId::new(77);

    async fn recorder() -> (ActivityRecorder, ActivityStore) {
        let store = ActivityStore::new(crate::db::connect_in_memory().await);
        (ActivityRecorder::new(store.clone(), 4), store)
    }

    fn channel() -> serenity::GenericChannelId {
        serenity::GenericChannelId::new(555)
    }

    #[test]
    fn event_descriptions() {
        assert_eq!(
            ActivityKind::Message { channel_id: channel() }.description(),
            "Sent a message in <#555>"
        );
        assert_eq!(ActivityKind::Join.description(), "Joined the server");
        assert_eq!(ActivityKind::Scan.description(), SCAN_DESCRIPTION);
    }

    #[test]
    fn missing_members_skips_bots_and_known() {
        let roster = vec![
            roster_member(1, false),
            roster_member(2, true),
            roster_member(3, false),
            roster_member(4, false),
        ];
        let existing = vec![ActivityRecord {
            id: 1,
            guild_id: GUILD,
            member_id: serenity::UserId::new(3),
            member_name: "member-3".into(),
            last_active: Utc::now(),
            description: String::new(),
        }];

        let ids: Vec<u64> = missing_members(roster, &existing)
            .iter()
            .map(|m| m.id.get())
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[tokio::test]
    async fn mixed_events_leave_exactly_one_record() {
        let (recorder, store) = recorder().await;
        let member = serenity::UserId::new(9);
        let start = Utc::now() - Duration::days(1);

        let kinds = [
            ActivityKind::Join,
            ActivityKind::Message { channel_id: channel() },
            ActivityKind::Scan,
            ActivityKind::Reaction { channel_id: channel() },
            ActivityKind::Message { channel_id: channel() },
        ];
        for (i, kind) in kinds.into_iter().enumerate() {
            recorder
                .record(GUILD, member, "nine", kind, start + Duration::minutes(i as i64))
                .await
                .unwrap();
        }

        let records = store.list(GUILD).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Sent a message in <#555>");
    }

    #[tokio::test]
    async fn scan_does_not_overwrite_real_activity() {
        let (recorder, store) = recorder().await;
        let member = serenity::UserId::new(5);
        let seen = Utc::now() - Duration::days(10);

        let written = recorder
            .record(GUILD, member, "five", ActivityKind::Join, seen)
            .await
            .unwrap();
        assert!(written);
        let written = recorder
            .record(GUILD, member, "five", ActivityKind::Scan, Utc::now())
            .await
            .unwrap();
        assert!(!written);

        let record = store.find(GUILD, member).await.unwrap().unwrap();
        assert_eq!(record.description, "Joined the server");
        assert_eq!(record.last_active.timestamp(), seen.timestamp());
    }

    #[tokio::test]
    async fn rescan_writes_go_through_scan_recording() {
        let (recorder, store) = recorder().await;
        let source = FakeRoster::new(vec![roster_member(1, false)]);

        let pending = recorder.rescan(GUILD, &source).await.unwrap();

        // A message lands between the roster diff and the scan insert
        recorder
            .record(
                GUILD,
                serenity::UserId::new(1),
                "member-1",
                ActivityKind::Message { channel_id: channel() },
                Utc::now(),
            )
            .await
            .unwrap();

        let summary = pending.finish().await;
        let record = store
            .find(GUILD, serenity::UserId::new(1))
            .await
            .unwrap()
            .unwrap();

        // Whichever write ran first, the message is what remains
        assert_eq!(record.description, "Sent a message in <#555>");
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.inserted + summary.already_present, 1);
    }

    #[tokio::test]
    async fn forget_removes_member() {
        let (recorder, store) = recorder().await;
        let member = serenity::UserId::new(5);
        recorder
            .record(GUILD, member, "five", ActivityKind::Join, Utc::now())
            .await
            .unwrap();

        recorder.forget(GUILD, member).await.unwrap();
        recorder.forget(GUILD, member).await.unwrap();

        assert!(store.find(GUILD, member).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rescan_inserts_only_missing_members() {
        let (recorder, store) = recorder().await;
        recorder
            .record(
                GUILD,
                serenity::UserId::new(2),
                "member-2",
                ActivityKind::Message { channel_id: channel() },
                Utc::now(),
            )
            .await
            .unwrap();

        let source = FakeRoster::new(vec![
            roster_member(1, false),
            roster_member(2, false),
            roster_member(3, true),
            roster_member(4, false),
        ]);

        let pending = recorder.rescan(GUILD, &source).await.unwrap();
        assert_eq!(pending.missing, 2);

        let summary = pending.finish().await;
        assert_eq!(
            summary,
            RescanSummary {
                inserted: 2,
                already_present: 0,
                failed: 0
            }
        );

        let records = store.list(GUILD).await.unwrap();
        assert_eq!(records.len(), 3);
        let scanned: Vec<u64> = records
            .iter()
            .filter(|r| r.description == SCAN_DESCRIPTION)
            .map(|r| r.member_id.get())
            .collect();
        assert_eq!(scanned.len(), 2);
        assert!(scanned.contains(&1) && scanned.contains(&4));

        // Running it again finds nothing new
        let again = recorder.rescan(GUILD, &source).await.unwrap();
        assert_eq!(again.missing, 0);
        assert_eq!(again.finish().await, RescanSummary::default());
    }
}

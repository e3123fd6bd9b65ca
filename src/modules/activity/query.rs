use super::error::ActivityResult;
use super::store::{ActivityRecord, ActivityStore};
use chrono::{DateTime, TimeDelta, Utc};
use poise::serenity_prelude as serenity;

/// Parses the `<days>` argument of `activity list`. `None` means a usage error.
pub fn parse_days(input: &str) -> Option<i64> {
    input.trim().parse().ok()
}

/// Keeps records idle for at least `days` days as of `now`, preserving order.
/// A threshold below one keeps everything.
pub fn filter_inactive(
    records: Vec<ActivityRecord>,
    days: i64,
    now: DateTime<Utc>,
) -> Vec<ActivityRecord> {
    if days < 1 {
        return records;
    }

    // Thresholds past chrono's range cannot be met by anyone
    let Some(threshold) = TimeDelta::try_days(days) else {
        return Vec::new();
    };

    records
        .into_iter()
        .filter(|record| {
            record
                .last_active
                .checked_add_signed(threshold)
                .is_some_and(|deadline| deadline < now)
        })
        .collect()
}

pub async fn find_inactive(
    store: &ActivityStore,
    guild_id: serenity::GuildId,
    days: i64,
) -> ActivityResult<Vec<ActivityRecord>> {
    let records = store.list(guild_id).await?;
    Ok(filter_inactive(records, days, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const GUILD: serenity::GuildId = serenity::GuildId::new(10);

    fn record(member: u64, idle_days: i64, now: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord {
            id: member as i64,
            guild_id: GUILD,
            member_id: serenity::UserId::new(member),
            member_name: format!("m{member}"),
            last_active: now - Duration::days(idle_days),
            description: String::new(),
        }
    }

    fn ids(records: &[ActivityRecord]) -> Vec<u64> {
        records.iter().map(|r| r.member_id.get()).collect()
    }

    #[test]
    fn parses_days_argument() {
        assert_eq!(parse_days("30"), Some(30));
        assert_eq!(parse_days(" 0 "), Some(0));
        assert_eq!(parse_days("-4"), Some(-4));
        assert_eq!(parse_days("thirty"), None);
        assert_eq!(parse_days(""), None);
    }

    #[test]
    fn threshold_example() {
        let now = Utc::now();
        let records = vec![record(1, 40, now), record(2, 2, now)];

        assert_eq!(ids(&filter_inactive(records.clone(), 30, now)), vec![1]);
        assert_eq!(ids(&filter_inactive(records, 1, now)), vec![1, 2]);
    }

    #[test]
    fn below_one_returns_everything_unfiltered() {
        let now = Utc::now();
        let records = vec![record(3, 0, now), record(1, 400, now), record(2, -1, now)];

        assert_eq!(ids(&filter_inactive(records.clone(), 0, now)), vec![3, 1, 2]);
        assert_eq!(ids(&filter_inactive(records, -7, now)), vec![3, 1, 2]);
    }

    #[test]
    fn cutoff_is_strict() {
        let now = Utc::now();
        let exactly = vec![record(1, 5, now)];

        assert!(filter_inactive(exactly, 5, now).is_empty());
    }

    #[test]
    fn lower_threshold_is_superset() {
        let now = Utc::now();
        let records: Vec<_> = (0..60).map(|d| record(d as u64 + 1, d, now)).collect();

        for low in 1..40 {
            for high in low..40 {
                let wide = ids(&filter_inactive(records.clone(), low, now));
                let narrow = ids(&filter_inactive(records.clone(), high, now));
                assert!(narrow.iter().all(|id| wide.contains(id)), "{low} vs {high}");
            }
        }
    }

    #[test]
    fn absurd_threshold_matches_nobody() {
        let now = Utc::now();
        let records = vec![record(1, 10_000, now)];

        assert!(filter_inactive(records, i64::MAX, now).is_empty());
    }

    #[tokio::test]
    async fn reads_from_store() {
        let store = ActivityStore::new(crate::db::connect_in_memory().await);
        let now = Utc::now();
        store
            .upsert(GUILD, serenity::UserId::new(1), "a", now - Duration::days(40), "")
            .await
            .unwrap();
        store
            .upsert(GUILD, serenity::UserId::new(2), "b", now - Duration::days(2), "")
            .await
            .unwrap();

        assert_eq!(ids(&find_inactive(&store, GUILD, 30).await.unwrap()), vec![1]);
        assert_eq!(ids(&find_inactive(&store, GUILD, 0).await.unwrap()), vec![1, 2]);
    }
}

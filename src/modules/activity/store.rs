use super::error::ActivityResult;
use crate::db::entities::member_activity;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

/// Maximum number of characters kept from an activity description.
pub const DESCRIPTION_LIMIT: usize = 80;

/// A member's last observed activity in a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: i64,
    pub guild_id: serenity::GuildId,
    pub member_id: serenity::UserId,
    pub member_name: String,
    pub last_active: DateTime<Utc>,
    pub description: String,
}

impl From<member_activity::Model> for ActivityRecord {
    fn from(model: member_activity::Model) -> Self {
        Self {
            id: model.id,
            guild_id: serenity::GuildId::new(model.guild_id as u64),
            member_id: serenity::UserId::new(model.member_id as u64),
            member_name: model.member_name,
            last_active: model.last_active.to_utc(),
            description: model.description,
        }
    }
}

pub fn truncate_description(description: &str) -> String {
    description.chars().take(DESCRIPTION_LIMIT).collect()
}

/// Persistence for activity records, keyed by (guild, member).
#[derive(Clone)]
pub struct ActivityStore {
    db: DatabaseConnection,
}

impl ActivityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn active_model(
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
        member_name: &str,
        at: DateTime<Utc>,
        description: &str,
    ) -> member_activity::ActiveModel {
        member_activity::ActiveModel {
            guild_id: Set(guild_id.get() as i64),
            member_id: Set(member_id.get() as i64),
            member_name: Set(member_name.to_string()),
            last_active: Set(at.into()),
            description: Set(truncate_description(description)),
            ..Default::default()
        }
    }

    fn natural_key() -> OnConflict {
        OnConflict::columns([
            member_activity::Column::GuildId,
            member_activity::Column::MemberId,
        ])
    }

    /// Inserts the record, or refreshes name, timestamp and description of the
    /// existing one. Single statement, so concurrent events for the same member
    /// can never produce a second row.
    pub async fn upsert(
        &self,
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
        member_name: &str,
        at: DateTime<Utc>,
        description: &str,
    ) -> ActivityResult<()> {
        let model = Self::active_model(guild_id, member_id, member_name, at, description);

        member_activity::Entity::insert(model)
            .on_conflict(
                Self::natural_key()
                    .update_columns([
                        member_activity::Column::MemberName,
                        member_activity::Column::LastActive,
                        member_activity::Column::Description,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    /// Inserts the record only if the member has none yet. Returns whether a row was written.
    pub async fn insert_if_absent(
        &self,
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
        member_name: &str,
        at: DateTime<Utc>,
        description: &str,
    ) -> ActivityResult<bool> {
        let model = Self::active_model(guild_id, member_id, member_name, at, description);

        let inserted = member_activity::Entity::insert(model)
            .on_conflict(Self::natural_key().do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted > 0)
    }

    pub async fn find(
        &self,
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
    ) -> ActivityResult<Option<ActivityRecord>> {
        let record = member_activity::Entity::find()
            .filter(member_activity::Column::GuildId.eq(guild_id.get() as i64))
            .filter(member_activity::Column::MemberId.eq(member_id.get() as i64))
            .one(&self.db)
            .await?;

        Ok(record.map(Into::into))
    }

    /// Removes the member's record. Absent records are not an error.
    pub async fn delete(
        &self,
        guild_id: serenity::GuildId,
        member_id: serenity::UserId,
    ) -> ActivityResult<u64> {
        let result = member_activity::Entity::delete_many()
            .filter(member_activity::Column::GuildId.eq(guild_id.get() as i64))
            .filter(member_activity::Column::MemberId.eq(member_id.get() as i64))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn delete_all(&self, guild_id: serenity::GuildId) -> ActivityResult<u64> {
        let result = member_activity::Entity::delete_many()
            .filter(member_activity::Column::GuildId.eq(guild_id.get() as i64))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// All records of the guild in insertion order.
    pub async fn list(&self, guild_id: serenity::GuildId) -> ActivityResult<Vec<ActivityRecord>> {
        let records = member_activity::Entity::find()
            .filter(member_activity::Column::GuildId.eq(guild_id.get() as i64))
            .order_by_asc(member_activity::Column::Id)
            .all(&self.db)
            .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}

use super::error::ActivityResult;
use nonmax::NonMaxU16;
use poise::serenity_prelude as serenity;

/// Largest page the member list endpoint will return.
pub const ROSTER_PAGE_SIZE: u16 = 1000;

/// The part of a guild member the recorder cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub id: serenity::UserId,
    pub name: String,
    pub bot: bool,
}

impl From<&serenity::Member> for RosterMember {
    fn from(member: &serenity::Member) -> Self {
        Self {
            id: member.user.id,
            name: member.display_name().to_string(),
            bot: member.user.bot(),
        }
    }
}

/// Source of a guild's member list, fetched one page at a time.
#[async_trait::async_trait]
pub trait RosterSource: Send + Sync {
    /// Members with ids greater than `after`, at most `limit` of them.
    async fn fetch_page(
        &self,
        guild_id: serenity::GuildId,
        after: Option<serenity::UserId>,
        limit: u16,
    ) -> ActivityResult<Vec<RosterMember>>;
}

/// Roster backed by the Discord HTTP API.
pub struct HttpRoster<'a> {
    http: &'a serenity::Http,
}

impl<'a> HttpRoster<'a> {
    pub fn new(http: &'a serenity::Http) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl RosterSource for HttpRoster<'_> {
    async fn fetch_page(
        &self,
        guild_id: serenity::GuildId,
        after: Option<serenity::UserId>,
        limit: u16,
    ) -> ActivityResult<Vec<RosterMember>> {
        let members = guild_id
            .members(self.http, NonMaxU16::new(limit), after)
            .await?;

        Ok(members.iter().map(RosterMember::from).collect())
    }
}

/// Walks the member list until a short page marks the end.
pub async fn fetch_full_roster(
    source: &dyn RosterSource,
    guild_id: serenity::GuildId,
    page_size: u16,
) -> ActivityResult<Vec<RosterMember>> {
    let mut roster = Vec::new();
    let mut after = None;

    loop {
        let page = source.fetch_page(guild_id, after, page_size).await?;
        let fetched = page.len();
        after = page.last().map(|m| m.id);
        roster.extend(page);

        tracing::debug!(
            "Fetched {} roster members for guild {} ({} total)",
            fetched,
            guild_id,
            roster.len()
        );

        if fetched < page_size as usize || after.is_none() {
            break;
        }
    }

    Ok(roster)
}

use super::query::{self, parse_days};
use super::report::{InactivityReport, Navigation, format_timestamp};
use super::roster::HttpRoster;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use chrono::Utc;
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use tracing::{error, warn};

/// Help text shown for malformed `activity` invocations.
pub fn usage(prefix: &str) -> String {
    format!(
        "Usages: ```{prefix}activity rescan\n{prefix}activity list <number>```"
    )
}

/// Member activity tracking
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("rescan", "user", "list")
)]
pub async fn activity(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(usage(&ctx.data().prefix)).await?;
    Ok(())
}

/// Start tracking every member of the server that is not tracked yet
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn rescan(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let l10n = ctx.l10n_guild();
    let data = ctx.data();

    ctx.defer().await?;

    let roster = HttpRoster::new(ctx.http());
    match data.activity.recorder.rescan(guild_id, &roster).await {
        Ok(pending) => {
            let mut args = FluentArgs::new();
            args.set("count", pending.missing.to_string());
            ctx.say(l10n.t("activity-rescan-done", Some(&args))).await?;

            pending.finish_in_background();
        }
        Err(e) => {
            error!("Rescan of guild {} failed: {:?}", guild_id, e);
            ctx.say(l10n.t("activity-error-generic", None)).await?;
        }
    }

    Ok(())
}

/// Show when a member was last active
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn user(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] member: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let target = member.as_ref().unwrap_or_else(|| ctx.author());
    let l10n = ctx.l10n_guild();

    let record = match ctx.data().activity.store.find(guild_id, target.id).await {
        Ok(record) => record,
        Err(e) => {
            error!(
                "Failed to look up activity of {} in guild {}: {:?}",
                target.id, guild_id, e
            );
            ctx.say(l10n.t("activity-error-generic", None)).await?;
            return Ok(());
        }
    };

    let mut args = FluentArgs::new();
    args.set("userId", target.id.get().to_string());

    let Some(record) = record else {
        ctx.say(l10n.t("activity-user-not-found", Some(&args))).await?;
        return Ok(());
    };

    args.set("name", record.member_name.clone());
    args.set("timestamp", format_timestamp(record.last_active));
    args.set(
        "days",
        (Utc::now() - record.last_active).num_days().max(0).to_string(),
    );
    args.set("description", record.description.clone());

    ctx.send(
        poise::CreateReply::default()
            .content(l10n.t("activity-user-found", Some(&args)))
            .allowed_mentions(serenity::CreateAllowedMentions::new()),
    )
    .await?;

    Ok(())
}

/// List members inactive for at least the given number of days
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "Minimum days of inactivity, 0 lists every tracked member"] days: Option<
        String,
    >,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let Some(days) = days.as_deref().and_then(parse_days) else {
        ctx.say(usage(&data.prefix)).await?;
        return Ok(());
    };

    let l10n = ctx.l10n_guild();

    let records = match query::find_inactive(&data.activity.store, guild_id, days).await {
        Ok(records) => records,
        Err(e) => {
            error!(
                "Inactivity query for guild {} ({} days) failed: {:?}",
                guild_id, days, e
            );
            ctx.say(l10n.t("activity-error-generic", None)).await?;
            return Ok(());
        }
    };

    if records.is_empty() {
        ctx.say(l10n.t("activity-list-empty", None)).await?;
        return Ok(());
    }

    let report = InactivityReport::new(guild_id, days, records);
    let page_count = report.page_count();
    let components = report.render(&l10n, Utc::now()).into_components();

    let handle = ctx
        .send(
            poise::CreateReply::default()
                .flags(serenity::MessageFlags::IS_COMPONENTS_V2)
                .components(components)
                .allowed_mentions(serenity::CreateAllowedMentions::new()),
        )
        .await?;
    let message = handle.message().await?;

    data.activity.reports.insert(message.id, report);

    if page_count > 1 {
        for navigation in [Navigation::Previous, Navigation::Next] {
            if let Err(e) = message.react(ctx.http(), navigation.reaction()).await {
                warn!(
                    "Failed to add {} to report message {}: {:?}",
                    navigation.symbol(),
                    message.id,
                    e
                );
            }
        }
    }

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![activity()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_matches_help_text() {
        assert_eq!(
            usage("~"),
            "Usages: ```~activity rescan\n~activity list <number>```"
        );
        assert_eq!(
            usage("!"),
            "Usages: ```!activity rescan\n!activity list <number>```"
        );
    }
}

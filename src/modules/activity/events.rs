use super::pager::{self, HttpReportMessage};
use super::recorder::ActivityKind;
use super::report::Navigation;
use super::roster::HttpRoster;
use crate::{Data, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::info;

pub fn handler<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move { handle_event(ctx, event, data).await })
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message, .. } => {
            let Some(guild_id) = new_message.guild_id else {
                return Ok(());
            };
            if new_message.author.bot() {
                return Ok(());
            }

            data.activity
                .recorder
                .record(
                    guild_id,
                    new_message.author.id,
                    new_message.author.display_name(),
                    ActivityKind::Message {
                        channel_id: new_message.channel_id,
                    },
                    Utc::now(),
                )
                .await?;
        }
        serenity::FullEvent::ReactionAdd { add_reaction, .. } => {
            handle_reaction(ctx, add_reaction, data).await?;
        }
        serenity::FullEvent::GuildMemberAddition { new_member, .. } => {
            if new_member.user.bot() {
                return Ok(());
            }

            data.activity
                .recorder
                .record(
                    new_member.guild_id,
                    new_member.user.id,
                    new_member.display_name(),
                    ActivityKind::Join,
                    Utc::now(),
                )
                .await?;
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            data.activity.recorder.forget(*guild_id, user.id).await?;
        }
        serenity::FullEvent::GuildCreate { guild, is_new, .. } => {
            if is_new.unwrap_or(false) {
                let roster = HttpRoster::new(&ctx.http);
                let pending = data.activity.recorder.rescan(guild.id, &roster).await?;
                info!(
                    "Joined guild {}, tracking {} new member(s)",
                    guild.id, pending.missing
                );
                pending.finish_in_background();
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // Outages also delete guilds from the gateway's point of view
            if incomplete.unavailable {
                return Ok(());
            }

            let removed = data.activity.recorder.forget_guild(incomplete.id).await?;
            info!(
                "Removed {} activity record(s) of departed guild {}",
                removed, incomplete.id
            );
        }
        serenity::FullEvent::MessageDelete {
            deleted_message_id,
            ..
        } => {
            data.activity.reports.remove(*deleted_message_id);
        }
        _ => {}
    }

    Ok(())
}

async fn handle_reaction(
    ctx: &serenity::Context,
    reaction: &serenity::Reaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = reaction.guild_id else {
        return Ok(());
    };
    let Some(member) = reaction.member.as_ref() else {
        return Ok(());
    };
    if member.user.bot() {
        return Ok(());
    }

    data.activity
        .recorder
        .record(
            guild_id,
            member.user.id,
            member.display_name(),
            ActivityKind::Reaction {
                channel_id: reaction.channel_id,
            },
            Utc::now(),
        )
        .await?;

    if let Some(navigation) = Navigation::from_emoji(&reaction.emoji) {
        navigate_report(ctx, reaction, navigation, data).await;
    }

    Ok(())
}

async fn navigate_report(
    ctx: &serenity::Context,
    reaction: &serenity::Reaction,
    navigation: Navigation,
    data: &Data,
) {
    let Some(report) = data.activity.reports.get(reaction.message_id) else {
        return;
    };

    let guild_id = report.lock().await.guild_id;
    let l10n = data.l10n.get_l10n_for_guild(ctx, guild_id);
    let message = HttpReportMessage::new(&ctx.http, reaction);

    pager::turn_page(&report, navigation, &message, &l10n, Utc::now()).await;
}

use crate::services::localization::{ContextL10nExt, L10nProxy};
use crate::{Context, Data, Error};
use chrono::{DateTime, TimeDelta, Utc};
use poise::serenity_prelude as serenity;
use std::sync::atomic::Ordering;

/// Renders a duration as `1d 2h 3m 4s`, leaving out leading zero units.
pub fn format_uptime(uptime: TimeDelta) -> String {
    let total = uptime.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    );

    let mut parts = vec![];
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}

/// Show uptime and report statistics
#[poise::command(prefix_command, slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let end_time = Utc::now();
    let l10n = ctx.l10n_user();

    let components = get_status_components(
        &ctx.data(),
        &l10n,
        ctx.serenity_context().shard_id,
        ctx.created_at().to_utc(),
        end_time,
    );

    ctx.send(
        poise::CreateReply::default()
            .flags(serenity::MessageFlags::IS_COMPONENTS_V2)
            .components(components),
    )
    .await?;

    Ok(())
}

pub fn get_status_components(
    data: &Data,
    l10n: &L10nProxy,
    shard_id: serenity::ShardId,
    request_created_at: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Vec<serenity::CreateComponent<'static>> {
    let mut inner_components = vec![];

    inner_components.push(serenity::CreateContainerComponent::TextDisplay(
        serenity::CreateTextDisplay::new(format!("## {}", l10n.t("status-title", None))),
    ));

    inner_components.push(serenity::CreateContainerComponent::Separator(
        serenity::CreateSeparator::new(true),
    ));

    let latency = end_time - request_created_at;

    let metrics_text = format!(
        "**{}**: `{}`\n**{}**: <t:{}:F>\n**{}**: `{}`\n**{}**: `{} ms`\n**{}**: `{} / {}`",
        l10n.t("status-uptime", None),
        format_uptime(end_time - data.started_at),
        l10n.t("status-started", None),
        data.started_at.timestamp(),
        l10n.t("status-open-reports", None),
        data.activity.reports.len(),
        l10n.t("status-latency", None),
        latency.num_milliseconds(),
        l10n.t("status-shard", None),
        shard_id.get() + 1,
        data.shard_count.load(Ordering::Relaxed)
    );

    inner_components.push(serenity::CreateContainerComponent::TextDisplay(
        serenity::CreateTextDisplay::new(metrics_text),
    ));

    #[cfg(feature = "system-info")]
    {
        use sysinfo::System;
        let mut sys = System::new_all();
        sys.refresh_all();

        let total_gb = sys.total_memory() as f32 / 1024.0 / 1024.0 / 1024.0;
        let used_gb = sys.used_memory() as f32 / 1024.0 / 1024.0 / 1024.0;

        inner_components.push(serenity::CreateContainerComponent::TextDisplay(
            serenity::CreateTextDisplay::new(format!(
                "**{}**\nCPU: `{:.2}%`\nMem: `{:.2}` / `{:.2}` GB",
                l10n.t("status-system", None),
                sys.global_cpu_usage(),
                used_gb,
                total_gb
            )),
        ));
    }

    inner_components.push(serenity::CreateContainerComponent::Separator(
        serenity::CreateSeparator::new(false),
    ));

    let button_row = vec![
        serenity::CreateButton::new("status-refresh")
            .label(l10n.t("status-refresh-btn", None))
            .style(serenity::ButtonStyle::Primary)
            .emoji(serenity::ReactionType::Unicode('🔄'.into())),
    ];

    inner_components.push(serenity::CreateContainerComponent::ActionRow(
        serenity::CreateActionRow::Buttons(button_row.into()),
    ));

    vec![serenity::CreateComponent::Container(
        serenity::CreateContainer::new(inner_components),
    )]
}

pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    if interaction.data.custom_id != "status-refresh" {
        return Ok(());
    }

    let l10n = data.l10n.get_proxy(&interaction.locale.to_string());
    let start_time = interaction.id.created_at().to_utc();

    interaction
        .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await?;

    let components = get_status_components(data, &l10n, ctx.shard_id, start_time, Utc::now());

    interaction
        .edit_response(
            &ctx.http,
            serenity::EditInteractionResponse::new().components(components),
        )
        .await?;

    Ok(())
}

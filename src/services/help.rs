use crate::modules::activity::commands::usage;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// List the available commands
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let l10n = ctx.l10n_user();
    let data = ctx.data();

    let mut components = vec![
        serenity::CreateComponent::TextDisplay(serenity::CreateTextDisplay::new(
            l10n.t("help-title", None),
        )),
        serenity::CreateComponent::Separator(serenity::CreateSeparator::new(true)),
    ];

    for module in &data.module_definitions {
        components.push(serenity::CreateComponent::TextDisplay(
            serenity::CreateTextDisplay::new(format!(
                "**{}**\n{}",
                l10n.t(module.name_key, None),
                l10n.t(module.desc_key, None)
            )),
        ));
    }

    components.push(serenity::CreateComponent::TextDisplay(
        serenity::CreateTextDisplay::new(format!(
            "{}\n{}\n`{}status` {}",
            l10n.t("help-usage-header", None),
            usage(&data.prefix),
            data.prefix,
            l10n.t("help-status", None)
        )),
    ));

    ctx.send(
        poise::CreateReply::default()
            .flags(serenity::MessageFlags::IS_COMPONENTS_V2)
            .components(components),
    )
    .await?;

    Ok(())
}

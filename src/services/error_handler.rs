use crate::modules::activity::commands::usage;
use crate::services::localization::{ContextL10nExt, L10nProxy};
use crate::{Data, Error};
use fluent::FluentArgs;
use tracing::{debug, error};

fn is_activity_command(qualified_name: &str) -> bool {
    qualified_name == "activity" || qualified_name.starts_with("activity ")
}

/// Reply for malformed arguments of an `activity` command, `None` for other commands.
/// `activity user` gets its own hint since the shared usage text does not cover it.
pub fn argument_hint(qualified_name: &str, prefix: &str, l10n: &L10nProxy) -> Option<String> {
    if qualified_name == "activity user" {
        let mut args = FluentArgs::new();
        args.set("prefix", prefix.to_string());
        return Some(l10n.t("activity-user-usage", Some(&args)));
    }

    is_activity_command(qualified_name).then(|| usage(prefix))
}

/// Framework-wide error hook. Nothing raised by a single command escapes it.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } if is_activity_command(&ctx.command().qualified_name) => {
            let command = &ctx.command().qualified_name;
            debug!("Bad arguments for {} ({:?}): {}", command, input, error);

            let hint = argument_hint(command, &ctx.data().prefix, &ctx.l10n_user())
                .unwrap_or_else(|| usage(&ctx.data().prefix));
            if let Err(e) = ctx.say(hint).await {
                error!("Failed to send usage message: {:?}", e);
            }
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command {} failed in guild {:?}: {:?}",
                ctx.command().qualified_name,
                ctx.guild_id(),
                error
            );
            let l10n = ctx.l10n_user();
            if let Err(e) = ctx.say(l10n.t("activity-error-generic", None)).await {
                error!("Failed to send error message: {:?}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::localization::LocalizationManager;
    use std::sync::Arc;

    fn l10n() -> L10nProxy {
        Arc::new(LocalizationManager::new()).get_proxy("en-US")
    }

    #[test]
    fn user_subcommand_gets_its_own_hint() {
        let hint = argument_hint("activity user", "~", &l10n()).unwrap();
        assert_eq!(hint, "Usage: ```~activity user [@member]```");
    }

    #[test]
    fn other_activity_commands_get_fixed_usage() {
        let l10n = l10n();
        for command in ["activity", "activity list", "activity rescan"] {
            assert_eq!(
                argument_hint(command, "!", &l10n).as_deref(),
                Some("Usages: ```!activity rescan\n!activity list <number>```")
            );
        }
    }

    #[test]
    fn unrelated_commands_fall_through() {
        let l10n = l10n();
        assert_eq!(argument_hint("status", "~", &l10n), None);
        assert_eq!(argument_hint("activityboard", "~", &l10n), None);
    }
}

use crate::Data;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info};

/// Custom event handler for non-command Discord events
pub struct Handler {
    modules: Vec<crate::modules::Module>,
}

impl Handler {
    pub fn new() -> Self {
        Self {
            modules: crate::modules::get_modules(),
        }
    }
}

#[serenity::async_trait]
impl serenity::EventHandler for Handler {
    async fn dispatch(&self, ctx: &serenity::Context, event: &serenity::FullEvent) {
        // 1. Core / Service handling
        match event {
            serenity::FullEvent::Ready { data_about_bot, .. } => {
                info!("Logged in as {}", data_about_bot.user.name);
            }
            serenity::FullEvent::GuildCreate { guild, is_new, .. } => {
                if is_new.unwrap_or(false) {
                    info!("Joined new guild: {} ({})", guild.name, guild.id);
                }
            }
            serenity::FullEvent::GuildDelete { incomplete, .. } => {
                info!("Left guild: {}", incomplete.id);
            }
            serenity::FullEvent::InteractionCreate { interaction, .. } => {
                handle_interactions(ctx, interaction).await;
            }
            _ => {}
        }

        // 2. Module dispatch. Every handler runs in its own task so a slow
        // database round trip never holds up the gateway.
        let event_arc = Arc::new(event.clone());
        let data = ctx.data::<Data>();

        for module in &self.modules {
            for handler in &module.event_handlers {
                let ctx = ctx.clone();
                let event_arc = event_arc.clone();
                let data = data.clone();
                let handler = *handler;
                let module_id = module.definition.id;

                tokio::spawn(async move {
                    if let Err(e) = handler(&ctx, &event_arc, &data).await {
                        error!("Error in event handler for module {}: {:?}", module_id, e);
                    }
                });
            }
        }
    }
}

async fn handle_interactions(ctx: &serenity::Context, interaction: &serenity::Interaction) {
    if let serenity::Interaction::Component(component_interaction) = interaction {
        let data = ctx.data::<Data>().clone();
        let ctx = ctx.clone();
        let component_interaction = component_interaction.clone();

        tokio::spawn(async move {
            let custom_id = &component_interaction.data.custom_id;

            if custom_id.starts_with("status-") {
                if let Err(e) =
                    crate::services::status::handle_interaction(&ctx, &component_interaction, &data)
                        .await
                {
                    error!("Error handling status interaction: {:?}", e);
                }
            }
        });
    }
}

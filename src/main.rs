use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::Parser as _;
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod db;
mod modules;
mod services;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database connection string.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Marker that starts a text command.
    #[arg(long, env = "COMMAND_PREFIX", default_value = "~")]
    prefix: String,

    /// Maximum number of open paginated reports kept in memory.
    #[arg(long, env = "REPORT_CAPACITY", default_value_t = 256)]
    report_capacity: usize,

    /// Minutes a report can go without navigation before it is dropped.
    #[arg(long, env = "REPORT_IDLE_MINUTES", default_value_t = 30)]
    report_idle_minutes: u64,

    /// Concurrent inserts while reconciling a guild roster.
    #[arg(long, env = "RESCAN_CONCURRENCY", default_value_t = 8)]
    rescan_concurrency: usize,

    /// Publish commands. If no guild ID is provided, publish globally.
    #[arg(long, num_args = 0..)]
    publish: Option<Vec<u64>>,

    /// Clear all commands instead of publishing them.
    #[arg(long)]
    clear: bool,

    /// Rollback the specified number of migrations and run all migrations again.
    #[arg(long, num_args = 0..=1, default_missing_value = "1")]
    refresh_migrations: Option<u32>,
}

// Custom user data passed to all command functions
pub struct Data {
    pub l10n: Arc<services::localization::LocalizationManager>,
    pub activity: Arc<modules::activity::ActivityService>,
    pub module_definitions: Vec<modules::ModuleDefinition>,
    pub prefix: String,
    pub started_at: DateTime<Utc>,
    pub shard_count: Arc<AtomicU32>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting guild activity bot...");

    // Establish database connection
    let db = db::establish_connection(&args.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    if let Some(depth) = args.refresh_migrations {
        info!("Refreshing migrations (down {}, then up)...", depth);
        db::migrations::Migrator::down(&db, Some(depth))
            .await
            .context("Failed to rollback migration")?;
    }

    db::migrations::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    if args.refresh_migrations.is_some() {
        info!("Migrations refreshed successfully.");
        return Ok(());
    }

    let token = serenity::Token::from_env("DISCORD_TOKEN").context("missing DISCORD_TOKEN")?;
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    // Initialize localization manager
    let l10n = Arc::new(services::localization::LocalizationManager::new());

    // Initialize activity tracking
    let activity = Arc::new(modules::activity::ActivityService::new(
        db.clone(),
        modules::activity::ActivitySettings {
            report_capacity: args.report_capacity,
            report_idle: Duration::from_secs(args.report_idle_minutes * 60),
            rescan_concurrency: args.rescan_concurrency,
        },
    ));

    // Load and translate commands
    let mut commands = modules::commands();
    l10n.apply_translations(&mut commands);

    let framework_options = poise::FrameworkOptions {
        commands,
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(args.prefix.clone().into()),
            ..Default::default()
        },
        on_error: |error| Box::pin(services::error_handler::on_error(error)),
        ..Default::default()
    };

    // Handle command registration if requested
    if let Some(publish_args) = args.publish {
        let http = serenity::HttpBuilder::new(token.clone()).build();
        let bot_user = http
            .get_current_user()
            .await
            .context("Failed to fetch bot user info")?;
        let application_id = bot_user.id;

        info!("Fetched Application ID: {}", application_id);

        let http = serenity::HttpBuilder::new(token.clone())
            .application_id(serenity::ApplicationId::new(application_id.get()))
            .build();

        let empty_commands = vec![];
        let commands = if args.clear {
            &empty_commands
        } else {
            &framework_options.commands
        };

        if publish_args.is_empty() {
            if args.clear {
                info!("Clearing commands globally...");
            } else {
                info!("Registering commands globally...");
            }

            if let Err(e) = poise::builtins::register_globally(&http, commands).await {
                error!("Failed to register commands globally: {}", e);
            } else {
                info!("Global command operation successful");
            }
        } else {
            for guild_id in publish_args {
                if args.clear {
                    info!("Clearing commands in guild {}...", guild_id);
                } else {
                    info!("Registering commands in guild {}...", guild_id);
                }

                if let Err(e) = poise::builtins::register_in_guild(
                    &http,
                    commands,
                    serenity::GuildId::new(guild_id),
                )
                .await
                {
                    error!("Failed to register commands in guild {}: {}", guild_id, e);
                } else {
                    info!("Guild command operation successful for guild {}", guild_id);
                }
            }
        }
        return Ok(());
    }

    let http = serenity::HttpBuilder::new(token.clone()).build();
    let initial_shard_count = http
        .get_bot_gateway()
        .await
        .context("Failed to get bot gateway info")?
        .shards
        .get() as u32;

    let shard_count = Arc::new(AtomicU32::new(initial_shard_count));

    // Spawn background task to refresh shard count every 2 minutes
    {
        let shard_count = shard_count.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(120)).await;
                match http.get_bot_gateway().await {
                    Ok(gateway) => {
                        let new_count = gateway.shards.get() as u32;
                        shard_count.store(new_count, Ordering::Relaxed);
                        info!("Shard count refreshed: {}", new_count);
                    }
                    Err(e) => {
                        error!("Failed to refresh shard count: {:?}", e);
                    }
                }
            }
        });
    }

    // Create the poise framework
    let framework = poise::Framework::new(framework_options);

    let mut cache_settings = serenity::cache::Settings::default();
    cache_settings.cache_users = true;
    cache_settings.cache_guilds = true;

    // Build the client with both poise framework and custom event handler
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(Box::new(framework))
        .event_handler(Arc::new(services::event_manager::Handler::new()))
        .cache_settings(cache_settings)
        .data(Arc::new(Data {
            l10n,
            activity: activity.clone(),
            module_definitions: modules::definitions(),
            prefix: args.prefix,
            started_at: Utc::now(),
            shard_count,
        }) as _)
        .await
        .context("Failed to create client")?;

    // Start report cleanup runner
    activity.reports.clone().start_cleanup_runner();

    info!("Bot is ready!");
    client.start_autosharded().await.context("Client error")?;

    Ok(())
}

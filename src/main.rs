use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot for community events, player profiles and strikes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Guild the bot serves (defaults to DISCORD_GUILD_ID, then the first guild)
    #[arg(long)]
    guild_id: Option<u64>,

    /// JSON config file (defaults to CONFIG_PATH, then built-in defaults)
    #[arg(long)]
    config: Option<String>,

    /// Directory for the persisted records (defaults to STATE_PATH, then `state`)
    #[arg(long)]
    state_path: Option<String>,
}

mod commands;
mod config;
mod error;
mod events;
mod guild;
mod logging;
mod managers;
mod messages;
mod models;
mod permissions;
mod state;

use config::BotConfig;
use error::BotError;
use guild::{create_shared_gateway, SharedGateway};
use logging::SharedDiagnostics;
use managers::{
    create_shared_event_manager, create_shared_profile_manager, create_shared_strike_manager,
    SharedEventManager, SharedProfileManager, SharedStrikeManager,
};
use state::{create_shared_store, FileMedium, SharedStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub store: SharedStore,
    pub events: SharedEventManager,
    pub profiles: SharedProfileManager,
    pub strikes: SharedStrikeManager,
    pub gateway: SharedGateway,
    pub diagnostics: SharedDiagnostics,
}

/// Load and validate the config file, or validate the defaults
fn load_config(path: Option<&str>) -> Result<BotConfig> {
    match path {
        Some(path) => Ok(BotConfig::load_from_file(path)?),
        None => {
            let config = BotConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Log the application ID encoded in the token's first segment
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    // Discord tokens use URL-safe base64 without padding
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
    if let Some(id_str) = decoded.ok().and_then(|d| String::from_utf8(d).ok()) {
        info!(
            "Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)",
            id_str, id_str
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config_path = args.config.or_else(|| std::env::var("CONFIG_PATH").ok());
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not up yet
            eprintln!("Invalid configuration: {:#}", e);
            return Err(e);
        }
    };

    let diagnostics = logging::create_diagnostics(config.diagnostics_capacity);
    logging::init_tracing(diagnostics.clone());
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path),
        None => info!("No config file given, using defaults"),
    }

    let token = std::env::var("DISCORD_TOKEN").context("Missing DISCORD_TOKEN environment variable")?;
    log_bot_id(&token);

    let state_path = args
        .state_path
        .or_else(|| std::env::var("STATE_PATH").ok())
        .unwrap_or_else(|| "state".to_string());
    info!("Storing records in {}", state_path);
    let store = create_shared_store(Arc::new(FileMedium::new(&state_path)));

    let config = Arc::new(config);
    let events = create_shared_event_manager(store.clone(), &config)?;

    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id.or_else(|| {
        std::env::var("DISCORD_GUILD_ID")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
    });

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::event(),
                commands::active_event(),
                commands::end_event(),
                commands::clear_registrations(),
                commands::register(),
                commands::registrants(),
                commands::rank(),
                commands::info(),
                commands::kick(),
                commands::ban(),
                commands::strike(),
                commands::set_activity(),
                commands::inactive(),
                commands::unregistered(),
                commands::roleless(),
                commands::strike_inactive(),
                commands::strike_unregistered(),
                commands::strike_roleless(),
                commands::room(),
                commands::help(),
                commands::diagnostics(),
                commands::shutdown(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            let reply = match error.downcast_ref::<BotError>() {
                                Some(e @ BotError::AuthorizationDenied { .. }) => {
                                    warn!("{} in '{}'", e, ctx.command().qualified_name);
                                    e.user_message()
                                }
                                Some(e) => {
                                    error!("Error in command '{}': {}", ctx.command().qualified_name, e);
                                    e.user_message()
                                }
                                None => {
                                    error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                                    "❌ An unexpected error occurred.".to_string()
                                }
                            };
                            let _ = ctx.say(reply).await;
                        }
                        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
                            if let Some(e) = error {
                                error!("Permission check for '{}' failed: {}", ctx.command().qualified_name, e);
                            }
                            let denied = BotError::AuthorizationDenied {
                                command: ctx.command().qualified_name.clone(),
                            };
                            let _ = ctx.say(denied.user_message()).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            warn!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                            let _ = ctx
                                .say(format!("❌ Invalid arguments for `!{}`. See `!help`.", ctx.command().qualified_name))
                                .await;
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("❌ I am missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            warn!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say("❌ You don't have permission to use this command.").await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            warn!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            if let Err(e) = poise::builtins::on_error(other).await {
                                error!("Error while handling error: {}", e);
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let guild_id = target_guild_id
                    .map(serenity::GuildId::new)
                    .or_else(|| ready.guilds.first().map(|g| g.id))
                    .ok_or_else(|| BotError::ConfigValidation {
                        message: "the bot is not in any guild and no guild ID was given".to_string(),
                    })?;
                if ready.guilds.len() > 1 && target_guild_id.is_none() {
                    warn!("Bot is in {} guilds, serving only {}", ready.guilds.len(), guild_id);
                }
                info!("Serving guild {}", guild_id);

                if guild_commands || sync_commands {
                    info!("Registering commands to guild: {}", guild_id);
                    if let Err(e) =
                        poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await
                    {
                        error!("Failed to register commands for guild {}: {}", guild_id, e);
                    } else {
                        info!(
                            "Successfully registered {} commands for guild {}",
                            framework.options().commands.len(),
                            guild_id
                        );
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(ctx, &framework.options().commands).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!(
                            "Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                            framework.options().commands.len()
                        );
                    }
                }

                let gateway = create_shared_gateway(ctx.http.clone(), guild_id, ready.user.id);
                let profiles = create_shared_profile_manager(store.clone(), gateway.clone());
                let strikes = create_shared_strike_manager(store.clone(), gateway.clone(), &config);

                let data = Data {
                    config,
                    store,
                    events,
                    profiles,
                    strikes,
                    gateway,
                    diagnostics,
                };
                crate::events::handle_startup(&data).await;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;
    let privileged_intents = ["MESSAGE_CONTENT", "GUILD_MEMBERS"];
    info!("Requesting privileged intents: {:?}", privileged_intents);

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable these privileged intents in the Discord Developer Portal:");
            for intent in &privileged_intents {
                error!("  - {}", intent);
            }
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable these in Discord Developer Portal: {:?}",
                privileged_intents
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}

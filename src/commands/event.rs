use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::error::BotError;
use crate::guild::{Directory, Messenger};
use crate::managers::EventManager;
use crate::messages;
use crate::models::MemberId;
use crate::permissions::{ensure_admin, require_admin};
use crate::{Context, Error};

use super::say_chunked;

/// Create the event (`DD/MM/YYYY HH:MM | Description`) or show the current one
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn event(
    ctx: Context<'_>,
    #[rest]
    #[description = "DD/MM/YYYY HH:MM | Description (leave empty to view)"]
    input: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();

    let Some(input) = input.filter(|s| !s.trim().is_empty()) else {
        let reply = match data.events.get_event().await {
            Some(event) => messages::current_event(&event, &data.events.regional_times(&event)),
            None => "❌ There is no active event.".to_string(),
        };
        ctx.say(reply).await?;
        return Ok(());
    };

    ensure_admin(ctx).await?;
    let (date, description) = EventManager::parse_event_input(&input)?;
    let event = data.events.create_event(&date, &description).await?;

    let announcement = messages::event_announcement(&event, &data.events.regional_times(&event));
    if let Some(warning) =
        announce_event(data.gateway.as_ref(), &data.config.channels.events, &announcement).await
    {
        ctx.say(warning).await?;
    }

    ctx.say("✅ Event saved.").await?;
    Ok(())
}

/// Post a saved event to the events channel. Failure never undoes the event;
/// it yields a warning for the invoker instead.
async fn announce_event(messenger: &dyn Messenger, channel: &str, announcement: &str) -> Option<String> {
    match messenger.send_to_channel(channel, announcement).await {
        Ok(()) => None,
        Err(BotError::ChannelNotFound { name }) => {
            warn!("Event saved but channel '{}' is missing", name);
            Some("⚠️ The events channel was not found.".to_string())
        }
        Err(e) => {
            warn!("Could not announce event: {}", e);
            Some(e.user_message())
        }
    }
}

/// Show the active event with its regional times
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn active_event(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let Some(event) = data.events.get_event().await else {
        ctx.say("❌ There is no scheduled event.").await?;
        return Ok(());
    };

    let times: String = data
        .events
        .regional_times(&event)
        .iter()
        .map(|t| format!("**{}**: {} ({})\n", t.label, t.time, t.date))
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("📅 Active event")
        .description(&event.description)
        .field("Date", format!("`{}`", event.formatted_date()), false)
        .field("Times by region", times, false)
        .color(0x00ff00);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// End the event and clear its registrations
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn end_event(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().events.clear_event().await?;
    info!("Event ended by {}", ctx.author().name);
    ctx.say("🗑️ Event and registrations removed.").await?;
    Ok(())
}

/// Clear registrations but keep the event
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn clear_registrations(ctx: Context<'_>) -> Result<(), Error> {
    ctx.data().events.clear_registrations().await?;
    ctx.say("🧹 Registrations removed.").await?;
    Ok(())
}

/// Register for the active event
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    let outcome = ctx
        .data()
        .events
        .register(MemberId(ctx.author().id.get()))
        .await?;
    ctx.say(messages::registration(outcome)).await?;
    Ok(())
}

/// List members registered for the event
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn registrants(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let mut names = Vec::new();
    for id in data.events.registrants().await {
        match data.gateway.member(id).await {
            Ok(member) => names.push(member.display_name),
            // Member left the server
            Err(_) => names.push(format!("Unknown member ({})", id)),
        }
    }
    say_chunked(ctx, &messages::registrants(&names)).await
}

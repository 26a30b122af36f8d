use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::messages;
use crate::models::MemberId;
use crate::permissions::require_admin;
use crate::{Context, Error};

use super::say_chunked;

const DIAGNOSTICS_SHOWN: usize = 20;

/// Show the command list
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(messages::help_text()).await?;
    Ok(())
}

/// Channel name for a private room: `room-<owner>-<guest>...`, lowercase, no spaces
pub fn room_name(usernames: &[&str]) -> String {
    let joined = usernames.join("-").to_lowercase().replace(' ', "-");
    format!("room-{}", joined)
}

/// Create a private room for you and the mentioned members
#[poise::command(prefix_command, guild_only, required_permissions = "MANAGE_CHANNELS")]
pub async fn room(
    ctx: Context<'_>,
    #[description = "Members to invite"] guests: Vec<serenity::Member>,
) -> Result<(), Error> {
    if guests.is_empty() {
        ctx.say("❌ Mention at least one member. Usage: `!room @member1 @member2 ...`")
            .await?;
        return Ok(());
    }

    let data = ctx.data();
    let owner = MemberId(ctx.author().id.get());
    let guest_ids: Vec<MemberId> = guests.iter().map(|m| MemberId(m.user.id.get())).collect();

    let usernames: Vec<&str> = std::iter::once(ctx.author().name.as_str())
        .chain(guests.iter().map(|m| m.user.name.as_str()))
        .collect();
    let name = room_name(&usernames);

    let channel_id = data
        .gateway
        .create_private_room(&data.config.room_category, &name, owner, &guest_ids)
        .await?;

    let welcome = format!(
        "👋 Welcome {} and {}! This is your private room.",
        guest_ids
            .iter()
            .map(|id| id.mention())
            .collect::<Vec<_>>()
            .join(", "),
        owner.mention()
    );
    if let Err(e) = data.gateway.say_in(channel_id, &welcome).await {
        warn!("Could not post welcome in room {}: {}", channel_id, e);
    }

    ctx.say(format!("✅ Private room created: <#{}>", channel_id))
        .await?;
    Ok(())
}

/// Show recent warnings and errors
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn diagnostics(ctx: Context<'_>) -> Result<(), Error> {
    let entries = ctx.data().diagnostics.recent(DIAGNOSTICS_SHOWN);
    if entries.is_empty() {
        ctx.say("✅ No warnings or errors recorded.").await?;
        return Ok(());
    }

    let lines: Vec<String> = entries.iter().map(|e| e.format()).collect();
    say_chunked(
        ctx,
        &format!("🩺 **Last {} warnings/errors:**\n{}", entries.len(), lines.join("\n")),
    )
    .await
}

/// Shut the bot down
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    info!("Shutdown requested by {}", ctx.author().name);
    ctx.say(messages::shutdown_notice()).await?;
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name() {
        assert_eq!(room_name(&["Pollo", "Zeal Tick"]), "room-pollo-zeal-tick");
    }
}

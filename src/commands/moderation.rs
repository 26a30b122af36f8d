use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use tracing::{error, info};

use crate::error::Result as BotResult;
use crate::guild::Directory;
use crate::managers::BulkCriterion;
use crate::messages;
use crate::models::MemberId;
use crate::permissions::require_admin;
use crate::state::{ActivityMessage, ACTIVITY_KEY};
use crate::{Context, Data, Error};

use super::{say_chunked, MESSAGE_LIMIT};

const DEFAULT_REASON: &str = "Not specified";

/// Kick a member
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[rest]
    #[description = "Reason"]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
    ctx.data()
        .gateway
        .kick_member(MemberId(member.user.id.get()), &reason)
        .await?;
    info!("{} kicked {} ({})", ctx.author().name, member.user.name, reason);
    ctx.say(format!(
        "👢 {} has been kicked. Reason: {}",
        member.user.name, reason
    ))
    .await?;
    Ok(())
}

/// Ban a member
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] member: serenity::Member,
    #[rest]
    #[description = "Reason"]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason.unwrap_or_else(|| DEFAULT_REASON.to_string());
    ctx.data()
        .gateway
        .ban_member(MemberId(member.user.id.get()), &reason)
        .await?;
    info!("{} banned {} ({})", ctx.author().name, member.user.name, reason);
    ctx.say(format!(
        "🔨 {} has been banned. Reason: {}",
        member.user.name, reason
    ))
    .await?;
    Ok(())
}

/// Add strikes to a member (negative amounts remove them)
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn strike(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
    #[description = "Strikes to add, default 1"] amount: Option<i64>,
    #[rest]
    #[description = "Reason"]
    reason: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let id = MemberId(member.user.id.get());
    let reason = reason.unwrap_or_else(|| "No reason given".to_string());
    let outcome = data
        .strikes
        .adjust_strikes(id, amount.unwrap_or(1), &reason)
        .await?;

    ctx.say(messages::strike_result(
        &id.mention(),
        &outcome,
        data.strikes.threshold(),
        &data.config.appeal_contact,
    ))
    .await?;
    Ok(())
}

/// Remember which message in the activity channel tracks weekly activity
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn set_activity(
    ctx: Context<'_>,
    #[description = "ID of the weekly activity message"] message_id: u64,
) -> Result<(), Error> {
    let data = ctx.data();
    let activity = data
        .gateway
        .locate_activity_message(&data.config.channels.activity, message_id)
        .await?;
    {
        let _guard = data.store.lock(ACTIVITY_KEY).await;
        data.store.save(ACTIVITY_KEY, &activity).await?;
    }
    info!("Weekly activity message set to {}", message_id);
    ctx.say("✅ Weekly activity message saved.").await?;
    Ok(())
}

/// Members who reacted to the weekly activity message
async fn active_members(data: &Data) -> BotResult<HashSet<MemberId>> {
    let stored: ActivityMessage = data
        .store
        .load(ACTIVITY_KEY, ActivityMessage::default())
        .await;
    data.gateway
        .activity_reactors(
            &data.config.channels.activity,
            stored,
            data.config.activity_scan_depth,
        )
        .await
}

async fn list_matching(
    ctx: Context<'_>,
    criterion: BulkCriterion,
    title: &str,
    empty: &str,
) -> Result<(), Error> {
    ctx.defer().await?;
    let members = ctx.data().strikes.members_matching(&criterion).await?;
    let ids: Vec<MemberId> = members.iter().map(|m| m.id).collect();
    say_chunked(ctx, &messages::member_list(title, &ids, empty)).await
}

/// List members who did not react to the weekly activity message
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn inactive(ctx: Context<'_>) -> Result<(), Error> {
    let active = active_members(ctx.data()).await?;
    list_matching(
        ctx,
        BulkCriterion::Inactive { active },
        "🔴 **Members inactive this week:**",
        "✅ Every member is active.",
    )
    .await
}

/// List members without player data
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn unregistered(ctx: Context<'_>) -> Result<(), Error> {
    list_matching(
        ctx,
        BulkCriterion::Unregistered,
        "📛 **Members without player data (`!rank`):**",
        "✅ Every member has registered with `!rank`.",
    )
    .await
}

/// List members without any role
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn roleless(ctx: Context<'_>) -> Result<(), Error> {
    list_matching(
        ctx,
        BulkCriterion::Roleless,
        "🔖 **Members without any role:**",
        "✅ Every member has at least one role.",
    )
    .await
}

/// Run a bulk strike in the background and post the report to the invoking channel
async fn spawn_bulk_strike(ctx: Context<'_>, criterion: BulkCriterion) -> Result<(), Error> {
    let data = ctx.data();
    let strikes = data.strikes.clone();
    let gateway = data.gateway.clone();
    let appeal_contact = data.config.appeal_contact.clone();
    let channel_id = ctx.channel_id();
    let label = criterion.label();

    ctx.say(format!(
        "⏳ Applying strikes for {}. The report will be posted here.",
        label
    ))
    .await?;

    info!("Bulk strike for {} started by {}", label, ctx.author().name);
    tokio::spawn(async move {
        let report = strikes.strike_all(criterion).await;
        info!(
            "Bulk strike for {} finished: {} scanned, {} struck, {} failed",
            label,
            report.scanned,
            report.outcomes.len(),
            report.failures.len()
        );

        let text = messages::bulk_report(label, &report, strikes.threshold(), &appeal_contact);
        for chunk in messages::chunk(&text, MESSAGE_LIMIT) {
            if let Err(e) = gateway.say_in(channel_id, &chunk).await {
                error!("Could not post bulk strike report: {}", e);
                break;
            }
        }
    });
    Ok(())
}

/// Strike every member who did not react to the weekly activity message
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn strike_inactive(ctx: Context<'_>) -> Result<(), Error> {
    let active = active_members(ctx.data()).await?;
    spawn_bulk_strike(ctx, BulkCriterion::Inactive { active }).await
}

/// Strike every member without player data
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn strike_unregistered(ctx: Context<'_>) -> Result<(), Error> {
    spawn_bulk_strike(ctx, BulkCriterion::Unregistered).await
}

/// Strike every member without any role
#[poise::command(prefix_command, slash_command, guild_only, check = "require_admin")]
pub async fn strike_roleless(ctx: Context<'_>) -> Result<(), Error> {
    spawn_bulk_strike(ctx, BulkCriterion::Roleless).await
}

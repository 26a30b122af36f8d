use poise::serenity_prelude as serenity;

use crate::error::BotError;
use crate::guild::Directory;
use crate::managers::ProfileRequest;
use crate::messages::{self, MemberCard};
use crate::models::MemberId;
use crate::{Context, Error};

const RANK_USAGE: &str = "❌ Usage: `!rank <ID> <Alias (optional)> <Rank> <Level> <Country>`";

/// Save your player data and decorate your nickname
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[rest]
    #[description = "<ID> [Alias] <Rank> <Level> <Country>"]
    input: Option<String>,
) -> Result<(), Error> {
    let input = input.unwrap_or_default();
    let words: Vec<&str> = input.split_whitespace().collect();
    let Some(request) = ProfileRequest::from_words(&words) else {
        ctx.say(RANK_USAGE).await?;
        return Ok(());
    };

    let data = ctx.data();
    let member = data.gateway.member(MemberId(ctx.author().id.get())).await?;
    let update = data.profiles.register_profile(&member, &request).await?;

    if let Some(e) = &update.nickname_error {
        let text = match e {
            BotError::InsufficientPermission { .. } => {
                "⚠️ I couldn't change your nickname. Check my permissions.".to_string()
            }
            other => other.user_message(),
        };
        ctx.say(text).await?;
    }

    ctx.say(messages::profile_saved(&member.display_name, &update.profile))
        .await?;
    Ok(())
}

/// Show a member's player data, strikes and event status
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let data = ctx.data();
    let target = match member {
        Some(member) => member,
        None => ctx
            .author_member()
            .await
            .ok_or_else(|| BotError::MemberNotFound {
                id: ctx.author().id.to_string(),
            })?
            .into_owned(),
    };
    let id = MemberId(target.user.id.get());

    let Some(profile) = data.profiles.profile(id).await else {
        ctx.say("❌ No data registered for this user.").await?;
        return Ok(());
    };

    let resolved = data.gateway.member(id).await?;
    let card = MemberCard {
        member: &resolved,
        nickname: target.nick.as_deref(),
        profile: &profile,
        strikes: data.strikes.get_strikes(id).await,
        registered: data.events.is_registered(id).await,
    };
    ctx.say(messages::member_card(&card)).await?;
    Ok(())
}

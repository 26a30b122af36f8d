use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ChannelId, ChannelType, CreateChannel, EditMember, GetMessages, GuildId,
    Http, MessageId, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::{Directory, Messenger};
use crate::error::{discord_error, BotError, Result};
use crate::models::{Member, MemberId};
use crate::state::ActivityMessage;

const REACTION_PAGE: u8 = 100;

/// Discord-backed guild access for the single community server
pub struct GuildGateway {
    http: Arc<Http>,
    guild_id: GuildId,
    bot_id: UserId,
}

impl GuildGateway {
    pub fn new(http: Arc<Http>, guild_id: GuildId, bot_id: UserId) -> Self {
        Self {
            http,
            guild_id,
            bot_id,
        }
    }

    /// Find a channel of the given kind by exact name
    async fn find_channel(&self, name: &str, kind: ChannelType) -> Result<Option<ChannelId>> {
        let channels = self.guild_id.channels(&self.http).await?;
        Ok(channels
            .values()
            .find(|c| c.kind == kind && c.name == name)
            .map(|c| c.id))
    }

    /// Members who reacted to the weekly activity message, bots excluded.
    ///
    /// Uses the stored activity message when one is set; otherwise the most recent
    /// bot-authored message with reactions among the last `scan_depth` messages of
    /// the activity channel.
    pub async fn activity_reactors(
        &self,
        activity_channel: &str,
        stored: ActivityMessage,
        scan_depth: u8,
    ) -> Result<HashSet<MemberId>> {
        let message = match stored.location() {
            Some((channel_id, message_id)) => ChannelId::new(channel_id)
                .message(&self.http, MessageId::new(message_id))
                .await
                .map_err(|_| BotError::ActivityMessageMissing {
                    channel: activity_channel.to_string(),
                })?,
            None => {
                let channel_id = self
                    .find_channel(activity_channel, ChannelType::Text)
                    .await?
                    .ok_or_else(|| BotError::ChannelNotFound {
                        name: activity_channel.to_string(),
                    })?;
                let recent = channel_id
                    .messages(&self.http, GetMessages::new().limit(scan_depth))
                    .await?;
                recent
                    .into_iter()
                    .find(|m| m.author.id == self.bot_id && !m.reactions.is_empty())
                    .ok_or_else(|| BotError::ActivityMessageMissing {
                        channel: activity_channel.to_string(),
                    })?
            }
        };

        let mut reactors = HashSet::new();
        for reaction in &message.reactions {
            let mut after: Option<UserId> = None;
            loop {
                let users = message
                    .channel_id
                    .reaction_users(
                        &self.http,
                        message.id,
                        reaction.reaction_type.clone(),
                        Some(REACTION_PAGE),
                        after,
                    )
                    .await?;
                let page_len = users.len();
                after = users.last().map(|u| u.id);
                reactors.extend(
                    users
                        .into_iter()
                        .filter(|u| !u.bot)
                        .map(|u| MemberId(u.id.get())),
                );
                if page_len < REACTION_PAGE as usize {
                    break;
                }
            }
        }

        debug!(
            "Collected {} reactors on activity message {}",
            reactors.len(),
            message.id
        );
        Ok(reactors)
    }

    /// Resolve a message ID posted in the activity channel
    pub async fn locate_activity_message(
        &self,
        activity_channel: &str,
        message_id: u64,
    ) -> Result<ActivityMessage> {
        let channel_id = self
            .find_channel(activity_channel, ChannelType::Text)
            .await?
            .ok_or_else(|| BotError::ChannelNotFound {
                name: activity_channel.to_string(),
            })?;

        channel_id
            .message(&self.http, MessageId::new(message_id))
            .await
            .map_err(|_| BotError::ActivityMessageMissing {
                channel: activity_channel.to_string(),
            })?;

        Ok(ActivityMessage {
            channel_id: Some(channel_id.get()),
            message_id: Some(message_id),
        })
    }

    /// Create a text channel visible only to `owner`, `guests` and the bot.
    /// The category is created if it does not exist yet.
    pub async fn create_private_room(
        &self,
        category_name: &str,
        room_name: &str,
        owner: MemberId,
        guests: &[MemberId],
    ) -> Result<ChannelId> {
        let category = match self
            .find_channel(category_name, ChannelType::Category)
            .await?
        {
            Some(id) => id,
            None => {
                info!("Creating category '{}'", category_name);
                self.guild_id
                    .create_channel(
                        &self.http,
                        CreateChannel::new(category_name).kind(ChannelType::Category),
                    )
                    .await
                    .map_err(|e| discord_error(e, "create a category"))?
                    .id
            }
        };

        let visible = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        let mut overwrites = vec![PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(self.guild_id.everyone_role()),
        }];
        let participants = std::iter::once(owner)
            .chain(guests.iter().copied())
            .map(|id| UserId::new(id.0))
            .chain(std::iter::once(self.bot_id));
        for user_id in participants {
            overwrites.push(PermissionOverwrite {
                allow: visible,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(user_id),
            });
        }

        let channel = self
            .guild_id
            .create_channel(
                &self.http,
                CreateChannel::new(room_name)
                    .kind(ChannelType::Text)
                    .category(category)
                    .permissions(overwrites),
            )
            .await
            .map_err(|e| discord_error(e, "create a channel"))?;

        info!("Created private room '{}' ({})", room_name, channel.id);
        Ok(channel.id)
    }

    pub async fn say_in(&self, channel_id: ChannelId, text: &str) -> Result<()> {
        channel_id
            .say(&self.http, text)
            .await
            .map_err(|e| discord_error(e, "send messages in that channel"))?;
        Ok(())
    }
}

fn to_member(member: &serenity::Member, roles: &HashMap<RoleId, serenity::Role>) -> Member {
    Member {
        id: MemberId(member.user.id.get()),
        is_bot: member.user.bot,
        roles: member
            .roles
            .iter()
            .filter_map(|id| roles.get(id))
            .map(|r| r.name.clone())
            .collect(),
        display_name: member.display_name().to_string(),
    }
}

#[async_trait]
impl Messenger for GuildGateway {
    async fn send_to_channel(&self, channel_name: &str, text: &str) -> Result<()> {
        let channel_id = self
            .find_channel(channel_name, ChannelType::Text)
            .await?
            .ok_or_else(|| BotError::ChannelNotFound {
                name: channel_name.to_string(),
            })?;
        self.say_in(channel_id, text).await
    }
}

#[async_trait]
impl Directory for GuildGateway {
    async fn members_page(&self, after: Option<MemberId>, limit: u64) -> Result<Vec<Member>> {
        let roles = self.guild_id.roles(&self.http).await?;
        let members = self
            .guild_id
            .members(&self.http, Some(limit), after.map(|id| UserId::new(id.0)))
            .await?;
        Ok(members.iter().map(|m| to_member(m, &roles)).collect())
    }

    async fn member(&self, id: MemberId) -> Result<Member> {
        let roles = self.guild_id.roles(&self.http).await?;
        let member = self
            .guild_id
            .member(&self.http, UserId::new(id.0))
            .await
            .map_err(|_| BotError::MemberNotFound { id: id.to_string() })?;
        Ok(to_member(&member, &roles))
    }

    async fn set_nickname(&self, id: MemberId, nickname: &str) -> Result<()> {
        self.guild_id
            .edit_member(
                &self.http,
                UserId::new(id.0),
                EditMember::new().nickname(nickname),
            )
            .await
            .map_err(|e| discord_error(e, "change this member's nickname"))?;
        Ok(())
    }

    async fn ban_member(&self, id: MemberId, reason: &str) -> Result<()> {
        self.guild_id
            .ban_with_reason(&self.http, UserId::new(id.0), 0, reason)
            .await
            .map_err(|e| discord_error(e, "ban this member"))
    }

    async fn kick_member(&self, id: MemberId, reason: &str) -> Result<()> {
        self.guild_id
            .kick_with_reason(&self.http, UserId::new(id.0), reason)
            .await
            .map_err(|e| discord_error(e, "kick this member"))
    }
}

/// Shared gateway type
pub type SharedGateway = Arc<GuildGateway>;

pub fn create_shared_gateway(http: Arc<Http>, guild_id: GuildId, bot_id: UserId) -> SharedGateway {
    Arc::new(GuildGateway::new(http, guild_id, bot_id))
}

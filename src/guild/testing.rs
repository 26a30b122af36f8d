use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use super::{Directory, Messenger};
use crate::error::{BotError, Result};
use crate::models::{Member, MemberId};

/// In-memory guild recording every platform call
#[derive(Default)]
pub struct FakeGuild {
    pub members: Mutex<Vec<Member>>,
    /// Text channels that exist
    pub channels: Mutex<HashSet<String>>,
    /// Members the bot may not ban, kick or rename
    pub protected: Mutex<HashSet<MemberId>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub bans: Mutex<Vec<(MemberId, String)>>,
    pub kicks: Mutex<Vec<(MemberId, String)>>,
    pub nicknames: Mutex<Vec<(MemberId, String)>>,
}

impl FakeGuild {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_members(members: Vec<Member>) -> Arc<Self> {
        let guild = Self::default();
        *guild.members.lock() = members;
        Arc::new(guild)
    }

    pub fn member(id: u64, roles: &[&str]) -> Member {
        Member {
            id: MemberId(id),
            is_bot: false,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            display_name: format!("member{}", id),
        }
    }

    pub fn bot(id: u64) -> Member {
        Member {
            is_bot: true,
            ..Self::member(id, &[])
        }
    }

    pub fn add_channel(&self, name: &str) {
        self.channels.lock().insert(name.to_string());
    }

    pub fn protect(&self, id: u64) {
        self.protected.lock().insert(MemberId(id));
    }

    pub fn sent_to(&self, channel: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn banned(&self) -> Vec<MemberId> {
        self.bans.lock().iter().map(|(id, _)| *id).collect()
    }

    fn check_allowed(&self, id: MemberId, action: &str) -> Result<()> {
        if self.protected.lock().contains(&id) {
            return Err(BotError::InsufficientPermission {
                action: action.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for FakeGuild {
    async fn send_to_channel(&self, channel_name: &str, text: &str) -> Result<()> {
        if !self.channels.lock().contains(channel_name) {
            return Err(BotError::ChannelNotFound {
                name: channel_name.to_string(),
            });
        }
        self.sent
            .lock()
            .push((channel_name.to_string(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl Directory for FakeGuild {
    async fn members_page(&self, after: Option<MemberId>, limit: u64) -> Result<Vec<Member>> {
        let mut members: Vec<Member> = self
            .members
            .lock()
            .iter()
            .filter(|m| after.map_or(true, |a| m.id > a))
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        members.truncate(limit as usize);
        Ok(members)
    }

    async fn member(&self, id: MemberId) -> Result<Member> {
        self.members
            .lock()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| BotError::MemberNotFound { id: id.to_string() })
    }

    async fn set_nickname(&self, id: MemberId, nickname: &str) -> Result<()> {
        self.check_allowed(id, "change this member's nickname")?;
        self.nicknames.lock().push((id, nickname.to_string()));
        Ok(())
    }

    async fn ban_member(&self, id: MemberId, reason: &str) -> Result<()> {
        self.check_allowed(id, "ban this member")?;
        self.bans.lock().push((id, reason.to_string()));
        Ok(())
    }

    async fn kick_member(&self, id: MemberId, reason: &str) -> Result<()> {
        self.check_allowed(id, "kick this member")?;
        self.kicks.lock().push((id, reason.to_string()));
        Ok(())
    }
}

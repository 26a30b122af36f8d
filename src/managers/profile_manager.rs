use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::guild::Directory;
use crate::models::{Country, Level, Member, MemberId, PlayerProfile, Rank};
use crate::state::{ProfileDirectory, SharedStore, PLAYERS_KEY};

/// Raw profile input as typed by the member
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRequest {
    pub external_id: String,
    pub alias: Option<String>,
    pub rank: String,
    pub level: String,
    pub country: String,
}

impl ProfileRequest {
    /// Parse `<id> [alias…] <rank> <level> <country…>`.
    ///
    /// The first valid rank directly followed by a valid level splits the words,
    /// so both alias and country may span several words. Without such a pair the
    /// words are taken positionally and validation reports the bad field.
    pub fn from_words(words: &[&str]) -> Option<Self> {
        let (external_id, rest) = words.split_first()?;
        if rest.len() < 3 {
            return None;
        }

        let split = (0..rest.len().saturating_sub(2)).find(|&i| {
            rest[i].parse::<Rank>().is_ok() && rest[i + 1].parse::<Level>().is_ok()
        });

        let (alias, rank, level, country) = match split {
            Some(i) => (&rest[..i], rest[i], rest[i + 1], &rest[i + 2..]),
            None if rest.len() == 3 => (&rest[..0], rest[0], rest[1], &rest[2..]),
            None => (&rest[..1], rest[1], rest[2], &rest[3..]),
        };

        Some(Self {
            external_id: external_id.to_string(),
            alias: (!alias.is_empty()).then(|| alias.join(" ")),
            rank: rank.to_string(),
            level: level.to_string(),
            country: country.join(" "),
        })
    }

    /// Check every vocabulary field; the alias falls back to `default_alias`
    pub fn validate(&self, default_alias: &str) -> Result<PlayerProfile> {
        Ok(PlayerProfile {
            external_id: self.external_id.clone(),
            alias: self
                .alias
                .clone()
                .unwrap_or_else(|| default_alias.to_string()),
            rank: self.rank.parse::<Rank>()?,
            level: self.level.parse::<Level>()?,
            country: self.country.parse::<Country>()?,
        })
    }
}

/// Result of saving a profile
#[derive(Debug)]
pub struct ProfileUpdate {
    pub profile: PlayerProfile,
    /// Set when the decorated nickname could not be applied
    pub nickname_error: Option<BotError>,
}

/// Manages the player directory and decorated nicknames
pub struct ProfileManager {
    store: SharedStore,
    directory: Arc<dyn Directory>,
}

impl ProfileManager {
    pub fn new(store: SharedStore, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }

    /// Validate and save a member's profile, replacing any previous one,
    /// then apply the decorated nickname
    pub async fn register_profile(&self, member: &Member, request: &ProfileRequest) -> Result<ProfileUpdate> {
        let profile = request.validate(&member.display_name)?;

        {
            let _guard = self.store.lock(PLAYERS_KEY).await;
            let mut players: ProfileDirectory =
                self.store.load(PLAYERS_KEY, ProfileDirectory::default()).await;
            players.upsert(member.id, profile.clone());
            self.store.save(PLAYERS_KEY, &players).await?;
        }
        info!(
            "Saved profile for {} ({} {} {})",
            member.id,
            profile.rank.key(),
            profile.level.key(),
            profile.country.key()
        );

        let nickname_error = match self.directory.set_nickname(member.id, &profile.nickname()).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Could not set nickname for {}: {}", member.id, e);
                Some(e)
            }
        };

        Ok(ProfileUpdate {
            profile,
            nickname_error,
        })
    }

    pub async fn profile(&self, member: MemberId) -> Option<PlayerProfile> {
        let players: ProfileDirectory = self.store.load(PLAYERS_KEY, ProfileDirectory::default()).await;
        players.get(member).cloned()
    }
}

/// Shared profile manager type
pub type SharedProfileManager = Arc<ProfileManager>;

pub fn create_shared_profile_manager(store: SharedStore, directory: Arc<dyn Directory>) -> SharedProfileManager {
    Arc::new(ProfileManager::new(store, directory))
}

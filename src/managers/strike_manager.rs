use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::guild::{member_pages, Directory};
use crate::models::{Member, MemberId};
use crate::state::{ProfileDirectory, SharedStore, StrikeLedger, PLAYERS_KEY, STRIKES_KEY};

/// What happened after a strike adjustment crossed (or did not cross) the threshold
#[derive(Debug)]
pub enum Escalation {
    None,
    Banned,
    /// The strike was recorded but the ban request was refused
    BanFailed(BotError),
}

#[derive(Debug)]
pub struct StrikeOutcome {
    pub member: MemberId,
    pub delta: i64,
    pub previous: u32,
    pub total: u32,
    pub reason: String,
    pub escalation: Escalation,
}

/// Which members a bulk strike targets
#[derive(Debug, Clone)]
pub enum BulkCriterion {
    /// Did not react to the weekly activity message
    Inactive { active: HashSet<MemberId> },
    /// Never registered a player profile
    Unregistered,
    /// Has no role beyond @everyone
    Roleless,
}

impl BulkCriterion {
    pub fn label(&self) -> &'static str {
        match self {
            BulkCriterion::Inactive { .. } => "inactivity",
            BulkCriterion::Unregistered => "not registering a profile",
            BulkCriterion::Roleless => "having no role",
        }
    }

    fn strike_reason(&self) -> String {
        format!("Strike for {}", self.label())
    }
}

/// Per-member results of a bulk strike run
#[derive(Debug, Default)]
pub struct BulkReport {
    pub scanned: usize,
    pub outcomes: Vec<StrikeOutcome>,
    /// Members whose strike could not be recorded
    pub failures: Vec<(MemberId, BotError)>,
    /// Set when the member scan stopped early
    pub interrupted: Option<BotError>,
}

/// Manages the strike ledger and automatic bans
pub struct StrikeManager {
    store: SharedStore,
    directory: Arc<dyn Directory>,
    threshold: u32,
    page_size: u64,
}

impl StrikeManager {
    pub fn new(store: SharedStore, directory: Arc<dyn Directory>, config: &BotConfig) -> Self {
        Self {
            store,
            directory,
            threshold: config.strike_threshold,
            page_size: config.member_page_size,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Current strikes, 0 for unknown members
    pub async fn get_strikes(&self, member: MemberId) -> u32 {
        let ledger: StrikeLedger = self.store.load(STRIKES_KEY, StrikeLedger::default()).await;
        ledger.get(member)
    }

    /// Add `delta` strikes (negative removes), never going below zero.
    /// Crossing the threshold upwards requests a ban; a refused ban is reported
    /// in the outcome and the strike stays recorded.
    pub async fn adjust_strikes(&self, member: MemberId, delta: i64, reason: &str) -> Result<StrikeOutcome> {
        let ban_reason = format!("{} accumulated strikes.", self.threshold);
        self.apply(member, delta, reason, &ban_reason).await
    }

    async fn apply(
        &self,
        member: MemberId,
        delta: i64,
        reason: &str,
        ban_reason: &str,
    ) -> Result<StrikeOutcome> {
        let (previous, total) = {
            let _guard = self.store.lock(STRIKES_KEY).await;
            let mut ledger: StrikeLedger =
                self.store.load(STRIKES_KEY, StrikeLedger::default()).await;
            let totals = ledger.apply(member, delta);
            self.store.save(STRIKES_KEY, &ledger).await?;
            totals
        };

        info!(
            "Strikes for {}: {} -> {} ({:+}, {})",
            member, previous, total, delta, reason
        );

        let escalation = if previous < self.threshold && total >= self.threshold {
            match self.directory.ban_member(member, ban_reason).await {
                Ok(()) => {
                    info!("Banned {} after reaching {} strikes", member, total);
                    Escalation::Banned
                }
                Err(e) => {
                    warn!("Could not ban {} after reaching {} strikes: {}", member, total, e);
                    Escalation::BanFailed(e)
                }
            }
        } else {
            Escalation::None
        };

        Ok(StrikeOutcome {
            member,
            delta,
            previous,
            total,
            reason: reason.to_string(),
            escalation,
        })
    }

    /// Resolve the member predicate for a criterion. True means "gets a strike".
    async fn predicate(&self, criterion: &BulkCriterion) -> impl Fn(&Member) -> bool {
        let registered: HashSet<MemberId> = match criterion {
            BulkCriterion::Unregistered => {
                let players: ProfileDirectory =
                    self.store.load(PLAYERS_KEY, ProfileDirectory::default()).await;
                players
                    .players
                    .keys()
                    .filter_map(|k| k.parse::<u64>().ok())
                    .map(MemberId)
                    .collect()
            }
            _ => HashSet::new(),
        };
        let criterion = criterion.clone();

        move |member: &Member| {
            if member.is_bot {
                return false;
            }
            match &criterion {
                BulkCriterion::Inactive { active } => !active.contains(&member.id),
                BulkCriterion::Unregistered => !registered.contains(&member.id),
                BulkCriterion::Roleless => member.roles.is_empty(),
            }
        }
    }

    /// Members a bulk strike would target, without changing anything
    pub async fn members_matching(&self, criterion: &BulkCriterion) -> Result<Vec<Member>> {
        let matches = self.predicate(criterion).await;
        let mut found = Vec::new();

        let mut pages = Box::pin(member_pages(self.directory.clone(), self.page_size));
        while let Some(page) = pages.next().await {
            found.extend(page?.into_iter().filter(|m| matches(m)));
        }
        Ok(found)
    }

    /// Give one strike to every member matching `criterion`.
    /// Members are processed independently; failures are collected, not fatal.
    pub async fn strike_all(&self, criterion: BulkCriterion) -> BulkReport {
        let matches = self.predicate(&criterion).await;
        let reason = criterion.strike_reason();
        let ban_reason = format!("{} accumulated strikes for {}", self.threshold, criterion.label());
        let mut report = BulkReport::default();

        let mut pages = Box::pin(member_pages(self.directory.clone(), self.page_size));
        let mut page_number = 0;
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    error!("Member scan for {} stopped: {}", criterion.label(), e);
                    report.interrupted = Some(e);
                    break;
                }
            };
            page_number += 1;
            report.scanned += page.len();

            for member in page.iter().filter(|m| matches(*m)) {
                match self.apply(member.id, 1, &reason, &ban_reason).await {
                    Ok(outcome) => report.outcomes.push(outcome),
                    Err(e) => {
                        error!("Could not strike {}: {}", member.id, e);
                        report.failures.push((member.id, e));
                    }
                }
            }

            info!(
                "Bulk strike for {}: page {} done, {} scanned, {} struck",
                criterion.label(),
                page_number,
                report.scanned,
                report.outcomes.len()
            );
        }

        report
    }
}

/// Shared strike manager type
pub type SharedStrikeManager = Arc<StrikeManager>;

pub fn create_shared_strike_manager(
    store: SharedStore,
    directory: Arc<dyn Directory>,
    config: &BotConfig,
) -> SharedStrikeManager {
    Arc::new(StrikeManager::new(store, directory, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guild::testing::FakeGuild;
    use crate::models::{Country, Level, PlayerProfile, Rank};
    use crate::state::store::memory::{memory_store, MemoryMedium};

    fn manager_with(guild: Arc<FakeGuild>) -> (StrikeManager, SharedStore, Arc<MemoryMedium>) {
        let (store, medium) = memory_store();
        let config = BotConfig {
            member_page_size: 2,
            ..BotConfig::default()
        };
        (
            StrikeManager::new(store.clone(), guild, &config),
            store,
            medium,
        )
    }

    #[tokio::test]
    async fn test_five_strikes_ban_exactly_once() {
        let guild = FakeGuild::with_members(vec![FakeGuild::member(1, &[])]);
        let (manager, _, _) = manager_with(guild.clone());

        let mut totals = Vec::new();
        for _ in 0..5 {
            let outcome = manager.adjust_strikes(MemberId(1), 1, "spam").await.unwrap();
            totals.push(outcome.total);
        }
        assert_eq!(totals, vec![1, 2, 3, 4, 5]);
        assert_eq!(guild.banned(), vec![MemberId(1)]);

        let outcome = manager.adjust_strikes(MemberId(1), 1, "spam").await.unwrap();
        assert_eq!(outcome.total, 6);
        assert!(matches!(outcome.escalation, Escalation::None));
        assert_eq!(guild.banned().len(), 1);
    }

    #[tokio::test]
    async fn test_total_never_negative() {
        let guild = FakeGuild::new();
        let (manager, _, _) = manager_with(guild);

        for delta in [2, -5, 1, -1, -1, 3] {
            let outcome = manager.adjust_strikes(MemberId(3), delta, "x").await.unwrap();
            assert!(outcome.total < 100);
        }
        assert_eq!(manager.get_strikes(MemberId(3)).await, 3);

        let outcome = manager.adjust_strikes(MemberId(3), -10, "pardon").await.unwrap();
        assert_eq!(outcome.total, 0);
        assert_eq!(manager.get_strikes(MemberId(99)).await, 0);
    }

    #[tokio::test]
    async fn test_large_jump_bans_and_decrement_does_not() {
        let guild = FakeGuild::new();
        let (manager, _, _) = manager_with(guild.clone());

        let outcome = manager.adjust_strikes(MemberId(4), 7, "raid").await.unwrap();
        assert!(matches!(outcome.escalation, Escalation::Banned));

        let outcome = manager.adjust_strikes(MemberId(4), -1, "appeal").await.unwrap();
        assert_eq!(outcome.total, 6);
        assert!(matches!(outcome.escalation, Escalation::None));
        assert_eq!(guild.banned().len(), 1);
    }

    #[tokio::test]
    async fn test_huge_amounts_saturate() {
        let guild = FakeGuild::new();
        let (manager, _, _) = manager_with(guild.clone());
        manager.adjust_strikes(MemberId(1), 1, "x").await.unwrap();

        let outcome = manager.adjust_strikes(MemberId(1), i64::MAX, "x").await.unwrap();
        assert_eq!(outcome.total, u32::MAX);
        assert!(matches!(outcome.escalation, Escalation::Banned));

        let outcome = manager.adjust_strikes(MemberId(1), i64::MIN, "x").await.unwrap();
        assert_eq!(outcome.total, 0);
        assert_eq!(guild.banned().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_ban_keeps_strike() {
        let guild = FakeGuild::new();
        guild.protect(8);
        let (manager, _, _) = manager_with(guild.clone());

        let outcome = manager.adjust_strikes(MemberId(8), 5, "x").await.unwrap();
        assert!(matches!(
            outcome.escalation,
            Escalation::BanFailed(BotError::InsufficientPermission { .. })
        ));
        assert_eq!(manager.get_strikes(MemberId(8)).await, 5);
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let guild = FakeGuild::new();
        let (manager, _, medium) = manager_with(guild);
        manager.adjust_strikes(MemberId(2), 1, "x").await.unwrap();

        medium.fail_next_writes(1);
        let err = manager.adjust_strikes(MemberId(2), 1, "x").await.unwrap_err();
        assert!(matches!(err, BotError::StorageWrite { .. }));
        assert_eq!(manager.get_strikes(MemberId(2)).await, 1);
    }

    #[tokio::test]
    async fn test_strike_roleless_skips_bots_and_members_with_roles() {
        let guild = FakeGuild::with_members(vec![
            FakeGuild::member(1, &[]),
            FakeGuild::member(2, &["Player"]),
            FakeGuild::bot(3),
            FakeGuild::member(4, &[]),
            FakeGuild::member(5, &[]),
        ]);
        let (manager, _, _) = manager_with(guild);

        let report = manager.strike_all(BulkCriterion::Roleless).await;
        let struck: Vec<MemberId> = report.outcomes.iter().map(|o| o.member).collect();
        assert_eq!(struck, vec![MemberId(1), MemberId(4), MemberId(5)]);
        assert_eq!(report.scanned, 5);
        assert!(report.failures.is_empty());
        assert!(report.interrupted.is_none());
        assert_eq!(manager.get_strikes(MemberId(2)).await, 0);
    }

    #[tokio::test]
    async fn test_strike_unregistered_uses_profiles() {
        let guild = FakeGuild::with_members(vec![FakeGuild::member(1, &[]), FakeGuild::member(2, &[])]);
        let (manager, store, _) = manager_with(guild);

        let mut players = ProfileDirectory::default();
        players.upsert(
            MemberId(1),
            PlayerProfile {
                external_id: "a".to_string(),
                alias: "a".to_string(),
                rank: Rank::Plata,
                level: Level::One,
                country: Country::Chile,
            },
        );
        store.save(PLAYERS_KEY, &players).await.unwrap();

        let listed = manager.members_matching(&BulkCriterion::Unregistered).await.unwrap();
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![MemberId(2)]);

        let report = manager.strike_all(BulkCriterion::Unregistered).await;
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].member, MemberId(2));
    }

    #[tokio::test]
    async fn test_bulk_ban_failure_does_not_stop_others() {
        let guild = FakeGuild::with_members(vec![
            FakeGuild::member(1, &[]),
            FakeGuild::member(2, &[]),
            FakeGuild::member(3, &[]),
        ]);
        guild.protect(1);
        let (manager, _, _) = manager_with(guild.clone());
        for id in 1..=3 {
            manager.adjust_strikes(MemberId(id), 4, "warned").await.unwrap();
        }

        let active = HashSet::from([MemberId(3)]);
        let report = manager.strike_all(BulkCriterion::Inactive { active }).await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(matches!(report.outcomes[0].escalation, Escalation::BanFailed(_)));
        assert!(matches!(report.outcomes[1].escalation, Escalation::Banned));
        assert_eq!(guild.banned(), vec![MemberId(2)]);
        assert_eq!(manager.get_strikes(MemberId(1)).await, 5);
        assert_eq!(manager.get_strikes(MemberId(3)).await, 4);
    }
}

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{BotConfig, EVENT_DATE_FORMAT};
use crate::error::{BotError, Result};
use crate::models::MemberId;
use crate::state::{ProfileDirectory, Roster, SharedStore, StoredEvent, EVENT_KEY, PLAYERS_KEY, ROSTER_KEY};

/// The active event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Wall-clock time in the canonical zone
    pub scheduled_at: NaiveDateTime,
    pub description: String,
}

impl Event {
    pub fn formatted_date(&self) -> String {
        self.scheduled_at.format(EVENT_DATE_FORMAT).to_string()
    }
}

/// Event time shown for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalTime {
    pub label: String,
    /// HH:MM
    pub time: String,
    /// DD/MM/YYYY
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered,
    MissingProfile,
    NoActiveEvent,
}

/// Reminder thresholds already sent, scoped to one event generation
#[derive(Debug, Default)]
struct ReminderState {
    generation: u64,
    notified: HashSet<i64>,
}

/// Owns the event record, its roster and the reminder dedupe set.
/// Creating or clearing an event starts a new generation, which empties the dedupe set.
pub struct EventManager {
    store: SharedStore,
    canonical: Tz,
    regional: Vec<(String, Tz)>,
    reminders: Mutex<ReminderState>,
}

impl EventManager {
    pub fn new(store: SharedStore, config: &BotConfig) -> Result<Self> {
        Ok(Self {
            store,
            canonical: config.canonical_zone()?,
            regional: config.regional_zones()?,
            reminders: Mutex::new(ReminderState::default()),
        })
    }

    /// Split `DD/MM/YYYY HH:MM | Description` into date and description
    pub fn parse_event_input(input: &str) -> Result<(String, String)> {
        let (date, description) =
            input
                .split_once('|')
                .ok_or_else(|| BotError::InvalidEventFormat {
                    message: "missing '|' between date and description".to_string(),
                })?;
        Ok((date.trim().to_string(), description.trim().to_string()))
    }

    /// Replace the active event. On success the roster and reminder state are reset;
    /// on a parse failure nothing changes.
    pub async fn create_event(&self, date: &str, description: &str) -> Result<Event> {
        let scheduled_at = NaiveDateTime::parse_from_str(date.trim(), EVENT_DATE_FORMAT)
            .map_err(|e| BotError::InvalidEventFormat {
                message: format!("'{}': {}", date.trim(), e),
            })?;
        let description = description.trim();
        if description.is_empty() {
            return Err(BotError::InvalidEventFormat {
                message: "description is empty".to_string(),
            });
        }

        let event = Event {
            scheduled_at,
            description: description.to_string(),
        };

        let _event_guard = self.store.lock(EVENT_KEY).await;
        let _roster_guard = self.store.lock(ROSTER_KEY).await;

        self.store
            .save(
                EVENT_KEY,
                &StoredEvent {
                    scheduled_at: Some(event.formatted_date()),
                    description: Some(event.description.clone()),
                },
            )
            .await?;
        self.reset_reminders();
        // Not atomic with the event write; a crash here leaves the old roster
        self.store.save(ROSTER_KEY, &Roster::default()).await?;

        info!(
            "Event created for {} ({}): {}",
            event.formatted_date(),
            self.canonical.name(),
            event.description
        );
        Ok(event)
    }

    /// The active event, if any. Unparsable stored data counts as no event.
    pub async fn get_event(&self) -> Option<Event> {
        let stored: StoredEvent = self.store.load(EVENT_KEY, StoredEvent::default()).await;
        let (Some(date), Some(description)) = (stored.scheduled_at, stored.description) else {
            return None;
        };

        match NaiveDateTime::parse_from_str(&date, EVENT_DATE_FORMAT) {
            Ok(scheduled_at) => Some(Event {
                scheduled_at,
                description,
            }),
            Err(e) => {
                warn!("Stored event date '{}' is invalid: {}", date, e);
                None
            }
        }
    }

    /// Remove the event and its registrations. Idempotent.
    pub async fn clear_event(&self) -> Result<()> {
        let _event_guard = self.store.lock(EVENT_KEY).await;
        let _roster_guard = self.store.lock(ROSTER_KEY).await;

        self.store.save(EVENT_KEY, &StoredEvent::default()).await?;
        self.reset_reminders();
        self.store.save(ROSTER_KEY, &Roster::default()).await?;

        info!("Event and registrations cleared");
        Ok(())
    }

    /// Empty the roster, keeping the event
    pub async fn clear_registrations(&self) -> Result<()> {
        let _roster_guard = self.store.lock(ROSTER_KEY).await;
        self.store.save(ROSTER_KEY, &Roster::default()).await?;
        info!("Registrations cleared");
        Ok(())
    }

    /// Register a member for the active event. Requires a player profile.
    pub async fn register(&self, member: MemberId) -> Result<RegistrationOutcome> {
        // Held until the roster is saved so a concurrent clear cannot slip in
        let _event_guard = self.store.lock(EVENT_KEY).await;
        if self.get_event().await.is_none() {
            return Ok(RegistrationOutcome::NoActiveEvent);
        }

        let players: ProfileDirectory = self
            .store
            .load(PLAYERS_KEY, ProfileDirectory::default())
            .await;
        if !players.contains(member) {
            return Ok(RegistrationOutcome::MissingProfile);
        }

        let _roster_guard = self.store.lock(ROSTER_KEY).await;
        let mut roster: Roster = self.store.load(ROSTER_KEY, Roster::default()).await;
        if !roster.add(member) {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }
        self.store.save(ROSTER_KEY, &roster).await?;

        debug!("Member {} registered ({} total)", member, roster.len());
        Ok(RegistrationOutcome::Registered)
    }

    pub async fn registrants(&self) -> Vec<MemberId> {
        let roster: Roster = self.store.load(ROSTER_KEY, Roster::default()).await;
        roster.members.into_iter().collect()
    }

    pub async fn is_registered(&self, member: MemberId) -> bool {
        let roster: Roster = self.store.load(ROSTER_KEY, Roster::default()).await;
        roster.contains(member)
    }

    /// The event's instant, interpreting its wall-clock time in the canonical zone
    pub fn scheduled_instant(&self, event: &Event) -> DateTime<Tz> {
        self.canonical
            .from_local_datetime(&event.scheduled_at)
            .earliest()
            .unwrap_or_else(|| self.canonical.from_utc_datetime(&event.scheduled_at))
    }

    /// Event time converted into each configured regional zone
    pub fn regional_times(&self, event: &Event) -> Vec<RegionalTime> {
        let instant = self.scheduled_instant(event).with_timezone(&Utc);
        self.regional
            .iter()
            .map(|(label, zone)| {
                let local = instant.with_timezone(zone);
                RegionalTime {
                    label: label.clone(),
                    time: local.format("%H:%M").to_string(),
                    date: local.format("%d/%m/%Y").to_string(),
                }
            })
            .collect()
    }

    /// Current event generation; bumped on every create and clear
    pub fn reminder_generation(&self) -> u64 {
        self.reminders.lock().generation
    }

    pub fn is_notified(&self, generation: u64, threshold: i64) -> bool {
        let state = self.reminders.lock();
        state.generation == generation && state.notified.contains(&threshold)
    }

    /// Record a sent reminder. Returns false if the event changed since `generation`
    /// was read, in which case nothing is recorded.
    pub fn mark_notified(&self, generation: u64, threshold: i64) -> bool {
        let mut state = self.reminders.lock();
        if state.generation != generation {
            return false;
        }
        state.notified.insert(threshold)
    }

    fn reset_reminders(&self) {
        let mut state = self.reminders.lock();
        state.generation += 1;
        state.notified.clear();
    }
}

/// Shared event manager type
pub type SharedEventManager = Arc<EventManager>;

pub fn create_shared_event_manager(store: SharedStore, config: &BotConfig) -> Result<SharedEventManager> {
    Ok(Arc::new(EventManager::new(store, config)?))
}

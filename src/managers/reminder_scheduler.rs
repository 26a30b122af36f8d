use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::guild::Messenger;
use crate::managers::SharedEventManager;
use crate::messages;

/// A reminder that should be sent on this tick
#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    /// Event generation the reminder belongs to
    pub generation: u64,
    pub threshold: i64,
    pub minutes_remaining: i64,
    pub description: String,
}

/// Whole minutes from `now` until `scheduled`, rounded down
pub fn minutes_until(scheduled: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (scheduled - now).num_seconds().div_euclid(60)
}

/// First threshold, in list order, whose ±1 minute window contains `minutes`
/// and that has not been notified yet
pub fn select_threshold(
    minutes: i64,
    thresholds: &[i64],
    already_notified: impl Fn(i64) -> bool,
) -> Option<i64> {
    if minutes < 0 {
        return None;
    }
    thresholds
        .iter()
        .copied()
        .find(|t| (t - 1..=t + 1).contains(&minutes) && !already_notified(*t))
}

/// Periodic task sending one-time reminders before the active event
pub struct ReminderScheduler {
    events: SharedEventManager,
    messenger: Arc<dyn Messenger>,
    channel: String,
    thresholds: Vec<i64>,
    period: Duration,
}

impl ReminderScheduler {
    pub fn new(events: SharedEventManager, messenger: Arc<dyn Messenger>, config: &BotConfig) -> Self {
        let mut thresholds = config.reminder_thresholds.clone();
        // Larger thresholds win when windows overlap
        thresholds.sort_unstable_by(|a, b| b.cmp(a));

        Self {
            events,
            messenger,
            channel: config.channels.events.clone(),
            thresholds,
            period: Duration::from_secs(config.reminder_tick_secs),
        }
    }

    /// Work out which reminder, if any, is due at `now`. Does not record anything.
    pub async fn due_reminder(&self, now: DateTime<Utc>) -> Option<DueReminder> {
        // Read the generation before the event so a concurrent replace can only
        // cause a repeated reminder, never a suppressed one
        let generation = self.events.reminder_generation();
        let event = self.events.get_event().await?;

        let scheduled = self.events.scheduled_instant(&event).with_timezone(&Utc);
        let minutes_remaining = minutes_until(scheduled, now);
        let threshold = select_threshold(minutes_remaining, &self.thresholds, |t| {
            self.events.is_notified(generation, t)
        })?;

        Some(DueReminder {
            generation,
            threshold,
            minutes_remaining,
            description: event.description,
        })
    }

    /// Run one tick at `now`. Returns the threshold that was notified, if any.
    /// A threshold is only recorded once its reminder was delivered.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Option<i64> {
        let due = self.due_reminder(now).await?;

        let text = messages::reminder(due.minutes_remaining, &due.description);
        if let Err(e) = self.messenger.send_to_channel(&self.channel, &text).await {
            warn!(
                "Could not send {}-minute reminder, retrying next tick: {}",
                due.threshold, e
            );
            return None;
        }

        if !self.events.mark_notified(due.generation, due.threshold) {
            debug!("Event changed while sending the {}-minute reminder", due.threshold);
        }
        info!(
            "Sent {}-minute reminder ({} minutes left) for '{}'",
            due.threshold, due.minutes_remaining, due.description
        );
        Some(due.threshold)
    }

    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Reminder scheduler started (every {}s, thresholds {:?})",
            self.period.as_secs(),
            self.thresholds
        );
        loop {
            interval.tick().await;
            self.tick_at(Utc::now()).await;
        }
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guild::testing::FakeGuild;
    use crate::managers::create_shared_event_manager;
    use crate::state::store::memory::memory_store;
    use chrono::Duration as ChronoDuration;

    const EVENTS: &str = "🎉┇eventos";

    async fn setup() -> (ReminderScheduler, SharedEventManager, Arc<FakeGuild>) {
        let (store, _) = memory_store();
        let config = BotConfig::default();
        let events = create_shared_event_manager(store, &config).unwrap();
        let guild = FakeGuild::new();
        guild.add_channel(EVENTS);
        let scheduler = ReminderScheduler::new(events.clone(), guild.clone(), &config);
        (scheduler, events, guild)
    }

    async fn event_start(events: &SharedEventManager) -> DateTime<Utc> {
        let event = events.get_event().await.unwrap();
        events.scheduled_instant(&event).with_timezone(&Utc)
    }

    #[test]
    fn test_minutes_until_rounds_down() {
        let now = Utc::now();
        assert_eq!(minutes_until(now + ChronoDuration::seconds(90), now), 1);
        assert_eq!(minutes_until(now + ChronoDuration::seconds(60), now), 1);
        assert_eq!(minutes_until(now - ChronoDuration::seconds(1), now), -1);
    }

    #[test]
    fn test_select_threshold_windows() {
        let none = |_| false;
        let thresholds = [60, 30, 10];
        assert_eq!(select_threshold(61, &thresholds, none), Some(60));
        assert_eq!(select_threshold(59, &thresholds, none), Some(60));
        assert_eq!(select_threshold(58, &thresholds, none), None);
        assert_eq!(select_threshold(9, &thresholds, none), Some(10));
        assert_eq!(select_threshold(-1, &thresholds, none), None);
        assert_eq!(select_threshold(60, &thresholds, |t| t == 60), None);
    }

    #[test]
    fn test_select_threshold_prefers_first_listed() {
        assert_eq!(select_threshold(11, &[12, 10], |_| false), Some(12));
        assert_eq!(select_threshold(11, &[12, 10], |t| t == 12), Some(10));
    }

    #[tokio::test]
    async fn test_minute_by_minute_fires_each_threshold_once() {
        let (scheduler, events, guild) = setup().await;
        events.create_event("25/12/2025 20:00", "Finals").await.unwrap();
        let start = event_start(&events).await;

        let mut fired = Vec::new();
        for elapsed in 0..=70 {
            let now = start - ChronoDuration::minutes(61) + ChronoDuration::minutes(elapsed);
            if let Some(threshold) = scheduler.tick_at(now).await {
                fired.push((minutes_until(start, now), threshold));
            }
        }

        assert_eq!(fired, vec![(61, 60), (31, 30), (11, 10)]);
        let sent = guild.sent_to(EVENTS);
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains("61"));
        assert!(sent[0].contains("Finals"));
    }

    #[tokio::test]
    async fn test_no_reminder_without_event_or_after_start() {
        let (scheduler, events, guild) = setup().await;
        assert_eq!(scheduler.tick_at(Utc::now()).await, None);

        events.create_event("25/12/2025 20:00", "Finals").await.unwrap();
        let start = event_start(&events).await;
        assert_eq!(scheduler.tick_at(start + ChronoDuration::minutes(5)).await, None);
        assert!(guild.sent_to(EVENTS).is_empty());
    }

    #[tokio::test]
    async fn test_new_event_rearms_thresholds() {
        let (scheduler, events, _guild) = setup().await;
        events.create_event("25/12/2025 20:00", "Finals").await.unwrap();
        let start = event_start(&events).await;
        let now = start - ChronoDuration::minutes(30);
        assert_eq!(scheduler.tick_at(now).await, Some(30));
        assert_eq!(scheduler.tick_at(now).await, None);

        events.create_event("25/12/2025 20:00", "Finals again").await.unwrap();
        assert_eq!(scheduler.tick_at(now).await, Some(30));
    }

    #[tokio::test]
    async fn test_missing_channel_retries_next_tick() {
        let (store, _) = memory_store();
        let config = BotConfig::default();
        let events = create_shared_event_manager(store, &config).unwrap();
        let guild = FakeGuild::new();
        let scheduler = ReminderScheduler::new(events.clone(), guild.clone(), &config);

        events.create_event("25/12/2025 20:00", "Finals").await.unwrap();
        let start = event_start(&events).await;
        let now = start - ChronoDuration::minutes(10);

        assert_eq!(scheduler.tick_at(now).await, None);
        guild.add_channel(EVENTS);
        assert_eq!(
            scheduler.tick_at(now + ChronoDuration::minutes(1)).await,
            Some(10)
        );
    }
}

pub mod event_manager;
pub mod profile_manager;
pub mod reminder_scheduler;
pub mod strike_manager;

pub use event_manager::{
    create_shared_event_manager, Event, EventManager, RegionalTime, RegistrationOutcome,
    SharedEventManager,
};
pub use profile_manager::{create_shared_profile_manager, ProfileRequest, SharedProfileManager};
pub use reminder_scheduler::ReminderScheduler;
pub use strike_manager::{
    create_shared_strike_manager, BulkCriterion, BulkReport, Escalation, SharedStrikeManager,
    StrikeOutcome,
};

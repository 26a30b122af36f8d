pub mod records;
pub mod store;

pub use records::{
    ActivityMessage, ProfileDirectory, Roster, StoredEvent, StrikeLedger, ACTIVITY_KEY, EVENT_KEY,
    PLAYERS_KEY, ROSTER_KEY, STRIKES_KEY,
};
pub use store::{create_shared_store, FileMedium, SharedStore};

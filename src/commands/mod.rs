pub mod event;
pub mod general;
pub mod moderation;
pub mod profile;

pub use event::{active_event, clear_registrations, end_event, event, register, registrants};
pub use general::{diagnostics, help, room, shutdown};
pub use moderation::{
    ban, inactive, kick, roleless, set_activity, strike, strike_inactive, strike_roleless,
    strike_unregistered, unregistered,
};
pub use profile::{info, rank};

use crate::messages;
use crate::{Context, Error};

/// Discord rejects messages above 2000 characters
pub const MESSAGE_LIMIT: usize = 1900;

/// Reply with `text`, split over several messages when it is too long
pub async fn say_chunked(ctx: Context<'_>, text: &str) -> Result<(), Error> {
    for chunk in messages::chunk(text, MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

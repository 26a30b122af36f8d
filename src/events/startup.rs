use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::BotError;
use crate::guild::Messenger;
use crate::managers::ReminderScheduler;
use crate::messages;
use crate::Data;

/// Post the "bot is active" notice. A missing channel is only a warning.
pub async fn announce_startup(messenger: &dyn Messenger, channel: &str) -> bool {
    match messenger
        .send_to_channel(channel, &messages::startup_notice())
        .await
    {
        Ok(()) => {
            info!("Startup notice posted in '{}'", channel);
            true
        }
        Err(BotError::ChannelNotFound { name }) => {
            warn!("Announcements channel '{}' not found, skipping startup notice", name);
            false
        }
        Err(e) => {
            warn!("Could not post startup notice: {}", e);
            false
        }
    }
}

/// Runs once after login: startup notice, then the reminder scheduler
pub async fn handle_startup(data: &Data) -> JoinHandle<()> {
    announce_startup(data.gateway.as_ref(), &data.config.channels.announcements).await;

    let scheduler = Arc::new(ReminderScheduler::new(
        data.events.clone(),
        data.gateway.clone(),
        &data.config,
    ));
    scheduler.spawn()
}

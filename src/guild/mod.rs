//! Narrow interfaces to the chat platform.
//!
//! Managers only talk to the guild through `Directory` and `Messenger`, so the
//! event, profile and strike logic runs the same against Discord and against
//! the in-memory fakes used in tests.

pub mod gateway;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Member, MemberId};

pub use gateway::{create_shared_gateway, SharedGateway};

/// Posting to channels by name
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Fails with `ChannelNotFound` if no text channel has that name
    async fn send_to_channel(&self, channel_name: &str, text: &str) -> Result<()>;
}

/// Member lookup and moderation actions
#[async_trait]
pub trait Directory: Send + Sync {
    /// Up to `limit` members with IDs greater than `after`, in ID order
    async fn members_page(&self, after: Option<MemberId>, limit: u64) -> Result<Vec<Member>>;

    async fn member(&self, id: MemberId) -> Result<Member>;

    async fn set_nickname(&self, id: MemberId, nickname: &str) -> Result<()>;

    async fn ban_member(&self, id: MemberId, reason: &str) -> Result<()>;

    async fn kick_member(&self, id: MemberId, reason: &str) -> Result<()>;
}

/// Walk the whole member directory one page at a time.
/// The stream ends after a short page or the first error.
pub fn member_pages(
    directory: Arc<dyn Directory>,
    page_size: u64,
) -> impl Stream<Item = Result<Vec<Member>>> + Send {
    stream::unfold(Some(None), move |cursor: Option<Option<MemberId>>| {
        let directory = directory.clone();
        async move {
            let after = cursor?;
            match directory.members_page(after, page_size).await {
                Ok(page) => {
                    let next = if (page.len() as u64) < page_size {
                        None
                    } else {
                        page.iter().map(|m| m.id).max().map(Some)
                    };
                    Some((Ok(page), next))
                }
                Err(e) => Some((Err(e), None)),
            }
        }
    })
}

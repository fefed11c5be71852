pub mod discord;

use async_trait::async_trait;

use crate::types::Listing;

pub use discord::DiscordNotifier;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Message rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Announces a single new listing to wherever the user is listening.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, listing: &Listing) -> Result<(), DeliveryError>;
}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{DeliveryError, Notifier};
use crate::types::Listing;

pub(crate) const API_BASE: &str = "https://discord.com/api/v10";

/// Posts listings to a Discord channel through the bot REST API.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    bot_token: String,
    channel_id: u64,
    api_base: String,
}

impl DiscordNotifier {
    pub fn new(client: Client, bot_token: impl Into<String>, channel_id: u64) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            channel_id,
            api_base: API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Checks the token by asking Discord who we are. Returns the bot user name.
    pub async fn verify(&self) -> Result<String, DeliveryError> {
        let url = format!("{}/users/@me", self.api_base);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let user: BotUser = response.json().await?;
        log::info!("Logged in to Discord as {}", user.username);
        Ok(user.username)
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DeliveryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, listing: &Listing) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        let payload = CreateMessage::for_listing(listing);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&payload)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        Self::check_status(response).await?;
        log::debug!("Announced {} listing {}", listing.source, listing.id);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateMessage {
    pub embeds: Vec<Embed>,
}

impl CreateMessage {
    pub fn for_listing(listing: &Listing) -> Self {
        let mut description = format!(
            "Title: {}\nPrice: {}\nLink: {}",
            listing.title,
            listing.price_label(),
            listing.url
        );
        if let Some(details) = &listing.details {
            description.push_str(&format!("\nDetails: {}", details));
        }

        let url = listing
            .url
            .starts_with("http")
            .then(|| listing.url.clone());

        Self {
            embeds: vec![Embed {
                title: format!("New {} listing", listing.source),
                description,
                url,
                thumbnail: listing
                    .image_url
                    .as_ref()
                    .filter(|u| u.starts_with("http"))
                    .map(|u| EmbedImage { url: u.clone() }),
                timestamp: listing.posted_at.map(|t| t.to_rfc3339()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::CannedServer;
    use crate::types::Source;
    use chrono::{TimeZone, Utc};

    fn notifier(server: &CannedServer) -> DiscordNotifier {
        DiscordNotifier::new(Client::new(), "secret", 42).with_api_base(server.url.clone())
    }

    #[test]
    fn test_message_carries_title_price_and_link() {
        let mut listing =
            Listing::new(Source::Nettikone, "1", "Car X", "https://www.nettikone.com/x/1");
        listing.price = Some(5000);
        listing.image_url = Some("https://img.nettix.fi/1.jpg".to_string());
        listing.posted_at = Some(Utc.with_ymd_and_hms(2024, 5, 2, 5, 15, 0).unwrap());

        let message = CreateMessage::for_listing(&listing);
        assert_eq!(message.embeds.len(), 1);

        let embed = &message.embeds[0];
        assert_eq!(embed.title, "New Nettikone listing");
        assert!(embed.description.contains("Title: Car X"));
        assert!(embed.description.contains("Price: 5000 €"));
        assert!(embed.description.contains("Link: https://www.nettikone.com/x/1"));
        assert_eq!(
            embed.thumbnail,
            Some(EmbedImage {
                url: "https://img.nettix.fi/1.jpg".to_string()
            })
        );

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["embeds"][0]["timestamp"], "2024-05-02T05:15:00+00:00");
    }

    #[test]
    fn test_message_omits_missing_optional_fields() {
        let listing =
            Listing::new(Source::Tori, "2", "Sisu Polar", "https://autot.tori.fi/ajoneuvo/2");

        let json = serde_json::to_value(CreateMessage::for_listing(&listing)).unwrap();
        let embed = &json["embeds"][0];

        assert!(embed.get("thumbnail").is_none());
        assert!(embed.get("timestamp").is_none());
        assert!(embed["description"].as_str().unwrap().contains("Price: N/A"));
    }

    #[tokio::test]
    async fn test_notify_posts_embed_to_channel() {
        let server = CannedServer::start(200, r#"{"id": "1"}"#).await;
        let mut listing =
            Listing::new(Source::Nettikone, "1", "Car X", "https://www.nettikone.com/x/1");
        listing.price = Some(5000);

        notifier(&server)
            .notify(&listing)
            .await
            .expect("Delivery should succeed");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.starts_with("POST /channels/42/messages "));
        assert!(request.to_lowercase().contains("authorization: bot secret"));
        assert!(request.contains(r#""embeds""#));
        assert!(request.contains("Price: 5000 €"));
    }

    #[tokio::test]
    async fn test_notify_non_success_is_rejected() {
        let server = CannedServer::start(403, r#"{"message": "Missing Access"}"#).await;
        let listing = Listing::new(Source::Tori, "2", "Sisu Polar", "https://autot.tori.fi/2");

        match notifier(&server).notify(&listing).await {
            Err(DeliveryError::Rejected { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("Missing Access"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_returns_bot_name() {
        let server = CannedServer::start(200, r#"{"id": "9", "username": "lotbot"}"#).await;

        let name = notifier(&server).verify().await.expect("Verify should succeed");
        assert_eq!(name, "lotbot");
        assert!(server.requests()[0].starts_with("GET /users/@me "));
    }

    #[tokio::test]
    async fn test_verify_with_bad_token_is_rejected() {
        let server = CannedServer::start(401, r#"{"message": "401: Unauthorized"}"#).await;

        let result = notifier(&server).verify().await;
        assert!(matches!(
            result,
            Err(DeliveryError::Rejected { status: 401, .. })
        ));
    }
}

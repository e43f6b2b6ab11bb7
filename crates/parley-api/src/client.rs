//! HTTP client for the conversation and message endpoints

use reqwest::{Response, StatusCode, Url};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    types::{Conversation, Cursor, Message, MessagePage},
};

/// Chat backend REST client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct CreateConversationRequest<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct UpdateMessageRequest<'a> {
    content: &'a str,
}

impl ApiClient {
    /// Create a client rooted at `base_url` (e.g. `https://chat.example.com/api`)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client that reuses an existing reqwest client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid API base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "API base URL '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("API base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Create a new conversation for `user_id`
    pub async fn create_conversation(&self, user_id: &str) -> Result<Conversation> {
        // Trailing empty segment keeps the `/conversations/` form the backend routes on.
        let url = self.endpoint(&["conversations", ""])?;
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&CreateConversationRequest { user_id })
            .send()
            .await?;
        let response = check_status(response, || "conversation endpoint".to_string()).await?;
        Ok(response.json().await?)
    }

    /// Fetch a conversation by id. A 404 is reported as [`Error::NotFound`].
    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let response =
            check_status(response, || format!("conversation {}", conversation_id)).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of history, newest-first
    pub async fn fetch_messages(&self, conversation_id: &str, cursor: Cursor) -> Result<MessagePage> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        tracing::debug!("GET {} page={} size={}", url, cursor.page(), cursor.size());
        let response = self
            .client
            .get(url)
            .query(&[("page", cursor.page()), ("size", cursor.size())])
            .send()
            .await?;
        let response =
            check_status(response, || format!("conversation {}", conversation_id)).await?;
        Ok(response.json().await?)
    }

    /// Replace a message's content; returns the server's canonical message
    pub async fn update_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message> {
        let url = self.endpoint(&["conversations", conversation_id, "messages", message_id])?;
        tracing::debug!("PUT {}", url);
        let response = self
            .client
            .put(url)
            .json(&UpdateMessageRequest { content })
            .send()
            .await?;
        let response = check_status(response, || format!("message {}", message_id)).await?;
        Ok(response.json().await?)
    }

    /// Delete a message
    pub async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        let url = self.endpoint(&["conversations", conversation_id, "messages", message_id])?;
        tracing::debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        check_status(response, || format!("message {}", message_id)).await?;
        Ok(())
    }
}

/// Map non-success statuses to errors. `what` names the resource for 404s.
async fn check_status(response: Response, what: impl FnOnce() -> String) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what()));
    }
    let text = response.text().await.unwrap_or_default();
    Err(Error::api(status.as_u16(), text))
}

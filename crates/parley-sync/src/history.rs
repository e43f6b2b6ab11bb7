//! Request/response side of the sync core: history pages and confirmed edits

use async_trait::async_trait;
use parley_api::{ApiClient, Cursor, Message, MessagePage, Result};

/// Stateless page fetcher for a conversation's history.
///
/// Implementations must not retry internally; the controller decides.
#[async_trait]
pub trait PaginationFetcher: Send + Sync {
    /// Fetch the page at `cursor`, newest-first, with the server's total count
    async fn fetch_page(&self, conversation_id: &str, cursor: Cursor) -> Result<MessagePage>;
}

/// Server-confirmed message mutations
#[async_trait]
pub trait MessageEditor: Send + Sync {
    /// Update a message and return the server's canonical version
    async fn update_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message>;

    /// Delete a message
    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()>;
}

/// Everything the controller needs from the request/response side
pub trait HistoryBackend: PaginationFetcher + MessageEditor {}

impl<T: PaginationFetcher + MessageEditor + ?Sized> HistoryBackend for T {}

#[async_trait]
impl PaginationFetcher for ApiClient {
    async fn fetch_page(&self, conversation_id: &str, cursor: Cursor) -> Result<MessagePage> {
        self.fetch_messages(conversation_id, cursor).await
    }
}

#[async_trait]
impl MessageEditor for ApiClient {
    async fn update_message(
        &self,
        conversation_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<Message> {
        ApiClient::update_message(self, conversation_id, message_id, content).await
    }

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        ApiClient::delete_message(self, conversation_id, message_id).await
    }
}

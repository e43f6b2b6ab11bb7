//! Session bootstrap: resolve the user and the conversation to open

use async_trait::async_trait;
use parley_api::{ApiClient, Conversation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Conversation lookup and creation
#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn create_conversation(&self, user_id: &str) -> parley_api::Result<Conversation>;

    async fn get_conversation(&self, conversation_id: &str) -> parley_api::Result<Conversation>;
}

#[async_trait]
impl ConversationApi for ApiClient {
    async fn create_conversation(&self, user_id: &str) -> parley_api::Result<Conversation> {
        ApiClient::create_conversation(self, user_id).await
    }

    async fn get_conversation(&self, conversation_id: &str) -> parley_api::Result<Conversation> {
        ApiClient::get_conversation(self, conversation_id).await
    }
}

/// Identity remembered between runs. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// A resolved identity, ready to hand to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub conversation_id: String,
}

impl Session {
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            user_id: Some(self.user_id.clone()),
            conversation_id: Some(self.conversation_id.clone()),
        }
    }
}

/// Resolve the session for this run.
///
/// Reuses the persisted user id or mints a new one. A persisted conversation
/// that the server no longer knows is replaced by a fresh one, once; any
/// other lookup failure is returned.
pub async fn bootstrap_session(
    api: &dyn ConversationApi,
    persisted: &PersistedSession,
) -> Result<Session> {
    let user_id = persisted
        .user_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Some(id) = &persisted.conversation_id {
        match api.get_conversation(id).await {
            Ok(conversation) => {
                tracing::info!("Resuming conversation {}", conversation.id);
                return Ok(Session {
                    user_id,
                    conversation_id: conversation.id,
                });
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Conversation {} no longer exists, starting a new one", id);
            }
            Err(e) => return Err(e.into()),
        }
    }

    start_new_conversation(api, &user_id).await
}

/// Create a fresh conversation for `user_id`
pub async fn start_new_conversation(api: &dyn ConversationApi, user_id: &str) -> Result<Session> {
    let conversation = api.create_conversation(user_id).await?;
    tracing::info!("Created conversation {}", conversation.id);
    Ok(Session {
        user_id: user_id.to_string(),
        conversation_id: conversation.id,
    })
}

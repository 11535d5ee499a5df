use crate::database::{DynStore, Table, fetch_all};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::OutboxService;
use crate::utils::generate_id;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const MAX_MESSAGE_LEN: usize = 2000;

/// One conversation per customer code, between that customer and the admin.
#[derive(Clone)]
pub struct ChatService {
    store: DynStore,
    outbox: Arc<OutboxService>,
}

impl ChatService {
    pub fn new(store: DynStore, outbox: Arc<OutboxService>) -> Self {
        Self { store, outbox }
    }

    pub async fn send(&self, user_id: &str, sender: Sender, text: &str) -> AppResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ValidationError("Message is empty".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::ValidationError(format!(
                "Message is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }

        let message = ChatMessage {
            id: generate_id("M"),
            user_id: user_id.to_string(),
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
            is_read: false,
        };
        self.outbox
            .save_or_enqueue(self.store.as_ref(), Table::ChatMessages, &message, &message.id)
            .await?;
        Ok(message)
    }

    /// Oldest first.
    pub async fn conversation(&self, user_id: &str) -> AppResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> =
            fetch_all(self.store.as_ref(), Table::ChatMessages).await?;
        messages.retain(|m| m.user_id == user_id);
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }

    /// Mark everything the other side sent as read. Returns how many changed.
    pub async fn mark_read(&self, user_id: &str, reader: Sender) -> AppResult<usize> {
        let unread: Vec<ChatMessage> = self
            .conversation(user_id)
            .await?
            .into_iter()
            .filter(|m| m.sender != reader && !m.is_read)
            .collect();

        for message in &unread {
            self.store
                .update(Table::ChatMessages, json!({ "isRead": true }), &message.id)
                .await?;
        }
        Ok(unread.len())
    }

    /// Customer messages the admin has not read yet, across all conversations.
    pub async fn admin_unread_count(&self) -> AppResult<usize> {
        let messages: Vec<ChatMessage> = fetch_all(self.store.as_ref(), Table::ChatMessages).await?;
        Ok(messages
            .iter()
            .filter(|m| m.sender == Sender::Customer && !m.is_read)
            .count())
    }
}

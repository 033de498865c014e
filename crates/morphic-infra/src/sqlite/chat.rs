//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `morphic-core` with raw sqlx queries,
//! private row structs and split reader/writer pool usage.
//!
//! SQLite has no row-level security, so every user-scoped write opens a
//! transaction on the single writer connection and first checks that the
//! target chat belongs to the acting user (see [`require_owner`]). Because
//! the writer pool has exactly one connection, nothing can change ownership
//! between the check and the write.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use morphic_core::chat::repository::ChatRepository;
use morphic_types::chat::{Chat, Visibility};
use morphic_types::error::RepositoryError;
use morphic_types::message::{MessageMetadata, MessagePart, MessageRole, ToolState, UiMessage};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRow {
    id: String,
    created_at: String,
    title: String,
    user_id: String,
    visibility: String,
}

impl ChatRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            user_id: row.try_get("user_id")?,
            visibility: row.try_get("visibility")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let visibility: Visibility = self
            .visibility
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        Ok(Chat {
            id: self.id,
            title: self.title,
            user_id: self.user_id,
            visibility,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

/// One row of `parts`, column for column.
#[derive(Default)]
struct PartRow {
    kind: String,
    text_text: Option<String>,
    reasoning_text: Option<String>,
    file_media_type: Option<String>,
    file_filename: Option<String>,
    file_url: Option<String>,
    source_url_source_id: Option<String>,
    source_url_url: Option<String>,
    source_url_title: Option<String>,
    tool_tool_call_id: Option<String>,
    tool_name: Option<String>,
    tool_state: Option<String>,
    tool_input: Option<String>,
    tool_output: Option<String>,
    tool_error_text: Option<String>,
    data_prefix: Option<String>,
    data_id: Option<String>,
    data_content: Option<String>,
}

impl PartRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            kind: row.try_get("type")?,
            text_text: row.try_get("text_text")?,
            reasoning_text: row.try_get("reasoning_text")?,
            file_media_type: row.try_get("file_media_type")?,
            file_filename: row.try_get("file_filename")?,
            file_url: row.try_get("file_url")?,
            source_url_source_id: row.try_get("source_url_source_id")?,
            source_url_url: row.try_get("source_url_url")?,
            source_url_title: row.try_get("source_url_title")?,
            tool_tool_call_id: row.try_get("tool_tool_call_id")?,
            tool_name: row.try_get("tool_name")?,
            tool_state: row.try_get("tool_state")?,
            tool_input: row.try_get("tool_input")?,
            tool_output: row.try_get("tool_output")?,
            tool_error_text: row.try_get("tool_error_text")?,
            data_prefix: row.try_get("data_prefix")?,
            data_id: row.try_get("data_id")?,
            data_content: row.try_get("data_content")?,
        })
    }

    fn from_part(part: &MessagePart) -> Self {
        let kind = part.type_name();
        match part {
            MessagePart::Text { text } => Self {
                kind,
                text_text: Some(text.clone()),
                ..Default::default()
            },
            MessagePart::Reasoning { text } => Self {
                kind,
                reasoning_text: Some(text.clone()),
                ..Default::default()
            },
            MessagePart::File {
                media_type,
                filename,
                url,
            } => Self {
                kind,
                file_media_type: Some(media_type.clone()),
                file_filename: Some(filename.clone()),
                file_url: Some(url.clone()),
                ..Default::default()
            },
            MessagePart::SourceUrl {
                source_id,
                url,
                title,
            } => Self {
                kind,
                source_url_source_id: Some(source_id.clone()),
                source_url_url: Some(url.clone()),
                source_url_title: title.clone(),
                ..Default::default()
            },
            MessagePart::StepStart => Self {
                kind,
                ..Default::default()
            },
            MessagePart::Tool {
                tool_name,
                tool_call_id,
                state,
                input,
                output,
                error_text,
            } => Self {
                kind,
                tool_tool_call_id: Some(tool_call_id.clone()),
                tool_name: Some(tool_name.clone()),
                tool_state: Some(state.to_string()),
                tool_input: input.as_ref().map(|v| v.to_string()),
                tool_output: output.as_ref().map(|v| v.to_string()),
                tool_error_text: error_text.clone(),
                ..Default::default()
            },
            MessagePart::Data { name, id, data } => Self {
                kind,
                data_prefix: Some(name.clone()),
                data_id: id.clone(),
                data_content: Some(data.to_string()),
                ..Default::default()
            },
        }
    }

    fn into_part(self) -> Result<MessagePart, RepositoryError> {
        let missing = |field: &str| RepositoryError::Query(format!("part '{}' has no {field}", self.kind));
        let part = match self.kind.as_str() {
            "text" => MessagePart::Text {
                text: self.text_text.clone().ok_or_else(|| missing("text_text"))?,
            },
            "reasoning" => MessagePart::Reasoning {
                text: self.reasoning_text.clone().unwrap_or_default(),
            },
            "file" => MessagePart::File {
                media_type: self.file_media_type.clone().ok_or_else(|| missing("file_media_type"))?,
                filename: self.file_filename.clone().ok_or_else(|| missing("file_filename"))?,
                url: self.file_url.clone().ok_or_else(|| missing("file_url"))?,
            },
            "source-url" => MessagePart::SourceUrl {
                source_id: self
                    .source_url_source_id
                    .clone()
                    .ok_or_else(|| missing("source_url_source_id"))?,
                url: self.source_url_url.clone().ok_or_else(|| missing("source_url_url"))?,
                title: self.source_url_title.clone(),
            },
            "step-start" => MessagePart::StepStart,
            kind if kind.starts_with("tool-") => {
                let state: ToolState = self
                    .tool_state
                    .as_deref()
                    .ok_or_else(|| missing("tool_state"))?
                    .parse()
                    .map_err(RepositoryError::Query)?;
                MessagePart::Tool {
                    tool_name: self
                        .tool_name
                        .clone()
                        .unwrap_or_else(|| kind["tool-".len()..].to_string()),
                    tool_call_id: self.tool_tool_call_id.clone().ok_or_else(|| missing("tool_tool_call_id"))?,
                    state,
                    input: parse_json_opt(self.tool_input.as_deref())?,
                    output: parse_json_opt(self.tool_output.as_deref())?,
                    error_text: self.tool_error_text.clone(),
                }
            }
            kind if kind.starts_with("data-") => MessagePart::Data {
                name: self
                    .data_prefix
                    .clone()
                    .unwrap_or_else(|| kind["data-".len()..].to_string()),
                id: self.data_id.clone(),
                data: parse_json_opt(self.data_content.as_deref())?.unwrap_or(serde_json::Value::Null),
            },
            other => return Err(RepositoryError::Query(format!("unknown part type: '{other}'"))),
        };
        Ok(part)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that string order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_json_opt(s: Option<&str>) -> Result<Option<serde_json::Value>, RepositoryError> {
    s.map(serde_json::from_str)
        .transpose()
        .map_err(|e| RepositoryError::Query(format!("invalid json column: {e}")))
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

/// Ownership predicate for a chat-scoped write.
///
/// `NotFound` when the chat does not exist. With a user, a chat owned by
/// someone else is an `RlsViolation`; without one (guest or system writes)
/// only existence is checked.
async fn require_owner(
    conn: &mut SqliteConnection,
    chat_id: &str,
    user_id: Option<&str>,
) -> Result<(), RepositoryError> {
    let owner: Option<(String,)> = sqlx::query_as("SELECT user_id FROM chats WHERE id = ?")
        .bind(chat_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;

    match (owner, user_id) {
        (None, _) => Err(RepositoryError::NotFound),
        (Some((owner,)), Some(user_id)) if owner != user_id => {
            tracing::warn!(chat_id, user_id, "write rejected by ownership check");
            Err(RepositoryError::RlsViolation(format!("chat {chat_id} is not owned by {user_id}")))
        }
        _ => Ok(()),
    }
}

async fn insert_chat(conn: &mut SqliteConnection, chat: &Chat) -> Result<Chat, RepositoryError> {
    let existing = sqlx::query("SELECT * FROM chats WHERE id = ?")
        .bind(&chat.id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;

    if let Some(row) = existing {
        let existing = ChatRow::from_row(&row).map_err(query_err)?.into_chat()?;
        if existing.user_id != chat.user_id {
            return Err(RepositoryError::RlsViolation(format!("chat {} is not owned by {}", chat.id, chat.user_id)));
        }
        return Ok(existing);
    }

    sqlx::query("INSERT INTO chats (id, created_at, title, user_id, visibility) VALUES (?, ?, ?, ?, ?)")
        .bind(&chat.id)
        .bind(format_datetime(&chat.created_at))
        .bind(&chat.title)
        .bind(&chat.user_id)
        .bind(chat.visibility.to_string())
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;

    Ok(chat.clone())
}

/// Insert or replace a message and all of its parts. The caller has already
/// applied the ownership predicate.
async fn write_message(conn: &mut SqliteConnection, chat_id: &str, message: &UiMessage) -> Result<(), RepositoryError> {
    let other_chat: Option<(String,)> = sqlx::query_as("SELECT chat_id FROM messages WHERE id = ? AND chat_id != ?")
        .bind(&message.id)
        .bind(chat_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;
    if other_chat.is_some() {
        return Err(RepositoryError::Conflict(format!("message {} belongs to another chat", message.id)));
    }

    let now = format_datetime(&Utc::now());
    let metadata = message
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    sqlx::query(
        r#"INSERT INTO messages (id, chat_id, role, created_at, seq, metadata)
           VALUES (?, ?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE chat_id = ?), ?)
           ON CONFLICT(id) DO UPDATE SET
               role = excluded.role,
               metadata = COALESCE(excluded.metadata, messages.metadata),
               updated_at = ?"#,
    )
    .bind(&message.id)
    .bind(chat_id)
    .bind(message.role.to_string())
    .bind(&now)
    .bind(chat_id)
    .bind(metadata)
    .bind(&now)
    .execute(&mut *conn)
    .await
    .map_err(query_err)?;

    sqlx::query("DELETE FROM parts WHERE message_id = ?")
        .bind(&message.id)
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;

    for (order, part) in message.parts.iter().enumerate() {
        let row = PartRow::from_part(part);
        sqlx::query(
            r#"INSERT INTO parts (
                   id, message_id, "order", type,
                   text_text, reasoning_text,
                   file_media_type, file_filename, file_url,
                   source_url_source_id, source_url_url, source_url_title,
                   tool_tool_call_id, tool_name, tool_state, tool_input, tool_output, tool_error_text,
                   data_prefix, data_id, data_content,
                   created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(&message.id)
        .bind(order as i64)
        .bind(&row.kind)
        .bind(&row.text_text)
        .bind(&row.reasoning_text)
        .bind(&row.file_media_type)
        .bind(&row.file_filename)
        .bind(&row.file_url)
        .bind(&row.source_url_source_id)
        .bind(&row.source_url_url)
        .bind(&row.source_url_title)
        .bind(&row.tool_tool_call_id)
        .bind(&row.tool_name)
        .bind(&row.tool_state)
        .bind(&row.tool_input)
        .bind(&row.tool_output)
        .bind(&row.tool_error_text)
        .bind(&row.data_prefix)
        .bind(&row.data_id)
        .bind(&row.data_content)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;
    }

    Ok(())
}

fn merge_metadata(current: &mut MessageMetadata, patch: &MessageMetadata) {
    if patch.trace_id.is_some() {
        current.trace_id = patch.trace_id.clone();
    }
    if patch.search_mode.is_some() {
        current.search_mode = patch.search_mode;
    }
    if patch.model_id.is_some() {
        current.model_id = patch.model_id.clone();
    }
    if patch.feedback_score.is_some() {
        current.feedback_score = patch.feedback_score;
    }
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let created = insert_chat(&mut tx, chat).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(created)
    }

    async fn create_chat_with_first_message(&self, chat: &Chat, message: &UiMessage) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        insert_chat(&mut tx, chat).await?;
        write_message(&mut tx, &chat.id, message).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(ChatRow::from_row(&row).map_err(query_err)?.into_chat()?)),
            None => Ok(None),
        }
    }

    async fn list_chats(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<Chat>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM chats WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?")
            .bind(user_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            chats.push(ChatRow::from_row(row).map_err(query_err)?.into_chat()?);
        }
        Ok(chats)
    }

    async fn update_chat_title(&self, chat_id: &str, user_id: &str, title: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        require_owner(&mut tx, chat_id, Some(user_id)).await?;
        sqlx::query("UPDATE chats SET title = ? WHERE id = ?")
            .bind(title)
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn update_chat_visibility(
        &self,
        chat_id: &str,
        user_id: &str,
        visibility: Visibility,
    ) -> Result<Chat, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        require_owner(&mut tx, chat_id, Some(user_id)).await?;
        let row = sqlx::query("UPDATE chats SET visibility = ? WHERE id = ? RETURNING *")
            .bind(visibility.to_string())
            .bind(chat_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(query_err)?;
        let chat = ChatRow::from_row(&row).map_err(query_err)?.into_chat()?;
        tx.commit().await.map_err(query_err)?;
        Ok(chat)
    }

    async fn delete_chat(&self, chat_id: &str, user_id: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        require_owner(&mut tx, chat_id, Some(user_id)).await?;
        sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn clear_chats(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM chats WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(query_err)?;
        sqlx::query("DELETE FROM chats WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        tx.commit().await.map_err(query_err)?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn load_messages(&self, chat_id: &str) -> Result<Vec<UiMessage>, RepositoryError> {
        let message_rows = sqlx::query("SELECT id, role, metadata FROM messages WHERE chat_id = ? ORDER BY seq ASC")
            .bind(chat_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let part_rows = sqlx::query(
            r#"SELECT p.* FROM parts p
               JOIN messages m ON m.id = p.message_id
               WHERE m.chat_id = ?
               ORDER BY p.message_id, p."order" ASC"#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut parts_by_message: HashMap<String, Vec<MessagePart>> = HashMap::new();
        for row in &part_rows {
            let message_id: String = row.try_get("message_id").map_err(query_err)?;
            let part = PartRow::from_row(row).map_err(query_err)?.into_part()?;
            parts_by_message.entry(message_id).or_default().push(part);
        }

        let mut messages = Vec::with_capacity(message_rows.len());
        for row in &message_rows {
            let id: String = row.try_get("id").map_err(query_err)?;
            let role: String = row.try_get("role").map_err(query_err)?;
            let metadata: Option<String> = row.try_get("metadata").map_err(query_err)?;
            let role: MessageRole = role.parse().map_err(|e: String| RepositoryError::Query(e))?;
            let metadata = metadata
                .as_deref()
                .map(serde_json::from_str::<MessageMetadata>)
                .transpose()
                .map_err(|e| RepositoryError::Query(format!("invalid metadata: {e}")))?;
            let parts = parts_by_message.remove(&id).unwrap_or_default();
            messages.push(UiMessage {
                id,
                role,
                parts,
                metadata,
            });
        }
        Ok(messages)
    }

    async fn upsert_message(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        message: &UiMessage,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        require_owner(&mut tx, chat_id, user_id).await?;
        write_message(&mut tx, chat_id, message).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn delete_messages_from(
        &self,
        chat_id: &str,
        user_id: &str,
        message_id: &str,
        inclusive: bool,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        require_owner(&mut tx, chat_id, Some(user_id)).await?;

        let target: Option<(i64,)> = sqlx::query_as("SELECT seq FROM messages WHERE id = ? AND chat_id = ?")
            .bind(message_id)
            .bind(chat_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_err)?;
        let Some((seq,)) = target else {
            return Ok(0);
        };

        let sql = if inclusive {
            "DELETE FROM messages WHERE chat_id = ? AND seq >= ?"
        } else {
            "DELETE FROM messages WHERE chat_id = ? AND seq > ?"
        };
        let result = sqlx::query(sql)
            .bind(chat_id)
            .bind(seq)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        tx.commit().await.map_err(query_err)?;
        Ok(result.rows_affected())
    }

    async fn update_message_metadata(
        &self,
        message_id: &str,
        patch: &MessageMetadata,
    ) -> Result<Option<String>, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let row: Option<(String, Option<String>)> =
            sqlx::query_as("SELECT chat_id, metadata FROM messages WHERE id = ?")
                .bind(message_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_err)?;
        let Some((chat_id, current)) = row else {
            return Ok(None);
        };

        let mut metadata = current
            .as_deref()
            .map(serde_json::from_str::<MessageMetadata>)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid metadata: {e}")))?
            .unwrap_or_default();
        merge_metadata(&mut metadata, patch);
        let encoded = serde_json::to_string(&metadata).map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("UPDATE messages SET metadata = ?, updated_at = ? WHERE id = ?")
            .bind(encoded)
            .bind(format_datetime(&Utc::now()))
            .bind(message_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        tx.commit().await.map_err(query_err)?;
        Ok(Some(chat_id))
    }
}

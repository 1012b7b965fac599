// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use switchboard_core::{Direction, Message, MessageRef, MessageStatus, SwitchboardError};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_at, timestamp_at, to_sql_timestamp};

const MESSAGE_COLUMNS: &str = "id, provider_message_id, conversation_id, user_id, username, \
     content, direction, sent_at, status, changed_at, error_text";

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        provider_message_id: row.get(1)?,
        conversation_id: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        content: row.get(5)?,
        direction: enum_at(row, 6)?,
        sent_at: timestamp_at(row, 7)?,
        status: enum_at(row, 8)?,
        changed_at: timestamp_at(row, 9)?,
        error_text: row.get(10)?,
    })
}

/// Insert on an open connection or transaction.
pub(crate) fn insert_on(conn: &Connection, msg: &Message) -> rusqlite::Result<()> {
    conn.execute(
        &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            msg.id,
            msg.provider_message_id,
            msg.conversation_id,
            msg.user_id,
            msg.username,
            msg.content,
            msg.direction.to_string(),
            to_sql_timestamp(&msg.sent_at),
            msg.status.to_string(),
            to_sql_timestamp(&msg.changed_at),
            msg.error_text,
        ],
    )?;
    Ok(())
}

/// All messages of a conversation in append order.
pub(crate) fn select_for_conversation(
    conn: &Connection,
    conversation_id: &str,
) -> rusqlite::Result<Vec<Message>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
         ORDER BY sent_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(params![conversation_id], message_from_row)?;
    rows.collect()
}

/// Append a message to an existing conversation.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), SwitchboardError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| insert_on(conn, &msg))
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in append order.
pub async fn get_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| select_for_conversation(conn, &conversation_id))
        .await
        .map_err(map_tr_err)
}

/// Look up a message by provider id or local id.
///
/// Provider ids are only unique per provider; the most recently stored match wins.
pub async fn find_message(
    db: &Database,
    target: &MessageRef,
) -> Result<Option<Message>, SwitchboardError> {
    let (column, value) = match target {
        MessageRef::Provider(id) => ("provider_message_id", id.clone()),
        MessageRef::Local(id) => ("id", id.clone()),
    };
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE {column} = ?1
                     ORDER BY rowid DESC LIMIT 1"
                ),
                params![value],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite a message's status. An existing error text is kept when `error_text` is `None`.
pub async fn update_status(
    db: &Database,
    message_id: &str,
    status: MessageStatus,
    changed_at: DateTime<Utc>,
    error_text: Option<&str>,
) -> Result<(), SwitchboardError> {
    let message_id = message_id.to_string();
    let error_text = error_text.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages
                 SET status = ?2, changed_at = ?3, error_text = COALESCE(?4, error_text)
                 WHERE id = ?1",
                params![
                    message_id,
                    status.to_string(),
                    to_sql_timestamp(&changed_at),
                    error_text,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record the id the provider assigned to an outbound message.
pub async fn set_provider_message_id(
    db: &Database,
    message_id: &str,
    provider_message_id: &str,
) -> Result<(), SwitchboardError> {
    let message_id = message_id.to_string();
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET provider_message_id = ?2 WHERE id = ?1",
                params![message_id, provider_message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Outbound messages of a conversation sent at or before `until`, oldest first.
pub async fn outbound_until(
    db: &Database,
    conversation_id: &str,
    until: DateTime<Utc>,
) -> Result<Vec<Message>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 AND direction = ?2 AND sent_at <= ?3
                 ORDER BY sent_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(
                params![
                    conversation_id,
                    Direction::Outbound.to_string(),
                    to_sql_timestamp(&until),
                ],
                message_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

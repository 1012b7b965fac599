// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations.

use rusqlite::{Connection, OptionalExtension, Row, params};
use switchboard_core::{Conversation, ConversationThread, Message, SwitchboardError};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_at, timestamp_at, to_sql_timestamp};
use crate::queries::messages;

const CONVERSATION_COLUMNS: &str = "id, sender_id, sender_username, company_id, \
     assigned_user_id, assigned_team_id, source, is_assigned, is_active, created_at";

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get(2)?,
        company_id: row.get(3)?,
        assigned_user_id: row.get(4)?,
        assigned_team_id: row.get(5)?,
        source: enum_at(row, 6)?,
        is_assigned: row.get(7)?,
        is_active: row.get(8)?,
        created_at: timestamp_at(row, 9)?,
    })
}

fn select_one(conn: &Connection, id: &str) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
        params![id],
        conversation_from_row,
    )
    .optional()
}

/// Attach messages to each conversation.
fn load_threads(
    conn: &Connection,
    conversations: Vec<Conversation>,
) -> rusqlite::Result<Vec<ConversationThread>> {
    conversations
        .into_iter()
        .map(|conversation| {
            let messages = messages::select_for_conversation(conn, &conversation.id)?;
            Ok(ConversationThread {
                conversation,
                messages,
            })
        })
        .collect()
}

fn select_many(
    conn: &Connection,
    filter: &str,
    args: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE {filter}
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(args, conversation_from_row)?;
    rows.collect()
}

/// The active conversation for a sender within a company.
pub async fn find_active(
    db: &Database,
    sender_id: &str,
    company_id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let sender_id = sender_id.to_string();
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE sender_id = ?1 AND company_id = ?2 AND is_active = 1"
                ),
                params![sender_id, company_id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_one(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// A conversation together with its messages.
pub async fn get_thread(
    db: &Database,
    id: &str,
) -> Result<Option<ConversationThread>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let Some(conversation) = select_one(conn, &id)? else {
                return Ok(None);
            };
            let messages = messages::select_for_conversation(conn, &conversation.id)?;
            Ok(Some(ConversationThread {
                conversation,
                messages,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a conversation and its first message in one transaction.
///
/// Fails with a constraint error if the sender already has an active
/// conversation with the company.
pub async fn insert_with_first_message(
    db: &Database,
    conversation: &Conversation,
    first_message: &Message,
) -> Result<(), SwitchboardError> {
    let conversation = conversation.clone();
    let first_message = first_message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO conversations ({CONVERSATION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    conversation.id,
                    conversation.sender_id,
                    conversation.sender_username,
                    conversation.company_id,
                    conversation.assigned_user_id,
                    conversation.assigned_team_id,
                    conversation.source.to_string(),
                    conversation.is_assigned,
                    conversation.is_active,
                    to_sql_timestamp(&conversation.created_at),
                ],
            )?;
            messages::insert_on(&tx, &first_message)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Set the assignee. Returns the updated conversation, or `None` if it does not exist.
pub async fn assign(
    db: &Database,
    id: &str,
    user_id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET assigned_user_id = ?2, is_assigned = 1 WHERE id = ?1",
                params![id, user_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            select_one(conn, &id)
        })
        .await
        .map_err(map_tr_err)
}

/// Active conversations of a company assigned to `user_id`, with messages.
pub async fn list_assigned(
    db: &Database,
    company_id: &str,
    user_id: &str,
) -> Result<Vec<ConversationThread>, SwitchboardError> {
    let company_id = company_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let conversations = select_many(
                conn,
                "company_id = ?1 AND assigned_user_id = ?2 AND is_assigned = 1 AND is_active = 1",
                params![company_id, user_id],
            )?;
            load_threads(conn, conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Active, unassigned conversations of a company, with messages.
pub async fn list_unassigned(
    db: &Database,
    company_id: &str,
) -> Result<Vec<ConversationThread>, SwitchboardError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let conversations = select_many(
                conn,
                "company_id = ?1 AND is_assigned = 0 AND is_active = 1",
                params![company_id],
            )?;
            load_threads(conn, conversations)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::Source;
    use tempfile::tempdir;

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap())
            .await
            .unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn insert_then_find_active() {
        let (_dir, db) = open().await;
        let conv = Conversation::open("psid-1", "Lee", "acme", Source::Facebook, Some("t1".into()));
        let first = Message::inbound(&conv, "m_1", "hi");
        insert_with_first_message(&db, &conv, &first).await.unwrap();

        let found = find_active(&db, "psid-1", "acme").await.unwrap().unwrap();
        assert_eq!(found.id, conv.id);
        assert_eq!(found.assigned_team_id.as_deref(), Some("t1"));
        assert_eq!(found.source, Source::Facebook);
        assert!(found.is_active && !found.is_assigned);
        assert!(find_active(&db, "psid-1", "globex").await.unwrap().is_none());

        let thread = get_thread(&db, &conv.id).await.unwrap().unwrap();
        assert_eq!(thread.messages.len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_active_conversation_is_rejected_atomically() {
        let (_dir, db) = open().await;
        let conv = Conversation::open("psid-1", "Lee", "acme", Source::Facebook, None);
        insert_with_first_message(&db, &conv, &Message::inbound(&conv, "m_1", "hi"))
            .await
            .unwrap();

        let dup = Conversation::open("psid-1", "Lee", "acme", Source::Facebook, None);
        let dup_msg = Message::inbound(&dup, "m_2", "again");
        assert!(insert_with_first_message(&db, &dup, &dup_msg).await.is_err());

        // The orphan message must not have been written.
        assert!(messages::get_messages(&db, &dup.id).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn assign_moves_between_queues() {
        let (_dir, db) = open().await;
        let conv = Conversation::open("wa-1", "Kim", "acme", Source::WhatsApp, None);
        insert_with_first_message(&db, &conv, &Message::inbound(&conv, "wamid.1", "hi"))
            .await
            .unwrap();
        assert_eq!(list_unassigned(&db, "acme").await.unwrap().len(), 1);

        let updated = assign(&db, &conv.id, "agent-1").await.unwrap().unwrap();
        assert!(updated.is_assigned);
        assert_eq!(updated.assigned_user_id.as_deref(), Some("agent-1"));

        assert!(list_unassigned(&db, "acme").await.unwrap().is_empty());
        let mine = list_assigned(&db, "acme", "agent-1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].messages[0].content, "hi");
        assert!(list_assigned(&db, "acme", "agent-2").await.unwrap().is_empty());

        assert!(assign(&db, "missing", "agent-1").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}

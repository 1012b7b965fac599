// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive operations: move a live conversation into the anonymized archive.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use switchboard_core::{ArchiveOutcome, ArchivedConversation, ArchivedMessage, SwitchboardError};

use crate::database::{Database, map_tr_err};
use crate::models::{enum_at, timestamp_at, to_sql_timestamp};

const ARCHIVED_CONVERSATION_COLUMNS: &str = "id, original_conversation_id, sender_pseudonym, \
     sender_label, company_id, assigned_user_id, assigned_team_id, source, created_at, archived_at";

const ARCHIVED_MESSAGE_COLUMNS: &str = "id, archived_conversation_id, provider_message_id, \
     user_id, username, content, direction, sent_at, status, changed_at";

fn archived_message_from_row(row: &Row<'_>) -> rusqlite::Result<ArchivedMessage> {
    Ok(ArchivedMessage {
        id: row.get(0)?,
        archived_conversation_id: row.get(1)?,
        provider_message_id: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        content: row.get(5)?,
        direction: enum_at(row, 6)?,
        sent_at: timestamp_at(row, 7)?,
        status: enum_at(row, 8)?,
        changed_at: timestamp_at(row, 9)?,
    })
}

fn archived_conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ArchivedConversation> {
    Ok(ArchivedConversation {
        id: row.get(0)?,
        original_conversation_id: row.get(1)?,
        sender_pseudonym: row.get(2)?,
        sender_label: row.get(3)?,
        company_id: row.get(4)?,
        assigned_user_id: row.get(5)?,
        assigned_team_id: row.get(6)?,
        source: enum_at(row, 7)?,
        created_at: timestamp_at(row, 8)?,
        archived_at: timestamp_at(row, 9)?,
        messages: Vec::new(),
    })
}

fn with_messages(
    conn: &Connection,
    mut archive: ArchivedConversation,
) -> rusqlite::Result<ArchivedConversation> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {ARCHIVED_MESSAGE_COLUMNS} FROM archived_messages
         WHERE archived_conversation_id = ?1 ORDER BY sent_at ASC, rowid ASC"
    ))?;
    archive.messages = stmt
        .query_map(params![archive.id], archived_message_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(archive)
}

/// Insert the archive and delete the live conversation it was built from, in one transaction.
///
/// The live message ids are compared with the archived ones inside the
/// transaction: a message appended after the archive was built makes the
/// outcome [`ArchiveOutcome::Stale`] and leaves everything as it was. Live
/// messages are removed by the cascade on `conversations`.
pub async fn archive_conversation(
    db: &Database,
    archive: &ArchivedConversation,
) -> Result<ArchiveOutcome, SwitchboardError> {
    let archive = archive.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let live: Option<BTreeSet<String>> = {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
                    params![archive.original_conversation_id],
                    |row| row.get(0),
                )?;
                if exists {
                    let mut stmt =
                        tx.prepare_cached("SELECT id FROM messages WHERE conversation_id = ?1")?;
                    let ids = stmt
                        .query_map(params![archive.original_conversation_id], |row| row.get(0))?
                        .collect::<rusqlite::Result<_>>()?;
                    Some(ids)
                } else {
                    None
                }
            };
            let Some(live) = live else {
                return Ok(ArchiveOutcome::Gone);
            };
            let archived: BTreeSet<String> = archive.messages.iter().map(|m| m.id.clone()).collect();
            if live != archived || archived.len() != archive.messages.len() {
                return Ok(ArchiveOutcome::Stale);
            }

            tx.execute(
                "DELETE FROM conversations WHERE id = ?1",
                params![archive.original_conversation_id],
            )?;

            tx.execute(
                &format!(
                    "INSERT INTO archived_conversations ({ARCHIVED_CONVERSATION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    archive.id,
                    archive.original_conversation_id,
                    archive.sender_pseudonym,
                    archive.sender_label,
                    archive.company_id,
                    archive.assigned_user_id,
                    archive.assigned_team_id,
                    archive.source.to_string(),
                    to_sql_timestamp(&archive.created_at),
                    to_sql_timestamp(&archive.archived_at),
                ],
            )?;

            {
                let mut insert = tx.prepare(&format!(
                    "INSERT INTO archived_messages ({ARCHIVED_MESSAGE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ))?;
                for msg in &archive.messages {
                    insert.execute(params![
                        msg.id,
                        archive.id,
                        msg.provider_message_id,
                        msg.user_id,
                        msg.username,
                        msg.content,
                        msg.direction.to_string(),
                        to_sql_timestamp(&msg.sent_at),
                        msg.status.to_string(),
                        to_sql_timestamp(&msg.changed_at),
                    ])?;
                }
            }

            tx.commit()?;
            Ok(ArchiveOutcome::Archived)
        })
        .await
        .map_err(map_tr_err)
}

/// The archive built from a given live conversation id.
pub async fn get_by_original_id(
    db: &Database,
    original_conversation_id: &str,
) -> Result<Option<ArchivedConversation>, SwitchboardError> {
    let original_conversation_id = original_conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let header = conn
                .query_row(
                    &format!(
                        "SELECT {ARCHIVED_CONVERSATION_COLUMNS} FROM archived_conversations
                         WHERE original_conversation_id = ?1"
                    ),
                    params![original_conversation_id],
                    archived_conversation_from_row,
                )
                .optional()?;
            header.map(|archive| with_messages(conn, archive)).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Every archive of one pseudonymized customer within a company, oldest first.
pub async fn list_for_pseudonym(
    db: &Database,
    company_id: &str,
    sender_pseudonym: &str,
) -> Result<Vec<ArchivedConversation>, SwitchboardError> {
    let company_id = company_id.to_string();
    let sender_pseudonym = sender_pseudonym.to_string();
    db.connection()
        .call(move |conn| {
            let headers: Vec<ArchivedConversation> = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARCHIVED_CONVERSATION_COLUMNS} FROM archived_conversations
                     WHERE company_id = ?1 AND sender_pseudonym = ?2
                     ORDER BY archived_at ASC, rowid ASC"
                ))?;
                stmt.query_map(
                    params![company_id, sender_pseudonym],
                    archived_conversation_from_row,
                )?
                .collect::<rusqlite::Result<_>>()?
            };
            headers
                .into_iter()
                .map(|archive| with_messages(conn, archive))
                .collect()
        })
        .await
        .map_err(map_tr_err)
}

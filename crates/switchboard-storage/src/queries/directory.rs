// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel bindings, users, and hub access tokens.
//!
//! Tokens are never stored in clear: only their SHA-256 digest is kept.

use std::collections::BTreeSet;

use rusqlite::{OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use switchboard_core::{ChannelSettings, Principal, Role, Source, SwitchboardError, UserRecord};

use crate::database::{Database, map_tr_err};
use crate::models::enum_at;

const CHANNEL_COLUMNS: &str =
    "company_id, source, company_key, routing_id, access_token, default_team_id";

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelSettings> {
    Ok(ChannelSettings {
        company_id: row.get(0)?,
        source: enum_at(row, 1)?,
        company_key: row.get(2)?,
        routing_id: row.get(3)?,
        access_token: row.get(4)?,
        default_team_id: row.get(5)?,
    })
}

/// Hex SHA-256 digest used to look tokens up.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Insert or replace a company's binding for one provider.
pub async fn upsert_channel_settings(
    db: &Database,
    settings: &ChannelSettings,
) -> Result<(), SwitchboardError> {
    let settings = settings.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO channel_settings ({CHANNEL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (company_id, source) DO UPDATE SET
                         company_key = excluded.company_key,
                         routing_id = excluded.routing_id,
                         access_token = excluded.access_token,
                         default_team_id = excluded.default_team_id"
                ),
                params![
                    settings.company_id,
                    settings.source.to_string(),
                    settings.company_key,
                    settings.routing_id,
                    settings.access_token,
                    settings.default_team_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_channel_by_company_key(
    db: &Database,
    source: Source,
    company_key: &str,
) -> Result<Option<ChannelSettings>, SwitchboardError> {
    let company_key = company_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {CHANNEL_COLUMNS} FROM channel_settings
                     WHERE source = ?1 AND company_key = ?2"
                ),
                params![source.to_string(), company_key],
                channel_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_channel_for_company(
    db: &Database,
    company_id: &str,
    source: Source,
) -> Result<Option<ChannelSettings>, SwitchboardError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {CHANNEL_COLUMNS} FROM channel_settings
                     WHERE company_id = ?1 AND source = ?2"
                ),
                params![company_id, source.to_string()],
                channel_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a user, its team memberships, and optionally its hub token.
pub async fn upsert_user(
    db: &Database,
    user: &UserRecord,
    token: Option<&str>,
) -> Result<(), SwitchboardError> {
    let user = user.clone();
    let digest = token.map(token_digest);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (user_id, company_id, display_name, role, token_sha256)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (user_id) DO UPDATE SET
                     company_id = excluded.company_id,
                     display_name = excluded.display_name,
                     role = excluded.role,
                     token_sha256 = COALESCE(excluded.token_sha256, users.token_sha256)",
                params![
                    user.user_id,
                    user.company_id,
                    user.display_name,
                    user.role.to_string(),
                    digest,
                ],
            )?;
            tx.execute(
                "DELETE FROM team_members WHERE user_id = ?1",
                params![user.user_id],
            )?;
            for team_id in &user.team_ids {
                tx.execute(
                    "INSERT INTO team_members (team_id, user_id) VALUES (?1, ?2)",
                    params![team_id, user.user_id],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<UserRecord>, SwitchboardError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    "SELECT user_id, company_id, display_name, role FROM users WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(UserRecord {
                            user_id: row.get(0)?,
                            company_id: row.get(1)?,
                            team_ids: BTreeSet::new(),
                            display_name: row.get(2)?,
                            role: enum_at::<Role>(row, 3)?,
                        })
                    },
                )
                .optional()?;
            let Some(mut user) = user else {
                return Ok(None);
            };
            let mut stmt =
                conn.prepare("SELECT team_id FROM team_members WHERE user_id = ?1")?;
            user.team_ids = stmt
                .query_map(params![user.user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            Ok(Some(user))
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve a presented hub token to the principal it was issued to.
pub async fn find_principal_by_token(
    db: &Database,
    token: &str,
) -> Result<Option<Principal>, SwitchboardError> {
    let digest = token_digest(token);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, role FROM users WHERE token_sha256 = ?1",
                params![digest],
                |row| {
                    Ok(Principal {
                        user_id: row.get(0)?,
                        roles: vec![enum_at::<Role>(row, 1)?],
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("d.db").to_str().unwrap())
            .await
            .unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn channel_lookup_by_key_and_company() {
        let (_dir, db) = open().await;
        let settings = ChannelSettings {
            company_id: "acme".into(),
            source: Source::WhatsApp,
            company_key: "BID1".into(),
            routing_id: "PNID1".into(),
            access_token: "EAAtoken".into(),
            default_team_id: Some("support".into()),
        };
        upsert_channel_settings(&db, &settings).await.unwrap();

        let by_key = find_channel_by_company_key(&db, Source::WhatsApp, "BID1")
            .await
            .unwrap();
        assert_eq!(by_key, Some(settings.clone()));
        assert!(
            find_channel_by_company_key(&db, Source::Facebook, "BID1")
                .await
                .unwrap()
                .is_none()
        );

        let mut rotated = settings.clone();
        rotated.access_token = "EAAnew".into();
        upsert_channel_settings(&db, &rotated).await.unwrap();
        let by_company = find_channel_for_company(&db, "acme", Source::WhatsApp)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_company.access_token, "EAAnew");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn user_round_trip_with_teams_and_token() {
        let (_dir, db) = open().await;
        let user = UserRecord {
            user_id: "u1".into(),
            company_id: Some("acme".into()),
            team_ids: ["billing".to_string(), "support".to_string()]
                .into_iter()
                .collect(),
            display_name: "Ada".into(),
            role: Role::Agent,
        };
        upsert_user(&db, &user, Some("secret-token")).await.unwrap();

        assert_eq!(find_user(&db, "u1").await.unwrap(), Some(user.clone()));
        let principal = find_principal_by_token(&db, "secret-token")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.user_id, "u1");
        assert_eq!(principal.roles, vec![Role::Agent]);
        assert!(find_principal_by_token(&db, "wrong").await.unwrap().is_none());

        // Re-upserting without a token keeps the existing one and replaces teams.
        let mut moved = user.clone();
        moved.team_ids = ["billing".to_string()].into_iter().collect();
        upsert_user(&db, &moved, None).await.unwrap();
        assert_eq!(find_user(&db, "u1").await.unwrap().unwrap().team_ids.len(), 1);
        assert!(
            find_principal_by_token(&db, "secret-token")
                .await
                .unwrap()
                .is_some()
        );
        db.close().await.unwrap();
    }

    #[test]
    fn token_digest_is_hex_sha256() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

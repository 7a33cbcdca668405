use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopwarden_model::{
    Session, SessionId, SessionKind, SessionStatus, SessionSummary,
};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{PatrolError, Result};
use crate::store::SessionStore;

/// Durable session store backed by Postgres. Results and summary are kept
/// as JSONB so the excluded history surface can read them without joining.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Create a store and verify database health.
    pub async fn new(pool: PgPool) -> Result<Self> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                PatrolError::Store(format!("session store failed Postgres health check: {e}"))
            })?;
        info!("session store connected to Postgres");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: &Session) -> Result<()> {
        let results = serde_json::to_value(&session.results)?;
        let summary = serde_json::to_value(session.summary)?;

        sqlx::query(
            r#"
            INSERT INTO patrol_sessions
                (id, kind, target, shop_name, status, cursor, results, summary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id.0)
        .bind(kind_str(session.kind))
        .bind(&session.target)
        .bind(&session.shop_name)
        .bind(status_str(session.status))
        .bind(i64::from(session.cursor))
        .bind(results)
        .bind(summary)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PatrolError::Store(format!("session insert failed: {e}")))?;

        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<()> {
        let results = serde_json::to_value(&session.results)?;
        let summary = serde_json::to_value(session.summary)?;

        let outcome = sqlx::query(
            r#"
            UPDATE patrol_sessions
            SET status = $2,
                cursor = $3,
                results = $4,
                summary = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(session.id.0)
        .bind(status_str(session.status))
        .bind(i64::from(session.cursor))
        .bind(results)
        .bind(summary)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PatrolError::Store(format!("session update failed: {e}")))?;

        if outcome.rows_affected() == 0 {
            return Err(PatrolError::Store(format!(
                "unknown session {}",
                session.id
            )));
        }
        Ok(())
    }

    async fn fetch(&self, id: SessionId) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, target, shop_name, status, cursor, results, summary, created_at, updated_at
            FROM patrol_sessions
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PatrolError::Store(format!("session fetch failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let kind: String = row.get("kind");
        let status: String = row.get("status");
        let cursor: i64 = row.get("cursor");
        let results: serde_json::Value = row.get("results");
        let summary: serde_json::Value = row.get("summary");
        let created_at: DateTime<Utc> = row.get("created_at");
        let updated_at: DateTime<Utc> = row.get("updated_at");
        let session_id: Uuid = row.get("id");

        Ok(Some(Session {
            id: SessionId(session_id),
            kind: parse_kind(&kind)?,
            target: row.get("target"),
            shop_name: row.get("shop_name"),
            status: parse_status(&status)?,
            cursor: u32::try_from(cursor)
                .map_err(|_| PatrolError::Store(format!("negative cursor {cursor}")))?,
            results: serde_json::from_value(results)?,
            summary: serde_json::from_value::<SessionSummary>(summary)?,
            created_at,
            updated_at,
        }))
    }
}

fn kind_str(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::RemoteCatalog => "remote_catalog",
        SessionKind::BulkFile => "bulk_file",
    }
}

fn parse_kind(raw: &str) -> Result<SessionKind> {
    match raw {
        "remote_catalog" => Ok(SessionKind::RemoteCatalog),
        "bulk_file" => Ok(SessionKind::BulkFile),
        other => Err(PatrolError::Store(format!("unknown session kind {other}"))),
    }
}

fn status_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Processing => "processing",
        SessionStatus::Paused => "paused",
        SessionStatus::Aborted => "aborted",
        SessionStatus::Completed => "completed",
    }
}

fn parse_status(raw: &str) -> Result<SessionStatus> {
    match raw {
        "processing" => Ok(SessionStatus::Processing),
        "paused" => Ok(SessionStatus::Paused),
        "aborted" => Ok(SessionStatus::Aborted),
        "completed" => Ok(SessionStatus::Completed),
        other => Err(PatrolError::Store(format!("unknown session status {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_status_strings_roundtrip() {
        for kind in [SessionKind::RemoteCatalog, SessionKind::BulkFile] {
            assert_eq!(parse_kind(kind_str(kind)).expect("kind"), kind);
        }
        for status in [
            SessionStatus::Processing,
            SessionStatus::Paused,
            SessionStatus::Aborted,
            SessionStatus::Completed,
        ] {
            assert_eq!(parse_status(status_str(status)).expect("status"), status);
        }
        assert!(parse_kind("csv").is_err());
        assert!(parse_status("done").is_err());
    }
}

//! Postgres-backed session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_booking_conversation::{
    DraftChange, DraftField, Session, SessionStore, SessionUpdate, Step, StoreError,
};
use clinic_booking_core::{ClinicId, SessionId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use super::store_error;

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    sender: String,
    clinic_id: String,
    step: String,
    name: Option<String>,
    service: Option<String>,
    booking_date: Option<String>,
    booking_time: Option<String>,
    last_message_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "session",
            reason,
        };
        let id = SessionId::from_str(&self.id)
            .map_err(|e| corrupt(format!("invalid session id '{}': {}", self.id, e)))?;
        let clinic_id = ClinicId::from_str(&self.clinic_id)
            .map_err(|e| corrupt(format!("invalid clinic id '{}': {}", self.clinic_id, e)))?;
        let step = Step::parse(&self.step)
            .ok_or_else(|| corrupt(format!("unknown step '{}' for session {}", self.step, id)))?;

        Ok(Session {
            id,
            sender: self.sender,
            clinic_id,
            step,
            name: self.name,
            service: self.service,
            date: self.booking_date,
            time: self.booking_time,
            last_message_id: self.last_message_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn draft_column(field: DraftField) -> &'static str {
    match field {
        DraftField::Name => "name",
        DraftField::Service => "service",
        DraftField::Date => "booking_date",
        DraftField::Time => "booking_time",
    }
}

/// Repository for conversation sessions.
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_sender(&self, sender: &str) -> Result<Option<Session>, StoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, sender, clinic_id, step, name, service, booking_date, booking_time,
                   last_message_id, created_at, updated_at
            FROM sessions
            WHERE sender = $1
            "#,
        )
        .bind(sender)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(SessionRow::try_into_session).transpose()
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn get(&self, sender: &str) -> Result<Option<Session>, StoreError> {
        self.find_by_sender(sender).await
    }

    async fn create(&self, sender: &str, clinic_id: ClinicId) -> Result<Session, StoreError> {
        let session = Session::new(sender, clinic_id);

        // A concurrent first contact may have inserted the row already; the
        // re-read below returns whichever insert won.
        sqlx::query(
            r#"
            INSERT INTO sessions (id, sender, clinic_id, step, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (sender) DO NOTHING
            "#,
        )
        .bind(session.id.to_string())
        .bind(&session.sender)
        .bind(clinic_id.to_string())
        .bind(session.step.as_str())
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        self.find_by_sender(sender)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "session",
                key: sender.to_string(),
            })
    }

    async fn update(&self, id: SessionId, update: &SessionUpdate) -> Result<(), StoreError> {
        let now = Utc::now();
        let result = match &update.draft {
            DraftChange::Keep => {
                sqlx::query("UPDATE sessions SET step = $2, updated_at = $3 WHERE id = $1")
                    .bind(id.to_string())
                    .bind(update.step.as_str())
                    .bind(now)
                    .execute(&self.pool)
                    .await
            }
            DraftChange::Set(field, value) => {
                let sql = format!(
                    "UPDATE sessions SET step = $2, {} = $3, updated_at = $4 WHERE id = $1",
                    draft_column(*field)
                );
                sqlx::query(&sql)
                    .bind(id.to_string())
                    .bind(update.step.as_str())
                    .bind(value.as_str())
                    .bind(now)
                    .execute(&self.pool)
                    .await
            }
            DraftChange::Clear => {
                sqlx::query(
                    r#"
                    UPDATE sessions
                    SET step = $2, name = NULL, service = NULL,
                        booking_date = NULL, booking_time = NULL, updated_at = $3
                    WHERE id = $1
                    "#,
                )
                .bind(id.to_string())
                .bind(update.step.as_str())
                .bind(now)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "session",
                key: id.to_string(),
            });
        }

        Ok(())
    }

    async fn claim_message(&self, id: SessionId, message_id: &str) -> Result<bool, StoreError> {
        let claimed: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE sessions
            SET last_message_id = $2, updated_at = $3
            WHERE id = $1 AND last_message_id IS DISTINCT FROM $2
            RETURNING id
            "#,
        )
        .bind(id.to_string())
        .bind(message_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(claimed.is_some())
    }
}

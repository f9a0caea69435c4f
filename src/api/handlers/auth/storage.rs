//! Postgres-backed account store.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::account::{Account, AccountChanges, AccountStore, NewAccount, OtpSlot};
use super::error::StoreError;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, is_verified, \
     is_active, role, otp_code, otp_expires_at, last_login, created_at, updated_at";

/// Account store backed by the `accounts` table.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            "INSERT INTO accounts (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(row_to_account(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert account")
                .into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by email")?;

        Ok(row.as_ref().map(row_to_account))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by id")?;

        Ok(row.as_ref().map(row_to_account))
    }

    async fn update(&self, id: Uuid, changes: AccountChanges) -> Result<Account, StoreError> {
        // Empty changes are a no-op returning the current row; updated_at is
        // only refreshed when something is actually persisted.
        if changes.is_empty() {
            return self.find_by_id(id).await?.ok_or(StoreError::NotFound);
        }

        let (otp_code, otp_expires_at) = match &changes.otp {
            Some(Some(slot)) => (Some(slot.code.clone()), Some(slot.expires_at)),
            Some(None) | None => (None, None),
        };

        let query = format!(
            "UPDATE accounts SET \
                 password_hash = COALESCE($2, password_hash), \
                 is_verified = COALESCE($3, is_verified), \
                 otp_code = CASE WHEN $4 THEN $5 ELSE otp_code END, \
                 otp_expires_at = CASE WHEN $4 THEN $6 ELSE otp_expires_at END, \
                 last_login = COALESCE($7, last_login), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&changes.password_hash)
            .bind(changes.is_verified)
            .bind(changes.otp.is_some())
            .bind(&otp_code)
            .bind(otp_expires_at)
            .bind(changes.last_login)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update account")?;

        row.as_ref().map(row_to_account).ok_or(StoreError::NotFound)
    }

    async fn consume_otp(
        &self,
        id: Uuid,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        // Check-and-clear in one statement so two racing verifications cannot
        // both consume the same code.
        let query = format!(
            "UPDATE accounts SET \
                 otp_code = NULL, \
                 otp_expires_at = NULL, \
                 is_verified = TRUE, \
                 updated_at = NOW() \
             WHERE id = $1 AND otp_code = $2 AND otp_expires_at > $3 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(candidate)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to consume otp")?;

        Ok(row.as_ref().map(row_to_account))
    }
}

fn row_to_account(row: &PgRow) -> Account {
    let otp_code: Option<String> = row.get("otp_code");
    let otp_expires_at: Option<DateTime<Utc>> = row.get("otp_expires_at");
    // Both columns are set together; anything else reads as "no OTP pending".
    let otp = match (otp_code, otp_expires_at) {
        (Some(code), Some(expires_at)) => Some(OtpSlot { code, expires_at }),
        _ => None,
    };

    Account {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_verified: row.get("is_verified"),
        is_active: row.get("is_active"),
        role: row.get("role"),
        otp,
        last_login: row.get("last_login"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}

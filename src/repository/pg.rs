//! Postgres read-model repository
//!
//! Account documents as rows in `bank_accounts`. The version gate runs as a
//! row-locked transaction: read `FOR UPDATE`, require the expected version,
//! write the updated document back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Balance, BankAccountDocument, Currency};

use super::{AccountRepository, RepositoryError, UpdateDocument};

const INSERT_QUERY: &str = r#"
    INSERT INTO bank_accounts
        (aggregate_id, version, email, first_name, last_name, balance_amount, balance_currency, password_hash, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

const UPSERT_QUERY: &str = r#"
    INSERT INTO bank_accounts
        (aggregate_id, version, email, first_name, last_name, balance_amount, balance_currency, password_hash, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    ON CONFLICT (aggregate_id) DO UPDATE SET
        version = EXCLUDED.version,
        email = EXCLUDED.email,
        first_name = EXCLUDED.first_name,
        last_name = EXCLUDED.last_name,
        balance_amount = EXCLUDED.balance_amount,
        balance_currency = EXCLUDED.balance_currency,
        password_hash = EXCLUDED.password_hash,
        updated_at = EXCLUDED.updated_at
"#;

const UPDATE_QUERY: &str = r#"
    UPDATE bank_accounts SET
        version = $2,
        email = $3,
        first_name = $4,
        last_name = $5,
        balance_amount = $6,
        balance_currency = $7,
        password_hash = $8,
        updated_at = $9
    WHERE aggregate_id = $1
"#;

const SELECT_COLUMNS: &str = r#"
    SELECT aggregate_id, version, email, first_name, last_name, balance_amount, balance_currency, password_hash, created_at, updated_at
    FROM bank_accounts
"#;

type AccountRow = (
    Uuid,
    i64,
    String,
    String,
    String,
    i64,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn document_from_row(row: AccountRow) -> Result<BankAccountDocument, RepositoryError> {
    let (
        aggregate_id,
        version,
        email,
        first_name,
        last_name,
        balance_amount,
        balance_currency,
        password_hash,
        created_at,
        updated_at,
    ) = row;

    let currency =
        Currency::new(&balance_currency).map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

    Ok(BankAccountDocument {
        aggregate_id,
        version,
        email,
        first_name,
        last_name,
        balance: Balance::new(balance_amount, currency),
        password_hash,
        created_at,
        updated_at,
    })
}

#[derive(Debug, Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        query: &str,
        document: &BankAccountDocument,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(query)
            .bind(document.aggregate_id)
            .bind(document.version)
            .bind(&document.email)
            .bind(&document.first_name)
            .bind(&document.last_name)
            .bind(document.balance.amount)
            .bind(document.balance.currency.as_str())
            .bind(&document.password_hash)
            .bind(document.created_at)
            .bind(document.updated_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn insert(&self, document: &BankAccountDocument) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if let Err(err) = self.write(&mut tx, INSERT_QUERY, document).await {
            if let sqlx::Error::Database(ref db_err) = err {
                if db_err.code().as_deref() == Some("23505") {
                    return Err(RepositoryError::DuplicateKey(document.aggregate_id));
                }
            }
            return Err(err.into());
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert(&self, document: &BankAccountDocument) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.write(&mut tx, UPSERT_QUERY, document).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_concurrently(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        update: UpdateDocument<'_>,
    ) -> Result<BankAccountDocument, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let query = format!("{} WHERE aggregate_id = $1 FOR UPDATE", SELECT_COLUMNS);
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(aggregate_id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut document =
            document_from_row(row.ok_or(RepositoryError::NotFound(aggregate_id))?)?;

        if document.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                aggregate_id,
                expected: expected_version,
                stored: document.version,
            });
        }

        update(&mut document);
        self.write(&mut tx, UPDATE_QUERY, &document).await?;
        tx.commit().await?;

        Ok(document)
    }

    async fn delete_by_aggregate_id(&self, aggregate_id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM bank_accounts WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_by_aggregate_id(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Option<BankAccountDocument>, RepositoryError> {
        let query = format!("{} WHERE aggregate_id = $1", SELECT_COLUMNS);
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(document_from_row).transpose()
    }

    async fn get_by_email(
        &self,
        email: &str,
    ) -> Result<Option<BankAccountDocument>, RepositoryError> {
        let query = format!("{} WHERE email = $1", SELECT_COLUMNS);
        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(document_from_row).transpose()
    }
}

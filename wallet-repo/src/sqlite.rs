//! SQLite ledger store adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

use wallet_types::{
    Client, ClientId, DomainError, LedgerRepository, Money, NewClient, RepoError, SessionId,
    Transaction, TransactionId,
};

use crate::types::{
    format_timestamp, map_db_error, map_tx_error, map_write_error, parse_timestamp,
    parse_transaction_status, parse_transaction_type, parse_uuid,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs
// ─────────────────────────────────────────────────────────────────────────────

/// Client row. SQLite stores ids and timestamps as text.
#[derive(FromRow)]
struct DbClient {
    id: String,
    document: String,
    full_name: String,
    email: String,
    phone: String,
    balance: i64,
    created_at: String,
}

impl DbClient {
    fn into_domain(self) -> Result<Client, RepoError> {
        let id = ClientId::from_uuid(parse_uuid(&self.id)?);
        let balance = Money::new(self.balance).map_err(RepoError::Domain)?;
        let created_at = parse_timestamp(&self.created_at)?;

        let new = NewClient {
            document: self.document,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
        };

        Ok(Client::from_parts(id, new, balance, created_at))
    }
}

/// Transaction row.
#[derive(FromRow)]
struct DbTransaction {
    id: String,
    client_id: String,
    transaction_type: String,
    amount: i64,
    status: String,
    session_id: Option<String>,
    token: Option<String>,
    token_expires_at: Option<String>,
    created_at: String,
}

impl DbTransaction {
    fn into_domain(self) -> Result<Transaction, RepoError> {
        let session_id = self
            .session_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?
            .map(SessionId::from_uuid);

        let token_expires_at = self
            .token_expires_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Transaction::from_parts(
            TransactionId::from_uuid(parse_uuid(&self.id)?),
            ClientId::from_uuid(parse_uuid(&self.client_id)?),
            parse_transaction_type(&self.transaction_type)?,
            Money::new(self.amount).map_err(RepoError::Domain)?,
            parse_transaction_status(&self.status)?,
            session_id,
            self.token,
            token_expires_at,
            parse_timestamp(&self.created_at)?,
        ))
    }
}

#[derive(FromRow)]
struct DbBalance {
    balance: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite ledger store.
#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &SqlitePool, sql: &str, name: &str) -> anyhow::Result<()> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_wallet_tables.sql"),
        "0001",
    )
    .await
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        // Ensure on-disk SQLite target directory exists.
        if !in_memory {
            if let Some(path) = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
            {
                let path = path.split('?').next().unwrap_or(path);
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens its own database, so keep one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Explains why the conditional completion matched no row.
    async fn completion_miss(&self, session_id: SessionId) -> RepoError {
        match self.find_payment_by_session(session_id).await {
            Ok(Some(payment)) if payment.is_pending() => DomainError::TokenExpired.into(),
            Ok(Some(payment)) => DomainError::NotPending(payment.status).into(),
            Ok(None) => RepoError::NotFound,
            Err(e) => e,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteRepo {
    async fn create_client(&self, new: NewClient) -> Result<Client, RepoError> {
        let id = ClientId::new();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO clients (id, document, full_name, email, phone, balance, created_at)
               VALUES (?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(id.to_string())
        .bind(&new.document)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(format_timestamp(now))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(Client::from_parts(id, new, Money::zero(), now))
    }

    async fn find_client_by_document_or_email(
        &self,
        document: &str,
        email: &str,
    ) -> Result<Option<Client>, RepoError> {
        let row: Option<DbClient> = sqlx::query_as(
            r#"SELECT id, document, full_name, email, phone, balance, created_at
               FROM clients WHERE document = ? OR email = ? LIMIT 1"#,
        )
        .bind(document)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(DbClient::into_domain).transpose()
    }

    async fn find_client_by_document_and_phone(
        &self,
        document: &str,
        phone: &str,
    ) -> Result<Option<Client>, RepoError> {
        let row: Option<DbClient> = sqlx::query_as(
            r#"SELECT id, document, full_name, email, phone, balance, created_at
               FROM clients WHERE document = ? AND phone = ?"#,
        )
        .bind(document)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(DbClient::into_domain).transpose()
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, RepoError> {
        let row: Option<DbClient> = sqlx::query_as(
            r#"SELECT id, document, full_name, email, phone, balance, created_at
               FROM clients WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(DbClient::into_domain).transpose()
    }

    async fn recharge(
        &self,
        client_id: ClientId,
        amount: Money,
    ) -> Result<(Client, Transaction), RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(map_tx_error)?;

        let client: Option<DbClient> = sqlx::query_as(
            r#"UPDATE clients SET balance = balance + ? WHERE id = ?
               RETURNING id, document, full_name, email, phone, balance, created_at"#,
        )
        .bind(amount.amount())
        .bind(client_id.to_string())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(map_db_error)?;

        let client = client.ok_or(RepoError::NotFound)?.into_domain()?;
        let tx = Transaction::recharge(client_id, amount);

        sqlx::query(
            r#"INSERT INTO transactions (id, client_id, transaction_type, amount, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.id.to_string())
        .bind(client_id.to_string())
        .bind(tx.transaction_type.as_ref())
        .bind(tx.amount.amount())
        .bind(tx.status.as_ref())
        .bind(format_timestamp(tx.created_at))
        .execute(&mut *db_tx)
        .await
        .map_err(map_write_error)?;

        db_tx.commit().await.map_err(map_tx_error)?;

        Ok((client, tx))
    }

    async fn create_pending_payment(&self, tx: Transaction) -> Result<Transaction, RepoError> {
        if !tx.is_pending() {
            return Err(RepoError::Domain(DomainError::NotPending(tx.status)));
        }

        sqlx::query(
            r#"INSERT INTO transactions (id, client_id, transaction_type, amount, status, session_id, token, token_expires_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.id.to_string())
        .bind(tx.client_id.to_string())
        .bind(tx.transaction_type.as_ref())
        .bind(tx.amount.amount())
        .bind(tx.status.as_ref())
        .bind(tx.session_id.map(|s| s.to_string()))
        .bind(&tx.token)
        .bind(tx.token_expires_at.map(format_timestamp))
        .bind(format_timestamp(tx.created_at))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(tx)
    }

    async fn find_payment_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, client_id, transaction_type, amount, status, session_id, token, token_expires_at, created_at
               FROM transactions WHERE session_id = ?"#,
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn complete_payment(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(Client, Transaction), RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(map_tx_error)?;

        // Write first so the transaction holds the write lock from the start.
        let payment: Option<DbTransaction> = sqlx::query_as(
            r#"UPDATE transactions SET status = 'COMPLETED'
               WHERE session_id = ? AND status = 'PENDING' AND token_expires_at >= ?
               RETURNING id, client_id, transaction_type, amount, status, session_id, token, token_expires_at, created_at"#,
        )
        .bind(session_id.to_string())
        .bind(format_timestamp(now))
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(map_db_error)?;

        let Some(payment) = payment else {
            db_tx.rollback().await.map_err(map_tx_error)?;
            return Err(self.completion_miss(session_id).await);
        };
        let payment = payment.into_domain()?;

        let client: Option<DbClient> = sqlx::query_as(
            r#"UPDATE clients SET balance = balance - ?
               WHERE id = ? AND balance >= ?
               RETURNING id, document, full_name, email, phone, balance, created_at"#,
        )
        .bind(payment.amount.amount())
        .bind(payment.client_id.to_string())
        .bind(payment.amount.amount())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(map_db_error)?;

        let Some(client) = client else {
            db_tx.rollback().await.map_err(map_tx_error)?;
            let row: Option<DbBalance> =
                sqlx::query_as(r#"SELECT balance FROM clients WHERE id = ?"#)
                    .bind(payment.client_id.to_string())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_db_error)?;
            return Err(RepoError::Domain(DomainError::InsufficientFunds {
                available: row.ok_or(RepoError::NotFound)?.balance,
                requested: payment.amount.amount(),
            }));
        };
        let client = client.into_domain()?;

        db_tx.commit().await.map_err(map_tx_error)?;

        Ok((client, payment))
    }

    async fn fail_payment(&self, session_id: SessionId) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE transactions SET status = 'FAILED' WHERE session_id = ? AND status = 'PENDING'"#,
        )
        .bind(session_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_transactions_for_client(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, client_id, transaction_type, amount, status, session_id, token, token_expires_at, created_at
               FROM transactions WHERE client_id = ?
               ORDER BY created_at DESC"#,
        )
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn list_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, client_id, transaction_type, amount, status, session_id, token, token_expires_at, created_at
               FROM transactions
               WHERE status = 'PENDING' AND token_expires_at < ?
               ORDER BY token_expires_at ASC
               LIMIT ?"#,
        )
        .bind(format_timestamp(now))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }
}

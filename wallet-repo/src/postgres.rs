//! PostgreSQL ledger store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use wallet_types::{
    Client, ClientId, DomainError, LedgerRepository, Money, NewClient, RepoError, SessionId,
    Transaction, TransactionId,
};

use crate::types::{
    map_db_error, map_tx_error, map_write_error, parse_transaction_status, parse_transaction_type,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct DbClient {
    id: Uuid,
    document: String,
    full_name: String,
    email: String,
    phone: String,
    balance: i64,
    created_at: DateTime<Utc>,
}

impl DbClient {
    fn into_domain(self) -> Result<Client, RepoError> {
        let balance = Money::new(self.balance).map_err(RepoError::Domain)?;
        let new = NewClient {
            document: self.document,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
        };

        Ok(Client::from_parts(
            ClientId::from_uuid(self.id),
            new,
            balance,
            self.created_at,
        ))
    }
}

#[derive(FromRow)]
struct DbTransaction {
    id: Uuid,
    client_id: Uuid,
    transaction_type: String,
    amount: i64,
    status: String,
    session_id: Option<Uuid>,
    token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl DbTransaction {
    fn into_domain(self) -> Result<Transaction, RepoError> {
        Ok(Transaction::from_parts(
            TransactionId::from_uuid(self.id),
            ClientId::from_uuid(self.client_id),
            parse_transaction_type(&self.transaction_type)?,
            Money::new(self.amount).map_err(RepoError::Domain)?,
            parse_transaction_status(&self.status)?,
            self.session_id.map(SessionId::from_uuid),
            self.token,
            self.token_expires_at,
            self.created_at,
        ))
    }
}

#[derive(FromRow)]
struct DbBalance {
    balance: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL ledger store relying on row locks taken by conditional updates.
#[derive(Clone)]
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
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

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_wallet_tables_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
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
impl LedgerRepository for PostgresRepo {
    async fn create_client(&self, new: NewClient) -> Result<Client, RepoError> {
        let id = ClientId::new();
        let now = Utc::now();

        sqlx::query(
            r#"INSERT INTO clients (id, document, full_name, email, phone, balance, created_at)
               VALUES ($1, $2, $3, $4, $5, 0, $6)"#,
        )
        .bind(id.into_uuid())
        .bind(&new.document)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(now)
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
               FROM clients WHERE document = $1 OR email = $2 LIMIT 1"#,
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
               FROM clients WHERE document = $1 AND phone = $2"#,
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
               FROM clients WHERE id = $1"#,
        )
        .bind(id.into_uuid())
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
            r#"UPDATE clients SET balance = balance + $1 WHERE id = $2
               RETURNING id, document, full_name, email, phone, balance, created_at"#,
        )
        .bind(amount.amount())
        .bind(client_id.into_uuid())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(map_db_error)?;

        let client = client.ok_or(RepoError::NotFound)?.into_domain()?;
        let tx = Transaction::recharge(client_id, amount);

        sqlx::query(
            r#"INSERT INTO transactions (id, client_id, transaction_type, amount, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(tx.id.into_uuid())
        .bind(client_id.into_uuid())
        .bind(tx.transaction_type.as_ref())
        .bind(tx.amount.amount())
        .bind(tx.status.as_ref())
        .bind(tx.created_at)
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
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(tx.id.into_uuid())
        .bind(tx.client_id.into_uuid())
        .bind(tx.transaction_type.as_ref())
        .bind(tx.amount.amount())
        .bind(tx.status.as_ref())
        .bind(tx.session_id.map(SessionId::into_uuid))
        .bind(&tx.token)
        .bind(tx.token_expires_at)
        .bind(tx.created_at)
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
               FROM transactions WHERE session_id = $1"#,
        )
        .bind(session_id.into_uuid())
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

        // A concurrent confirmation blocks on the row lock, then sees a
        // status other than PENDING and updates nothing.
        let payment: Option<DbTransaction> = sqlx::query_as(
            r#"UPDATE transactions SET status = 'COMPLETED'
               WHERE session_id = $1 AND status = 'PENDING' AND token_expires_at >= $2
               RETURNING id, client_id, transaction_type, amount, status, session_id, token, token_expires_at, created_at"#,
        )
        .bind(session_id.into_uuid())
        .bind(now)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(map_db_error)?;

        let Some(payment) = payment else {
            db_tx.rollback().await.map_err(map_tx_error)?;
            return Err(self.completion_miss(session_id).await);
        };
        let payment = payment.into_domain()?;

        let client: Option<DbClient> = sqlx::query_as(
            r#"UPDATE clients SET balance = balance - $1
               WHERE id = $2 AND balance >= $1
               RETURNING id, document, full_name, email, phone, balance, created_at"#,
        )
        .bind(payment.amount.amount())
        .bind(payment.client_id.into_uuid())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(map_db_error)?;

        let Some(client) = client else {
            db_tx.rollback().await.map_err(map_tx_error)?;
            let row: Option<DbBalance> =
                sqlx::query_as(r#"SELECT balance FROM clients WHERE id = $1"#)
                    .bind(payment.client_id.into_uuid())
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
            r#"UPDATE transactions SET status = 'FAILED' WHERE session_id = $1 AND status = 'PENDING'"#,
        )
        .bind(session_id.into_uuid())
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
               FROM transactions WHERE client_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(client_id.into_uuid())
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
               WHERE status = 'PENDING' AND token_expires_at < $1
               ORDER BY token_expires_at ASC
               LIMIT $2"#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }
}

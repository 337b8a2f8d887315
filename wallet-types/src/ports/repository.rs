//! Ledger store port.
//!
//! Adapters (Postgres, SQLite, the in-memory test double) implement this trait.

use chrono::{DateTime, Utc};

use crate::domain::{Client, ClientId, Money, NewClient, SessionId, Transaction};
use crate::error::RepoError;

/// Durable store of clients and their transactions.
///
/// Every operation that touches a balance MUST commit the balance change and
/// its transaction record together, inside one database transaction.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Client Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a client with zero balance.
    ///
    /// A duplicate document or email yields `RepoError::Conflict`.
    async fn create_client(&self, new: NewClient) -> Result<Client, RepoError>;

    /// Finds a client whose document OR email matches.
    async fn find_client_by_document_or_email(
        &self,
        document: &str,
        email: &str,
    ) -> Result<Option<Client>, RepoError>;

    /// Finds the client matching both document AND phone.
    async fn find_client_by_document_and_phone(
        &self,
        document: &str,
        phone: &str,
    ) -> Result<Option<Client>, RepoError>;

    /// Gets a client by ID.
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Balance Movements (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Credits the balance and records a completed recharge.
    async fn recharge(
        &self,
        client_id: ClientId,
        amount: Money,
    ) -> Result<(Client, Transaction), RepoError>;

    /// Records a pending payment. The balance is not touched.
    async fn create_pending_payment(&self, tx: Transaction) -> Result<Transaction, RepoError>;

    /// Gets the payment carrying this session id.
    async fn find_payment_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Transaction>, RepoError>;

    /// Moves a payment from pending to completed and debits its amount,
    /// provided its token has not expired at `now`.
    ///
    /// # Errors
    /// - `RepoError::NotFound` if no payment has this session id
    /// - `DomainError::NotPending` if the payment already left pending
    /// - `DomainError::TokenExpired` if the payment is pending but expired;
    ///   nothing is written
    /// - `DomainError::InsufficientFunds` if the balance no longer covers the
    ///   amount; nothing is written and the payment stays pending
    async fn complete_payment(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(Client, Transaction), RepoError>;

    /// Moves a payment from pending to failed.
    ///
    /// Returns `true` only if this call performed the transition.
    async fn fail_payment(&self, session_id: SessionId) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists a client's transactions, newest first.
    async fn list_transactions_for_client(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<Transaction>, RepoError>;

    /// Lists pending payments whose token expired before `now`.
    async fn list_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepoError>;
}

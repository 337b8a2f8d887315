//! Transaction domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::client::ClientId;
use super::money::Money;
use crate::error::DomainError;

/// Default lifetime of a payment confirmation token.
pub const TOKEN_TTL_MINUTES: i64 = 10;

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle correlating a payment initiation with its confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// The kind of balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Credit committed immediately
    Recharge,
    /// Debit gated by an emailed token
    Payment,
}

impl AsRef<str> for TransactionType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Recharge => "RECHARGE",
            Self::Payment => "PAYMENT",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Lifecycle of a transaction.
///
/// Only payments ever sit in `Pending`; they leave it at most once and
/// never come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl AsRef<str> for TransactionStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A recorded balance movement.
///
/// Rows are never deleted; a terminal status is the permanent audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Owning client
    pub client_id: ClientId,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub status: TransactionStatus,
    /// Confirmation handle (payments only)
    pub session_id: Option<SessionId>,
    /// 6-digit confirmation code (payments only)
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Instant after which the token is no longer accepted (payments only)
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a recharge, which is committed directly as completed.
    pub fn recharge(client_id: ClientId, amount: Money) -> Self {
        Self {
            id: TransactionId::new(),
            client_id,
            transaction_type: TransactionType::Recharge,
            amount,
            status: TransactionStatus::Completed,
            session_id: None,
            token: None,
            token_expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a pending payment awaiting token confirmation.
    ///
    /// Fails when `ttl` pushes the expiry past the representable range.
    pub fn pending_payment(
        client_id: ClientId,
        amount: Money,
        session_id: SessionId,
        token: String,
        ttl: Duration,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(DomainError::ExpiryOutOfRange)?;
        Ok(Self {
            id: TransactionId::new(),
            client_id,
            transaction_type: TransactionType::Payment,
            amount,
            status: TransactionStatus::Pending,
            session_id: Some(session_id),
            token: Some(token),
            token_expires_at: Some(expires_at),
            created_at: now,
        })
    }

    /// Reconstructs a transaction from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        client_id: ClientId,
        transaction_type: TransactionType,
        amount: Money,
        status: TransactionStatus,
        session_id: Option<SessionId>,
        token: Option<String>,
        token_expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            transaction_type,
            amount,
            status,
            session_id,
            token,
            token_expires_at,
            created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Strictly after the expiry instant; a transaction without expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expires| now > expires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recharge_creation() {
        let client = ClientId::new();
        let tx = Transaction::recharge(client, Money::new(1000).unwrap());

        assert_eq!(tx.transaction_type, TransactionType::Recharge);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.session_id.is_none());
        assert!(tx.token.is_none());
        assert!(!tx.is_expired_at(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_pending_payment_expiry() {
        let tx = Transaction::pending_payment(
            ClientId::new(),
            Money::new(500).unwrap(),
            SessionId::new(),
            "123456".into(),
            Duration::minutes(TOKEN_TTL_MINUTES),
        )
        .unwrap();

        assert!(tx.is_pending());
        let expires = tx.token_expires_at.unwrap();
        assert_eq!(expires - tx.created_at, Duration::minutes(10));
        assert!(!tx.is_expired_at(expires));
        assert!(tx.is_expired_at(expires + Duration::milliseconds(1)));
    }

    #[test]
    fn test_pending_payment_rejects_unrepresentable_expiry() {
        let result = Transaction::pending_payment(
            ClientId::new(),
            Money::new(500).unwrap(),
            SessionId::new(),
            "123456".into(),
            Duration::seconds(10_000_000_000_000),
        );
        assert!(matches!(result, Err(DomainError::ExpiryOutOfRange)));
    }

    #[test]
    fn test_token_never_serialized() {
        let tx = Transaction::pending_payment(
            ClientId::new(),
            Money::new(500).unwrap(),
            SessionId::new(),
            "654321".into(),
            Duration::minutes(1),
        )
        .unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(!json.contains("654321"));
    }

    #[test]
    fn test_session_id_parse() {
        let session = SessionId::new();
        let parsed: SessionId = format!(" {} ", session).parse().unwrap();
        assert_eq!(parsed, session);
        assert!("not-a-session".parse::<SessionId>().is_err());
    }
}

//! Client domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for a Client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random ClientId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ClientId from an existing UUID.
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

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Registration data for a client that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub document: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl NewClient {
    /// Builds registration data, trimming every field and lowercasing the email.
    ///
    /// # Validation
    /// - document: 5 to 20 digits
    /// - full name: 3 to 100 characters
    /// - email: `local@domain.tld` shape
    /// - phone: 10 to 15 digits
    pub fn new(
        document: &str,
        full_name: &str,
        email: &str,
        phone: &str,
    ) -> Result<Self, DomainError> {
        let client = Self {
            document: document.trim().to_string(),
            full_name: full_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            phone: phone.trim().to_string(),
        };

        check_digits("document", &client.document, 5, 20)?;
        check_digits("phone", &client.phone, 10, 15)?;

        let name_len = client.full_name.chars().count();
        if !(3..=100).contains(&name_len) {
            return Err(DomainError::ValidationError(
                "full name must be between 3 and 100 characters".into(),
            ));
        }

        if !looks_like_email(&client.email) {
            return Err(DomainError::ValidationError("email is not valid".into()));
        }

        Ok(client)
    }
}

fn check_digits(field: &str, value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    if !(min..=max).contains(&value.len()) {
        return Err(DomainError::ValidationError(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::ValidationError(format!(
            "{} must contain only digits",
            field
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
}

/// A registered wallet holder.
///
/// The client is the aggregate root: its balance only changes through the
/// recharge-credit and payment-debit paths of the ledger store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier
    pub id: ClientId,
    /// National document number (natural key)
    pub document: String,
    pub full_name: String,
    /// Registered contact channel for tokens and receipts
    pub email: String,
    pub phone: String,
    /// Current balance
    pub balance: Money,
    /// When the client registered
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Creates a client with all fields specified (for database reconstruction).
    pub fn from_parts(
        id: ClientId,
        new: NewClient,
        balance: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            document: new.document,
            full_name: new.full_name,
            email: new.email,
            phone: new.phone,
            balance,
            created_at,
        }
    }

    /// Checks if the balance covers a debit.
    pub fn has_sufficient_funds(&self, amount: &Money) -> bool {
        self.balance.covers(amount)
    }

    /// Email with the local part hidden, e.g. `a***@x.com`.
    pub fn masked_email(&self) -> String {
        mask_email(&self.email)
    }
}

/// Hides all but the first character of an email's local part.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Result<NewClient, DomainError> {
        NewClient::new("1111111111", "Ana Gomez", "A@X.com", "3001234567")
    }

    #[test]
    fn test_new_client_normalizes_fields() {
        let client = NewClient::new(" 1111111111 ", " Ana Gomez ", " A@X.com ", "3001234567")
            .unwrap();
        assert_eq!(client.document, "1111111111");
        assert_eq!(client.full_name, "Ana Gomez");
        assert_eq!(client.email, "a@x.com");
        assert!(valid().is_ok());
    }

    #[test]
    fn test_document_rules() {
        assert!(NewClient::new("1234", "Ana Gomez", "a@x.com", "3001234567").is_err());
        assert!(NewClient::new("12345abc", "Ana Gomez", "a@x.com", "3001234567").is_err());
        assert!(NewClient::new(&"9".repeat(21), "Ana Gomez", "a@x.com", "3001234567").is_err());
    }

    #[test]
    fn test_phone_rules() {
        assert!(NewClient::new("1111111111", "Ana Gomez", "a@x.com", "300123").is_err());
        assert!(NewClient::new("1111111111", "Ana Gomez", "a@x.com", "300-123-4567").is_err());
    }

    #[test]
    fn test_name_and_email_rules() {
        let short = NewClient::new("1111111111", "Al", "a@x.com", "3001234567");
        assert!(matches!(short, Err(DomainError::ValidationError(_))));

        for bad in ["ax.com", "@x.com", "a@x", "a@.com", "a@x.", "a b@x.com", "a@b@x.com"] {
            assert!(
                NewClient::new("1111111111", "Ana Gomez", bad, "3001234567").is_err(),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("ana.gomez@x.com"), "a***@x.com");
        assert_eq!(mask_email("a@x.com"), "a***@x.com");
        assert_eq!(mask_email("broken"), "***");
    }

    #[test]
    fn test_sufficient_funds() {
        let client = Client::from_parts(
            ClientId::new(),
            valid().unwrap(),
            Money::new(500).unwrap(),
            Utc::now(),
        );
        assert!(client.has_sufficient_funds(&Money::new(500).unwrap()));
        assert!(!client.has_sufficient_funds(&Money::new(501).unwrap()));
    }
}

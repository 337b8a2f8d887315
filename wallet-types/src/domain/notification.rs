use serde::{Deserialize, Serialize};

/// Template selector understood by notification senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    PaymentToken,
    RechargeConfirmation,
    PaymentResult,
}

impl AsRef<str> for NotificationKind {
    fn as_ref(&self) -> &str {
        match self {
            Self::Welcome => "welcome",
            Self::PaymentToken => "payment_token",
            Self::RechargeConfirmation => "recharge_confirmation",
            Self::PaymentResult => "payment_result",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A message for a client's registered email, with its template parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    Welcome { full_name: String },
    #[serde(rename_all = "camelCase")]
    PaymentToken {
        full_name: String,
        token: String,
        amount: i64,
        expires_in_minutes: i64,
    },
    #[serde(rename_all = "camelCase")]
    RechargeConfirmation {
        full_name: String,
        amount: i64,
        new_balance: i64,
    },
    /// Outcome of a payment; `new_balance` is only present on success.
    #[serde(rename_all = "camelCase")]
    PaymentResult {
        full_name: String,
        amount: i64,
        new_balance: Option<i64>,
        success: bool,
    },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Welcome { .. } => NotificationKind::Welcome,
            Self::PaymentToken { .. } => NotificationKind::PaymentToken,
            Self::RechargeConfirmation { .. } => NotificationKind::RechargeConfirmation,
            Self::PaymentResult { .. } => NotificationKind::PaymentResult,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "Welcome to your wallet",
            Self::PaymentToken { .. } => "Your payment confirmation code",
            Self::RechargeConfirmation { .. } => "Recharge successful",
            Self::PaymentResult { success: true, .. } => "Payment successful",
            Self::PaymentResult { success: false, .. } => "Payment failed",
        }
    }

    /// Template parameters as a flat JSON object.
    pub fn params(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            // Externally tagged: {"variantName": {..params..}}
            Ok(serde_json::Value::Object(mut outer)) => outer
                .values_mut()
                .next()
                .map(serde_json::Value::take)
                .unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_flat() {
        let n = Notification::RechargeConfirmation {
            full_name: "Ana".into(),
            amount: 50_000,
            new_balance: 80_000,
        };
        assert_eq!(n.kind(), NotificationKind::RechargeConfirmation);
        assert_eq!(
            n.params(),
            serde_json::json!({"fullName": "Ana", "amount": 50000, "newBalance": 80000})
        );
    }

    #[test]
    fn test_payment_result_subject() {
        let ok = Notification::PaymentResult {
            full_name: "Ana".into(),
            amount: 1,
            new_balance: Some(0),
            success: true,
        };
        let failed = Notification::PaymentResult {
            full_name: "Ana".into(),
            amount: 1,
            new_balance: None,
            success: false,
        };
        assert_eq!(ok.subject(), "Payment successful");
        assert_eq!(failed.subject(), "Payment failed");
        assert_eq!(NotificationKind::PaymentResult.to_string(), "payment_result");
    }
}

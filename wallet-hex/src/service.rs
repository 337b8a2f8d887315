//! Wallet Application Service
//!
//! Orchestrates registration, recharges and the token-gated payment flow
//! through the ledger store port. Holds no state between calls: every
//! operation re-reads what it needs from the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use wallet_repo::security::verify_token;
use wallet_types::{
    AppError, BalanceResponse, Client, ClientLookupRequest, ClientResponse, ConfirmPaymentRequest,
    DomainError, InitiatePaymentRequest, LedgerRepository, MAX_AMOUNT, Money, NewClient,
    Notification, Notifier, Operation, PaymentConfirmedResponse, PaymentInitiatedResponse,
    RechargeRequest, RechargeResponse, RegisterClientRequest, RepoError, SessionId,
    TOKEN_TTL_MINUTES, Transaction, TransactionSummary,
};

use crate::notify::{NotificationQueue, QUEUE_CAPACITY};
use crate::token::generate_token;

/// Tunable limits of the wallet.
#[derive(Debug, Clone)]
pub struct WalletPolicy {
    /// Largest accepted recharge or payment
    pub max_amount: i64,
    /// Lifetime of a payment confirmation token
    pub token_ttl: chrono::Duration,
    /// Upper bound on waiting for token delivery
    pub token_send_timeout: Duration,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        Self {
            max_amount: MAX_AMOUNT,
            token_ttl: chrono::Duration::minutes(TOKEN_TTL_MINUTES),
            token_send_timeout: Duration::from_secs(10),
        }
    }
}

/// Application service for wallet operations.
///
/// Generic over `R: LedgerRepository` - the adapter is injected at compile time.
pub struct WalletService<R: LedgerRepository> {
    repo: R,
    notifier: Arc<dyn Notifier>,
    queue: NotificationQueue,
    policy: WalletPolicy,
}

/// Maps a store failure for `operation`, logging the unexpected ones.
fn store_error(operation: Operation) -> impl FnOnce(RepoError) -> AppError {
    move |err| {
        let err = AppError::from_repo(operation, err);
        if err.is_infrastructure() {
            error!(%operation, error = %err, "Ledger store failure");
        }
        err
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl<R: LedgerRepository> WalletService<R> {
    /// Creates the service and spawns its notification worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(repo: R, notifier: Arc<dyn Notifier>, policy: WalletPolicy) -> Self {
        let queue = NotificationQueue::spawn(notifier.clone(), QUEUE_CAPACITY);
        Self {
            repo,
            notifier,
            queue,
            policy,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn policy(&self) -> &WalletPolicy {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Client Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Registers a client with zero balance.
    #[instrument(skip(self, req), fields(document = %req.document))]
    pub async fn register(&self, req: RegisterClientRequest) -> Result<ClientResponse, AppError> {
        let new = NewClient::new(&req.document, &req.full_name, &req.email, &req.phone)?;

        let existing = self
            .repo
            .find_client_by_document_or_email(&new.document, &new.email)
            .await
            .map_err(store_error(Operation::Register))?;
        if existing.is_some() {
            info!("Registration rejected: client exists");
            return Err(AppError::ClientExists);
        }

        // The unique indexes still catch a registration racing this one.
        let client = self
            .repo
            .create_client(new)
            .await
            .map_err(store_error(Operation::Register))?;

        info!(client_id = %client.id, "Client registered");
        self.queue.enqueue(
            &client.email,
            Notification::Welcome {
                full_name: client.full_name.clone(),
            },
        );

        Ok(ClientResponse {
            id: client.id,
            document: client.document,
            full_name: client.full_name,
            email: client.email,
        })
    }

    /// Returns the client's name and current balance.
    #[instrument(skip(self, req), fields(document = %req.document))]
    pub async fn check_balance(
        &self,
        req: ClientLookupRequest,
    ) -> Result<BalanceResponse, AppError> {
        let client = self
            .find_client(Operation::CheckBalance, &req.document, &req.phone)
            .await?;

        Ok(BalanceResponse {
            full_name: client.full_name,
            balance: client.balance.amount(),
        })
    }

    /// Lists the client's transactions, newest first.
    #[instrument(skip(self, req), fields(document = %req.document))]
    pub async fn transaction_history(
        &self,
        req: ClientLookupRequest,
    ) -> Result<Vec<TransactionSummary>, AppError> {
        let client = self
            .find_client(Operation::History, &req.document, &req.phone)
            .await?;

        let transactions = self
            .repo
            .list_transactions_for_client(client.id)
            .await
            .map_err(store_error(Operation::History))?;

        Ok(transactions
            .into_iter()
            .map(TransactionSummary::from)
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Balance Movements
    // ─────────────────────────────────────────────────────────────────────────────

    /// Credits the wallet and records a completed recharge.
    #[instrument(skip(self, req), fields(document = %req.document, amount = req.amount))]
    pub async fn recharge(&self, req: RechargeRequest) -> Result<RechargeResponse, AppError> {
        let amount = self.validate_amount(req.amount)?;
        let client = self
            .find_client(Operation::Recharge, &req.document, &req.phone)
            .await?;

        let (client, tx) = self
            .repo
            .recharge(client.id, amount)
            .await
            .map_err(store_error(Operation::Recharge))?;

        info!(client_id = %client.id, transaction_id = %tx.id, "Recharge completed");
        self.queue.enqueue(
            &client.email,
            Notification::RechargeConfirmation {
                full_name: client.full_name.clone(),
                amount: amount.amount(),
                new_balance: client.balance.amount(),
            },
        );

        Ok(RechargeResponse {
            new_balance: client.balance.amount(),
        })
    }

    /// Opens a pending payment and sends its token to the client's email.
    ///
    /// When the token cannot be delivered the payment stays valid and the
    /// token is returned in `token_fallback` instead.
    #[instrument(skip(self, req), fields(document = %req.document, amount = req.amount))]
    pub async fn initiate_payment(
        &self,
        req: InitiatePaymentRequest,
    ) -> Result<PaymentInitiatedResponse, AppError> {
        let amount = self.validate_amount(req.amount)?;
        let client = self
            .find_client(Operation::InitiatePayment, &req.document, &req.phone)
            .await?;

        if !client.has_sufficient_funds(&amount) {
            info!(client_id = %client.id, "Payment rejected: insufficient balance");
            return Err(AppError::InsufficientBalance {
                available: client.balance.amount(),
                requested: amount.amount(),
            });
        }

        let token = generate_token();
        let pending = Transaction::pending_payment(
            client.id,
            amount,
            SessionId::new(),
            token.clone(),
            self.policy.token_ttl,
        )?;
        let payment = self
            .repo
            .create_pending_payment(pending)
            .await
            .map_err(store_error(Operation::InitiatePayment))?;

        let session_id = payment.session_id.ok_or_else(|| AppError::Infrastructure {
            operation: Operation::InitiatePayment,
            message: "pending payment stored without session".into(),
        })?;
        info!(client_id = %client.id, %session_id, "Payment pending confirmation");

        let notification = Notification::PaymentToken {
            full_name: client.full_name.clone(),
            token: token.clone(),
            amount: amount.amount(),
            expires_in_minutes: self.policy.token_ttl.num_minutes(),
        };
        let delivered = tokio::time::timeout(
            self.policy.token_send_timeout,
            self.notifier.send(&client.email, &notification),
        )
        .await
        .unwrap_or(false);

        if !delivered {
            warn!(%session_id, "Token delivery failed, returning fallback token");
        }

        Ok(PaymentInitiatedResponse {
            session_id,
            email: client.masked_email(),
            token_fallback: (!delivered).then_some(token),
        })
    }

    /// Confirms a pending payment with its token.
    ///
    /// Checks run in a fixed order: session exists, still pending, not
    /// expired, token matches. A wrong token leaves the payment pending.
    #[instrument(skip(self, req), fields(session_id = %req.session_id))]
    pub async fn confirm_payment(
        &self,
        req: ConfirmPaymentRequest,
    ) -> Result<PaymentConfirmedResponse, AppError> {
        require("sessionId", &req.session_id)?;
        require("token", &req.token)?;

        let session_id: SessionId = req
            .session_id
            .parse()
            .map_err(|_| AppError::SessionNotFound)?;

        let payment = self
            .repo
            .find_payment_by_session(session_id)
            .await
            .map_err(store_error(Operation::ConfirmPayment))?
            .ok_or(AppError::SessionNotFound)?;

        if !payment.is_pending() {
            info!(status = %payment.status, "Confirmation rejected: already processed");
            return Err(AppError::AlreadyProcessed);
        }

        if payment.is_expired_at(Utc::now()) {
            return self.expire(payment).await;
        }

        let stored = payment.token.as_deref().unwrap_or_default();
        if !verify_token(&req.token, stored) {
            info!("Confirmation rejected: invalid token");
            return Err(AppError::InvalidToken);
        }

        // Expiry is checked again at write time.
        let (client, payment) = match self.repo.complete_payment(session_id, Utc::now()).await {
            Ok(completed) => completed,
            Err(RepoError::Domain(DomainError::TokenExpired)) => return self.expire(payment).await,
            Err(e) => return Err(store_error(Operation::ConfirmPayment)(e)),
        };

        info!(client_id = %client.id, transaction_id = %payment.id, "Payment completed");
        self.queue.enqueue(
            &client.email,
            Notification::PaymentResult {
                full_name: client.full_name.clone(),
                amount: payment.amount.amount(),
                new_balance: Some(client.balance.amount()),
                success: true,
            },
        );

        Ok(PaymentConfirmedResponse {
            new_balance: client.balance.amount(),
            amount: payment.amount.amount(),
        })
    }

    /// Fails every overdue pending payment, up to `limit` of them.
    ///
    /// Returns how many payments this call moved to failed.
    #[instrument(skip(self))]
    pub async fn expire_overdue_payments(&self, limit: i64) -> Result<usize, RepoError> {
        let overdue = self.repo.list_expired_pending(Utc::now(), limit).await?;

        let mut expired = 0;
        for payment in overdue {
            if self.fail_and_notify(&payment).await? {
                expired += 1;
            }
        }
        Ok(expired)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    fn validate_amount(&self, amount: i64) -> Result<Money, AppError> {
        Money::movement(amount, self.policy.max_amount).map_err(AppError::from)
    }

    async fn find_client(
        &self,
        operation: Operation,
        document: &str,
        phone: &str,
    ) -> Result<Client, AppError> {
        require("document", document)?;
        require("phone", phone)?;

        self.repo
            .find_client_by_document_and_phone(document.trim(), phone.trim())
            .await
            .map_err(store_error(operation))?
            .ok_or(AppError::ClientNotFound)
    }

    /// Lazy expiry at confirmation time.
    async fn expire(&self, payment: Transaction) -> Result<PaymentConfirmedResponse, AppError> {
        let transitioned = self
            .fail_and_notify(&payment)
            .await
            .map_err(store_error(Operation::ConfirmPayment))?;

        if transitioned {
            info!("Confirmation rejected: token expired");
            Err(AppError::TokenExpired)
        } else {
            // Another request resolved the payment first.
            Err(AppError::AlreadyProcessed)
        }
    }

    /// Moves `payment` to failed and queues the failure notice if this call
    /// performed the transition.
    async fn fail_and_notify(&self, payment: &Transaction) -> Result<bool, RepoError> {
        let Some(session_id) = payment.session_id else {
            return Ok(false);
        };

        if !self.repo.fail_payment(session_id).await? {
            return Ok(false);
        }
        info!(%session_id, "Payment expired");

        match self.repo.get_client(payment.client_id).await {
            Ok(Some(client)) => self.queue.enqueue(
                &client.email,
                Notification::PaymentResult {
                    full_name: client.full_name,
                    amount: payment.amount.amount(),
                    new_balance: None,
                    success: false,
                },
            ),
            Ok(None) => warn!(client_id = %payment.client_id, "Owner of expired payment not found"),
            Err(e) => warn!(error = %e, "Could not load owner of expired payment"),
        }

        Ok(true)
    }
}

//! Background sweep that fails overdue pending payments.
//!
//! Confirmation already expires payments lazily; the reaper only keeps
//! abandoned sessions from sitting in `PENDING` forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument};

use wallet_types::LedgerRepository;

use crate::WalletService;

/// Maximum payments expired per tick.
pub const REAPER_BATCH: i64 = 100;

pub struct ExpiredPaymentReaper<R: LedgerRepository> {
    service: Arc<WalletService<R>>,
    period: Duration,
}

impl<R: LedgerRepository> ExpiredPaymentReaper<R> {
    /// Periods below one second are raised to one second.
    pub fn new(service: Arc<WalletService<R>>, period: Duration) -> Self {
        Self {
            service,
            period: period.max(Duration::from_secs(1)),
        }
    }

    /// Runs one sweep. Returns the number of payments expired.
    pub async fn sweep(&self) -> usize {
        match self.service.expire_overdue_payments(REAPER_BATCH).await {
            Ok(expired) => {
                if expired > 0 {
                    info!("Expired {} overdue payments", expired);
                }
                expired
            }
            Err(e) => {
                error!("Failed to expire overdue payments: {}", e);
                0
            }
        }
    }

    #[instrument(skip(self), fields(period_secs = self.period.as_secs()))]
    pub async fn run(self) {
        info!("Starting expired payment reaper");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }
}

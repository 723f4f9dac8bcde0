//! Follow-up email when an invoice becomes paid.

use crate::error::{Error, Result};
use crate::mail::Mailer;
use crate::templates::{payment_followup, ClinicInfo};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vetcare_core::{Invoice, InvoiceStatus, Tutor};
use vetcare_db::{Change, Next, Store};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CHANNEL_CAPACITY: usize = 64;

pub fn followup_key(invoice_id: &str) -> String {
    format!("followup:{invoice_id}:paid")
}

/// React to one invoice change. Returns whether an email went out.
///
/// Only an update that moves an invoice into Paid triggers the follow-up,
/// and only once per invoice.
pub async fn handle_invoice_change(
    store: &Store,
    mailer: &dyn Mailer,
    clinic: &ClinicInfo,
    change: &Change<Invoice>,
) -> Result<bool> {
    let Change::Updated { old, new } = change else {
        return Ok(false);
    };
    if old.status == InvoiceStatus::Paid || new.status != InvoiceStatus::Paid {
        return Ok(false);
    }

    let key = followup_key(&new.id);
    if store.reminder_sent(&key)? {
        debug!(invoice = %new.id, "follow-up already sent");
        return Ok(false);
    }

    let tutor = store
        .get::<Tutor>(&new.tutor_id)?
        .ok_or_else(|| Error::Skipped(format!("tutor {} not found", new.tutor_id)))?;
    mailer.send(&payment_followup(clinic, &tutor, new)).await?;
    store.record_reminder(&key, Utc::now())?;
    info!(invoice = %new.id, to = %tutor.email, "payment follow-up sent");
    Ok(true)
}

/// Background task feeding invoice changes into [`handle_invoice_change`].
///
/// The database watch channel is blocking, so it is drained on a blocking
/// thread and forwarded into a tokio channel.
pub struct InvoiceWatcher {
    handle: JoinHandle<()>,
}

impl InvoiceWatcher {
    /// Subscribe and start processing. Changes committed after this returns
    /// are observed.
    pub fn spawn(
        store: Arc<Store>,
        mailer: Arc<dyn Mailer>,
        clinic: ClinicInfo,
    ) -> Result<Self> {
        let subscription = store.subscribe::<Invoice>()?;
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

        let feed_store = store.clone();
        tokio::task::spawn_blocking(move || {
            loop {
                match subscription.next_timeout(POLL_INTERVAL) {
                    Next::Change(change) => {
                        if tx.blocking_send(change).is_err() {
                            break;
                        }
                    }
                    Next::Idle => {
                        if tx.is_closed() {
                            break;
                        }
                    }
                    Next::Closed => {
                        warn!("invoice watch closed by the database");
                        break;
                    }
                }
            }
            if let Err(e) = feed_store.unsubscribe(subscription.id()) {
                warn!(error = %e, "failed to remove invoice watcher");
            }
            debug!("invoice feed stopped");
        });

        let handle = tokio::spawn(async move {
            info!("invoice watcher started");
            while let Some(change) = rx.recv().await {
                let change = match change {
                    Ok(change) => change,
                    Err(e) => {
                        error!(error = %e, "undecodable invoice change");
                        continue;
                    }
                };
                if let Err(e) = handle_invoice_change(&store, mailer.as_ref(), &clinic, &change).await
                {
                    error!(error = %e, "payment follow-up failed");
                }
            }
        });

        Ok(Self { handle })
    }

    /// Stop processing; the feed thread exits on its next poll.
    pub fn stop(self) {
        self.handle.abort();
    }
}

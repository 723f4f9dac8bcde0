//! Daily trigger for the reminder scan.

use crate::mail::Mailer;
use crate::reminders::run_reminder_scan;
use crate::templates::ClinicInfo;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vetcare_db::Store;

/// First instant strictly after `now` at `hour`:00 UTC
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Run the reminder scan every day at `hour` UTC until the task is aborted.
pub fn spawn_daily_reminders(
    store: Arc<Store>,
    mailer: Arc<dyn Mailer>,
    clinic: ClinicInfo,
    hour: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, hour);
            info!(next_run = %next, "reminder scan scheduled");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let today = Utc::now().date_naive();
            if let Err(e) = run_reminder_scan(&store, mailer.as_ref(), &clinic, today).await {
                error!(error = %e, "reminder scan failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_run_after() {
        let at = |d, h, m| Utc.with_ymd_and_hms(2024, 6, d, h, m, 0).unwrap();
        assert_eq!(next_run_after(at(1, 6, 30), 8), at(1, 8, 0));
        assert_eq!(next_run_after(at(1, 8, 0), 8), at(2, 8, 0));
        assert_eq!(next_run_after(at(1, 23, 59), 8), at(2, 8, 0));
        assert_eq!(next_run_after(at(1, 6, 30), 99), at(1, 23, 0));
    }
}

//! The sweep pass itself.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use sentra_contracts::{
    activity::ActivityEntry,
    error::SentraError,
    event::EmployeeId,
    settings::{SettingId, TimeBounded},
};
use sentra_core::traits::{ActivitySink, ExpiryStore};

/// What one sweep pass did.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub monitoring_deactivated: usize,
    pub logging_deactivated: usize,
    pub restrictions_deactivated: usize,
    /// Per-row failures; the sweep continued past each one.
    pub errors: Vec<SentraError>,
}

impl SweepReport {
    pub fn total_deactivated(&self) -> usize {
        self.monitoring_deactivated + self.logging_deactivated + self.restrictions_deactivated
    }
}

/// Deactivates expired settings and records each deactivation in the
/// activity log.
pub struct ExpirySweeper {
    store: Arc<dyn ExpiryStore>,
    activity: Arc<dyn ActivitySink>,
    item_timeout: StdDuration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn ExpiryStore>, activity: Arc<dyn ActivitySink>) -> Self {
        Self {
            store,
            activity,
            item_timeout: StdDuration::from_secs(30),
        }
    }

    /// Bound on a single row's deactivation (and its activity write). A
    /// store call exceeding it is recorded as a sweep error and the sweep
    /// moves on; the worker thread is abandoned.
    pub fn with_item_timeout(mut self, timeout: StdDuration) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Run one sweep pass at `now`.
    ///
    /// Queries each setting table for active rows whose `end_time` has
    /// passed and deactivates them one at a time. A failure on one row is
    /// collected into the report and the sweep moves on.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for setting in self.store.expired_monitoring(now) {
            let store = Arc::clone(&self.store);
            if self.deactivate_one(&setting, "monitoring_expired", now, &mut report, move |id| {
                store.deactivate_monitoring(id, now)
            }) {
                report.monitoring_deactivated += 1;
            }
        }

        for setting in self.store.expired_logging(now) {
            let store = Arc::clone(&self.store);
            if self.deactivate_one(&setting, "logging_expired", now, &mut report, move |id| {
                store.deactivate_logging(id, now)
            }) {
                report.logging_deactivated += 1;
            }
        }

        for restriction in self.store.expired_restrictions(now) {
            let store = Arc::clone(&self.store);
            if self.deactivate_one(&restriction, "restriction_expired", now, &mut report, move |id| {
                store.deactivate_restriction(id, now)
            }) {
                report.restrictions_deactivated += 1;
            }
        }

        if report.total_deactivated() > 0 || !report.errors.is_empty() {
            info!(
                monitoring = report.monitoring_deactivated,
                logging = report.logging_deactivated,
                restrictions = report.restrictions_deactivated,
                errors = report.errors.len(),
                "sweep complete"
            );
        }

        report
    }

    /// Deactivate one row and leave its activity entry, each bounded by
    /// the per-row timeout. Returns whether the deactivation itself
    /// succeeded.
    fn deactivate_one<S, F>(
        &self,
        setting: &S,
        category: &str,
        now: DateTime<Utc>,
        report: &mut SweepReport,
        apply: F,
    ) -> bool
    where
        S: TimeBounded,
        F: FnOnce(SettingId) -> Result<(), SentraError> + Send + 'static,
    {
        let id = setting.setting_id();
        if let Err(e) = run_bounded(id, self.item_timeout, move || apply(id)) {
            warn!(setting = %id, category, error = %e, "sweep deactivation failed");
            report.errors.push(e);
            return false;
        }

        // A failed activity write is reported but leaves the deactivation
        // in place.
        let activity = Arc::clone(&self.activity);
        let entry = expiry_entry(setting.subject(), id, setting.end_time(), category, now);
        if let Err(e) = run_bounded(id, self.item_timeout, move || activity.record(entry)) {
            warn!(setting = %id, error = %e, "activity write failed during sweep");
            report.errors.push(e);
        }
        true
    }
}

fn expiry_entry(
    employee_id: &EmployeeId,
    id: SettingId,
    end_time: Option<DateTime<Utc>>,
    category: &str,
    now: DateTime<Utc>,
) -> ActivityEntry {
    ActivityEntry {
        employee_id: employee_id.clone(),
        category: category.to_string(),
        message: format!("setting {} expired and was deactivated", id),
        details: json!({ "setting_id": id, "end_time": end_time }),
        risk_score: None,
        risk_factors: vec![],
        recorded_at: now,
    }
}

/// Run one store call on a worker thread, bounded by `timeout`.
///
/// On timeout the worker is abandoned (its eventual result is discarded)
/// and the row is reported `SweepTimeout`; a hung store call cannot wedge
/// the rest of the sweep.
fn run_bounded<F>(setting: SettingId, timeout: StdDuration, op: F) -> Result<(), SentraError>
where
    F: FnOnce() -> Result<(), SentraError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone after a timeout; a send error is fine.
        let _ = tx.send(op());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(SentraError::SweepTimeout {
            setting: setting.to_string(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use sentra_contracts::settings::{
        AccessRestriction, LoggingSetting, MonitoringSetting, NewRestriction, NewSetting,
        SettingProvenance,
    };
    use sentra_core::traits::SettingsSink;
    use sentra_store::{ChainedActivityLog, InMemorySettingsStore};

    use super::*;

    fn new_setting(employee: &str, end_time: Option<DateTime<Utc>>) -> NewSetting {
        NewSetting {
            employee_id: EmployeeId::new(employee),
            end_time,
            reason: "elevated risk".to_string(),
            provenance: SettingProvenance::default(),
            config: json!({}),
        }
    }

    fn sweeper() -> (Arc<InMemorySettingsStore>, Arc<ChainedActivityLog>, ExpirySweeper) {
        let store = Arc::new(InMemorySettingsStore::new());
        let activity = Arc::new(ChainedActivityLog::new());
        let sweeper = ExpirySweeper::new(store.clone(), activity.clone());
        (store, activity, sweeper)
    }

    #[test]
    fn test_sweep_deactivates_only_expired_rows() {
        let (store, activity, sweeper) = sweeper();
        let now = Utc::now();

        store
            .upsert_monitoring(new_setting("expired", Some(now + Duration::hours(1))), now)
            .unwrap();
        store
            .upsert_monitoring(new_setting("current", Some(now + Duration::hours(48))), now)
            .unwrap();
        store
            .upsert_logging(new_setting("indefinite", None), now)
            .unwrap();

        let report = sweeper.sweep(now + Duration::hours(2));

        assert_eq!(report.monitoring_deactivated, 1);
        assert_eq!(report.logging_deactivated, 0);
        assert!(report.errors.is_empty());

        let monitoring = store.monitoring();
        assert!(!monitoring.iter().find(|s| s.employee_id == EmployeeId::new("expired")).unwrap().is_active);
        assert!(monitoring.iter().find(|s| s.employee_id == EmployeeId::new("current")).unwrap().is_active);

        // One activity entry per deactivation, on an intact chain.
        let entries = activity.all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry.category, "monitoring_expired");
        assert!(activity.verify_integrity());
    }

    #[test]
    fn test_second_sweep_is_a_no_op() {
        let (store, activity, sweeper) = sweeper();
        let now = Utc::now();

        store
            .upsert_monitoring(new_setting("e1", Some(now + Duration::hours(1))), now)
            .unwrap();

        let later = now + Duration::hours(2);
        assert_eq!(sweeper.sweep(later).total_deactivated(), 1);
        assert_eq!(sweeper.sweep(later).total_deactivated(), 0);
        assert_eq!(activity.all().len(), 1);
    }

    #[test]
    fn test_sweep_covers_all_three_tables() {
        let (store, _activity, sweeper) = sweeper();
        let now = Utc::now();
        let end = Some(now + Duration::hours(1));

        store.upsert_monitoring(new_setting("e1", end), now).unwrap();
        store.upsert_logging(new_setting("e1", end), now).unwrap();
        store
            .insert_restriction(
                NewRestriction {
                    employee_id: EmployeeId::new("e1"),
                    restriction_type: "vpn".to_string(),
                    end_time: end,
                    reason: "policy".to_string(),
                    pending_override_review: false,
                    provenance: SettingProvenance::default(),
                },
                now,
            )
            .unwrap();

        let report = sweeper.sweep(now + Duration::hours(2));
        assert_eq!(report.monitoring_deactivated, 1);
        assert_eq!(report.logging_deactivated, 1);
        assert_eq!(report.restrictions_deactivated, 1);

        // The restriction's removal instant is stamped.
        assert!(store.restrictions()[0].removed_at.is_some());
    }

    /// A store implementation that hangs on deactivation, as if its
    /// backing database stopped answering mid-sweep.
    struct HangingStore {
        setting: MonitoringSetting,
    }

    impl ExpiryStore for HangingStore {
        fn expired_monitoring(&self, _now: DateTime<Utc>) -> Vec<MonitoringSetting> {
            vec![self.setting.clone()]
        }
        fn expired_logging(&self, _now: DateTime<Utc>) -> Vec<LoggingSetting> {
            vec![]
        }
        fn expired_restrictions(&self, _now: DateTime<Utc>) -> Vec<AccessRestriction> {
            vec![]
        }
        fn deactivate_monitoring(
            &self,
            _id: SettingId,
            _now: DateTime<Utc>,
        ) -> Result<(), SentraError> {
            std::thread::sleep(std::time::Duration::from_secs(5));
            Ok(())
        }
        fn deactivate_logging(&self, _id: SettingId, _now: DateTime<Utc>) -> Result<(), SentraError> {
            Ok(())
        }
        fn deactivate_restriction(
            &self,
            _id: SettingId,
            _now: DateTime<Utc>,
        ) -> Result<(), SentraError> {
            Ok(())
        }
    }

    #[test]
    fn test_hung_store_call_does_not_wedge_the_sweep() {
        let now = Utc::now();
        let store = Arc::new(HangingStore {
            setting: MonitoringSetting {
                id: SettingId::new(),
                employee_id: EmployeeId::new("e1"),
                start_time: now - Duration::hours(2),
                end_time: Some(now - Duration::hours(1)),
                is_active: true,
                reason: "elevated risk".to_string(),
                provenance: SettingProvenance::default(),
                config: json!({}),
                updated_at: now,
            },
        });
        let activity = Arc::new(ChainedActivityLog::new());
        let sweeper = ExpirySweeper::new(store, activity.clone())
            .with_item_timeout(std::time::Duration::from_millis(50));

        let report = sweeper.sweep(now);

        // The hung row is an error, not a deactivation, and the sweep
        // returned rather than blocking on it.
        assert_eq!(report.monitoring_deactivated, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], SentraError::SweepTimeout { .. }));
        assert!(activity.all().is_empty());
    }

    #[test]
    fn test_boundary_end_time_is_expired() {
        let (store, _activity, sweeper) = sweeper();
        let now = Utc::now();

        store.upsert_monitoring(new_setting("e1", Some(now)), now).unwrap();
        // end_time == now counts as expired.
        assert_eq!(sweeper.sweep(now).total_deactivated(), 1);
    }
}

//! In-memory store for the three time-bounded setting tables.
//!
//! Monitoring and logging are upserts: one active row per subject, and a
//! policy re-triggering the same setting extends it in place instead of
//! piling up rows. Access restrictions stack; each insert is a new row.
//!
//! The store implements two seams: `SettingsSink` for action handlers and
//! `ExpiryStore` for the sweeper. Expiry never deletes; rows are
//! deactivated in place and remain on the audit surface.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use sentra_contracts::{
    error::{SentraError, SentraResult},
    event::EmployeeId,
    settings::{
        AccessRestriction, LoggingSetting, MonitoringSetting, NewRestriction, NewSetting,
        SettingId, TimeBounded,
    },
};
use sentra_core::traits::{ExpiryStore, SettingsSink};

struct SettingsState {
    monitoring: Vec<MonitoringSetting>,
    logging: Vec<LoggingSetting>,
    restrictions: Vec<AccessRestriction>,
}

/// One store for all three setting tables.
pub struct InMemorySettingsStore {
    state: Mutex<SettingsState>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SettingsState {
                monitoring: Vec::new(),
                logging: Vec::new(),
                restrictions: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> SentraResult<std::sync::MutexGuard<'_, SettingsState>> {
        self.state.lock().map_err(|e| SentraError::StoreWrite {
            reason: format!("settings store lock poisoned: {}", e),
        })
    }

    pub fn monitoring(&self) -> Vec<MonitoringSetting> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .monitoring
            .clone()
    }

    pub fn logging(&self) -> Vec<LoggingSetting> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .logging
            .clone()
    }

    pub fn restrictions(&self) -> Vec<AccessRestriction> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .restrictions
            .clone()
    }

    /// Active restrictions currently in force for a subject.
    pub fn active_restrictions(&self, employee_id: &EmployeeId) -> Vec<AccessRestriction> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .restrictions
            .iter()
            .filter(|r| r.is_active && r.employee_id == *employee_id)
            .cloned()
            .collect()
    }

    /// Manual revocation of a restriction, outside the sweeper's expiry
    /// path. Also stamps `removed_at`.
    pub fn revoke_restriction(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()> {
        let mut state = self.lock()?;
        let restriction = state
            .restrictions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SentraError::StoreWrite {
                reason: format!("no restriction with id {}", id),
            })?;
        restriction.is_active = false;
        restriction.removed_at = Some(now);
        restriction.updated_at = now;
        info!(restriction = %id, "restriction manually revoked");
        Ok(())
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSink for InMemorySettingsStore {
    fn upsert_monitoring(
        &self,
        new: NewSetting,
        now: DateTime<Utc>,
    ) -> SentraResult<MonitoringSetting> {
        let mut state = self.lock()?;

        // Extend the existing active row rather than duplicating it.
        if let Some(existing) = state
            .monitoring
            .iter_mut()
            .find(|s| s.is_active && s.employee_id == new.employee_id)
        {
            existing.end_time = match (existing.end_time, new.end_time) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            };
            existing.reason = new.reason;
            existing.provenance = new.provenance;
            existing.config = new.config;
            existing.updated_at = now;
            debug!(setting = %existing.id, "monitoring setting extended");
            return Ok(existing.clone());
        }

        let setting = MonitoringSetting {
            id: SettingId::new(),
            employee_id: new.employee_id,
            start_time: now,
            end_time: new.end_time,
            is_active: true,
            reason: new.reason,
            provenance: new.provenance,
            config: new.config,
            updated_at: now,
        };
        state.monitoring.push(setting.clone());
        Ok(setting)
    }

    fn upsert_logging(&self, new: NewSetting, now: DateTime<Utc>) -> SentraResult<LoggingSetting> {
        let mut state = self.lock()?;

        if let Some(existing) = state
            .logging
            .iter_mut()
            .find(|s| s.is_active && s.employee_id == new.employee_id)
        {
            existing.end_time = match (existing.end_time, new.end_time) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            };
            existing.reason = new.reason;
            existing.provenance = new.provenance;
            existing.config = new.config;
            existing.updated_at = now;
            debug!(setting = %existing.id, "logging setting extended");
            return Ok(existing.clone());
        }

        let setting = LoggingSetting {
            id: SettingId::new(),
            employee_id: new.employee_id,
            start_time: now,
            end_time: new.end_time,
            is_active: true,
            reason: new.reason,
            provenance: new.provenance,
            config: new.config,
            updated_at: now,
        };
        state.logging.push(setting.clone());
        Ok(setting)
    }

    fn insert_restriction(
        &self,
        new: NewRestriction,
        now: DateTime<Utc>,
    ) -> SentraResult<AccessRestriction> {
        let mut state = self.lock()?;
        let restriction = AccessRestriction {
            id: SettingId::new(),
            employee_id: new.employee_id,
            restriction_type: new.restriction_type,
            start_time: now,
            end_time: new.end_time,
            is_active: true,
            reason: new.reason,
            pending_override_review: new.pending_override_review,
            removed_at: None,
            provenance: new.provenance,
            updated_at: now,
        };
        state.restrictions.push(restriction.clone());
        Ok(restriction)
    }
}

impl ExpiryStore for InMemorySettingsStore {
    fn expired_monitoring(&self, now: DateTime<Utc>) -> Vec<MonitoringSetting> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .monitoring
            .iter()
            .filter(|s| s.is_expired_at(now))
            .cloned()
            .collect()
    }

    fn expired_logging(&self, now: DateTime<Utc>) -> Vec<LoggingSetting> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .logging
            .iter()
            .filter(|s| s.is_expired_at(now))
            .cloned()
            .collect()
    }

    fn expired_restrictions(&self, now: DateTime<Utc>) -> Vec<AccessRestriction> {
        self.state
            .lock()
            .expect("settings store lock poisoned")
            .restrictions
            .iter()
            .filter(|r| r.is_expired_at(now))
            .cloned()
            .collect()
    }

    fn deactivate_monitoring(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()> {
        let mut state = self.lock()?;
        let setting = state
            .monitoring
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SentraError::StoreWrite {
                reason: format!("no monitoring setting with id {}", id),
            })?;
        setting.is_active = false;
        setting.updated_at = now;
        Ok(())
    }

    fn deactivate_logging(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()> {
        let mut state = self.lock()?;
        let setting = state
            .logging
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SentraError::StoreWrite {
                reason: format!("no logging setting with id {}", id),
            })?;
        setting.is_active = false;
        setting.updated_at = now;
        Ok(())
    }

    fn deactivate_restriction(&self, id: SettingId, now: DateTime<Utc>) -> SentraResult<()> {
        let mut state = self.lock()?;
        let restriction = state
            .restrictions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SentraError::StoreWrite {
                reason: format!("no restriction with id {}", id),
            })?;
        restriction.is_active = false;
        restriction.removed_at = Some(now);
        restriction.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use sentra_contracts::settings::SettingProvenance;

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

    #[test]
    fn test_monitoring_upsert_extends_instead_of_duplicating() {
        let store = InMemorySettingsStore::new();
        let now = Utc::now();

        let first = store
            .upsert_monitoring(new_setting("e1", Some(now + Duration::hours(24))), now)
            .unwrap();
        let second = store
            .upsert_monitoring(new_setting("e1", Some(now + Duration::hours(72))), now)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.monitoring().len(), 1);
        assert_eq!(second.end_time, Some(now + Duration::hours(72)));
    }

    #[test]
    fn test_upsert_never_shortens_the_window() {
        let store = InMemorySettingsStore::new();
        let now = Utc::now();

        store
            .upsert_monitoring(new_setting("e1", Some(now + Duration::hours(72))), now)
            .unwrap();
        let extended = store
            .upsert_monitoring(new_setting("e1", Some(now + Duration::hours(24))), now)
            .unwrap();
        assert_eq!(extended.end_time, Some(now + Duration::hours(72)));

        // Indefinite wins over any bound.
        let indefinite = store.upsert_monitoring(new_setting("e1", None), now).unwrap();
        assert_eq!(indefinite.end_time, None);
    }

    #[test]
    fn test_restrictions_stack() {
        let store = InMemorySettingsStore::new();
        let now = Utc::now();
        let employee = EmployeeId::new("e1");

        for kind in ["file_share", "email_external"] {
            store
                .insert_restriction(
                    NewRestriction {
                        employee_id: employee.clone(),
                        restriction_type: kind.to_string(),
                        end_time: None,
                        reason: "policy".to_string(),
                        pending_override_review: false,
                        provenance: SettingProvenance::default(),
                    },
                    now,
                )
                .unwrap();
        }

        assert_eq!(store.active_restrictions(&employee).len(), 2);
    }

    #[test]
    fn test_expiry_queries_and_deactivation() {
        let store = InMemorySettingsStore::new();
        let now = Utc::now();

        let bounded = store
            .upsert_monitoring(new_setting("e1", Some(now + Duration::hours(1))), now)
            .unwrap();
        store.upsert_monitoring(new_setting("e2", None), now).unwrap();

        let later = now + Duration::hours(2);
        let expired = store.expired_monitoring(later);
        assert_eq!(expired.len(), 1, "indefinite settings never expire");
        assert_eq!(expired[0].id, bounded.id);

        store.deactivate_monitoring(bounded.id, later).unwrap();
        assert!(store.expired_monitoring(later).is_empty());
        // Deactivation keeps the row visible.
        assert_eq!(store.monitoring().len(), 2);
    }

    #[test]
    fn test_restriction_deactivation_stamps_removed_at() {
        let store = InMemorySettingsStore::new();
        let now = Utc::now();

        let restriction = store
            .insert_restriction(
                NewRestriction {
                    employee_id: EmployeeId::new("e1"),
                    restriction_type: "vpn".to_string(),
                    end_time: Some(now + Duration::hours(1)),
                    reason: "policy".to_string(),
                    pending_override_review: true,
                    provenance: SettingProvenance::default(),
                },
                now,
            )
            .unwrap();

        let later = now + Duration::hours(2);
        store.deactivate_restriction(restriction.id, later).unwrap();
        let stored = &store.restrictions()[0];
        assert!(!stored.is_active);
        assert_eq!(stored.removed_at, Some(later));
    }
}

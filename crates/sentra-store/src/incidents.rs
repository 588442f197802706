//! In-memory incident store.
//!
//! Owns incident rows, their append-only `IncidentUpdate` history, and the
//! `INC-<year>-<seq>` numbering counters. Lifecycle rules are delegated to
//! `sentra-incident`; this store adds persistence, lookup, and the manual
//! transition surface analysts use.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use sentra_contracts::{
    error::{SentraError, SentraResult},
    event::EmployeeId,
    incident::{
        EscalationLevel, Incident, IncidentId, IncidentStatus, IncidentUpdate, NewIncident,
    },
};
use sentra_core::traits::IncidentSink;
use sentra_incident::machine;

struct IncidentState {
    incidents: Vec<Incident>,
    updates: Vec<IncidentUpdate>,
    /// Next sequence number per calendar year.
    counters: HashMap<i32, u32>,
}

/// An in-memory incident store with per-year incident numbering.
pub struct InMemoryIncidentStore {
    state: Mutex<IncidentState>,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IncidentState {
                incidents: Vec::new(),
                updates: Vec::new(),
                counters: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> SentraResult<std::sync::MutexGuard<'_, IncidentState>> {
        self.state.lock().map_err(|e| SentraError::StoreWrite {
            reason: format!("incident store lock poisoned: {}", e),
        })
    }

    pub fn get(&self, id: IncidentId) -> Option<Incident> {
        self.state
            .lock()
            .expect("incident store lock poisoned")
            .incidents
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Incident> {
        self.state
            .lock()
            .expect("incident store lock poisoned")
            .incidents
            .clone()
    }

    /// Update history for one incident, in the order changes were applied.
    pub fn history(&self, id: IncidentId) -> Vec<IncidentUpdate> {
        self.state
            .lock()
            .expect("incident store lock poisoned")
            .updates
            .iter()
            .filter(|u| u.incident_id == id)
            .cloned()
            .collect()
    }

    /// Apply a lifecycle transition under the store lock and persist the
    /// resulting update rows.
    fn transition<F>(&self, id: IncidentId, apply: F) -> SentraResult<Incident>
    where
        F: FnOnce(&mut Incident) -> SentraResult<Vec<IncidentUpdate>>,
    {
        let mut state = self.lock()?;
        let incident = state
            .incidents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| SentraError::IncidentState {
                reason: format!("no incident with id {}", id),
            })?;
        let updates = apply(incident)?;
        let result = incident.clone();
        state.updates.extend(updates);
        Ok(result)
    }

    // ── Manual surface ────────────────────────────────────────────────────────

    pub fn begin_investigation(
        &self,
        id: IncidentId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> SentraResult<Incident> {
        self.transition(id, |i| machine::begin_investigation(i, actor, now))
    }

    pub fn resolve(
        &self,
        id: IncidentId,
        notes: &str,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> SentraResult<Incident> {
        self.transition(id, |i| machine::resolve(i, notes, resolved_by, now))
    }

    pub fn close(&self, id: IncidentId, actor: &str, now: DateTime<Utc>) -> SentraResult<Incident> {
        self.transition(id, |i| machine::close(i, actor, now))
    }

    /// Manual escalation, permitted to lower the level.
    pub fn escalate_manual(
        &self,
        id: IncidentId,
        to: EscalationLevel,
        actor: &str,
        now: DateTime<Utc>,
    ) -> SentraResult<Incident> {
        self.transition(id, |i| machine::escalate(i, to, true, actor, now))
    }

    pub fn assign(
        &self,
        id: IncidentId,
        assignee: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> SentraResult<Incident> {
        self.transition(id, |i| {
            let update = IncidentUpdate {
                incident_id: i.id,
                field: "assigned_to".to_string(),
                old_value: i.assigned_to.clone().unwrap_or_default(),
                new_value: assignee.to_string(),
                actor: actor.to_string(),
                changed_at: now,
            };
            i.assigned_to = Some(assignee.to_string());
            i.updated_at = now;
            Ok(vec![update])
        })
    }
}

impl Default for InMemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentSink for InMemoryIncidentStore {
    fn create_incident(&self, new: NewIncident, now: DateTime<Utc>) -> SentraResult<Incident> {
        let mut state = self.lock()?;

        let year = now.year();
        let seq = state.counters.entry(year).or_insert(0);
        *seq += 1;
        let incident_number = format!("INC-{}-{:04}", year, seq);

        let escalation = new
            .escalation
            .unwrap_or_else(|| EscalationLevel::for_severity(new.severity));

        let incident = Incident {
            id: IncidentId::new(),
            incident_number: incident_number.clone(),
            title: new.title,
            description: new.description,
            severity: new.severity,
            status: IncidentStatus::Open,
            escalation,
            employee_id: new.employee_id,
            policy_id: new.policy_id,
            violation_id: new.violation_id,
            assigned_to: None,
            resolution_notes: None,
            resolved_by: None,
            resolved_at: None,
            escalated_at: None,
            escalated_to: None,
            created_at: now,
            updated_at: now,
        };
        state.incidents.push(incident.clone());
        info!(incident = %incident_number, severity = %incident.severity, "incident stored");
        Ok(incident)
    }

    fn find_open(&self, employee_id: &EmployeeId) -> Option<Incident> {
        self.state
            .lock()
            .expect("incident store lock poisoned")
            .incidents
            .iter()
            .find(|i| i.employee_id == *employee_id && i.status.is_open())
            .cloned()
    }

    fn escalate(
        &self,
        id: IncidentId,
        to: EscalationLevel,
        actor: &str,
        now: DateTime<Utc>,
    ) -> SentraResult<Incident> {
        self.transition(id, |i| machine::escalate(i, to, false, actor, now))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use sentra_contracts::incident::IncidentSeverity;

    use super::*;

    fn new_incident(employee: &str, severity: IncidentSeverity) -> NewIncident {
        NewIncident {
            title: "t".to_string(),
            description: "d".to_string(),
            severity,
            escalation: None,
            employee_id: EmployeeId::new(employee),
            policy_id: None,
            violation_id: None,
        }
    }

    #[test]
    fn test_numbering_counts_per_year() {
        let store = InMemoryIncidentStore::new();
        let in_2025 = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let in_2026 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let a = store
            .create_incident(new_incident("e1", IncidentSeverity::Low), in_2025)
            .unwrap();
        let b = store
            .create_incident(new_incident("e2", IncidentSeverity::Low), in_2025)
            .unwrap();
        let c = store
            .create_incident(new_incident("e3", IncidentSeverity::Low), in_2026)
            .unwrap();

        assert_eq!(a.incident_number, "INC-2025-0001");
        assert_eq!(b.incident_number, "INC-2025-0002");
        assert_eq!(c.incident_number, "INC-2026-0001");
    }

    #[test]
    fn test_default_escalation_derives_from_severity() {
        let store = InMemoryIncidentStore::new();
        let now = Utc::now();

        let critical = store
            .create_incident(new_incident("e1", IncidentSeverity::Critical), now)
            .unwrap();
        assert_eq!(critical.escalation, EscalationLevel::Immediate);

        let low = store
            .create_incident(new_incident("e2", IncidentSeverity::Low), now)
            .unwrap();
        assert_eq!(low.escalation, EscalationLevel::Normal);
    }

    #[test]
    fn test_find_open_ignores_resolved() {
        let store = InMemoryIncidentStore::new();
        let now = Utc::now();
        let employee = EmployeeId::new("e1");

        let inc = store
            .create_incident(new_incident("e1", IncidentSeverity::High), now)
            .unwrap();
        assert!(store.find_open(&employee).is_some());

        store.resolve(inc.id, "cleared", "analyst-1", now).unwrap();
        assert!(store.find_open(&employee).is_none());
    }

    #[test]
    fn test_transitions_append_history() {
        let store = InMemoryIncidentStore::new();
        let now = Utc::now();

        let inc = store
            .create_incident(new_incident("e1", IncidentSeverity::High), now)
            .unwrap();
        store.begin_investigation(inc.id, "analyst-1", now).unwrap();
        store
            .escalate(inc.id, EscalationLevel::Critical, "policy-engine", now)
            .unwrap();
        store.resolve(inc.id, "handled", "analyst-1", now).unwrap();

        let history = store.history(inc.id);
        let fields: Vec<&str> = history.iter().map(|u| u.field.as_str()).collect();
        assert_eq!(fields, vec!["status", "escalation", "status"]);
    }

    #[test]
    fn test_sink_escalation_is_monotonic() {
        let store = InMemoryIncidentStore::new();
        let now = Utc::now();
        let inc = store
            .create_incident(new_incident("e1", IncidentSeverity::Critical), now)
            .unwrap();

        // Immediate -> High is a no-op through the sink.
        let after = store
            .escalate(inc.id, EscalationLevel::High, "policy-engine", now)
            .unwrap();
        assert_eq!(after.escalation, EscalationLevel::Immediate);
        assert!(store.history(inc.id).is_empty());

        // The manual surface may lower it.
        let lowered = store
            .escalate_manual(inc.id, EscalationLevel::Normal, "analyst-1", now)
            .unwrap();
        assert_eq!(lowered.escalation, EscalationLevel::Normal);
    }

    /// A poisoned store must fail loudly: if `find_open` answered `None`
    /// it would read as "no open incident" and the caller would open a
    /// duplicate instead of escalating.
    #[test]
    fn test_poisoned_lock_fails_loudly_on_lookup() {
        let store = InMemoryIncidentStore::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.state.lock().unwrap();
            panic!("poison the incident store");
        }));

        let lookup = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.find_open(&EmployeeId::new("e1"))
        }));
        assert!(lookup.is_err());

        let get = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.get(IncidentId::new())
        }));
        assert!(get.is_err());
    }
}

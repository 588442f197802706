//! Incident lifecycle transitions.
//!
//! Every function mutates the incident in place and returns the
//! `IncidentUpdate` audit rows describing what changed. A forbidden
//! transition returns `SentraError::IncidentState` and leaves the incident
//! untouched.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use sentra_contracts::{
    error::{SentraError, SentraResult},
    incident::{EscalationLevel, Incident, IncidentStatus, IncidentUpdate},
};

fn status_update(
    incident: &Incident,
    from: IncidentStatus,
    to: IncidentStatus,
    actor: &str,
    now: DateTime<Utc>,
) -> IncidentUpdate {
    IncidentUpdate {
        incident_id: incident.id,
        field: "status".to_string(),
        old_value: from.to_string(),
        new_value: to.to_string(),
        actor: actor.to_string(),
        changed_at: now,
    }
}

fn forbidden(incident: &Incident, attempted: &str) -> SentraError {
    SentraError::IncidentState {
        reason: format!(
            "incident {} is '{}'; cannot {}",
            incident.incident_number, incident.status, attempted
        ),
    }
}

/// `Open -> Investigating`.
pub fn begin_investigation(
    incident: &mut Incident,
    actor: &str,
    now: DateTime<Utc>,
) -> SentraResult<Vec<IncidentUpdate>> {
    if incident.status != IncidentStatus::Open {
        return Err(forbidden(incident, "begin investigation"));
    }
    let update = status_update(
        incident,
        IncidentStatus::Open,
        IncidentStatus::Investigating,
        actor,
        now,
    );
    incident.status = IncidentStatus::Investigating;
    incident.updated_at = now;
    info!(incident = %incident.incident_number, actor, "investigation started");
    Ok(vec![update])
}

/// `Open | Investigating -> Resolved`.
///
/// Resolution notes are mandatory and recorded once; the resolver and
/// resolution instant are stamped on the incident.
pub fn resolve(
    incident: &mut Incident,
    notes: &str,
    resolved_by: &str,
    now: DateTime<Utc>,
) -> SentraResult<Vec<IncidentUpdate>> {
    if !incident.status.is_open() {
        return Err(forbidden(incident, "resolve"));
    }
    if notes.trim().is_empty() {
        return Err(SentraError::IncidentState {
            reason: format!(
                "incident {} cannot be resolved without resolution notes",
                incident.incident_number
            ),
        });
    }
    let update = status_update(incident, incident.status, IncidentStatus::Resolved, resolved_by, now);
    incident.status = IncidentStatus::Resolved;
    incident.resolution_notes = Some(notes.to_string());
    incident.resolved_by = Some(resolved_by.to_string());
    incident.resolved_at = Some(now);
    incident.updated_at = now;
    info!(incident = %incident.incident_number, resolved_by, "incident resolved");
    Ok(vec![update])
}

/// `Resolved -> Closed`. Closed is terminal.
pub fn close(
    incident: &mut Incident,
    actor: &str,
    now: DateTime<Utc>,
) -> SentraResult<Vec<IncidentUpdate>> {
    if incident.status != IncidentStatus::Resolved {
        return Err(forbidden(incident, "close"));
    }
    let update = status_update(
        incident,
        IncidentStatus::Resolved,
        IncidentStatus::Closed,
        actor,
        now,
    );
    incident.status = IncidentStatus::Closed;
    incident.updated_at = now;
    info!(incident = %incident.incident_number, actor, "incident closed");
    Ok(vec![update])
}

/// Raise (or, with `manual_override`, set) the escalation level of an open
/// incident.
///
/// Without the override, escalation is monotonic: a target at or below the
/// current level is a no-op and returns no update rows. Escalating a
/// resolved or closed incident is forbidden either way.
pub fn escalate(
    incident: &mut Incident,
    to: EscalationLevel,
    manual_override: bool,
    actor: &str,
    now: DateTime<Utc>,
) -> SentraResult<Vec<IncidentUpdate>> {
    if !incident.status.is_open() {
        return Err(forbidden(incident, "escalate"));
    }
    if !manual_override && to <= incident.escalation {
        debug!(
            incident = %incident.incident_number,
            current = %incident.escalation,
            requested = %to,
            "escalation no-op below current level"
        );
        return Ok(vec![]);
    }
    let update = IncidentUpdate {
        incident_id: incident.id,
        field: "escalation".to_string(),
        old_value: incident.escalation.to_string(),
        new_value: to.to_string(),
        actor: actor.to_string(),
        changed_at: now,
    };
    incident.escalation = to;
    incident.escalated_at = Some(now);
    incident.escalated_to = Some(to);
    incident.updated_at = now;
    info!(
        incident = %incident.incident_number,
        to = %to,
        manual_override,
        "incident escalated"
    );
    Ok(vec![update])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

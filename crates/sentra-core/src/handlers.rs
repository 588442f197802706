//! Built-in handlers for the six action types.
//!
//! Handlers validate their `config` field-by-field (a missing or
//! wrong-typed field falls back to a documented default — action configs
//! are author-facing and forgiving), perform exactly one logical side
//! effect through a sink trait, and return a result payload that lands on
//! the execution row.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use tracing::{debug, info};

use sentra_contracts::{
    activity::ActivityEntry,
    error::{SentraError, SentraResult},
    incident::{EscalationLevel, IncidentSeverity, NewIncident},
    notification::{NewNotification, NotificationPriority, NotificationTarget},
    settings::{NewRestriction, NewSetting, SettingProvenance},
};

use crate::traits::{
    ActionContext, ActionHandler, ActivitySink, IncidentSink, NotificationSink, SettingsSink,
};

// ── Config helpers ────────────────────────────────────────────────────────────

fn config_str<'a>(ctx: &'a ActionContext, key: &str) -> Option<&'a str> {
    ctx.action.config.get(key).and_then(|v| v.as_str())
}

fn config_u64(ctx: &ActionContext, key: &str) -> Option<u64> {
    ctx.action.config.get(key).and_then(|v| v.as_u64())
}

fn config_bool(ctx: &ActionContext, key: &str) -> bool {
    ctx.action
        .config
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// `duration_hours` in config bounds the setting; absent means indefinite.
fn end_time_from_config(ctx: &ActionContext) -> Option<chrono::DateTime<chrono::Utc>> {
    config_u64(ctx, "duration_hours").map(|h| ctx.now + Duration::hours(h as i64))
}

fn provenance(ctx: &ActionContext) -> SettingProvenance {
    SettingProvenance {
        policy_id: Some(ctx.policy.id),
        violation_id: ctx.event.violation_id,
        created_by: None,
    }
}

fn reason(ctx: &ActionContext) -> String {
    config_str(ctx, "reason")
        .map(String::from)
        .unwrap_or_else(|| format!("policy '{}' matched", ctx.policy.name))
}

// ── create_incident ───────────────────────────────────────────────────────────

/// Inserts an incident, or escalates the subject's already-open incident
/// when the new match carries strictly higher severity.
pub struct CreateIncidentHandler {
    incidents: Arc<dyn IncidentSink>,
}

impl CreateIncidentHandler {
    pub fn new(incidents: Arc<dyn IncidentSink>) -> Self {
        Self { incidents }
    }

    fn severity(ctx: &ActionContext) -> IncidentSeverity {
        config_str(ctx, "severity")
            .and_then(|s| serde_json::from_value(json!(s)).ok())
            .or(ctx.event.severity)
            .unwrap_or(IncidentSeverity::Medium)
    }
}

impl ActionHandler for CreateIncidentHandler {
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        let severity = Self::severity(ctx);

        // An already-open incident for the subject absorbs higher-severity
        // matches as escalations instead of piling up duplicates.
        if let Some(open) = self.incidents.find_open(&ctx.event.employee_id) {
            if severity > open.severity {
                let target = EscalationLevel::for_severity(severity);
                let escalated =
                    self.incidents
                        .escalate(open.id, target, "policy-engine", ctx.now)?;
                info!(
                    incident = %escalated.incident_number,
                    to = %escalated.escalation,
                    policy = %ctx.policy.name,
                    "escalated open incident instead of creating a duplicate"
                );
                return Ok(json!({
                    "escalated": true,
                    "incident_id": escalated.id,
                    "incident_number": escalated.incident_number,
                    "escalation": escalated.escalation,
                }));
            }
        }

        let escalation = config_str(ctx, "escalation")
            .and_then(|s| serde_json::from_value(json!(s)).ok());

        let incident = self.incidents.create_incident(
            NewIncident {
                title: config_str(ctx, "title")
                    .map(String::from)
                    .unwrap_or_else(|| format!("Policy triggered: {}", ctx.policy.name)),
                description: config_str(ctx, "description")
                    .map(String::from)
                    .unwrap_or_else(|| {
                        format!(
                            "Policy '{}' matched employee {} on event '{}'",
                            ctx.policy.name, ctx.event.employee_id, ctx.event.kind
                        )
                    }),
                severity,
                escalation,
                employee_id: ctx.event.employee_id.clone(),
                policy_id: Some(ctx.policy.id),
                violation_id: ctx.event.violation_id,
            },
            ctx.now,
        )?;

        info!(
            incident = %incident.incident_number,
            severity = %incident.severity,
            policy = %ctx.policy.name,
            "incident created"
        );

        Ok(json!({
            "escalated": false,
            "incident_id": incident.id,
            "incident_number": incident.incident_number,
            "severity": incident.severity,
        }))
    }
}

// ── enable_monitoring / enable_logging ────────────────────────────────────────

/// Upserts an enhanced monitoring setting for the subject.
pub struct EnableMonitoringHandler {
    settings: Arc<dyn SettingsSink>,
}

impl EnableMonitoringHandler {
    pub fn new(settings: Arc<dyn SettingsSink>) -> Self {
        Self { settings }
    }
}

impl ActionHandler for EnableMonitoringHandler {
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        let setting = self.settings.upsert_monitoring(
            NewSetting {
                employee_id: ctx.event.employee_id.clone(),
                end_time: end_time_from_config(ctx),
                reason: reason(ctx),
                provenance: provenance(ctx),
                config: ctx.action.config.clone(),
            },
            ctx.now,
        )?;
        debug!(setting = %setting.id, employee = %setting.employee_id, "monitoring enabled");
        Ok(json!({
            "setting_id": setting.id,
            "end_time": setting.end_time,
        }))
    }
}

/// Upserts a detailed logging setting for the subject.
pub struct EnableLoggingHandler {
    settings: Arc<dyn SettingsSink>,
}

impl EnableLoggingHandler {
    pub fn new(settings: Arc<dyn SettingsSink>) -> Self {
        Self { settings }
    }
}

impl ActionHandler for EnableLoggingHandler {
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        let setting = self.settings.upsert_logging(
            NewSetting {
                employee_id: ctx.event.employee_id.clone(),
                end_time: end_time_from_config(ctx),
                reason: reason(ctx),
                provenance: provenance(ctx),
                config: ctx.action.config.clone(),
            },
            ctx.now,
        )?;
        debug!(setting = %setting.id, employee = %setting.employee_id, "logging enabled");
        Ok(json!({
            "setting_id": setting.id,
            "end_time": setting.end_time,
        }))
    }
}

// ── restrict_access ───────────────────────────────────────────────────────────

/// Inserts an access restriction. With `override_requires_approval` set in
/// config, the restriction is active immediately but flagged for override
/// review.
pub struct RestrictAccessHandler {
    settings: Arc<dyn SettingsSink>,
}

impl RestrictAccessHandler {
    pub fn new(settings: Arc<dyn SettingsSink>) -> Self {
        Self { settings }
    }
}

impl ActionHandler for RestrictAccessHandler {
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        let restriction = self.settings.insert_restriction(
            NewRestriction {
                employee_id: ctx.event.employee_id.clone(),
                restriction_type: config_str(ctx, "restriction_type")
                    .unwrap_or("all")
                    .to_string(),
                end_time: end_time_from_config(ctx),
                reason: reason(ctx),
                pending_override_review: config_bool(ctx, "override_requires_approval"),
                provenance: provenance(ctx),
            },
            ctx.now,
        )?;
        info!(
            restriction = %restriction.id,
            employee = %restriction.employee_id,
            kind = %restriction.restriction_type,
            pending_review = restriction.pending_override_review,
            "access restricted"
        );
        Ok(json!({
            "restriction_id": restriction.id,
            "restriction_type": restriction.restriction_type,
            "pending_override_review": restriction.pending_override_review,
        }))
    }
}

// ── send_notification ─────────────────────────────────────────────────────────

/// Inserts a notification row. Delivery to email/chat is an asynchronous,
/// retryable side effect outside the engine's guarantees.
pub struct SendNotificationHandler {
    notifications: Arc<dyn NotificationSink>,
}

impl SendNotificationHandler {
    pub fn new(notifications: Arc<dyn NotificationSink>) -> Self {
        Self { notifications }
    }

    fn target(ctx: &ActionContext) -> SentraResult<NotificationTarget> {
        match config_str(ctx, "target_type").unwrap_or("role") {
            "all" => Ok(NotificationTarget::All),
            "user" => {
                let id = config_str(ctx, "target_id").ok_or_else(|| SentraError::HandlerFailed {
                    action: "send_notification".to_string(),
                    reason: "target_type 'user' requires target_id".to_string(),
                })?;
                Ok(NotificationTarget::User(id.to_string()))
            }
            "role" => Ok(NotificationTarget::Role(
                config_str(ctx, "target_id").unwrap_or("security_analyst").to_string(),
            )),
            other => Err(SentraError::HandlerFailed {
                action: "send_notification".to_string(),
                reason: format!("unknown target_type '{}'", other),
            }),
        }
    }
}

impl ActionHandler for SendNotificationHandler {
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        let priority = config_str(ctx, "priority")
            .and_then(|s| serde_json::from_value(json!(s)).ok())
            .unwrap_or(NotificationPriority::High);

        let notification = self.notifications.insert(
            NewNotification {
                target: Self::target(ctx)?,
                priority,
                title: config_str(ctx, "title")
                    .map(String::from)
                    .unwrap_or_else(|| format!("Security policy alert: {}", ctx.policy.name)),
                message: config_str(ctx, "message")
                    .map(String::from)
                    .unwrap_or_else(|| {
                        format!(
                            "Policy '{}' matched employee {} (risk score {:.1})",
                            ctx.policy.name, ctx.event.employee_id, ctx.snapshot.risk_score
                        )
                    }),
                expires_at: config_u64(ctx, "expires_hours")
                    .map(|h| ctx.now + Duration::hours(h as i64)),
            },
            ctx.now,
        )?;
        debug!(notification = %notification.id, "notification recorded");
        Ok(json!({ "notification_id": notification.id }))
    }
}

// ── log_activity ──────────────────────────────────────────────────────────────

/// Appends an activity entry carrying the subject's risk snapshot.
pub struct LogActivityHandler {
    activity: Arc<dyn ActivitySink>,
}

impl LogActivityHandler {
    pub fn new(activity: Arc<dyn ActivitySink>) -> Self {
        Self { activity }
    }
}

impl ActionHandler for LogActivityHandler {
    fn execute(&self, ctx: &ActionContext) -> SentraResult<serde_json::Value> {
        self.activity.record(ActivityEntry {
            employee_id: ctx.event.employee_id.clone(),
            category: config_str(ctx, "category").unwrap_or("policy_action").to_string(),
            message: config_str(ctx, "message")
                .map(String::from)
                .unwrap_or_else(|| format!("policy '{}' matched", ctx.policy.name)),
            details: json!({
                "policy_id": ctx.policy.id,
                "event_kind": ctx.event.kind,
                "violation_id": ctx.event.violation_id,
            }),
            risk_score: Some(ctx.snapshot.risk_score),
            risk_factors: ctx.snapshot.recent_violations.clone(),
            recorded_at: ctx.now,
        })?;
        Ok(json!({ "recorded": true }))
    }
}

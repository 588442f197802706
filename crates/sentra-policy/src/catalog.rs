//! TOML-driven policy catalog.
//!
//! `PolicyCatalog` loads a set of `SecurityPolicy` definitions from a TOML
//! document or file and validates the structural invariants the rest of
//! the engine assumes:
//!
//! - global policies carry no `target_id`; department/employee policies
//!   require one;
//! - action orders are unique within a policy;
//! - action delays fit within [`MAX_ACTION_DELAY_SECS`];
//! - condition and action lists are stored pre-sorted by `order` (ties
//!   keep declaration order).
//!
//! Unlike condition fields/operators — which fail closed at evaluation
//! time — these invariants are rejected at load, because a policy that
//! violates them was mis-authored rather than merely stale.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use sentra_contracts::{
    error::{SentraError, SentraResult},
    policy::{PolicyLevel, SecurityPolicy},
};

/// Upper bound on an action's `delay_secs`: one year. A delay above it
/// was mis-authored and is rejected at load.
pub const MAX_ACTION_DELAY_SECS: u64 = 365 * 24 * 60 * 60;

/// The top-level structure deserialized from a TOML catalog file.
///
/// Example:
/// ```toml
/// [[policies]]
/// name = "High Risk Alert"
/// level = "global"
/// priority = 75
///
/// [[policies.conditions]]
/// field = "risk_score"
/// operator = "greater_than"
/// value = 90.0
///
/// [[policies.actions]]
/// kind = "create_incident"
/// order = 1
/// [policies.actions.config]
/// severity = "high"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyCatalog {
    #[serde(default)]
    pub policies: Vec<SecurityPolicy>,
}

impl PolicyCatalog {
    /// Parse `s` as TOML and build a validated catalog.
    ///
    /// Returns `SentraError::Config` if the TOML is malformed, does not
    /// match the policy schema, or violates a structural invariant.
    pub fn from_toml_str(s: &str) -> SentraResult<Self> {
        let mut catalog: PolicyCatalog = toml::from_str(s).map_err(|e| SentraError::Config {
            reason: format!("failed to parse policy catalog TOML: {}", e),
        })?;
        catalog.validate()?;
        catalog.normalize();
        debug!(policy_count = catalog.policies.len(), "policy catalog loaded");
        Ok(catalog)
    }

    /// Read the file at `path` and parse it as a TOML policy catalog.
    pub fn from_file(path: &Path) -> SentraResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentraError::Config {
            reason: format!("failed to read policy catalog '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build a catalog from already-constructed policies, applying the same
    /// validation and normalization as the TOML path.
    pub fn from_policies(policies: Vec<SecurityPolicy>) -> SentraResult<Self> {
        let mut catalog = Self { policies };
        catalog.validate()?;
        catalog.normalize();
        Ok(catalog)
    }

    fn validate(&self) -> SentraResult<()> {
        for policy in &self.policies {
            match (policy.level, policy.target_id.as_deref()) {
                (PolicyLevel::Global, Some(target)) => {
                    return Err(SentraError::Config {
                        reason: format!(
                            "policy '{}' is global but names target '{}'",
                            policy.name, target
                        ),
                    });
                }
                (PolicyLevel::Department | PolicyLevel::Employee, None) => {
                    return Err(SentraError::Config {
                        reason: format!(
                            "policy '{}' is {}-level but has no target_id",
                            policy.name, policy.level
                        ),
                    });
                }
                _ => {}
            }

            let mut seen_orders = HashSet::new();
            for action in &policy.actions {
                if !seen_orders.insert(action.order) {
                    return Err(SentraError::Config {
                        reason: format!(
                            "policy '{}' has duplicate action order {}",
                            policy.name, action.order
                        ),
                    });
                }
                if action.delay_secs > MAX_ACTION_DELAY_SECS {
                    return Err(SentraError::Config {
                        reason: format!(
                            "policy '{}' action order {} has delay_secs {} above the {}s maximum",
                            policy.name, action.order, action.delay_secs, MAX_ACTION_DELAY_SECS
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Pre-sort condition chains and action lists by `order`. Stable sort:
    /// equal orders keep declaration order.
    fn normalize(&mut self) {
        for policy in &mut self.policies {
            policy.conditions.sort_by_key(|c| c.order);
            policy.actions.sort_by_key(|a| a.order);
        }
    }
}

//! Fill-plan execution.
//!
//! The engine dispatches each action, in listed order, to the executor
//! registered for its kind and aggregates per-action outcomes into an
//! [`ExecutionReport`]. Per-action outcomes are independent: one action's
//! failure never aborts the rest. The only whole-plan failures are
//! configuration problems — an invalid target URL or a kind with no
//! registered executor — which are detected before anything runs.

use crate::backend::Backend;
use crate::executor::ExecutorRegistry;
use crate::pacing::Pacing;
use formpilot_common::error::BackendError;
use formpilot_common::plan::{
    Action, ActionStatus, ExecutionReport, FieldKind, FillPlan, RunStatus,
};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No executor registered for field kind '{0}'")]
    UnsupportedKind(FieldKind),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

pub struct ExecutionEngine {
    registry: ExecutorRegistry,
    pacing: Pacing,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(ExecutorRegistry::default(), Pacing::default())
    }
}

impl ExecutionEngine {
    pub fn new(registry: ExecutorRegistry, pacing: Pacing) -> Self {
        Self { registry, pacing }
    }

    /// Execute the plan against an already-launched backend.
    pub async fn execute(
        &self,
        backend: &mut dyn Backend,
        plan: &FillPlan,
    ) -> Result<ExecutionReport, EngineError> {
        url::Url::parse(&plan.target_url).map_err(|e| EngineError::InvalidUrl {
            url: plan.target_url.clone(),
            reason: e.to_string(),
        })?;

        // An unregistered kind is a configuration error for the whole plan,
        // not a runtime fallback; surface it before touching the page.
        for action in &plan.actions {
            if !self.registry.supports(action.kind) {
                return Err(EngineError::UnsupportedKind(action.kind));
            }
        }

        tracing::info!(url = %plan.target_url, actions = plan.actions.len(), "executing fill plan");
        backend.navigate(&plan.target_url).await?;

        let mut results = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for action in &plan.actions {
            let status = self.run_action(backend, action, &mut errors).await;
            results.insert(action.id.clone(), status);
        }

        let required_failed = plan.actions.iter().any(|a| {
            a.required && results.get(&a.id) == Some(&ActionStatus::Failed)
        });
        let status = if required_failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        tracing::info!(?status, "fill plan finished");
        Ok(ExecutionReport {
            status,
            results,
            errors,
        })
    }

    async fn run_action(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        errors: &mut BTreeMap<String, String>,
    ) -> ActionStatus {
        if action.kind.needs_value() && action.value.is_none() {
            tracing::debug!(action = %action.id, "no value supplied, skipping");
            return ActionStatus::Skipped;
        }

        // Registry membership was validated up front.
        let Some(executor) = self.registry.get(action.kind) else {
            errors.insert(
                action.id.clone(),
                format!("no executor registered for kind '{}'", action.kind),
            );
            return ActionStatus::Failed;
        };

        match executor.apply(backend, action, &self.pacing).await {
            Ok(()) => {
                tracing::debug!(action = %action.id, kind = %action.kind, "action succeeded");
                ActionStatus::Success
            }
            Err(e) => {
                tracing::warn!(action = %action.id, kind = %action.kind, error = %e, "action failed");
                errors.insert(action.id.clone(), e.to_string());
                ActionStatus::Failed
            }
        }
    }
}

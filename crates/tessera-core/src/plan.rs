//! Plan execution.
//!
//! A plan creates its nets in the workspace, then walks its execution steps.
//! Each step runs either a list of nets or a list of substeps, `num_iter`
//! times (once by default), stopping early when its stop blob reads `true`.
//!
//! The caller's continuation predicate is polled with the iteration index
//! before every iteration of every step it reaches; returning `false` ends
//! that step without running anything.
//!
//! Design:
//! - The predicate is `FnMut + Send` behind a `Mutex`, so substeps started
//!   with `concurrent_substeps` poll the same predicate from their own
//!   threads. Cancellation (Ctrl-C in the CLI) reaches every running step.
//! - Calls are serialized by the mutex; the index passed is the iteration
//!   of the step doing the polling.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::domain::{ExecutionStep, PlanDef};
use crate::error::{PlanError, WorkspaceError};
use crate::workspace::Workspace;

/// Run `plan` on `ws`. Returns `Ok(false)` if any net run fails.
///
/// Nets of the plan replace existing nets of the same name, so the same plan
/// can be run repeatedly on one workspace.
pub fn run_plan_on_workspace(
    ws: &mut Workspace<'_>,
    plan: &PlanDef,
    should_continue: &mut (dyn FnMut(u64) -> bool + Send),
) -> Result<bool, WorkspaceError> {
    info!(plan = %plan.name, "Started executing plan");
    if plan.networks.is_empty() || plan.execution_steps.is_empty() {
        warn!(plan = %plan.name, "Nothing to run - did you define a correct plan?");
    }

    for net_def in &plan.networks {
        if ws.create_net(net_def, true)?.is_none() {
            return Err(PlanError::NetCreation(net_def.name.clone().unwrap_or_default()).into());
        }
    }
    debug!(plan = %plan.name, nets = plan.networks.len(), "Initialized plan networks");

    for step in &plan.execution_steps {
        validate_step(ws, step)?;
    }

    let ws: &Workspace<'_> = ws;
    let should_continue = Mutex::new(should_continue);
    for step in &plan.execution_steps {
        if !execute_step(ws, step, &should_continue)? {
            error!(plan = %plan.name, step = %step.name, "Failed executing step");
            return Ok(false);
        }
    }
    info!(plan = %plan.name, "Finished executing plan");
    Ok(true)
}

fn validate_step(ws: &Workspace<'_>, step: &ExecutionStep) -> Result<(), PlanError> {
    if !step.networks.is_empty() && !step.substeps.is_empty() {
        return Err(PlanError::MixedStep(step.name.clone()));
    }
    if let Some(net) = step.networks.iter().find(|net| !ws.has_net(net)) {
        return Err(PlanError::UnknownNet {
            step: step.name.clone(),
            net: net.clone(),
        });
    }
    step.substeps.iter().try_for_each(|sub| validate_step(ws, sub))
}

type Predicate<'a> = Mutex<&'a mut (dyn FnMut(u64) -> bool + Send)>;

fn poll(should_continue: &Predicate<'_>, iter: u64) -> bool {
    let mut predicate = should_continue
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    (**predicate)(iter)
}

fn execute_step(
    ws: &Workspace<'_>,
    step: &ExecutionStep,
    should_continue: &Predicate<'_>,
) -> Result<bool, WorkspaceError> {
    let num_iter = step.num_iter.unwrap_or(1);
    debug!(step = %step.name, num_iter, "Executing step");

    for iter in 0..num_iter {
        if !poll(should_continue, iter) {
            info!(step = %step.name, iter, "Stopping step: continuation predicate returned false");
            break;
        }
        if should_stop(ws, step)? {
            debug!(step = %step.name, iter, "Stop blob is set");
            break;
        }

        let ok = if !step.substeps.is_empty() && step.concurrent_substeps {
            execute_substeps_concurrently(ws, step, should_continue)?
        } else if !step.substeps.is_empty() {
            let mut ok = true;
            for sub in &step.substeps {
                if !execute_step(ws, sub, should_continue)? {
                    ok = false;
                    break;
                }
            }
            ok
        } else {
            step.networks.iter().all(|net| ws.run_net(net))
        };

        if !ok {
            error!(step = %step.name, iter, "Step failed");
            return Ok(false);
        }
    }
    Ok(true)
}

fn execute_substeps_concurrently(
    ws: &Workspace<'_>,
    step: &ExecutionStep,
    should_continue: &Predicate<'_>,
) -> Result<bool, WorkspaceError> {
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = step
            .substeps
            .iter()
            .map(|sub| s.spawn(move || execute_step(ws, sub, should_continue)))
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut ok = true;
    for result in results {
        match result {
            Ok(step_result) => ok &= step_result?,
            Err(_) => return Err(PlanError::SubstepPanicked(step.name.clone()).into()),
        }
    }
    Ok(ok)
}

fn should_stop(ws: &Workspace<'_>, step: &ExecutionStep) -> Result<bool, PlanError> {
    let Some(name) = &step.should_stop_blob else {
        return Ok(false);
    };
    let blob = ws.get_blob(name).ok_or_else(|| PlanError::StopBlob {
        step: step.name.clone(),
        blob: name.clone(),
        reason: "blob does not exist".to_string(),
    })?;
    blob.get_cloned::<bool>().map_err(|e| PlanError::StopBlob {
        step: step.name.clone(),
        blob: name.clone(),
        reason: e.to_string(),
    })
}

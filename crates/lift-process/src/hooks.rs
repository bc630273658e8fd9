//! Traducción de los hooks declarados en el descriptor al modelo del motor.

use lift_core::hooks::{Hook, HookPhase};
use lift_core::StepError;
use lift_domain::{DomainError, Module};

/// Hooks del módulo, en orden de declaración (que es su orden de ejecución).
/// Un hook con varias fases produce un `Hook` por fase.
pub fn hooks_for_module(module: &Module) -> Result<Vec<Hook>, StepError> {
    let mut hooks = Vec::new();
    for declared in &module.hooks {
        for raw_phase in &declared.phases {
            let (phase, step_id) =
                parse_phase(raw_phase).map_err(|e| StepError::Content(e.to_string()))?;
            hooks.push(Hook { name: declared.name.clone(),
                              module_name: module.name.clone(),
                              phase,
                              step_id });
        }
    }
    Ok(hooks)
}

fn parse_phase(raw: &str) -> Result<(HookPhase, String), DomainError> {
    match raw.split_once('/') {
        Some(("before", step_id)) if !step_id.is_empty() => {
            Ok((HookPhase::Before, step_id.to_owned()))
        }
        Some(("after", step_id)) if !step_id.is_empty() => {
            Ok((HookPhase::After, step_id.to_owned()))
        }
        _ => Err(DomainError::InvalidHookPhase(raw.to_owned())),
    }
}

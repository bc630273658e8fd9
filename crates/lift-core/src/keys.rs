//! Claves con namespace que el motor usa dentro del `ProcessContext`.
//!
//! Todo el estado por step cuelga del prefijo `step:{id}:` para poder
//! limpiarlo de una vez cuando el step termina.

use crate::hooks::HookPhase;

pub(crate) fn phase(step_id: &str) -> String {
    format!("step:{step_id}:phase")
}

pub(crate) fn attempts(step_id: &str) -> String {
    format!("step:{step_id}:attempts")
}

pub(crate) fn error(step_id: &str) -> String {
    format!("step:{step_id}:error")
}

pub(crate) fn hooks(step_id: &str) -> String {
    format!("step:{step_id}:hooks")
}

pub(crate) fn hook_cursor(step_id: &str) -> String {
    format!("step:{step_id}:hook_cursor")
}

pub(crate) fn hooks_phase(step_id: &str) -> String {
    format!("step:{step_id}:hooks_phase")
}

pub(crate) fn hooks_done(step_id: &str, phase: HookPhase) -> String {
    let tag = match phase {
        HookPhase::Before => "before",
        HookPhase::After => "after",
    };
    format!("step:{step_id}:hooks_done:{tag}")
}

pub(crate) fn step_prefix(step_id: &str) -> String {
    format!("step:{step_id}:")
}

pub(crate) const PIPELINE_CURSOR: &str = "pipeline:cursor";
pub(crate) const PIPELINE_FAILED_STEP: &str = "pipeline:failed_step";

//! Cálculo de los hooks aplicables a un step.

use super::{Hook, HookPhase};

/// Hooks aplicables a una invocación de un step, separados por momento.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculatedHooks {
    pub before: Vec<Hook>,
    pub after: Vec<Hook>,
}

/// Deriva, a partir de los hooks declarados para el módulo en curso, cuáles
/// aplican inmediatamente antes/después de un step dado. El orden de
/// declaración se conserva: es el orden de ejecución.
#[derive(Debug, Clone, Default)]
pub struct HooksCalculator {
    hooks: Vec<Hook>,
}

impl HooksCalculator {
    /// `hooks`: todos los hooks declarados del módulo actualmente procesado,
    /// en orden de declaración.
    pub fn new(hooks: Vec<Hook>) -> Self {
        Self { hooks }
    }

    pub fn compute(&self, step_id: &str) -> CalculatedHooks {
        let mut calculated = CalculatedHooks::default();
        for hook in &self.hooks {
            if hook.step_id != step_id {
                continue;
            }
            match hook.phase {
                HookPhase::Before => calculated.before.push(hook.clone()),
                HookPhase::After => calculated.after.push(hook.clone()),
            }
        }
        calculated
    }
}

//! Ejecutor de hooks para una invocación de step.

use crate::context::ProcessContext;
use crate::keys;
use crate::step::StepPhase;

use super::{Hook, HookPhase, HooksCalculator};

/// Decide qué hooks quedan pendientes para la invocación actual del step.
///
/// Invariante: nunca reporta hooks `Before` y `After` pendientes a la vez
/// para la misma invocación; los marcadores en el contexto registran qué
/// momento ya fue ejecutado, de modo que la re-entrada tras el sub-pipeline
/// vea una lista vacía.
pub struct HooksExecutor<'a> {
    calculator: &'a HooksCalculator,
    step_id: &'a str,
}

impl<'a> HooksExecutor<'a> {
    pub fn new(calculator: &'a HooksCalculator, step_id: &'a str) -> Self {
        Self { calculator, step_id }
    }

    /// Hooks a ejecutar antes de que el step avance. Sólo aplica en la fase
    /// de entrada; en re-entradas (marcador puesto) devuelve una lista vacía.
    pub fn execute_before_step_hooks(&self, ctx: &ProcessContext, current_phase: StepPhase) -> Vec<Hook> {
        if current_phase != StepPhase::Execute {
            return Vec::new();
        }
        if self.phase_already_executed(ctx, HookPhase::Before) {
            return Vec::new();
        }
        self.calculator.compute(self.step_id).before
    }

    /// Hooks a ejecutar una vez que el step envuelto alcanzó `Done`.
    pub fn execute_after_step_hooks(&self, ctx: &ProcessContext, current_phase: StepPhase) -> Vec<Hook> {
        if current_phase != StepPhase::Done {
            return Vec::new();
        }
        if self.phase_already_executed(ctx, HookPhase::After) {
            return Vec::new();
        }
        self.calculator.compute(self.step_id).after
    }

    fn phase_already_executed(&self, ctx: &ProcessContext, phase: HookPhase) -> bool {
        ctx.get_raw::<bool>(&keys::hooks_done(self.step_id, phase))
           .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn calculator() -> HooksCalculator {
        HooksCalculator::new(vec![Hook { name: "pre".into(),
                                         module_name: "web".into(),
                                         phase: HookPhase::Before,
                                         step_id: "upload-app".into() },
                                  Hook { name: "post".into(),
                                         module_name: "web".into(),
                                         phase: HookPhase::After,
                                         step_id: "upload-app".into() }])
    }

    #[test]
    fn never_reports_before_and_after_together() {
        let calc = calculator();
        let executor = HooksExecutor::new(&calc, "upload-app");
        let ctx = ProcessContext::new(Uuid::new_v4());

        let before = executor.execute_before_step_hooks(&ctx, StepPhase::Execute);
        let after = executor.execute_after_step_hooks(&ctx, StepPhase::Execute);
        assert_eq!(before.len(), 1);
        assert!(after.is_empty());

        let after = executor.execute_after_step_hooks(&ctx, StepPhase::Done);
        let before = executor.execute_before_step_hooks(&ctx, StepPhase::Done);
        assert_eq!(after.len(), 1);
        assert!(before.is_empty());
    }

    #[test]
    fn reentry_with_marker_is_empty() {
        let calc = calculator();
        let executor = HooksExecutor::new(&calc, "upload-app");
        let mut ctx = ProcessContext::new(Uuid::new_v4());
        ctx.set_raw(&keys::hooks_done("upload-app", HookPhase::Before), &true);

        assert!(executor.execute_before_step_hooks(&ctx, StepPhase::Execute).is_empty());
    }
}

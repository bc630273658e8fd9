//! Decorador que añade hooks a cualquier step sin alterar su implementación.

use crate::context::ProcessContext;
use crate::errors::StepError;
use crate::keys;
use crate::logger::ProcessLogger;
use crate::step::{Step, StepMetadata, StepPhase};

use super::{Hook, HookPhase, HooksCalculator, HooksExecutor};

/// Envuelve un `Step` con los hooks del módulo en curso.
///
/// Con un conjunto de hooks vacío el decorador es transparente: produce
/// exactamente la misma secuencia de fases que el step sin envolver.
/// Cuando hay hooks `Before` pendientes, deja la cola registrada en el
/// contexto y devuelve la fase sin avanzar; el motor ejecuta la cola como
/// sub-pipeline anidado y re-entra con la lista vacía.
pub struct HookedStep {
    inner: Box<dyn Step>,
    calculator: HooksCalculator,
}

impl HookedStep {
    pub fn new(inner: Box<dyn Step>, calculator: HooksCalculator) -> Self {
        Self { inner, calculator }
    }

    fn queue(&self, ctx: &mut ProcessContext, hooks: &[Hook], phase: HookPhase) {
        let id = &self.inner.metadata().id;
        ctx.set_raw(&keys::hooks(id), &hooks.to_vec());
        ctx.set_raw(&keys::hooks_phase(id), &phase);
        ctx.set_raw(&keys::hook_cursor(id), &0usize);
    }

    fn queue_after_hooks(&self, ctx: &mut ProcessContext, phase: StepPhase) {
        if phase != StepPhase::Done {
            return;
        }
        let id = self.inner.metadata().id.clone();
        let executor = HooksExecutor::new(&self.calculator, &id);
        let after = executor.execute_after_step_hooks(ctx, phase);
        if !after.is_empty() {
            self.queue(ctx, &after, HookPhase::After);
        }
    }
}

impl Step for HookedStep {
    fn metadata(&self) -> &StepMetadata {
        self.inner.metadata()
    }

    fn execute(&self, ctx: &mut ProcessContext, logger: &ProcessLogger) -> Result<StepPhase, StepError> {
        let id = self.inner.metadata().id.clone();
        let executor = HooksExecutor::new(&self.calculator, &id);
        let before = executor.execute_before_step_hooks(ctx, StepPhase::Execute);
        if !before.is_empty() {
            logger.debug(&format!("deferring step {} until {} before-hook(s) finish", id, before.len()));
            self.queue(ctx, &before, HookPhase::Before);
            return Ok(StepPhase::Execute);
        }
        let phase = self.inner.execute(ctx, logger)?;
        self.queue_after_hooks(ctx, phase);
        Ok(phase)
    }

    fn poll(&self, ctx: &mut ProcessContext, logger: &ProcessLogger) -> Result<StepPhase, StepError> {
        let phase = self.inner.poll(ctx, logger)?;
        self.queue_after_hooks(ctx, phase);
        Ok(phase)
    }

    fn is_best_effort(&self) -> bool {
        self.inner.is_best_effort()
    }
}

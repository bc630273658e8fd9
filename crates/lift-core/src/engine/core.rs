//! Máquina de estados de steps y avance del pipeline.
//!
//! Cada invocación de `Engine::execute` es una unidad de trabajo acotada:
//! carga el cursor desde el contexto, avanza mientras los steps devuelvan
//! `Done` y se suspende en cuanto un step queda en `Poll` o `Retry`. La
//! re-invocación tras la suspensión la programa el sustrato de workflow
//! externo (ver `scheduler`); el motor nunca bloquea un hilo esperando una
//! operación remota.

use std::time::Duration;

use crate::context::ProcessContext;
use crate::errors::{EngineError, ErrorClass, StepError};
use crate::hooks::{HookPhase, HookStepFactory};
use crate::keys;
use crate::logger::ProcessLogger;
use crate::step::{Pipeline, Step, StepPhase};

use super::settings::{PollSettings, RetrySettings};

/// Resultado de una invocación acotada del motor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Hay trabajo pendiente; re-invocar tras la espera indicada.
    Suspended(Duration),
    Completed,
    /// Terminal: el error y el step causante quedan también registrados en el
    /// contexto. Los efectos remotos ya confirmados no se revierten; la
    /// recuperación esperada es reanudar desde el step fallido.
    Failed { step_id: String, error: StepError },
}

/// Avance del sub-pipeline de hooks pendiente de un step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookProgress {
    /// No había hooks pendientes.
    None,
    /// La cola se agotó en esta invocación.
    Drained,
    Suspended,
    Failed,
}

pub struct Engine {
    retry: RetrySettings,
    poll: PollSettings,
    hook_factory: Option<Box<dyn HookStepFactory>>,
}

impl Engine {
    pub fn new(retry: RetrySettings, poll: PollSettings) -> Self {
        Self { retry,
               poll,
               hook_factory: None }
    }

    /// Registra la fábrica que materializa hooks declarados como steps.
    pub fn with_hook_factory(mut self, factory: Box<dyn HookStepFactory>) -> Self {
        self.hook_factory = Some(factory);
        self
    }

    pub fn retry_settings(&self) -> RetrySettings {
        self.retry
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.poll
    }

    /// Ejecuta una invocación acotada sobre la instancia: avanza steps `Done`
    /// consecutivos y se suspende al primer `Poll`/`Retry`. Exactamente un
    /// step de la instancia corre a la vez.
    pub fn execute(&self, pipeline: &Pipeline, ctx: &mut ProcessContext, logger: &ProcessLogger)
                   -> Result<Progress, EngineError> {
        let mut cursor: usize = ctx.get_raw(keys::PIPELINE_CURSOR).unwrap_or(0);
        while cursor < pipeline.len() {
            let step = pipeline.step(cursor)
                               .ok_or_else(|| EngineError::Internal("pipeline cursor out of range".into()))?;
            let step_id = step.metadata().id.clone();
            match self.run_step(step, ctx, logger)? {
                StepPhase::Done => {
                    logger.for_step(&step_id).debug("step finished");
                    cursor += 1;
                    ctx.set_raw(keys::PIPELINE_CURSOR, &cursor);
                }
                StepPhase::Poll => return Ok(Progress::Suspended(self.poll.interval)),
                StepPhase::Retry => {
                    let attempts: u32 = ctx.get_raw(&keys::attempts(&step_id)).unwrap_or(1);
                    return Ok(Progress::Suspended(self.retry.backoff_base * attempts));
                }
                StepPhase::Failed => {
                    let error = ctx.get_raw::<StepError>(&keys::error(&step_id))
                                   .unwrap_or_else(|| StepError::Operation("step failed without recorded error".into()));
                    if step.is_best_effort() {
                        logger.for_step(&step_id)
                              .warn(&format!("best-effort step failed, continuing: {error}"));
                        ctx.remove_prefix(&keys::step_prefix(&step_id));
                        cursor += 1;
                        ctx.set_raw(keys::PIPELINE_CURSOR, &cursor);
                        continue;
                    }
                    ctx.set_raw(keys::PIPELINE_FAILED_STEP, &step_id);
                    logger.for_step(&step_id).error(&format!("pipeline aborted: {error}"));
                    return Ok(Progress::Failed { step_id, error });
                }
                StepPhase::Execute => {
                    return Err(EngineError::Internal(format!("step {step_id} did not advance")))
                }
            }
        }
        Ok(Progress::Completed)
    }

    /// Contrato `runStep(step, context) -> StepPhase` de la máquina de
    /// estados. La fase persistida del step decide qué entrada se ejecuta.
    pub fn run_step(&self, step: &dyn Step, ctx: &mut ProcessContext, logger: &ProcessLogger)
                    -> Result<StepPhase, EngineError> {
        let step_id = step.metadata().id.clone();
        let step_logger = logger.for_step(&step_id);

        // Un sub-pipeline de hooks pendiente tiene prioridad: el step envuelto
        // queda diferido hasta que la cola se agote.
        match self.advance_pending_hooks(&step_id, ctx, logger)? {
            HookProgress::Suspended => return Ok(StepPhase::Poll),
            HookProgress::Failed => return Ok(StepPhase::Failed),
            HookProgress::None | HookProgress::Drained => {}
        }

        let phase: StepPhase = ctx.get_raw(&keys::phase(&step_id)).unwrap_or(StepPhase::Execute);
        match phase {
            StepPhase::Execute => match step.execute(ctx, &step_logger) {
                Ok(StepPhase::Execute) => {
                    // El decorador de hooks difirió el step y dejó la cola
                    // registrada; se ejecuta ahora como sub-pipeline.
                    match self.advance_pending_hooks(&step_id, ctx, logger)? {
                        HookProgress::Suspended => Ok(StepPhase::Poll),
                        HookProgress::Failed => Ok(StepPhase::Failed),
                        HookProgress::Drained => self.run_step(step, ctx, logger),
                        HookProgress::None => {
                            Err(EngineError::Internal(format!("step {step_id} returned Execute without pending hooks")))
                        }
                    }
                }
                Ok(StepPhase::Poll) => {
                    ctx.set_raw(&keys::phase(&step_id), &StepPhase::Poll);
                    Ok(StepPhase::Poll)
                }
                Ok(StepPhase::Done) => self.complete_step(&step_id, ctx, logger),
                Ok(other) => Err(EngineError::Internal(format!("step {step_id} returned {other:?} from execute"))),
                Err(e) => Ok(self.handle_step_error(&step_id, ctx, &step_logger, e)),
            },
            StepPhase::Poll => match step.poll(ctx, &step_logger) {
                Ok(StepPhase::Poll) => Ok(StepPhase::Poll),
                Ok(StepPhase::Done) => self.complete_step(&step_id, ctx, logger),
                Ok(other) => Err(EngineError::Internal(format!("step {step_id} returned {other:?} from poll"))),
                Err(e) => Ok(self.handle_step_error(&step_id, ctx, &step_logger, e)),
            },
            // `Done` persistido ocurre cuando los hooks `After` quedaron
            // suspendidos; al drenarse (arriba) sólo falta finalizar.
            StepPhase::Done => Ok(self.finalize_step(&step_id, ctx)),
            StepPhase::Failed => Ok(StepPhase::Failed),
            StepPhase::Retry => Err(EngineError::Internal("Retry is never persisted as a step phase".into())),
        }
    }

    /// El step alcanzó `Done`: ejecuta los hooks `After` que el decorador
    /// haya dejado en cola y finaliza.
    fn complete_step(&self, step_id: &str, ctx: &mut ProcessContext, logger: &ProcessLogger)
                     -> Result<StepPhase, EngineError> {
        match self.advance_pending_hooks(step_id, ctx, logger)? {
            HookProgress::Suspended => {
                ctx.set_raw(&keys::phase(step_id), &StepPhase::Done);
                Ok(StepPhase::Poll)
            }
            HookProgress::Failed => Ok(StepPhase::Failed),
            HookProgress::None | HookProgress::Drained => Ok(self.finalize_step(step_id, ctx)),
        }
    }

    /// Limpia el estado del step en el contexto una vez terminado.
    fn finalize_step(&self, step_id: &str, ctx: &mut ProcessContext) -> StepPhase {
        ctx.remove_prefix(&keys::step_prefix(step_id));
        StepPhase::Done
    }

    fn handle_step_error(&self, step_id: &str, ctx: &mut ProcessContext, logger: &ProcessLogger, error: StepError)
                         -> StepPhase {
        match error.classify() {
            ErrorClass::Fatal => {
                logger.error(&format!("step failed: {error}"));
                ctx.set_raw(&keys::error(step_id), &error);
                StepPhase::Failed
            }
            ErrorClass::Transient => {
                let attempts: u32 = ctx.get_raw(&keys::attempts(step_id)).unwrap_or(0) + 1;
                ctx.set_raw(&keys::attempts(step_id), &attempts);
                if attempts >= self.retry.max_attempts {
                    logger.error(&format!("giving up after {attempts} attempt(s): {error}"));
                    ctx.set_raw(&keys::error(step_id), &error);
                    StepPhase::Failed
                } else {
                    logger.warn(&format!("transient failure on attempt {attempts}, will retry: {error}"));
                    StepPhase::Retry
                }
            }
        }
    }

    /// Ejecuta la cola de hooks pendiente del step como sub-pipeline anidado,
    /// reutilizando `run_step` (misma semántica de polling y reintentos).
    fn advance_pending_hooks(&self, step_id: &str, ctx: &mut ProcessContext, logger: &ProcessLogger)
                             -> Result<HookProgress, EngineError> {
        let queue = match ctx.get_raw::<Vec<crate::hooks::Hook>>(&keys::hooks(step_id)) {
            Some(queue) if !queue.is_empty() => queue,
            _ => return Ok(HookProgress::None),
        };
        let factory = self.hook_factory.as_ref().ok_or(EngineError::NoHookFactory)?;

        let mut index: usize = ctx.get_raw(&keys::hook_cursor(step_id)).unwrap_or(0);
        while index < queue.len() {
            let hook_step = factory.create(&queue[index]);
            let hook_step_id = hook_step.metadata().id.clone();
            match self.run_step(hook_step.as_ref(), ctx, logger)? {
                StepPhase::Done => {
                    index += 1;
                    ctx.set_raw(&keys::hook_cursor(step_id), &index);
                }
                StepPhase::Poll | StepPhase::Retry => return Ok(HookProgress::Suspended),
                StepPhase::Failed => {
                    let error = ctx.get_raw::<StepError>(&keys::error(&hook_step_id))
                                   .unwrap_or_else(|| {
                                       StepError::Operation(format!("hook {} failed", queue[index].name))
                                   });
                    ctx.set_raw(&keys::error(step_id), &error);
                    return Ok(HookProgress::Failed);
                }
                StepPhase::Execute => {
                    return Err(EngineError::Internal("hook step did not advance".into()))
                }
            }
        }

        let phase: HookPhase = ctx.get_raw(&keys::hooks_phase(step_id)).unwrap_or(HookPhase::Before);
        ctx.set_raw(&keys::hooks_done(step_id, phase), &true);
        ctx.remove_raw(&keys::hooks(step_id));
        ctx.remove_raw(&keys::hook_cursor(step_id));
        ctx.remove_raw(&keys::hooks_phase(step_id));
        Ok(HookProgress::Drained)
    }
}

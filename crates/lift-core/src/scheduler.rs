//! Interfaz con el sustrato de workflow externo.
//!
//! El motor no asume ningún sustrato concreto: lo único que exige es poder
//! persistir el contexto, recuperarlo y pedir una re-invocación tras una
//! espera ("persist-and-suspend" / "resume-after-delay"). La implementación
//! real puede ser una cola de jobs embebida, un poller o una task queue
//! durable; aquí se incluye la variante en memoria usada por los tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use uuid::Uuid;

use crate::context::ProcessContext;
use crate::engine::{Engine, Progress};
use crate::errors::EngineError;
use crate::logger::ProcessLogger;
use crate::step::Pipeline;

/// Sustrato de persistencia y re-invocación. Garantiza re-invocación
/// at-least-once y ordenada por instancia tras la espera pedida.
pub trait ExecutionScheduler {
    fn persist_context(&mut self, ctx: &ProcessContext) -> Result<(), EngineError>;
    fn load_context(&self, instance_id: Uuid) -> Result<Option<ProcessContext>, EngineError>;
    fn schedule_reinvocation(&mut self, instance_id: Uuid, after: Duration) -> Result<(), EngineError>;
}

/// Sustrato en memoria: guarda los contextos serializados (igual que haría un
/// sustrato durable) y encola las re-invocaciones sin respetar la espera real.
#[derive(Default)]
pub struct InMemoryScheduler {
    contexts: HashMap<Uuid, String>,
    queue: VecDeque<(Uuid, Duration)>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_reinvocations(&self) -> usize {
        self.queue.len()
    }

    /// Cancela una instancia entre invocaciones: se descartan las
    /// re-invocaciones encoladas y el contexto se purga. Las operaciones
    /// remotas en vuelo quedan abandonadas (el sondeo simplemente cesa).
    pub fn cancel(&mut self, instance_id: Uuid) {
        self.queue.retain(|(id, _)| *id != instance_id);
        self.contexts.remove(&instance_id);
    }

    /// Re-invoca el motor hasta que la instancia termine, ignorando las
    /// esperas. `max_invocations` acota el lazo por si un step nunca sale de
    /// `Poll`. Devuelve el progreso terminal y el contexto final persistido.
    pub fn drive_to_completion(&mut self,
                               engine: &Engine,
                               pipeline: &Pipeline,
                               mut ctx: ProcessContext,
                               max_invocations: usize)
                               -> Result<(Progress, ProcessContext), EngineError> {
        let instance_id = ctx.instance_id();
        let logger = ProcessLogger::new(instance_id);
        for _ in 0..max_invocations {
            let progress = engine.execute(pipeline, &mut ctx, &logger)?;
            self.persist_context(&ctx)?;
            match progress {
                Progress::Suspended(after) => {
                    self.schedule_reinvocation(instance_id, after)?;
                    self.queue.pop_front();
                    ctx = self.load_context(instance_id)?
                             .ok_or_else(|| EngineError::Scheduler("context vanished".into()))?;
                }
                terminal => return Ok((terminal, ctx)),
            }
        }
        Err(EngineError::Scheduler(format!("instance {instance_id} did not finish within {max_invocations} invocations")))
    }
}

impl ExecutionScheduler for InMemoryScheduler {
    fn persist_context(&mut self, ctx: &ProcessContext) -> Result<(), EngineError> {
        let serialized = serde_json::to_string(ctx)
            .map_err(|e| EngineError::Scheduler(format!("context not serializable: {e}")))?;
        self.contexts.insert(ctx.instance_id(), serialized);
        Ok(())
    }

    fn load_context(&self, instance_id: Uuid) -> Result<Option<ProcessContext>, EngineError> {
        match self.contexts.get(&instance_id) {
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| EngineError::Scheduler(format!("persisted context corrupt: {e}"))),
            None => Ok(None),
        }
    }

    fn schedule_reinvocation(&mut self, instance_id: Uuid, after: Duration) -> Result<(), EngineError> {
        self.queue.push_back((instance_id, after));
        Ok(())
    }
}

//! Abstracción "arrancar y sondear hasta estado terminal".
//!
//! Un step asíncrono arranca una operación remota durante `execute`, persiste
//! su handle en el contexto y devuelve `Poll`. En cada invocación posterior el
//! step construye sus `AsyncExecution` y las sondea vía `Poller`.

use crate::context::ProcessContext;
use crate::errors::StepError;
use crate::logger::ProcessLogger;

/// Estado observado de una operación remota en un sondeo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Finished,
    /// La operación alcanzó un estado terminal de error en el lado remoto.
    Failed,
}

/// Una operación remota pendiente. El handle que identifica la operación
/// (id de paquete, token de upload, ...) se lee del contexto, de modo que el
/// sondeo sobreviva a reinicios del proceso.
pub trait AsyncExecution {
    fn poll(&self, ctx: &mut ProcessContext, logger: &ProcessLogger) -> Result<ExecutionStatus, StepError>;
}

/// Agrega el estado de un conjunto de operaciones pendientes.
pub struct Poller;

impl Poller {
    /// Cualquier `Failed` domina; si no, cualquier `Running` mantiene el
    /// sondeo; sólo cuando todas terminaron el resultado es `Finished`.
    pub fn poll_all(executions: &[Box<dyn AsyncExecution + '_>],
                    ctx: &mut ProcessContext,
                    logger: &ProcessLogger)
                    -> Result<ExecutionStatus, StepError> {
        let mut any_running = false;
        for execution in executions {
            match execution.poll(ctx, logger)? {
                ExecutionStatus::Failed => return Ok(ExecutionStatus::Failed),
                ExecutionStatus::Running => any_running = true,
                ExecutionStatus::Finished => {}
            }
        }
        if any_running {
            Ok(ExecutionStatus::Running)
        } else {
            Ok(ExecutionStatus::Finished)
        }
    }
}

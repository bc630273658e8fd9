//! Contrato de los steps del pipeline.

mod phase;
mod pipeline;

pub use phase::StepPhase;
pub use pipeline::Pipeline;

use crate::context::ProcessContext;
use crate::errors::StepError;
use crate::logger::ProcessLogger;

/// Metadatos de un step, usados para el registro del pipeline y como
/// namespace de sus claves en el contexto. El id debe ser único dentro del
/// pipeline (los hooks materializados usan ids derivados del nombre del hook).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl StepMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(),
               name: name.into(),
               description: description.into() }
    }
}

/// Unidad de ejecución del pipeline.
///
/// Los steps son stateless: todo su estado vive en el `ProcessContext` bajo
/// claves con su id como namespace, de modo que la instancia pueda
/// suspenderse y reanudarse en otra invocación (incluso en otro proceso).
pub trait Step {
    fn metadata(&self) -> &StepMetadata;

    /// Lógica síncrona del step. Devuelve `Done` si no arrancó ninguna
    /// operación remota, o `Poll` si dejó un handle persistido en el contexto
    /// que habrá que seguir sondeando.
    fn execute(&self, ctx: &mut ProcessContext, logger: &ProcessLogger) -> Result<StepPhase, StepError>;

    /// Revisa las operaciones remotas registradas por `execute`. Sólo se
    /// invoca mientras la fase persistida del step sea `Poll`.
    fn poll(&self, ctx: &mut ProcessContext, logger: &ProcessLogger) -> Result<StepPhase, StepError> {
        let _ = (ctx, logger);
        Ok(StepPhase::Done)
    }

    /// Un step best-effort no aborta el pipeline al fallar: el motor registra
    /// el error y continúa con el siguiente step.
    fn is_best_effort(&self) -> bool {
        false
    }
}

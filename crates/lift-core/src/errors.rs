//! Errores del motor y de los steps.
//!
//! La taxonomía sigue las reglas del pipeline: los errores de contenido son
//! fatales y nunca se reintentan; los errores transitorios se reintentan con
//! backoff lineal hasta agotar los intentos configurados; los errores remotos
//! se clasifican por su status HTTP.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error producido por la ejecución de un step.
///
/// Se serializa porque el registro del fallo terminal (step + error) vive en
/// el `ProcessContext` y debe sobrevivir a la suspensión de la instancia.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepError {
    /// Error de contenido/validación (manifiesto malformado, tamaño excedido,
    /// dependencia requerida ausente). Fatal, nunca se reintenta.
    #[error("content error: {0}")]
    Content(String),

    /// Error de infraestructura transitorio (timeout, "not yet visible").
    #[error("transient error: {0}")]
    Transient(String),

    /// Operación remota terminada con error y status conocido.
    #[error("remote operation failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    /// Fallo terminal de una operación remota ya iniciada (p.ej. un paquete
    /// que el control plane marca como FAILED). Se propaga tal cual.
    #[error("operation failed: {0}")]
    Operation(String),
}

/// Clasificación usada por el motor para decidir entre reintento y aborto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Fatal,
    Transient,
}

impl StepError {
    /// Clasifica el error. Los status 5xx, 408 y 429 se consideran
    /// transitorios; el resto de los 4xx es permanente.
    pub fn classify(&self) -> ErrorClass {
        match self {
            StepError::Content(_) | StepError::Operation(_) => ErrorClass::Fatal,
            StepError::Transient(_) => ErrorClass::Transient,
            StepError::Remote { status, .. } => {
                if *status >= 500 || *status == 408 || *status == 429 {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Fatal
                }
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.classify() == ErrorClass::Transient
    }
}

/// Errores internos del motor (no confundir con fallos de steps, que quedan
/// registrados en el contexto y terminan la instancia de forma ordenada).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing required variable {0}")]
    MissingVariable(String),

    #[error("variable {0} holds an incompatible value: {1}")]
    IncompatibleVariable(String, String),

    #[error("hooks pending but no hook step factory configured")]
    NoHookFactory,

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("internal: {0}")]
    Internal(String),
}

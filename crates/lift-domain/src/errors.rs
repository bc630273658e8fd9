//! Errores de dominio.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("module {0} not found in descriptor")]
    ModuleNotFound(String),

    #[error("invalid hook phase {0:?}: expected \"before/<step-id>\" or \"after/<step-id>\"")]
    InvalidHookPhase(String),
}

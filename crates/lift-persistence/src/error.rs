//! Errores de almacenamiento de archivos.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("file content not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt blob metadata: {0}")]
    Metadata(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FileStorageError {
    /// Un fallo de storage o de IO puede ser transitorio; metadata corrupta
    /// y contenido ausente no lo son.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FileStorageError::Storage(_) | FileStorageError::Io(_))
    }
}

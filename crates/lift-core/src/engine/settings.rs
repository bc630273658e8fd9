//! Configuración por operación del motor.

use std::time::Duration;

/// Política de reintentos para errores transitorios.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    /// Número máximo de ejecuciones de una fase antes de declarar `Failed`.
    pub max_attempts: u32,
    /// Espera base; el backoff es lineal: `attempts * backoff_base`.
    pub backoff_base: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3,
               backoff_base: Duration::from_secs(5) }
    }
}

/// Intervalo de re-invocación mientras una operación remota sigue en curso.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5) }
    }
}

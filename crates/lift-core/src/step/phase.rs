//! Fases del ciclo de vida de un step.
//!
//! Las transiciones válidas son:
//! - `Execute` -> `Done` (step síncrono)
//! - `Execute` -> `Poll` (arrancó una operación remota)
//! - `Poll` -> `Poll` | `Done`
//! - cualquier fase -> `Retry` (error transitorio, reintento pendiente)
//! - cualquier fase -> `Failed` (terminal)
//!
//! `Execute` es la fase de entrada; `Done` y `Failed` son terminales.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPhase {
    /// Fase de entrada: lógica síncrona del step.
    Execute,
    /// Hay una operación remota en curso; el motor reinvoca tras el intervalo
    /// de polling.
    Poll,
    /// El step terminó correctamente.
    Done,
    /// Error transitorio; el motor reinvoca la misma fase tras el backoff.
    Retry,
    /// Terminal: aborta el pipeline salvo que el step sea best-effort.
    Failed,
}

impl StepPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepPhase::Done | StepPhase::Failed)
    }
}

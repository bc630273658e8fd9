//! Subsistema de hooks: extensión pre/post step sin tocar los steps.
//!
//! Los hooks se declaran en el descriptor por módulo y se materializan como
//! steps normales que el motor ejecuta en un sub-pipeline anidado, con la
//! misma máquina de estados (polling y reintentos incluidos).

mod calculator;
mod executor;
mod hooked_step;

pub use calculator::{CalculatedHooks, HooksCalculator};
pub use executor::HooksExecutor;
pub use hooked_step::HookedStep;

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// Momento de ejecución de un hook relativo al step que envuelve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookPhase {
    Before,
    After,
}

/// Hook calculado para una invocación concreta de un step. Inmutable una vez
/// computado; se persiste en el contexto mientras su sub-pipeline avanza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    pub module_name: String,
    pub phase: HookPhase,
    pub step_id: String,
}

/// Materializa un `Hook` declarado como un step ejecutable. El motor lo usa
/// para construir el sub-pipeline anidado; la implementación concreta decide
/// qué hace cada hook (tarea remota, script, ...).
pub trait HookStepFactory {
    fn create(&self, hook: &Hook) -> Box<dyn Step>;
}

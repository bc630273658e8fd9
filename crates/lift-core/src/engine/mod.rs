//! Motor de ejecución del pipeline de despliegue.

mod core;
mod settings;

pub use core::{Engine, Progress};
pub use settings::{PollSettings, RetrySettings};

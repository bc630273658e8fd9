//! lift-core: máquina de estados de steps para despliegues reanudables.
//!
//! Núcleo del pipeline de despliegue: secuencia steps, se suspende en
//! operaciones remotas largas, reanuda por polling y reintenta errores
//! transitorios de forma idempotente. Todo el estado reanudable vive en el
//! `ProcessContext`; la persistencia y la re-invocación se delegan en un
//! sustrato de workflow externo (`scheduler`).

pub mod context;
pub mod engine;
pub mod errors;
pub mod execution;
pub mod hooks;
pub mod logger;
pub mod scheduler;
pub mod step;

mod keys;

pub use context::{ProcessContext, Variable};
pub use engine::{Engine, PollSettings, Progress, RetrySettings};
pub use errors::{EngineError, ErrorClass, StepError};
pub use execution::{AsyncExecution, ExecutionStatus, Poller};
pub use hooks::{CalculatedHooks, Hook, HookPhase, HookStepFactory, HookedStep, HooksCalculator, HooksExecutor};
pub use logger::ProcessLogger;
pub use scheduler::{ExecutionScheduler, InMemoryScheduler};
pub use step::{Pipeline, Step, StepMetadata, StepPhase};

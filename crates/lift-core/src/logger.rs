//! Handle de observabilidad por instancia.
//!
//! En lugar de loggers globales, cada instancia de despliegue recibe un
//! `ProcessLogger` explícito que prefija todos sus mensajes con el id de la
//! instancia (y opcionalmente el step actual) y delega en el crate `log`.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProcessLogger {
    instance_id: Uuid,
    step_id: Option<String>,
}

impl ProcessLogger {
    pub fn new(instance_id: Uuid) -> Self {
        Self { instance_id, step_id: None }
    }

    /// Deriva un logger anotado con el step actual.
    pub fn for_step(&self, step_id: &str) -> Self {
        Self { instance_id: self.instance_id,
               step_id: Some(step_id.to_string()) }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    fn prefix(&self) -> String {
        match &self.step_id {
            Some(step) => format!("[{}/{}]", self.instance_id, step),
            None => format!("[{}]", self.instance_id),
        }
    }

    pub fn debug(&self, message: &str) {
        log::debug!("{} {}", self.prefix(), message);
    }

    pub fn info(&self, message: &str) {
        log::info!("{} {}", self.prefix(), message);
    }

    pub fn warn(&self, message: &str) {
        log::warn!("{} {}", self.prefix(), message);
    }

    pub fn error(&self, message: &str) {
        log::error!("{} {}", self.prefix(), message);
    }
}

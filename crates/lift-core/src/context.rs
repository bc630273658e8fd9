//! `ProcessContext`: almacén tipado de variables de una instancia de
//! despliegue.
//!
//! Rol en el pipeline:
//! - Todo el estado necesario para reanudar (handles de operaciones remotas,
//!   contadores de intentos, resultados parciales) vive aquí, nunca en estado
//!   local transitorio del step.
//! - El contexto pertenece en exclusiva a una instancia durante toda su vida
//!   y se serializa completo entre invocaciones del motor.
//! - Las claves declaradas (`Variable<T>`) dan acceso tipado; el motor usa
//!   además claves crudas con namespace (`step:{id}:phase`, ...) para su
//!   propio estado.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::EngineError;

/// Clave tipada de una variable del contexto.
///
/// Declarar las variables como constantes evita errores de tipeo y fija el
/// tipo del valor en el punto de declaración, no en cada lectura.
pub struct Variable<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Variable<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Estado serializable de una instancia de despliegue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessContext {
    instance_id: Uuid,
    variables: BTreeMap<String, Value>,
}

impl ProcessContext {
    pub fn new(instance_id: Uuid) -> Self {
        Self { instance_id,
               variables: BTreeMap::new() }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Lee una variable tipada. `None` si no existe o si el valor almacenado
    /// no es deserializable al tipo declarado.
    pub fn get<T: DeserializeOwned>(&self, var: &Variable<T>) -> Option<T> {
        self.variables
            .get(var.name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Lee una variable obligatoria.
    pub fn require<T: DeserializeOwned>(&self, var: &Variable<T>) -> Result<T, EngineError> {
        let raw = self.variables
                      .get(var.name)
                      .ok_or_else(|| EngineError::MissingVariable(var.name.to_string()))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| EngineError::IncompatibleVariable(var.name.to_string(), e.to_string()))
    }

    /// Escribe una variable tipada. La última escritura por nombre gana; el
    /// historial append-only lo mantiene el sustrato de workflow.
    pub fn set<T: Serialize>(&mut self, var: &Variable<T>, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.variables.insert(var.name.to_string(), v);
            }
            Err(err) => log::error!("dropping write of variable {}: {err}", var.name),
        }
    }

    pub fn remove<T>(&mut self, var: &Variable<T>) {
        self.variables.remove(var.name);
    }

    pub fn contains<T>(&self, var: &Variable<T>) -> bool {
        self.variables.contains_key(var.name)
    }

    // Acceso crudo para el estado interno del motor (claves con namespace).

    pub fn get_raw<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.variables
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_raw<T: Serialize>(&mut self, name: &str, value: &T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.variables.insert(name.to_string(), v);
        }
    }

    pub fn remove_raw(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Elimina todas las claves con el prefijo dado. Se usa al finalizar un
    /// step para no arrastrar estado muerto entre steps.
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.variables.retain(|k, _| !k.starts_with(prefix));
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COUNTER: Variable<u32> = Variable::new("counter");
    const LABELS: Variable<Vec<String>> = Variable::new("labels");

    #[test]
    fn typed_roundtrip() {
        let mut ctx = ProcessContext::new(Uuid::new_v4());
        ctx.set(&COUNTER, &7);
        ctx.set(&LABELS, &vec!["a".to_string(), "b".to_string()]);

        assert_eq!(ctx.get(&COUNTER), Some(7));
        assert_eq!(ctx.require(&LABELS).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn missing_variable_is_none_and_require_fails() {
        let ctx = ProcessContext::new(Uuid::new_v4());
        assert_eq!(ctx.get(&COUNTER), None);
        assert!(ctx.require(&COUNTER).is_err());
    }

    #[test]
    fn unserializable_write_is_dropped_without_clobbering() {
        const RATE: Variable<f64> = Variable::new("rate");
        let mut ctx = ProcessContext::new(Uuid::new_v4());
        ctx.set(&RATE, &1.5);

        // NaN no tiene representación JSON; la escritura se descarta
        ctx.set(&RATE, &f64::NAN);
        assert_eq!(ctx.get(&RATE), Some(1.5));
    }

    #[test]
    fn incompatible_value_is_rejected() {
        let mut ctx = ProcessContext::new(Uuid::new_v4());
        ctx.set_raw(COUNTER.name(), &json!("not a number"));
        assert_eq!(ctx.get(&COUNTER), None);
        assert!(matches!(ctx.require(&COUNTER),
                         Err(crate::errors::EngineError::IncompatibleVariable(..))));
    }

    #[test]
    fn context_survives_serialization() {
        let mut ctx = ProcessContext::new(Uuid::new_v4());
        ctx.set(&COUNTER, &3);
        ctx.set_raw("step:upload-app:phase", &json!("Poll"));

        let persisted = serde_json::to_string(&ctx).unwrap();
        let restored: ProcessContext = serde_json::from_str(&persisted).unwrap();

        assert_eq!(restored.instance_id(), ctx.instance_id());
        assert_eq!(restored.get(&COUNTER), Some(3));
        assert_eq!(restored.get_raw::<String>("step:upload-app:phase").as_deref(), Some("Poll"));
    }

    #[test]
    fn remove_prefix_clears_step_state() {
        let mut ctx = ProcessContext::new(Uuid::new_v4());
        ctx.set_raw("step:a:phase", &json!("Poll"));
        ctx.set_raw("step:a:attempts", &json!(2));
        ctx.set_raw("step:ab:phase", &json!("Execute"));

        ctx.remove_prefix("step:a:");

        assert!(ctx.get_raw::<String>("step:a:phase").is_none());
        assert!(ctx.get_raw::<u32>("step:a:attempts").is_none());
        assert!(ctx.get_raw::<String>("step:ab:phase").is_some());
    }
}

//! Cliente del control plane.
//!
//! El transporte HTTP real es un colaborador externo; aquí vive el contrato
//! que consumen los steps y un doble de pruebas programable. Cada llamada
//! puede fallar con un error clasificado por status HTTP.

use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use lift_core::StepError;
use lift_domain::{CloudApplication, CloudPackage, CloudRoute, ServiceBroker};

#[derive(Debug, Clone, Error)]
#[error("controller call failed{}: {message}", status_suffix(.status))]
pub struct ClientError {
    /// Status HTTP de la respuesta; `None` ante fallo de red sin respuesta.
    pub status: Option<u16>,
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" ({s})"),
        None => String::new(),
    }
}

impl ClientError {
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }
}

impl From<ClientError> for StepError {
    fn from(err: ClientError) -> Self {
        match err.status {
            Some(status) => StepError::Remote { status, message: err.message },
            // fallo de red sin respuesta: siempre reintentable
            None => StepError::Transient(err.message),
        }
    }
}

pub trait ControllerClient {
    fn get_application(&self, name: &str)
                       -> Result<Option<CloudApplication>, ClientError>;

    /// Inicia la subida del binario; el paquete devuelto es el token de
    /// polling (su guid se persiste en el contexto).
    fn async_upload_application(&self, name: &str, path: &Path)
                                -> Result<CloudPackage, ClientError>;

    fn get_package(&self, guid: Uuid) -> Result<CloudPackage, ClientError>;

    /// Paquete más reciente conocido para la aplicación, subido o no.
    fn get_most_recent_package(&self, app_guid: Uuid)
                               -> Result<Option<CloudPackage>, ClientError>;

    /// Paquete actualmente asociado (stageado) a la aplicación.
    fn get_current_package(&self, app_guid: Uuid)
                           -> Result<Option<CloudPackage>, ClientError>;

    fn update_application_env(&self, guid: Uuid, env: Map<String, Value>)
                              -> Result<(), ClientError>;

    fn delete_route(&self, route: &CloudRoute) -> Result<(), ClientError>;

    fn get_service_broker(&self, name: &str)
                          -> Result<Option<ServiceBroker>, ClientError>;

    fn delete_service_broker(&self, name: &str) -> Result<(), ClientError>;
}

pub use mock::MockClient;

mod mock {
    use super::*;
    use lift_domain::PackageStatus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockState {
        applications: HashMap<String, CloudApplication>,
        packages: HashMap<Uuid, CloudPackage>,
        most_recent: HashMap<Uuid, Uuid>,
        current: HashMap<Uuid, Uuid>,
        brokers: HashMap<String, ServiceBroker>,
        route_failures: HashMap<String, u16>,
        broker_delete_failures: HashMap<String, u16>,
        upload_failure: Option<ClientError>,
        calls: Vec<String>,
    }

    /// Doble de pruebas con respuestas programables y registro de llamadas.
    #[derive(Default)]
    pub struct MockClient {
        state: Mutex<MockState>,
    }

    impl MockClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_application(&self, app: CloudApplication) {
            self.lock().applications.insert(app.name.clone(), app);
        }

        pub fn add_package(&self, package: CloudPackage) {
            self.lock().packages.insert(package.guid, package);
        }

        pub fn set_most_recent_package(&self, app_guid: Uuid, package_guid: Uuid) {
            self.lock().most_recent.insert(app_guid, package_guid);
        }

        pub fn set_current_package(&self, app_guid: Uuid, package_guid: Uuid) {
            self.lock().current.insert(app_guid, package_guid);
        }

        pub fn set_package_status(&self, guid: Uuid, status: PackageStatus) {
            if let Some(package) = self.lock().packages.get_mut(&guid) {
                package.status = status;
            }
        }

        pub fn add_service_broker(&self, broker: ServiceBroker) {
            self.lock().brokers.insert(broker.name.clone(), broker);
        }

        pub fn fail_route_deletion(&self, route: &CloudRoute, status: u16) {
            self.lock().route_failures.insert(route.to_string(), status);
        }

        pub fn fail_broker_deletion(&self, name: &str, status: u16) {
            self.lock().broker_delete_failures.insert(name.to_owned(), status);
        }

        pub fn fail_upload(&self, error: ClientError) {
            self.lock().upload_failure = Some(error);
        }

        pub fn calls(&self) -> Vec<String> {
            self.lock().calls.clone()
        }

        pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
            self.calls().into_iter().filter(|c| c.starts_with(prefix)).collect()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn record(&self, call: String) {
            self.lock().calls.push(call);
        }
    }

    impl ControllerClient for MockClient {
        fn get_application(&self, name: &str)
                           -> Result<Option<CloudApplication>, ClientError> {
            self.record(format!("get_application {name}"));
            Ok(self.lock().applications.get(name).cloned())
        }

        fn async_upload_application(&self, name: &str, path: &Path)
                                    -> Result<CloudPackage, ClientError> {
            self.record(format!("async_upload_application {name}"));
            if !path.exists() {
                return Err(ClientError::network(format!("staged file {} missing",
                                                        path.display())));
            }
            let mut state = self.lock();
            if let Some(err) = state.upload_failure.take() {
                return Err(err);
            }
            let package = CloudPackage { guid: Uuid::new_v4(),
                                         status: PackageStatus::Processing,
                                         content_digest: None,
                                         created_at: chrono::Utc::now() };
            state.packages.insert(package.guid, package.clone());
            if let Some(app) = state.applications.get(name).map(|a| a.guid) {
                state.most_recent.insert(app, package.guid);
            }
            Ok(package)
        }

        fn get_package(&self, guid: Uuid) -> Result<CloudPackage, ClientError> {
            self.record(format!("get_package {guid}"));
            self.lock()
                .packages
                .get(&guid)
                .cloned()
                .ok_or_else(|| ClientError::with_status(404, format!("package {guid}")))
        }

        fn get_most_recent_package(&self, app_guid: Uuid)
                                   -> Result<Option<CloudPackage>, ClientError> {
            self.record(format!("get_most_recent_package {app_guid}"));
            let state = self.lock();
            Ok(state.most_recent
                    .get(&app_guid)
                    .and_then(|guid| state.packages.get(guid))
                    .cloned())
        }

        fn get_current_package(&self, app_guid: Uuid)
                               -> Result<Option<CloudPackage>, ClientError> {
            self.record(format!("get_current_package {app_guid}"));
            let state = self.lock();
            Ok(state.current
                    .get(&app_guid)
                    .and_then(|guid| state.packages.get(guid))
                    .cloned())
        }

        fn update_application_env(&self, guid: Uuid, env: Map<String, Value>)
                                  -> Result<(), ClientError> {
            self.record(format!("update_application_env {guid}"));
            let mut state = self.lock();
            if let Some(app) = state.applications.values_mut().find(|a| a.guid == guid) {
                app.env = env;
                Ok(())
            } else {
                Err(ClientError::with_status(404, format!("application {guid}")))
            }
        }

        fn delete_route(&self, route: &CloudRoute) -> Result<(), ClientError> {
            let name = route.to_string();
            self.record(format!("delete_route {name}"));
            match self.lock().route_failures.get(&name) {
                Some(status) => Err(ClientError::with_status(*status, format!("route {name}"))),
                None => Ok(()),
            }
        }

        fn get_service_broker(&self, name: &str)
                              -> Result<Option<ServiceBroker>, ClientError> {
            self.record(format!("get_service_broker {name}"));
            Ok(self.lock().brokers.get(name).cloned())
        }

        fn delete_service_broker(&self, name: &str) -> Result<(), ClientError> {
            self.record(format!("delete_service_broker {name}"));
            let mut state = self.lock();
            if let Some(status) = state.broker_delete_failures.get(name) {
                return Err(ClientError::with_status(*status, format!("broker {name}")));
            }
            state.brokers.remove(name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_become_remote() {
        let err: StepError = ClientError::with_status(502, "bad gateway").into();
        assert!(err.is_transient());
        let err: StepError = ClientError::with_status(403, "forbidden").into();
        assert!(!err.is_transient());
    }

    #[test]
    fn network_errors_become_transient() {
        let err: StepError = ClientError::network("connection reset").into();
        assert!(err.is_transient());
    }
}

//! Decisión de subida idempotente y reutilización de paquetes.
//!
//! El objetivo es no volver a transferir binarios sin cambios: el digest del
//! contenido se compara contra el guardado en el env de la aplicación y, si
//! coincide, se intenta reutilizar el paquete remoto más reciente. La
//! identidad de paquetes se compara por guid, nunca por digest.

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use uuid::Uuid;

use lift_core::StepError;
use lift_domain::entities::{APP_CONTENT_DIGEST_ATTRIBUTE, DEPLOY_ATTRIBUTES_ENV};
use lift_domain::{CloudApplication, CloudPackage};
use lift_persistence::FileService;

use crate::archive;
use crate::client::ControllerClient;
use crate::digest::ArchiveDigestCalculator;

#[derive(Debug, Clone, PartialEq)]
pub enum UploadDecision {
    /// Subida asíncrona iniciada; el paquete es el token de polling.
    UploadStarted(CloudPackage),
    /// El último paquete remoto se re-asocia sin transferir contenido.
    BindLatest(CloudPackage),
    /// Contenido sin cambios y paquete vigente; no hay nada que hacer.
    ContentUnchanged,
}

pub struct UploadOutcome {
    pub decision: UploadDecision,
    pub new_digest: String,
}

pub struct PackageReuseResolver<'a, C, F> {
    client: &'a C,
    files: &'a F,
    calculator: ArchiveDigestCalculator,
}

impl<'a, C: ControllerClient, F: FileService> PackageReuseResolver<'a, C, F> {
    pub fn new(client: &'a C, files: &'a F, calculator: ArchiveDigestCalculator) -> Self {
        Self { client, files, calculator }
    }

    pub fn decide_upload_action(&self,
                                space: &str,
                                archive_id: Uuid,
                                module_file: &str,
                                app: &CloudApplication,
                                needs_restage: bool)
                                -> Result<UploadOutcome, StepError> {
        let new_digest =
            self.calculator.digest_entry(self.files, space, archive_id, module_file)?;
        let current_digest = app.deployed_content_digest();

        if current_digest.as_deref() != Some(new_digest.as_str()) {
            log::debug!("content of {} changed, uploading", app.name);
            let package = self.start_upload(space, archive_id, module_file, app)?;
            return Ok(UploadOutcome { decision: UploadDecision::UploadStarted(package),
                                      new_digest });
        }

        let latest = match self.client.get_most_recent_package(app.guid)? {
            Some(latest) if latest.status.is_reusable() => latest,
            Some(_) | None => {
                log::debug!("no reusable package for {}, uploading", app.name);
                let package = self.start_upload(space, archive_id, module_file, app)?;
                return Ok(UploadOutcome { decision: UploadDecision::UploadStarted(package),
                                          new_digest });
            }
        };

        let current_package = self.client.get_current_package(app.guid)?;
        let bound_to_latest = current_package.as_ref()
                                             .is_some_and(|p| packages_match(p, &latest));
        if !bound_to_latest || needs_restage {
            log::debug!("binding {} to latest package {}", app.name, latest.guid);
            return Ok(UploadOutcome { decision: UploadDecision::BindLatest(latest),
                                      new_digest });
        }

        log::info!("content of application {} is not changed", app.name);
        Ok(UploadOutcome { decision: UploadDecision::ContentUnchanged, new_digest })
    }

    fn start_upload(&self,
                    space: &str,
                    archive_id: Uuid,
                    module_file: &str,
                    app: &CloudApplication)
                    -> Result<CloudPackage, StepError> {
        let staged = stage_module_file(self.files, space, archive_id, module_file)?;
        let package = self.client
                          .async_upload_application(&app.name, staged.path())
                          .map_err(StepError::from)?;
        Ok(package)
        // `staged` se suelta aquí: el temporal se borra en éxito, fallo y
        // cancelación por igual
    }
}

/// Dos paquetes son el mismo objeto remoto sólo si comparten guid.
pub fn packages_match(a: &CloudPackage, b: &CloudPackage) -> bool {
    a.guid == b.guid
}

/// Extrae la entrada del módulo a un archivo temporal listo para subir.
fn stage_module_file<F: FileService>(files: &F,
                                     space: &str,
                                     archive_id: Uuid,
                                     entry_name: &str)
                                     -> Result<NamedTempFile, StepError> {
    let mut staged = NamedTempFile::new()
        .map_err(|e| StepError::Transient(format!("creating staging file: {e}")))?;
    archive::with_archive_entry(files, space, archive_id, entry_name, |reader| {
        std::io::copy(reader, staged.as_file_mut())
            .map_err(|e| StepError::Transient(format!("staging {entry_name}: {e}")))?;
        Ok(())
    })?;
    Ok(staged)
}

/// Env de la aplicación con el digest de contenido actualizado dentro de
/// `DEPLOY_ATTRIBUTES`, preservando el resto de atributos.
pub fn env_with_content_digest(env: &Map<String, Value>,
                               digest: &str)
                               -> Result<Map<String, Value>, StepError> {
    let mut attributes: Map<String, Value> =
        env.get(DEPLOY_ATTRIBUTES_ENV)
           .and_then(|v| v.as_str())
           .and_then(|raw| serde_json::from_str(raw).ok())
           .unwrap_or_default();
    attributes.insert(APP_CONTENT_DIGEST_ATTRIBUTE.into(), Value::String(digest.into()));
    let serialized = serde_json::to_string(&attributes)
        .map_err(|e| StepError::Operation(format!("serializing deploy attributes: {e}")))?;
    let mut updated = env.clone();
    updated.insert(DEPLOY_ATTRIBUTES_ENV.into(), Value::String(serialized));
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lift_domain::PackageStatus;
    use serde_json::json;

    fn package(status: PackageStatus) -> CloudPackage {
        CloudPackage { guid: Uuid::new_v4(),
                       status,
                       content_digest: None,
                       created_at: Utc::now() }
    }

    #[test]
    fn equal_digest_different_guid_is_not_a_match() {
        let mut a = package(PackageStatus::Ready);
        let mut b = package(PackageStatus::Ready);
        a.content_digest = Some("same".into());
        b.content_digest = Some("same".into());
        assert!(!packages_match(&a, &b));
        assert!(packages_match(&a, &a.clone()));
    }

    #[test]
    fn digest_update_preserves_other_attributes() {
        let mut env = Map::new();
        env.insert(DEPLOY_ATTRIBUTES_ENV.into(),
                   json!("{\"app-content-digest\":\"old\",\"color\":\"blue\"}"));
        env.insert("OTHER".into(), json!("untouched"));

        let updated = env_with_content_digest(&env, "new").unwrap();
        assert_eq!(updated.get("OTHER"), Some(&json!("untouched")));
        let attrs: Map<String, Value> =
            serde_json::from_str(updated[DEPLOY_ATTRIBUTES_ENV].as_str().unwrap()).unwrap();
        assert_eq!(attrs["app-content-digest"], json!("new"));
        assert_eq!(attrs["color"], json!("blue"));
    }
}

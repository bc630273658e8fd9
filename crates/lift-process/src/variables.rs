//! Variables tipadas del contexto de despliegue.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use lift_core::Variable;
use lift_domain::{ApplicationToDeploy, CloudApplication, CloudPackage, CloudRoute,
                  DeploymentDescriptor};

use crate::archive::ArchiveManifest;

pub const SPACE_ID: Variable<String> = Variable::new("space_id");
pub const APP_ARCHIVE_ID: Variable<Uuid> = Variable::new("app_archive_id");
pub const APP_TO_DEPLOY: Variable<ApplicationToDeploy> = Variable::new("app_to_deploy");
pub const ARCHIVE_MANIFEST: Variable<ArchiveManifest> = Variable::new("archive_manifest");
pub const DEPLOYMENT_DESCRIPTOR: Variable<DeploymentDescriptor> =
    Variable::new("deployment_descriptor");

/// Paquete creado o re-asociado por el step de subida; token de polling.
pub const CLOUD_PACKAGE: Variable<CloudPackage> = Variable::new("cloud_package");
pub const APP_CONTENT_CHANGED: Variable<bool> = Variable::new("app_content_changed");
pub const APP_NEEDS_RESTAGE: Variable<bool> = Variable::new("app_needs_restage");
/// Digest calculado en esta ejecución, pendiente de persistir en el env de
/// la aplicación cuando el paquete llegue a `Ready`.
pub const NEW_CONTENT_DIGEST: Variable<String> = Variable::new("new_content_digest");

pub const CURRENT_ROUTES: Variable<Vec<CloudRoute>> = Variable::new("current_routes");
pub const APPS_TO_UNDEPLOY: Variable<Vec<CloudApplication>> =
    Variable::new("apps_to_undeploy");
pub const SERVICE_BROKERS_TO_CREATE: Variable<Vec<String>> =
    Variable::new("service_brokers_to_create");

/// Mapa lateral entrada-de-archivo a contenido parseado, producido por el
/// resolutor y consumido por steps posteriores.
pub const RESOLVED_EXTERNAL_FILES: Variable<BTreeMap<String, Map<String, Value>>> =
    Variable::new("resolved_external_files");

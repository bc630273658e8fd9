//! Entidades remotas del controlador y su proyección local.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Variable de entorno de la aplicación donde se persisten atributos del
/// despliegue, en formato JSON.
pub const DEPLOY_ATTRIBUTES_ENV: &str = "DEPLOY_ATTRIBUTES";
/// Atributo (dentro de `DEPLOY_ATTRIBUTES`) con el digest del contenido
/// subido en el despliegue anterior.
pub const APP_CONTENT_DIGEST_ATTRIBUTE: &str = "app-content-digest";

/// Aplicación tal como existe en el controlador remoto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudApplication {
    pub guid: Uuid,
    pub name: String,
    #[serde(default)]
    pub env: Map<String, Value>,
    /// Paquete actualmente stageado, si la app ya fue stageada alguna vez.
    pub staged_package_guid: Option<Uuid>,
    #[serde(default)]
    pub routes: Vec<CloudRoute>,
}

impl CloudApplication {
    /// Digest del contenido del despliegue anterior, leído de
    /// `DEPLOY_ATTRIBUTES`. `None` si la variable falta o no es JSON válido.
    pub fn deployed_content_digest(&self) -> Option<String> {
        let raw = self.env.get(DEPLOY_ATTRIBUTES_ENV)?.as_str()?;
        let attributes: Map<String, Value> = serde_json::from_str(raw).ok()?;
        attributes.get(APP_CONTENT_DIGEST_ATTRIBUTE)?
                  .as_str()
                  .map(str::to_owned)
    }
}

/// Aplicación que el despliegue en curso quiere dejar desplegada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationToDeploy {
    pub name: String,
    pub module_name: String,
    #[serde(default)]
    pub routes: Vec<CloudRoute>,
}

/// Paquete de contenido subido al controlador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudPackage {
    pub guid: Uuid,
    pub status: PackageStatus,
    /// Digest del contenido, sólo conocido para paquetes creados por nosotros.
    pub content_digest: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    AwaitingUpload,
    Processing,
    Ready,
    Failed,
    Expired,
    Copying,
}

impl PackageStatus {
    /// Un paquete es reutilizable mientras su contenido siga (o vaya a estar)
    /// disponible en el controlador.
    pub fn is_reusable(self) -> bool {
        !matches!(self,
                  PackageStatus::AwaitingUpload
                  | PackageStatus::Failed
                  | PackageStatus::Expired)
    }
}

/// Broker de servicios registrado por una aplicación desplegada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceBroker {
    pub guid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudRoute {
    pub host: String,
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl fmt::Display for CloudRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.host, self.domain)?;
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
        }
        Ok(())
    }
}

//! Modelo del descriptor de despliegue.
//!
//! El parsing/validación del descriptor es un colaborador externo; aquí sólo
//! vive el modelo ya parseado que consumen los steps y el resolutor de
//! contenido de archivo. Los `parameters` son JSON genérico; el sub-mapa
//! `config` es el destino de merge del contenido externo resuelto.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Clave del sub-mapa de configuración dentro de `parameters`.
pub const CONFIG_PARAMETER: &str = "config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub id: String,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub required_dependencies: Vec<RequiredDependency>,
    #[serde(default)]
    pub hooks: Vec<DeclaredHook>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredDependency {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Hook declarado en el descriptor para un módulo.
///
/// Cada fase tiene la forma `"before/<step-id>"` o `"after/<step-id>"`; un
/// mismo hook puede engancharse a varios steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredHook {
    pub name: String,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl DeploymentDescriptor {
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Lee el sub-mapa `config` de unos `parameters`, si existe y es un objeto.
pub fn config_of(parameters: &Map<String, Value>) -> Option<&Map<String, Value>> {
    parameters.get(CONFIG_PARAMETER).and_then(|v| v.as_object())
}

//! lift-domain: modelos del descriptor MTA y de las entidades del control
//! plane, sin lógica de ejecución.

pub mod descriptor;
pub mod entities;
pub mod errors;

pub use descriptor::{DeclaredHook, DeploymentDescriptor, Module, RequiredDependency, Resource};
pub use entities::{ApplicationToDeploy, CloudApplication, CloudPackage, CloudRoute, PackageStatus,
                   ServiceBroker};
pub use errors::DomainError;

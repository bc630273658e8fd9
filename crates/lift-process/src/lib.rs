//! lift-process: los steps de despliegue MTA sobre el motor de `lift-core`.
//!
//! Cubre la subida idempotente de binarios (digest de contenido +
//! reutilización de paquetes), la resolución del contenido externo del
//! archivo hacia el descriptor y la limpieza de rutas y brokers sobrantes.

pub mod archive;
pub mod client;
pub mod config;
pub mod digest;
pub mod hooks;
pub mod packages;
pub mod resolver;
pub mod steps;
pub mod variables;

pub use archive::{ArchiveManifest, ManifestEntry, MtaArchiveHelper};
pub use client::{ClientError, ControllerClient, MockClient};
pub use config::ApplicationConfiguration;
pub use digest::ArchiveDigestCalculator;
pub use packages::{packages_match, PackageReuseResolver, UploadDecision, UploadOutcome};
pub use resolver::{ArchiveContentResolver, ContentLengthTracker, ExternalFileProcessor,
                   ResolvedArchiveContent};
pub use steps::{deployment_pipeline, hooked_deployment_pipeline, DeleteIdleRoutesStep,
                DeleteServiceBrokersStep, UploadAppStep};

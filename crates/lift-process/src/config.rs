//! Configuración del proceso de despliegue desde variables de entorno.
//! Usa convención `LIFT_*`; todo valor tiene un default razonable.

use std::env;
use std::time::Duration;

const DEFAULT_MAX_RESOURCE_FILE_SIZE: u64 = 1024 * 1024; // 1 MiB
const DEFAULT_MAX_RESOLVED_CONTENT_SIZE: u64 = 5 * 1024 * 1024;
const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 5;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct ApplicationConfiguration {
    pub max_resource_file_size: u64,
    pub max_resolved_external_content_size: u64,
    pub max_retry_attempts: u32,
    pub retry_backoff: Duration,
    pub poll_interval: Duration,
}

impl Default for ApplicationConfiguration {
    fn default() -> Self {
        Self { max_resource_file_size: DEFAULT_MAX_RESOURCE_FILE_SIZE,
               max_resolved_external_content_size: DEFAULT_MAX_RESOLVED_CONTENT_SIZE,
               max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
               retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
               poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS) }
    }
}

impl ApplicationConfiguration {
    pub fn from_env() -> Self {
        // carga .env si existe; su ausencia no es un error
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            max_resource_file_size:
                parsed("LIFT_MAX_RESOURCE_FILE_SIZE", defaults.max_resource_file_size),
            max_resolved_external_content_size:
                parsed("LIFT_MAX_RESOLVED_CONTENT_SIZE",
                       defaults.max_resolved_external_content_size),
            max_retry_attempts:
                parsed("LIFT_MAX_RETRY_ATTEMPTS", defaults.max_retry_attempts),
            retry_backoff:
                Duration::from_secs(parsed("LIFT_RETRY_BACKOFF_SECS",
                                           DEFAULT_RETRY_BACKOFF_SECS)),
            poll_interval:
                Duration::from_secs(parsed("LIFT_POLL_INTERVAL_SECS",
                                           DEFAULT_POLL_INTERVAL_SECS)),
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

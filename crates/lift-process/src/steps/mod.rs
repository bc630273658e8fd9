//! Steps del pipeline de despliegue.

mod delete_idle_routes;
mod delete_service_brokers;
mod upload_app;

pub use delete_idle_routes::DeleteIdleRoutesStep;
pub use delete_service_brokers::DeleteServiceBrokersStep;
pub use upload_app::UploadAppStep;

use std::sync::Arc;

use lift_core::{Hook, HookedStep, HooksCalculator, Pipeline, ProcessContext, Step, StepError,
                Variable};
use lift_persistence::FileService;

use crate::client::ControllerClient;
use crate::config::ApplicationConfiguration;

pub const UPLOAD_APP_STEP_ID: &str = "upload-app";
pub const DELETE_IDLE_ROUTES_STEP_ID: &str = "delete-idle-routes";
pub const DELETE_SERVICE_BROKERS_STEP_ID: &str = "delete-service-brokers";

/// Pipeline de despliegue con los steps en su orden de ejecución.
pub fn deployment_pipeline<C, F>(client: Arc<C>,
                                 files: Arc<F>,
                                 config: ApplicationConfiguration)
                                 -> Pipeline
    where C: ControllerClient + 'static,
          F: FileService + 'static
{
    Pipeline::new(deployment_steps(client, files, config))
}

/// Como `deployment_pipeline`, con cada step envuelto para ejecutar los
/// hooks declarados del módulo (ver `hooks::hooks_for_module`). Con una
/// lista vacía el pipeline se comporta igual que el desnudo.
pub fn hooked_deployment_pipeline<C, F>(client: Arc<C>,
                                        files: Arc<F>,
                                        config: ApplicationConfiguration,
                                        hooks: Vec<Hook>)
                                        -> Pipeline
    where C: ControllerClient + 'static,
          F: FileService + 'static
{
    let steps = deployment_steps(client, files, config)
        .into_iter()
        .map(|step| {
            Box::new(HookedStep::new(step, HooksCalculator::new(hooks.clone())))
                as Box<dyn Step>
        })
        .collect();
    Pipeline::new(steps)
}

fn deployment_steps<C, F>(client: Arc<C>,
                          files: Arc<F>,
                          config: ApplicationConfiguration)
                          -> Vec<Box<dyn Step>>
    where C: ControllerClient + 'static,
          F: FileService + 'static
{
    vec![
        Box::new(UploadAppStep::new(Arc::clone(&client), files, config)),
        Box::new(DeleteIdleRoutesStep::new(Arc::clone(&client))),
        Box::new(DeleteServiceBrokersStep::new(client)),
    ]
}

fn require<T: serde::de::DeserializeOwned>(ctx: &ProcessContext,
                                           variable: &Variable<T>)
                                           -> Result<T, StepError> {
    ctx.require(variable)
       .map_err(|e| StepError::Operation(e.to_string()))
}

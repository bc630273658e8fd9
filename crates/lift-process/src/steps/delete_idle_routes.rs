//! Borrado de rutas que el nuevo despliegue ya no declara.

use std::sync::Arc;

use lift_core::{ProcessContext, ProcessLogger, Step, StepError, StepMetadata, StepPhase};

use crate::client::ControllerClient;
use crate::steps::{require, DELETE_IDLE_ROUTES_STEP_ID};
use crate::variables;

pub struct DeleteIdleRoutesStep<C> {
    client: Arc<C>,
    metadata: StepMetadata,
}

impl<C: ControllerClient> DeleteIdleRoutesStep<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client,
               metadata: StepMetadata::new(DELETE_IDLE_ROUTES_STEP_ID,
                                           "Delete idle routes",
                                           "Elimina las rutas actuales que el nuevo \
                                            despliegue no conserva") }
    }
}

impl<C: ControllerClient> Step for DeleteIdleRoutesStep<C> {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn execute(&self, ctx: &mut ProcessContext, logger: &ProcessLogger)
               -> Result<StepPhase, StepError> {
        let kept = require(ctx, &variables::APP_TO_DEPLOY)?.routes;
        let current = ctx.get(&variables::CURRENT_ROUTES).unwrap_or_default();

        for route in &current {
            if kept.contains(route) {
                continue;
            }
            match self.client.delete_route(route) {
                Ok(()) => logger.info(&format!("deleted idle route {route}")),
                // la ruta ya no existe
                Err(err) if err.status == Some(404) => {
                    logger.debug(&format!("route {route} already gone"));
                }
                // la ruta fue reasignada a otra aplicación
                Err(err) if err.status == Some(409) => {
                    logger.warn(&format!("route {route} is in use elsewhere, skipping"));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(StepPhase::Done)
    }
}

//! Final response assembly.

use super::assembler::AssemblyContext;
use super::collector::CollectedResults;
use gridsim_core::model::export::export_network;
use gridsim_core::schema::Summary;
use gridsim_core::{
    CreationStatus, Diagnostics, GridError, ReturnNetwork, SimulationResponse, ValidationError,
};
use std::collections::BTreeMap;
use web_time::Instant;

/// Accumulates warnings and bucketed errors while the pipeline runs and
/// turns them into a [`SimulationResponse`] at the end.
#[derive(Debug)]
pub struct ResponseBuilder {
    start: Instant,
    return_network: ReturnNetwork,
    pub diagnostics: Diagnostics,
    errors: BTreeMap<String, Vec<ValidationError>>,
}

impl ResponseBuilder {
    pub fn new(start: Instant, return_network: ReturnNetwork) -> Self {
        Self {
            start,
            return_network,
            diagnostics: Diagnostics::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn error(&mut self, bucket: &str, error: ValidationError) {
        self.errors.entry(bucket.to_string()).or_default().push(error);
    }

    /// Report a run-level failure under its own bucket.
    pub fn fail(&mut self, err: &GridError) {
        self.error(err.bucket(), err.to_entry());
    }

    pub fn errors(&mut self, bucket: &str, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors
            .entry(bucket.to_string())
            .or_default()
            .extend(errors);
    }

    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|b| !b.is_empty())
    }

    fn summary(&self, converged: bool, slack_bus_id: &str) -> Summary {
        Summary {
            converged,
            runtime_ms: self.start.elapsed().as_millis() as u64,
            slack_bus_id: slack_bus_id.to_string(),
        }
    }

    /// Response for a run that got as far as an assembled model.
    pub fn finish(self, ctx: &AssemblyContext, collected: CollectedResults) -> SimulationResponse {
        let converged = ctx.net.converged;
        let summary = self.summary(converged, &ctx.slack_bus_id);
        SimulationResponse {
            summary,
            bus_by_id: collected.bus_by_id,
            res_bus: collected.res_bus,
            warnings: self.diagnostics.messages(),
            errors: self.errors,
            element_status: ctx.status.clone(),
            results: collected.results,
            network: export_network(&ctx.net, self.return_network),
        }
    }

    /// Response for a run that stopped before anything was solved.
    pub fn abort(
        self,
        slack_bus_id: &str,
        element_status: BTreeMap<String, CreationStatus>,
    ) -> SimulationResponse {
        let mut response = SimulationResponse::empty(slack_bus_id);
        response.summary = self.summary(false, slack_bus_id);
        response.warnings = self.diagnostics.messages();
        response.errors = self.errors;
        response.element_status = element_status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_keeps_buckets_and_warnings() {
        let mut builder = ResponseBuilder::new(Instant::now(), ReturnNetwork::Tables);
        builder.diagnostics.add_warning_with_entity("graph", "ignored", "n1");
        builder.error(
            "validation",
            ValidationError::new("", "network", Some("bus"), "At least one bus is required"),
        );
        builder.fail(&GridError::Network("Error while building network: boom".into()));
        assert!(builder.has_errors());
        let response = builder.abort("", BTreeMap::new());
        assert!(!response.summary.converged);
        assert_eq!(response.warnings, vec!["[graph] n1: ignored".to_string()]);
        assert_eq!(response.errors["validation"].len(), 1);
        assert_eq!(
            response.errors["network"][0].message,
            "Error while building network: boom"
        );
        assert!(response.network.is_none());
        assert!(response.results.is_empty());
    }

    #[test]
    fn finish_exports_requested_network() {
        let mut ctx = AssemblyContext::new(1.0, 50.0);
        ctx.slack_bus_id = "b1".to_string();
        let builder = ResponseBuilder::new(Instant::now(), ReturnNetwork::Summary);
        let response = builder.finish(&ctx, CollectedResults::default());
        assert_eq!(response.summary.slack_bus_id, "b1");
        let network = response.network.unwrap();
        assert!(!network.meta.converged);
        assert!(network.tables.is_none());
    }
}

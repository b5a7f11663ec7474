//! Diagram-to-results simulation pipeline.
//!
//! [`simulate`] runs one request end to end:
//!
//! 1. index the diagram and report ignored line nodes
//! 2. [`validator::validate`] the topology (network-wide findings stop here)
//! 3. [`assembler::assemble`] the [`PowerNet`](gridsim_core::PowerNet),
//!    skipping elements the validator rejected
//! 4. [`solver_adapter::run`] the load flow
//! 5. [`collector::collect`] id-keyed results and
//!    [`violations::detect`] limit breaches
//! 6. [`response::ResponseBuilder`] the payload
//!
//! Every stage reports into the response instead of failing the call, so the
//! caller always gets a [`SimulationResponse`] back.

pub mod assembler;
pub mod collector;
pub mod registry;
pub mod response;
pub mod solver_adapter;
pub mod validator;
pub mod violations;

pub use assembler::AssemblyContext;
pub use registry::IndexRegistry;
pub use solver_adapter::SolverOutcome;
pub use validator::{validate, Validation};
pub use violations::{Violation, ViolationLimits};

use crate::power_flow::{Algorithm, PowerFlowError, PowerFlowSettings};
use gridsim_core::graph::{assign_edge_ids, ElementKind, GraphEdge, GraphIndex};
use gridsim_core::{
    CreationStatus, GridError, ReturnNetwork, RunSettings, SimulationRequest, SimulationResponse,
};
use response::ResponseBuilder;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};
use web_time::Instant;

/// Caller-side defaults for one simulation. Request settings override the
/// power-flow fields they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    pub power_flow: PowerFlowSettings,
    pub limits: ViolationLimits,
    pub return_network: ReturnNetwork,
    pub sn_mva: f64,
    pub f_hz: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            power_flow: PowerFlowSettings::default(),
            limits: ViolationLimits::default(),
            return_network: ReturnNetwork::None,
            sn_mva: 1.0,
            f_hz: 50.0,
        }
    }
}

impl SimulationOptions {
    pub fn with_power_flow(mut self, power_flow: PowerFlowSettings) -> Self {
        self.power_flow = power_flow;
        self
    }

    pub fn with_limits(mut self, limits: ViolationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_return_network(mut self, return_network: ReturnNetwork) -> Self {
        self.return_network = return_network;
        self
    }

    pub fn with_system_base(mut self, sn_mva: f64, f_hz: f64) -> Self {
        self.sn_mva = sn_mva;
        self.f_hz = f_hz;
        self
    }
}

/// Apply request settings on top of the defaults.
pub fn resolve_settings(
    request: &RunSettings,
    defaults: &PowerFlowSettings,
) -> Result<PowerFlowSettings, PowerFlowError> {
    let mut settings = defaults.clone();
    if let Some(name) = request.algorithm.as_deref() {
        settings.algorithm = name.parse::<Algorithm>()?;
    }
    if let Some(max_iter) = request.max_iter {
        settings.max_iterations = max_iter as usize;
    }
    if let Some(tolerance) = request.tolerance_mva {
        settings.tolerance_mva = tolerance;
    }
    settings.validate()?;
    Ok(settings)
}

/// Run one request through the whole pipeline.
pub fn simulate(request: &SimulationRequest, options: &SimulationOptions) -> SimulationResponse {
    let start = Instant::now();
    let return_network = request
        .settings
        .return_network
        .unwrap_or(options.return_network);

    match panic::catch_unwind(AssertUnwindSafe(|| run(request, options, start, return_network))) {
        Ok(response) => response,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown failure".to_string());
            warn!(%reason, "simulation aborted");
            let mut builder = ResponseBuilder::new(start, return_network);
            builder.fail(&GridError::Network(format!(
                "Error while building network: {reason}"
            )));
            builder.abort("", BTreeMap::new())
        }
    }
}

fn run(
    request: &SimulationRequest,
    options: &SimulationOptions,
    start: Instant,
    return_network: ReturnNetwork,
) -> SimulationResponse {
    let mut builder = ResponseBuilder::new(start, return_network);
    let edges = with_edge_ids(&request.edges);
    let index = GraphIndex::new(&request.nodes, &edges);
    info!(
        nodes = request.nodes.len(),
        edges = request.edges.len(),
        "simulation started"
    );

    for node in index.nodes_of(ElementKind::Line) {
        builder.diagnostics.add_warning_with_entity(
            "graph",
            "line nodes are ignored; draw lines as edges between two buses",
            &node.id,
        );
    }

    let validation = validate(&index);
    let mut status: BTreeMap<String, CreationStatus> = BTreeMap::new();
    for err in validation.errors.iter().filter(|e| !e.element_id.is_empty()) {
        status
            .entry(err.element_id.clone())
            .or_insert_with(|| CreationStatus::failed(&err.element_id, &err.element_type, &err.message));
    }
    if !validation.is_valid() {
        warn!(
            findings = validation.errors.len(),
            fatal = validation.is_fatal(),
            "validation reported problems"
        );
        builder.errors("validation", validation.errors.iter().cloned());
    }
    let fallback_slack = index
        .nodes_of(ElementKind::Bus)
        .next()
        .map(|n| n.id.clone())
        .unwrap_or_default();
    if validation.is_fatal() {
        return builder.abort(&fallback_slack, status);
    }

    let mut ctx = AssemblyContext::new(options.sn_mva, options.f_hz);
    assembler::assemble(&index, &validation.failed_elements(), &mut ctx);
    for (id, failed) in status {
        ctx.status.insert(id, failed);
    }

    if !ctx.has_slack() {
        builder.fail(&GridError::Network(
            "No ext_grid found. At least one ext_grid is required.".to_string(),
        ));
        return builder.finish(&ctx, Default::default());
    }

    let settings = match resolve_settings(&request.settings, &options.power_flow) {
        Ok(settings) => settings,
        Err(err) => {
            builder.fail(&settings_error(&request.settings, &options.power_flow, &err));
            return builder.finish(&ctx, Default::default());
        }
    };

    match solver_adapter::run(&mut ctx.net, &settings) {
        SolverOutcome::Converged(outcome) => {
            info!(
                iterations = outcome.iterations,
                deenergized = outcome.deenergized_nodes,
                "power flow converged"
            );
        }
        SolverOutcome::NotConverged(reason) => {
            builder
                .diagnostics
                .add_warning("powerflow", &format!("Power flow did not converge: {reason}"));
        }
        SolverOutcome::SolverError(err) => {
            builder.fail(&settings_error(&request.settings, &settings, &err));
        }
    }

    let collected = collector::collect(&ctx);
    let violations = violations::detect(&mut ctx, &options.limits, &mut builder.diagnostics);
    let response = builder.finish(&ctx, collected);
    info!(
        converged = response.summary.converged,
        violations,
        warnings = response.warnings.len(),
        runtime_ms = response.summary.runtime_ms,
        "simulation finished"
    );
    response
}

/// Edges as given, or a copy with synthetic ids when some are missing.
fn with_edge_ids(edges: &[GraphEdge]) -> Cow<'_, [GraphEdge]> {
    if edges.iter().all(|e| e.id.is_some()) {
        return Cow::Borrowed(edges);
    }
    let mut owned = edges.to_vec();
    assign_edge_ids(&mut owned);
    Cow::Owned(owned)
}

/// A solver failure naming the settings the run was attempted with.
fn settings_error(
    request: &RunSettings,
    effective: &PowerFlowSettings,
    err: &PowerFlowError,
) -> GridError {
    let algorithm = request
        .algorithm
        .clone()
        .unwrap_or_else(|| effective.algorithm.to_string());
    let max_iter = request
        .max_iter
        .map_or(effective.max_iterations, |m| m as usize);
    let tolerance = request.tolerance_mva.unwrap_or(effective.tolerance_mva);
    GridError::Solver(format!(
        "power flow failed (algorithm={algorithm}, max_iter={max_iter}, tolerance_mva={tolerance}): {err}"
    ))
}

//! Request and response payloads of one simulation run.

use crate::graph::{GraphEdge, GraphNode};
use crate::model::export::NetworkExport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// How much of the assembled network to echo back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnNetwork {
    #[default]
    None,
    Summary,
    Tables,
}

impl ReturnNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnNetwork::None => "none",
            ReturnNetwork::Summary => "summary",
            ReturnNetwork::Tables => "tables",
        }
    }
}

impl FromStr for ReturnNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ReturnNetwork::None),
            "summary" => Ok(ReturnNetwork::Summary),
            "tables" => Ok(ReturnNetwork::Tables),
            other => Err(format!(
                "unknown return_network '{other}' (expected none, summary or tables)"
            )),
        }
    }
}

/// Numerical settings supplied with a request. Absent fields fall back to
/// the caller's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub algorithm: Option<String>,
    #[serde(alias = "max_iterations")]
    pub max_iter: Option<u32>,
    #[serde(alias = "tolerance")]
    pub tolerance_mva: Option<f64>,
    pub return_network: Option<ReturnNetwork>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationRequest {
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub settings: RunSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub element_id: String,
    pub element_type: String,
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        element_id: impl Into<String>,
        element_type: impl Into<String>,
        field: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            element_type: element_type.into(),
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationStatus {
    pub element_id: String,
    pub element_type: String,
    pub success: bool,
    pub error: Option<String>,
}

impl CreationStatus {
    pub fn ok(element_id: &str, element_type: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
            element_type: element_type.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(element_id: &str, element_type: &str, error: impl Into<String>) -> Self {
        Self {
            element_id: element_id.to_string(),
            element_type: element_type.to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub converged: bool,
    pub runtime_ms: u64,
    pub slack_bus_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusResult {
    pub vm_pu: Option<f64>,
    pub va_degree: Option<f64>,
    pub p_mw: Option<f64>,
    pub q_mvar: Option<f64>,
}

/// One row of the raw bus result table, tagged with its external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResBusRow {
    pub bus_id: String,
    pub index: usize,
    pub vm_pu: Option<f64>,
    pub va_degree: Option<f64>,
    pub p_mw: Option<f64>,
    pub q_mvar: Option<f64>,
}

/// Active/reactive output of loads, sgens, motors, shunts, storages, wards
/// and external grids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerResult {
    pub p_mw: Option<f64>,
    pub q_mvar: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenResult {
    pub p_mw: Option<f64>,
    pub q_mvar: Option<f64>,
    pub vm_pu: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    pub p_from_mw: Option<f64>,
    pub q_from_mvar: Option<f64>,
    pub p_to_mw: Option<f64>,
    pub q_to_mvar: Option<f64>,
    pub i_from_ka: Option<f64>,
    pub i_to_ka: Option<f64>,
    pub loading_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafoResult {
    pub p_hv_mw: Option<f64>,
    pub q_hv_mvar: Option<f64>,
    pub p_lv_mw: Option<f64>,
    pub q_lv_mvar: Option<f64>,
    pub i_hv_ka: Option<f64>,
    pub i_lv_ka: Option<f64>,
    pub loading_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trafo3wResult {
    pub p_hv_mw: Option<f64>,
    pub q_hv_mvar: Option<f64>,
    pub p_mv_mw: Option<f64>,
    pub q_mv_mvar: Option<f64>,
    pub p_lv_mw: Option<f64>,
    pub q_lv_mvar: Option<f64>,
    pub i_hv_ka: Option<f64>,
    pub i_mv_ka: Option<f64>,
    pub i_lv_ka: Option<f64>,
    pub loading_percent: Option<f64>,
}

/// Solved values per category, keyed by external id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementResults {
    pub loads: BTreeMap<String, PowerResult>,
    pub gens: BTreeMap<String, GenResult>,
    pub sgens: BTreeMap<String, PowerResult>,
    pub motors: BTreeMap<String, PowerResult>,
    pub shunts: BTreeMap<String, PowerResult>,
    pub storages: BTreeMap<String, PowerResult>,
    pub wards: BTreeMap<String, PowerResult>,
    pub ext_grids: BTreeMap<String, PowerResult>,
    pub lines: BTreeMap<String, LineResult>,
    pub trafos: BTreeMap<String, TrafoResult>,
    pub trafo3ws: BTreeMap<String, Trafo3wResult>,
}

impl ElementResults {
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
            && self.gens.is_empty()
            && self.sgens.is_empty()
            && self.motors.is_empty()
            && self.shunts.is_empty()
            && self.storages.is_empty()
            && self.wards.is_empty()
            && self.ext_grids.is_empty()
            && self.lines.is_empty()
            && self.trafos.is_empty()
            && self.trafo3ws.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResponse {
    pub summary: Summary,
    pub bus_by_id: BTreeMap<String, BusResult>,
    pub res_bus: Vec<ResBusRow>,
    pub warnings: Vec<String>,
    pub errors: BTreeMap<String, Vec<ValidationError>>,
    pub element_status: BTreeMap<String, CreationStatus>,
    pub results: ElementResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkExport>,
}

impl SimulationResponse {
    /// Empty, non-converged response.
    pub fn empty(slack_bus_id: impl Into<String>) -> Self {
        Self {
            summary: Summary {
                converged: false,
                runtime_ms: 0,
                slack_bus_id: slack_bus_id.into(),
            },
            bus_by_id: BTreeMap::new(),
            res_bus: Vec::new(),
            warnings: Vec::new(),
            errors: BTreeMap::new(),
            element_status: BTreeMap::new(),
            results: ElementResults::default(),
            network: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.values().any(|bucket| !bucket.is_empty())
    }
}

/// NaN and infinities are not representable in JSON; they become `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

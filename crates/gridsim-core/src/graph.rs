//! Diagram graph schema.
//!
//! A request describes the network as nodes (equipment) and edges (lines and
//! attachments). Node payloads are parsed at the boundary into one typed
//! variant per element category; nothing downstream touches raw JSON maps.
//!
//! Numeric inputs are kept as [`NumField`] so that a value such as
//! `"p_mw": "abc"` survives parsing and can be reported by validation with
//! the offending element id instead of failing the whole request.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Element categories understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Bus,
    Load,
    ExtGrid,
    Gen,
    Sgen,
    Motor,
    Shunt,
    Storage,
    Transformer,
    Trafo3w,
    Switch,
    Ward,
    Line,
}

impl ElementKind {
    pub const ALL: [ElementKind; 13] = [
        ElementKind::Bus,
        ElementKind::Load,
        ElementKind::ExtGrid,
        ElementKind::Gen,
        ElementKind::Sgen,
        ElementKind::Motor,
        ElementKind::Shunt,
        ElementKind::Storage,
        ElementKind::Transformer,
        ElementKind::Trafo3w,
        ElementKind::Switch,
        ElementKind::Ward,
        ElementKind::Line,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Bus => "bus",
            ElementKind::Load => "load",
            ElementKind::ExtGrid => "ext_grid",
            ElementKind::Gen => "gen",
            ElementKind::Sgen => "sgen",
            ElementKind::Motor => "motor",
            ElementKind::Shunt => "shunt",
            ElementKind::Storage => "storage",
            ElementKind::Transformer => "transformer",
            ElementKind::Trafo3w => "trafo3w",
            ElementKind::Switch => "switch",
            ElementKind::Ward => "ward",
            ElementKind::Line => "line",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == input)
    }

    /// Elements connected to exactly one bus through `busId`.
    pub fn is_bus_bound(&self) -> bool {
        matches!(
            self,
            ElementKind::Load
                | ElementKind::ExtGrid
                | ElementKind::Gen
                | ElementKind::Sgen
                | ElementKind::Motor
                | ElementKind::Shunt
                | ElementKind::Storage
                | ElementKind::Ward
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric input that may have been supplied in a non-numeric form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumField {
    Num(f64),
    Invalid(String),
}

impl NumField {
    pub fn value(&self) -> Option<f64> {
        match self {
            NumField::Num(v) => Some(*v),
            NumField::Invalid(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for NumField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(match raw {
            Value::Number(n) => match n.as_f64() {
                Some(v) => NumField::Num(v),
                None => NumField::Invalid(n.to_string()),
            },
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => NumField::Num(v),
                _ => NumField::Invalid(s),
            },
            other => NumField::Invalid(other.to_string()),
        })
    }
}

impl From<f64> for NumField {
    fn from(value: f64) -> Self {
        NumField::Num(value)
    }
}

/// Convenience accessors on optional numeric fields.
pub trait NumFieldExt {
    /// Numeric value, falling back to `default` when absent or invalid.
    fn value_or(&self, default: f64) -> f64;
    /// Numeric value when present and valid.
    fn number(&self) -> Option<f64>;
    /// True when a value was supplied but is not numeric.
    fn is_invalid(&self) -> bool;
}

impl NumFieldExt for Option<NumField> {
    fn value_or(&self, default: f64) -> f64 {
        self.number().unwrap_or(default)
    }

    fn number(&self) -> Option<f64> {
        self.as_ref().and_then(NumField::value)
    }

    fn is_invalid(&self) -> bool {
        matches!(self, Some(NumField::Invalid(_)))
    }
}

/// Id references may arrive as strings or numbers; blank strings count as absent.
fn de_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    pub vn_kv: Option<NumField>,
    pub min_vm_pu: Option<NumField>,
    pub max_vm_pu: Option<NumField>,
    pub in_service: Option<bool>,
    #[serde(deserialize_with = "de_text")]
    pub zone: Option<String>,
    #[serde(rename = "type", deserialize_with = "de_text")]
    pub bus_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub p_mw: Option<NumField>,
    pub q_mvar: Option<NumField>,
    pub scaling: Option<NumField>,
    pub in_service: Option<bool>,
    pub controllable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtGridData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub vm_pu: Option<NumField>,
    pub va_degree: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub p_mw: Option<NumField>,
    pub vm_pu: Option<NumField>,
    pub min_q_mvar: Option<NumField>,
    pub max_q_mvar: Option<NumField>,
    pub in_service: Option<bool>,
    pub controllable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgenData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub p_mw: Option<NumField>,
    pub q_mvar: Option<NumField>,
    pub scaling: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub pn_mech_mw: Option<NumField>,
    pub cos_phi: Option<NumField>,
    pub efficiency: Option<NumField>,
    pub loading_percent: Option<NumField>,
    pub scaling: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuntData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub p_mw: Option<NumField>,
    pub q_mvar: Option<NumField>,
    pub vn_kv: Option<NumField>,
    pub step: Option<NumField>,
    pub max_step: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub p_mw: Option<NumField>,
    pub q_mvar: Option<NumField>,
    pub max_e_mwh: Option<NumField>,
    pub min_e_mwh: Option<NumField>,
    pub max_p_mw: Option<NumField>,
    pub min_p_mw: Option<NumField>,
    pub soc_percent: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    pub pz_mw: Option<NumField>,
    pub qz_mvar: Option<NumField>,
    pub ps_mw: Option<NumField>,
    pub qs_mvar: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafoData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "hvBusId", deserialize_with = "de_ref")]
    pub hv_bus_id: Option<String>,
    #[serde(rename = "lvBusId", deserialize_with = "de_ref")]
    pub lv_bus_id: Option<String>,
    #[serde(deserialize_with = "de_ref")]
    pub std_type: Option<String>,
    pub tap_pos: Option<NumField>,
    pub parallel: Option<NumField>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trafo3wData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "hvBusId", deserialize_with = "de_ref")]
    pub hv_bus_id: Option<String>,
    #[serde(rename = "mvBusId", deserialize_with = "de_ref")]
    pub mv_bus_id: Option<String>,
    #[serde(rename = "lvBusId", deserialize_with = "de_ref")]
    pub lv_bus_id: Option<String>,
    #[serde(deserialize_with = "de_ref")]
    pub std_type: Option<String>,
    pub in_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchData {
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(rename = "busId", deserialize_with = "de_ref")]
    pub bus_id: Option<String>,
    #[serde(rename = "elementId", deserialize_with = "de_ref")]
    pub element_id: Option<String>,
    #[serde(rename = "elementType", deserialize_with = "de_ref")]
    pub element_type: Option<String>,
    pub closed: Option<bool>,
    #[serde(rename = "type", deserialize_with = "de_text")]
    pub switch_type: Option<String>,
    pub z_ohm: Option<NumField>,
    pub in_service: Option<bool>,
}

impl SwitchData {
    /// `elementType` with the `line` default applied.
    pub fn element_type(&self) -> &str {
        self.element_type.as_deref().unwrap_or("line")
    }

    pub fn is_closed(&self) -> bool {
        self.closed.unwrap_or(true)
    }
}

/// Typed node payload, one variant per element category.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeElement {
    Bus(BusData),
    Load(LoadData),
    ExtGrid(ExtGridData),
    Gen(GenData),
    Sgen(SgenData),
    Motor(MotorData),
    Shunt(ShuntData),
    Storage(StorageData),
    Transformer(TrafoData),
    Trafo3w(Trafo3wData),
    Switch(SwitchData),
    Ward(WardData),
    /// Lines are drawn as edges; a line node carries nothing the model uses.
    Line(Value),
}

impl NodeElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            NodeElement::Bus(_) => ElementKind::Bus,
            NodeElement::Load(_) => ElementKind::Load,
            NodeElement::ExtGrid(_) => ElementKind::ExtGrid,
            NodeElement::Gen(_) => ElementKind::Gen,
            NodeElement::Sgen(_) => ElementKind::Sgen,
            NodeElement::Motor(_) => ElementKind::Motor,
            NodeElement::Shunt(_) => ElementKind::Shunt,
            NodeElement::Storage(_) => ElementKind::Storage,
            NodeElement::Transformer(_) => ElementKind::Transformer,
            NodeElement::Trafo3w(_) => ElementKind::Trafo3w,
            NodeElement::Switch(_) => ElementKind::Switch,
            NodeElement::Ward(_) => ElementKind::Ward,
            NodeElement::Line(_) => ElementKind::Line,
        }
    }

    /// Embedded `busId` of single-bus elements.
    pub fn bus_ref(&self) -> Option<&str> {
        match self {
            NodeElement::Load(d) => d.bus_id.as_deref(),
            NodeElement::ExtGrid(d) => d.bus_id.as_deref(),
            NodeElement::Gen(d) => d.bus_id.as_deref(),
            NodeElement::Sgen(d) => d.bus_id.as_deref(),
            NodeElement::Motor(d) => d.bus_id.as_deref(),
            NodeElement::Shunt(d) => d.bus_id.as_deref(),
            NodeElement::Storage(d) => d.bus_id.as_deref(),
            NodeElement::Ward(d) => d.bus_id.as_deref(),
            NodeElement::Switch(d) => d.bus_id.as_deref(),
            _ => None,
        }
    }

    /// Numeric inputs with their field names, for well-formedness checks.
    pub fn numeric_fields(&self) -> Vec<(&'static str, &Option<NumField>)> {
        match self {
            NodeElement::Bus(d) => vec![
                ("vn_kv", &d.vn_kv),
                ("min_vm_pu", &d.min_vm_pu),
                ("max_vm_pu", &d.max_vm_pu),
            ],
            NodeElement::Load(d) => vec![
                ("p_mw", &d.p_mw),
                ("q_mvar", &d.q_mvar),
                ("scaling", &d.scaling),
            ],
            NodeElement::ExtGrid(d) => vec![("vm_pu", &d.vm_pu), ("va_degree", &d.va_degree)],
            NodeElement::Gen(d) => vec![
                ("p_mw", &d.p_mw),
                ("vm_pu", &d.vm_pu),
                ("min_q_mvar", &d.min_q_mvar),
                ("max_q_mvar", &d.max_q_mvar),
            ],
            NodeElement::Sgen(d) => vec![
                ("p_mw", &d.p_mw),
                ("q_mvar", &d.q_mvar),
                ("scaling", &d.scaling),
            ],
            NodeElement::Motor(d) => vec![
                ("pn_mech_mw", &d.pn_mech_mw),
                ("cos_phi", &d.cos_phi),
                ("efficiency", &d.efficiency),
                ("loading_percent", &d.loading_percent),
                ("scaling", &d.scaling),
            ],
            NodeElement::Shunt(d) => vec![
                ("p_mw", &d.p_mw),
                ("q_mvar", &d.q_mvar),
                ("vn_kv", &d.vn_kv),
                ("step", &d.step),
                ("max_step", &d.max_step),
            ],
            NodeElement::Storage(d) => vec![
                ("p_mw", &d.p_mw),
                ("q_mvar", &d.q_mvar),
                ("max_e_mwh", &d.max_e_mwh),
                ("min_e_mwh", &d.min_e_mwh),
                ("max_p_mw", &d.max_p_mw),
                ("min_p_mw", &d.min_p_mw),
                ("soc_percent", &d.soc_percent),
            ],
            NodeElement::Ward(d) => vec![
                ("pz_mw", &d.pz_mw),
                ("qz_mvar", &d.qz_mvar),
                ("ps_mw", &d.ps_mw),
                ("qs_mvar", &d.qs_mvar),
            ],
            NodeElement::Transformer(d) => vec![("tap_pos", &d.tap_pos), ("parallel", &d.parallel)],
            NodeElement::Switch(d) => vec![("z_ohm", &d.z_ohm)],
            NodeElement::Trafo3w(_) | NodeElement::Line(_) => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(deserialize_with = "de_ref", default)]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

/// A diagram node: an externally identified piece of equipment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct GraphNode {
    pub id: String,
    pub element: NodeElement,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, element: NodeElement) -> Self {
        Self {
            id: id.into(),
            element,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.element.kind()
    }
}

impl TryFrom<RawNode> for GraphNode {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let id = raw.id.unwrap_or_default();
        let data = match raw.data {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(v) => v,
        };
        let kind = ElementKind::parse(raw.kind.as_str())
            .ok_or_else(|| format!("node '{}': unknown node type '{}'", id, raw.kind))?;
        let wrap = |e: serde_json::Error| format!("node '{}' ({}): {}", id, kind, e);
        let element = match kind {
            ElementKind::Bus => NodeElement::Bus(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::Load => NodeElement::Load(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::ExtGrid => {
                NodeElement::ExtGrid(serde_json::from_value(data).map_err(wrap)?)
            }
            ElementKind::Gen => NodeElement::Gen(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::Sgen => NodeElement::Sgen(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::Motor => NodeElement::Motor(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::Shunt => NodeElement::Shunt(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::Storage => {
                NodeElement::Storage(serde_json::from_value(data).map_err(wrap)?)
            }
            ElementKind::Transformer => {
                NodeElement::Transformer(serde_json::from_value(data).map_err(wrap)?)
            }
            ElementKind::Trafo3w => {
                NodeElement::Trafo3w(serde_json::from_value(data).map_err(wrap)?)
            }
            ElementKind::Switch => {
                NodeElement::Switch(serde_json::from_value(data).map_err(wrap)?)
            }
            ElementKind::Ward => NodeElement::Ward(serde_json::from_value(data).map_err(wrap)?),
            ElementKind::Line => NodeElement::Line(data),
        };
        Ok(GraphNode { id, element })
    }
}

/// Payload of a diagram edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeData {
    #[serde(deserialize_with = "de_ref")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "de_ref")]
    pub attach_type: Option<String>,
    #[serde(deserialize_with = "de_ref")]
    pub std_type: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    pub length_km: Option<NumField>,
    pub r_ohm_per_km: Option<NumField>,
    pub x_ohm_per_km: Option<NumField>,
    pub c_nf_per_km: Option<NumField>,
    pub max_i_ka: Option<NumField>,
    pub parallel: Option<NumField>,
    pub df: Option<NumField>,
    pub in_service: Option<bool>,
}

impl EdgeData {
    /// The four explicit electrical parameters of a line, in reporting order.
    pub fn line_parameters(&self) -> [(&'static str, &Option<NumField>); 4] {
        [
            ("r_ohm_per_km", &self.r_ohm_per_km),
            ("x_ohm_per_km", &self.x_ohm_per_km),
            ("c_nf_per_km", &self.c_nf_per_km),
            ("max_i_ka", &self.max_i_ka),
        ]
    }
}

/// Discriminator of an edge's `data.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Line,
    Attach,
    Other,
}

/// A diagram connection between two nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(default, deserialize_with = "de_ref")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_ref")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "de_ref")]
    pub target: Option<String>,
    #[serde(default)]
    pub data: Option<EdgeData>,
}

impl GraphEdge {
    /// A line edge with default data, mostly useful in tests.
    pub fn line(id: &str, source: &str, target: &str, data: EdgeData) -> Self {
        Self {
            id: Some(id.to_string()),
            source: Some(source.to_string()),
            target: Some(target.to_string()),
            data: Some(EdgeData {
                kind: Some("line".to_string()),
                ..data
            }),
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    pub fn kind(&self) -> EdgeKind {
        match self.data.as_ref().and_then(|d| d.kind.as_deref()) {
            Some("line") => EdgeKind::Line,
            Some("attach") => EdgeKind::Attach,
            _ => EdgeKind::Other,
        }
    }

    pub fn attach_type(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.attach_type.as_deref())
    }

    pub fn data_or_default(&self) -> EdgeData {
        self.data.clone().unwrap_or_default()
    }
}

/// Give every edge without an id the synthetic id `edge_{position}`.
pub fn assign_edge_ids(edges: &mut [GraphEdge]) {
    for (i, edge) in edges.iter_mut().enumerate() {
        if edge.id.is_none() {
            edge.id = Some(format!("edge_{i}"));
        }
    }
}

/// Category-keyed view over one request's nodes and edges.
#[derive(Debug)]
pub struct GraphIndex<'a> {
    nodes: &'a [GraphNode],
    edges: &'a [GraphEdge],
    by_kind: HashMap<ElementKind, Vec<usize>>,
    kind_by_id: HashMap<&'a str, ElementKind>,
    /// (attach_type, equipment id) -> bus id
    attached_bus: HashMap<(ElementKind, &'a str), &'a str>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(nodes: &'a [GraphNode], edges: &'a [GraphEdge]) -> Self {
        let mut by_kind: HashMap<ElementKind, Vec<usize>> = HashMap::new();
        let mut kind_by_id = HashMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            by_kind.entry(node.kind()).or_default().push(pos);
            kind_by_id.entry(node.id.as_str()).or_insert(node.kind());
        }

        let mut attached_bus = HashMap::new();
        for edge in edges.iter().filter(|e| e.kind() == EdgeKind::Attach) {
            let (Some(src), Some(tgt)) = (edge.source.as_deref(), edge.target.as_deref()) else {
                continue;
            };
            let Some(attach) = edge.attach_type().and_then(ElementKind::parse) else {
                continue;
            };
            if attach == ElementKind::ExtGrid {
                // ext_grid attachments run ext_grid -> bus
                attached_bus.entry((attach, src)).or_insert(tgt);
                continue;
            }
            let src_is_bus = kind_by_id.get(src) == Some(&ElementKind::Bus);
            let tgt_is_bus = kind_by_id.get(tgt) == Some(&ElementKind::Bus);
            match (src_is_bus, tgt_is_bus) {
                (true, false) => {
                    attached_bus.entry((attach, tgt)).or_insert(src);
                }
                (false, true) => {
                    attached_bus.entry((attach, src)).or_insert(tgt);
                }
                _ => {}
            }
        }

        Self {
            nodes,
            edges,
            by_kind,
            kind_by_id,
            attached_bus,
        }
    }

    pub fn nodes(&self) -> &'a [GraphNode] {
        self.nodes
    }

    pub fn edges(&self) -> &'a [GraphEdge] {
        self.edges
    }

    /// Nodes of one category, in request order.
    pub fn nodes_of(&self, kind: ElementKind) -> impl Iterator<Item = &'a GraphNode> + '_ {
        let nodes = self.nodes;
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(move |&pos| &nodes[pos])
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    pub fn kind_of(&self, id: &str) -> Option<ElementKind> {
        self.kind_by_id.get(id).copied()
    }

    pub fn is_bus(&self, id: &str) -> bool {
        self.kind_of(id) == Some(ElementKind::Bus)
    }

    /// Bus of a single-bus element: embedded `busId`, else an attach edge.
    pub fn resolve_bus(&self, node: &'a GraphNode) -> Option<&'a str> {
        node.element.bus_ref().or_else(|| {
            self.attached_bus
                .get(&(node.kind(), node.id.as_str()))
                .copied()
        })
    }

    pub fn line_edges(&self) -> impl Iterator<Item = &'a GraphEdge> + '_ {
        self.edges.iter().filter(|e| e.kind() == EdgeKind::Line)
    }

    pub fn attach_edges(&self) -> impl Iterator<Item = &'a GraphEdge> + '_ {
        self.edges.iter().filter(|e| e.kind() == EdgeKind::Attach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nodes(value: Value) -> Vec<GraphNode> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_typed_node_payloads() {
        let parsed = nodes(json!([
            {"id": "b1", "type": "bus", "data": {"vn_kv": 22}},
            {"id": "l1", "type": "load", "data": {"busId": "b1", "p_mw": "2.5"}},
            {"id": "sw", "type": "switch", "data": {"busId": "b1", "elementId": 7}}
        ]));
        assert_eq!(parsed[0].kind(), ElementKind::Bus);
        match &parsed[1].element {
            NodeElement::Load(d) => {
                assert_eq!(d.bus_id.as_deref(), Some("b1"));
                assert_eq!(d.p_mw.number(), Some(2.5));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &parsed[2].element {
            NodeElement::Switch(d) => {
                assert_eq!(d.element_id.as_deref(), Some("7"));
                assert_eq!(d.element_type(), "line");
                assert!(d.is_closed());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keeps_non_numeric_input_for_validation() {
        let parsed = nodes(json!([
            {"id": "l1", "type": "load", "data": {"busId": "", "p_mw": "abc"}}
        ]));
        let NodeElement::Load(d) = &parsed[0].element else {
            panic!("expected load");
        };
        assert!(d.bus_id.is_none());
        assert!(d.p_mw.is_invalid());
        assert_eq!(d.p_mw.value_or(1.0), 1.0);
    }

    #[test]
    fn non_finite_strings_are_not_numbers() {
        let parsed = nodes(json!([
            {"id": "l1", "type": "load", "data": {"busId": "b1", "p_mw": "NaN", "q_mvar": " inf "}},
            {"id": "l2", "type": "load", "data": {"busId": "b1", "p_mw": "-Infinity", "q_mvar": "1e3"}}
        ]));
        let NodeElement::Load(a) = &parsed[0].element else {
            panic!("expected load");
        };
        let NodeElement::Load(b) = &parsed[1].element else {
            panic!("expected load");
        };
        assert_eq!(a.p_mw, Some(NumField::Invalid("NaN".into())));
        assert!(a.q_mvar.is_invalid());
        assert!(b.p_mw.is_invalid());
        assert_eq!(b.q_mvar.number(), Some(1000.0));
    }

    #[test]
    fn missing_data_uses_defaults() {
        let parsed = nodes(json!([{"id": "g", "type": "ext_grid"}, {"id": "x", "type": "line", "data": null}]));
        assert_eq!(parsed[0].element, NodeElement::ExtGrid(ExtGridData::default()));
        assert_eq!(parsed[1].kind(), ElementKind::Line);
    }

    #[test]
    fn rejects_unknown_node_type() {
        let err = serde_json::from_value::<Vec<GraphNode>>(json!([
            {"id": "z", "type": "dc_line", "data": {}}
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("unknown node type 'dc_line'"));
    }

    #[test]
    fn synthetic_edge_ids_follow_position() {
        let mut edges: Vec<GraphEdge> = serde_json::from_value(json!([
            {"id": "keep", "source": "a", "target": "b"},
            {"source": "a", "target": "c"},
            {"id": "", "source": "b", "target": "c"}
        ]))
        .unwrap();
        assign_edge_ids(&mut edges);
        let ids: Vec<&str> = edges.iter().map(GraphEdge::id).collect();
        assert_eq!(ids, vec!["keep", "edge_1", "edge_2"]);
    }

    #[test]
    fn attach_edges_resolve_missing_bus_ids() {
        let parsed = nodes(json!([
            {"id": "b1", "type": "bus", "data": {"vn_kv": 20}},
            {"id": "grid", "type": "ext_grid", "data": {}},
            {"id": "ld", "type": "load", "data": {}},
            {"id": "gen", "type": "gen", "data": {"busId": "b1"}}
        ]));
        let edges: Vec<GraphEdge> = serde_json::from_value(json!([
            {"id": "a1", "source": "grid", "target": "b1", "data": {"kind": "attach", "attach_type": "ext_grid"}},
            {"id": "a2", "source": "b1", "target": "ld", "data": {"kind": "attach", "attach_type": "load"}}
        ]))
        .unwrap();
        let index = GraphIndex::new(&parsed, &edges);
        assert_eq!(index.resolve_bus(&parsed[1]), Some("b1"));
        assert_eq!(index.resolve_bus(&parsed[2]), Some("b1"));
        assert_eq!(index.resolve_bus(&parsed[3]), Some("b1"));
        assert_eq!(index.count(ElementKind::Bus), 1);
        assert_eq!(index.attach_edges().count(), 2);
        assert_eq!(index.line_edges().count(), 0);
    }
}

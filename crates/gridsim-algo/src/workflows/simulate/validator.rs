//! Topology validation of a diagram before anything is built.
//!
//! Checks run in four passes and every finding is collected:
//!
//! 1. required fields, references and numeric well-formedness per element
//! 2. attach-edge direction and endpoint types
//! 3. global presence of buses and ext_grids
//! 4. islanding under the current switch states (only on an otherwise clean
//!    graph)
//!
//! Findings about a single element disqualify only that element. Findings
//! about the network as a whole (no bus, no ext_grid, duplicate ids, an
//! island without a slack source) make the whole run fatal.

use gridsim_core::graph::{
    ElementKind, GraphEdge, GraphIndex, GraphNode, NodeElement, NumField, NumFieldExt,
    SwitchData,
};
use gridsim_core::{BusGraph, ValidationError};
use std::collections::HashSet;
use tracing::debug;

const NETWORK: &str = "network";

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub errors: Vec<ValidationError>,
    fatal: bool,
}

impl Validation {
    /// True when nothing was found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when a network-wide check failed and nothing may be built.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Ids of elements that carry at least one finding.
    pub fn failed_elements(&self) -> HashSet<&str> {
        self.errors
            .iter()
            .filter(|e| !e.element_id.is_empty())
            .map(|e| e.element_id.as_str())
            .collect()
    }

    fn element(&mut self, id: &str, kind: &str, field: Option<&str>, message: String) {
        self.errors.push(ValidationError::new(id, kind, field, message));
    }

    fn network(&mut self, field: &str, message: impl Into<String>) {
        self.fatal = true;
        self.errors
            .push(ValidationError::new("", NETWORK, Some(field), message));
    }
}

/// Validate one diagram. An empty error list means the network can be
/// simulated as drawn.
pub fn validate(index: &GraphIndex<'_>) -> Validation {
    let mut out = Validation::default();

    check_duplicate_ids(index, &mut out);
    for node in index.nodes() {
        check_node(index, node, &mut out);
    }
    for edge in index.line_edges() {
        check_line_edge(index, edge, &mut out);
    }
    for edge in index.attach_edges() {
        check_attach_edge(index, edge, &mut out);
    }

    if index.count(ElementKind::Bus) == 0 {
        out.network("bus", "At least one bus is required");
    }
    if index.count(ElementKind::ExtGrid) == 0 {
        out.network("ext_grid", "At least one ext_grid is required");
    }

    if out.errors.is_empty() {
        check_islands(index, &mut out);
    }
    debug!(
        errors = out.errors.len(),
        fatal = out.fatal,
        "validation finished"
    );
    out
}

fn check_duplicate_ids(index: &GraphIndex<'_>, out: &mut Validation) {
    let mut seen = HashSet::new();
    let ids = index
        .nodes()
        .iter()
        .map(|n| n.id.as_str())
        .chain(index.line_edges().map(GraphEdge::id));
    for id in ids {
        if id.is_empty() {
            out.network("id", "every node needs a non-empty id");
        } else if !seen.insert(id) {
            out.network("id", format!("duplicate element id '{id}'"));
        }
    }
}

fn check_numeric(node: &GraphNode, kind: &str, out: &mut Validation) {
    for (field, value) in node.element.numeric_fields() {
        if let Some(NumField::Invalid(raw)) = value {
            out.element(
                &node.id,
                kind,
                Some(field),
                format!("{field} must be numeric, got '{raw}'"),
            );
        }
    }
}

/// `{field} is required` / `{field} '{id}' does not exist` for a bus reference.
fn check_bus_ref(
    index: &GraphIndex<'_>,
    node: &GraphNode,
    kind: &str,
    field: &str,
    bus: Option<&str>,
    out: &mut Validation,
) -> bool {
    match bus {
        None => {
            out.element(&node.id, kind, Some(field), format!("{field} is required"));
            false
        }
        Some(bus) if !index.is_bus(bus) => {
            out.element(
                &node.id,
                kind,
                Some(field),
                format!("{field} '{bus}' does not exist"),
            );
            false
        }
        Some(_) => true,
    }
}

fn check_std_type(node: &GraphNode, kind: &str, std_type: Option<&str>, out: &mut Validation) {
    if std_type.map_or(true, |s| s.trim().is_empty()) {
        out.element(&node.id, kind, Some("std_type"), "std_type is required".into());
    }
}

fn check_node(index: &GraphIndex<'_>, node: &GraphNode, out: &mut Validation) {
    let kind = node.kind();
    let kind_str = kind.as_str();
    match &node.element {
        NodeElement::Bus(d) => match &d.vn_kv {
            None => out.element(&node.id, kind_str, Some("vn_kv"), "vn_kv is required".into()),
            Some(NumField::Invalid(raw)) => out.element(
                &node.id,
                kind_str,
                Some("vn_kv"),
                format!("vn_kv must be numeric, got '{raw}'"),
            ),
            Some(NumField::Num(v)) if !(v.is_finite() && *v > 0.0) => {
                out.element(&node.id, kind_str, Some("vn_kv"), "vn_kv must be > 0".into())
            }
            Some(NumField::Num(_)) => {
                for (field, value) in [("min_vm_pu", &d.min_vm_pu), ("max_vm_pu", &d.max_vm_pu)] {
                    if value.is_invalid() {
                        out.element(
                            &node.id,
                            kind_str,
                            Some(field),
                            format!("{field} must be numeric"),
                        );
                    }
                }
            }
        },
        NodeElement::Transformer(d) => {
            let hv = check_bus_ref(index, node, kind_str, "hvBusId", d.hv_bus_id.as_deref(), out);
            let lv = check_bus_ref(index, node, kind_str, "lvBusId", d.lv_bus_id.as_deref(), out);
            if hv && lv && d.hv_bus_id == d.lv_bus_id {
                out.element(
                    &node.id,
                    kind_str,
                    Some("lvBusId"),
                    "hvBusId and lvBusId must be different buses".into(),
                );
            }
            check_std_type(node, kind_str, d.std_type.as_deref(), out);
            check_numeric(node, kind_str, out);
        }
        NodeElement::Trafo3w(d) => {
            let refs = [
                ("hvBusId", d.hv_bus_id.as_deref()),
                ("mvBusId", d.mv_bus_id.as_deref()),
                ("lvBusId", d.lv_bus_id.as_deref()),
            ];
            let resolved = refs
                .iter()
                .filter(|(field, bus)| check_bus_ref(index, node, kind_str, field, *bus, out))
                .count();
            if resolved == 3 {
                let distinct: HashSet<_> = refs.iter().map(|(_, b)| *b).collect();
                if distinct.len() != 3 {
                    out.element(
                        &node.id,
                        kind_str,
                        Some("lvBusId"),
                        "hvBusId, mvBusId and lvBusId must be three different buses".into(),
                    );
                }
            }
            check_std_type(node, kind_str, d.std_type.as_deref(), out);
        }
        NodeElement::Switch(d) => {
            check_bus_ref(index, node, kind_str, "busId", d.bus_id.as_deref(), out);
            let element_type = d.element_type();
            let valid_type = matches!(element_type, "bus" | "line" | "trafo");
            if !valid_type {
                out.element(
                    &node.id,
                    kind_str,
                    Some("elementType"),
                    format!("elementType must be 'line', 'trafo', or 'bus', got '{element_type}'"),
                );
            }
            match d.element_id.as_deref() {
                None => out.element(
                    &node.id,
                    kind_str,
                    Some("elementId"),
                    "elementId is required".into(),
                ),
                Some(target) if valid_type => {
                    match switch_target_buses(index, element_type, target) {
                        None => out.element(
                            &node.id,
                            kind_str,
                            Some("elementId"),
                            format!("elementId '{target}' ({element_type}) does not exist"),
                        ),
                        Some(ends) => {
                            if let Some(bus) = d.bus_id.as_deref() {
                                if !switch_at_target(bus, ends) {
                                    out.element(
                                        &node.id,
                                        kind_str,
                                        Some("busId"),
                                        format!("busId '{bus}' is not a terminal of {element_type} '{target}'"),
                                    );
                                }
                            }
                        }
                    }
                }
                Some(_) => {}
            }
            check_numeric(node, kind_str, out);
        }
        NodeElement::Line(_) => {}
        _ if kind.is_bus_bound() => {
            check_bus_ref(index, node, kind_str, "busId", index.resolve_bus(node), out);
            check_numeric(node, kind_str, out);
        }
        _ => {}
    }
}

/// Terminal buses of a switch target, or `None` when the target does not
/// exist. Bus targets have no terminals to check against.
fn switch_target_buses<'a>(
    index: &GraphIndex<'a>,
    element_type: &str,
    target: &str,
) -> Option<[Option<&'a str>; 2]> {
    match element_type {
        "bus" => index.is_bus(target).then_some([None, None]),
        "line" => index
            .line_edges()
            .find(|e| e.id() == target)
            .map(|e| [e.source.as_deref(), e.target.as_deref()]),
        "trafo" => index
            .nodes_of(ElementKind::Transformer)
            .find(|n| n.id == target)
            .and_then(|n| match &n.element {
                NodeElement::Transformer(t) => {
                    Some([t.hv_bus_id.as_deref(), t.lv_bus_id.as_deref()])
                }
                _ => None,
            }),
        _ => None,
    }
}

fn switch_at_target(bus: &str, ends: [Option<&str>; 2]) -> bool {
    ends == [None, None] || ends.contains(&Some(bus))
}

/// Switch that the model will accept: known target, and for branch targets
/// a bus that is one of its terminals.
fn switch_is_placed(index: &GraphIndex<'_>, sw: &SwitchData) -> bool {
    let (Some(bus), Some(target)) = (sw.bus_id.as_deref(), sw.element_id.as_deref()) else {
        return false;
    };
    switch_target_buses(index, sw.element_type(), target)
        .is_some_and(|ends| switch_at_target(bus, ends))
}

fn check_line_edge(index: &GraphIndex<'_>, edge: &GraphEdge, out: &mut Validation) {
    let id = edge.id();
    let (Some(src), Some(tgt)) = (edge.source.as_deref(), edge.target.as_deref()) else {
        out.element(id, "line", Some("source"), "source or target missing".into());
        return;
    };
    let mut ends_ok = true;
    for (field, end) in [("source", src), ("target", tgt)] {
        match index.kind_of(end) {
            Some(ElementKind::Bus) => {}
            Some(other) => {
                ends_ok = false;
                out.element(
                    id,
                    "line",
                    Some(field),
                    format!("{field} '{end}' is a {other}, not a bus"),
                );
            }
            None => {
                ends_ok = false;
                out.element(id, "line", Some(field), format!("{field} '{end}' does not exist"));
            }
        }
    }
    if ends_ok && src == tgt {
        out.element(
            id,
            "line",
            Some("target"),
            "source and target cannot be the same".into(),
        );
    }

    let data = edge.data_or_default();
    match &data.length_km {
        Some(NumField::Invalid(raw)) => out.element(
            id,
            "line",
            Some("length_km"),
            format!("length_km must be numeric, got '{raw}'"),
        ),
        Some(NumField::Num(v)) if !(*v > 0.0) => {
            out.element(id, "line", Some("length_km"), "length_km must be > 0".into())
        }
        _ => {}
    }

    let has_std_type = data.std_type.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has_std_type {
        let params = data.line_parameters();
        let missing: Vec<&str> = params
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            out.element(
                id,
                "line",
                Some("std_type"),
                format!("Missing line parameters: {}", missing.join(", ")),
            );
        }
        for (name, value) in params {
            if value.is_invalid() {
                out.element(id, "line", Some(name), format!("{name} must be numeric"));
            }
        }
    }
}

fn check_attach_edge(index: &GraphIndex<'_>, edge: &GraphEdge, out: &mut Validation) {
    let id = edge.id();
    let (Some(src), Some(tgt)) = (edge.source.as_deref(), edge.target.as_deref()) else {
        out.element(id, "attach", Some("source"), "source or target missing".into());
        return;
    };
    let attach = match edge.attach_type() {
        None => {
            out.element(id, "attach", Some("attach_type"), "attach_type is required".into());
            return;
        }
        Some(raw) => match ElementKind::parse(raw).filter(ElementKind::is_bus_bound) {
            Some(kind) => kind,
            None => {
                out.element(
                    id,
                    "attach",
                    Some("attach_type"),
                    format!("attach_type '{raw}' cannot be attached to a bus"),
                );
                return;
            }
        },
    };

    let (src_kind, tgt_kind) = (index.kind_of(src), index.kind_of(tgt));
    if attach == ElementKind::ExtGrid {
        if src_kind != Some(ElementKind::ExtGrid) || tgt_kind != Some(ElementKind::Bus) {
            out.element(
                id,
                "attach",
                Some("source"),
                format!("ext_grid attachment must run from an ext_grid to a bus ('{src}' -> '{tgt}')"),
            );
        }
        return;
    }

    let is_bus = |k: Option<ElementKind>| k == Some(ElementKind::Bus);
    let equipment = match (is_bus(src_kind), is_bus(tgt_kind)) {
        (true, false) => Some((tgt, tgt_kind)),
        (false, true) => Some((src, src_kind)),
        _ => None,
    };
    match equipment {
        None => out.element(
            id,
            "attach",
            Some("source"),
            format!("{attach} attachment must connect exactly one bus ('{src}' -> '{tgt}')"),
        ),
        Some((node, None)) => out.element(
            id,
            "attach",
            Some("source"),
            format!("'{node}' does not exist"),
        ),
        Some((node, Some(kind))) if kind != attach => out.element(
            id,
            "attach",
            Some("attach_type"),
            format!("'{node}' is a {kind}, not a {attach}"),
        ),
        Some(_) => {}
    }
}

/// Bus graph under the current switch states.
fn bus_graph(index: &GraphIndex<'_>) -> BusGraph {
    let mut open_lines = HashSet::new();
    let mut open_trafos = HashSet::new();
    let mut graph = BusGraph::new();
    for bus in index.nodes_of(ElementKind::Bus) {
        graph.add_bus(&bus.id);
    }

    for node in index.nodes_of(ElementKind::Switch) {
        let NodeElement::Switch(sw) = &node.element else {
            continue;
        };
        if !switch_is_placed(index, sw) {
            continue;
        }
        let Some(target) = sw.element_id.as_deref() else {
            continue;
        };
        match (sw.element_type(), sw.is_closed()) {
            ("line", false) => {
                open_lines.insert(target);
            }
            ("trafo", false) => {
                open_trafos.insert(target);
            }
            ("bus", true) => {
                if let Some(bus) = sw.bus_id.as_deref() {
                    graph.connect(bus, target);
                }
            }
            _ => {}
        }
    }

    for edge in index.line_edges() {
        if open_lines.contains(edge.id()) {
            continue;
        }
        if let (Some(a), Some(b)) = (edge.source.as_deref(), edge.target.as_deref()) {
            graph.connect(a, b);
        }
    }
    for node in index.nodes_of(ElementKind::Transformer) {
        if open_trafos.contains(node.id.as_str()) {
            continue;
        }
        if let NodeElement::Transformer(t) = &node.element {
            if let (Some(hv), Some(lv)) = (t.hv_bus_id.as_deref(), t.lv_bus_id.as_deref()) {
                graph.connect(hv, lv);
            }
        }
    }
    for node in index.nodes_of(ElementKind::Trafo3w) {
        if let NodeElement::Trafo3w(t) = &node.element {
            if let (Some(hv), Some(mv), Some(lv)) = (
                t.hv_bus_id.as_deref(),
                t.mv_bus_id.as_deref(),
                t.lv_bus_id.as_deref(),
            ) {
                graph.connect(hv, mv);
                graph.connect(hv, lv);
                graph.connect(mv, lv);
            }
        }
    }
    graph
}

fn check_islands(index: &GraphIndex<'_>, out: &mut Validation) {
    let graph = bus_graph(index);
    let slack_hosts: HashSet<&str> = index
        .nodes_of(ElementKind::ExtGrid)
        .filter_map(|n| index.resolve_bus(n))
        .collect();

    let islands = graph.islands();
    debug!(islands = islands.len(), "bus graph components");
    let orphan = islands
        .iter()
        .find(|island| !island.members.iter().any(|b| slack_hosts.contains(b.as_str())));
    if let Some(island) = orphan {
        let representative = island.members[0].as_str();
        out.network(
            "island",
            format!(
                "Island of {} bus(es) has no ext_grid: {}",
                island.members.len(),
                island.members.join(", ")
            ),
        );
        out.element(
            representative,
            "bus",
            Some("island"),
            format!("Bus '{representative}' is in an island without ext_grid"),
        );
    }
}

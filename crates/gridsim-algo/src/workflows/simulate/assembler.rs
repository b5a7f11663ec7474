//! Diagram -> [`PowerNet`] translation.
//!
//! Elements are created category by category in dependency order: buses,
//! lines, transformers, three-winding transformers, external grids, bus
//! injections and finally switches (which point at lines, transformers and
//! buses created before them). A failing element gets a failed
//! [`CreationStatus`] and the batch moves on.

use super::registry::IndexRegistry;
use gridsim_core::graph::{
    ElementKind, GraphEdge, GraphIndex, GraphNode, NodeElement, NumFieldExt,
};
use gridsim_core::model::{
    BusRow, ExtGridRow, GenRow, LineOptions, LineParameters, LoadRow, ModelError, MotorRow,
    ShuntRow, SgenRow, StorageRow, SwitchElement, SwitchRow, TrafoOptions, WardRow,
};
use gridsim_core::{CreationStatus, PowerNet};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Everything one assembly produces, threaded through every creation step.
#[derive(Debug)]
pub struct AssemblyContext {
    pub net: PowerNet,
    pub buses: IndexRegistry,
    pub lines: IndexRegistry,
    pub trafos: IndexRegistry,
    pub trafo3ws: IndexRegistry,
    pub ext_grids: IndexRegistry,
    pub loads: IndexRegistry,
    pub gens: IndexRegistry,
    pub sgens: IndexRegistry,
    pub motors: IndexRegistry,
    pub shunts: IndexRegistry,
    pub storages: IndexRegistry,
    pub wards: IndexRegistry,
    pub switches: IndexRegistry,
    pub status: BTreeMap<String, CreationStatus>,
    /// Reporting only; the engine treats every ext_grid bus as slack.
    pub slack_bus_id: String,
}

impl AssemblyContext {
    pub fn new(sn_mva: f64, f_hz: f64) -> Self {
        Self {
            net: PowerNet::new(sn_mva, f_hz),
            buses: IndexRegistry::new(),
            lines: IndexRegistry::new(),
            trafos: IndexRegistry::new(),
            trafo3ws: IndexRegistry::new(),
            ext_grids: IndexRegistry::new(),
            loads: IndexRegistry::new(),
            gens: IndexRegistry::new(),
            sgens: IndexRegistry::new(),
            motors: IndexRegistry::new(),
            shunts: IndexRegistry::new(),
            storages: IndexRegistry::new(),
            wards: IndexRegistry::new(),
            switches: IndexRegistry::new(),
            status: BTreeMap::new(),
            slack_bus_id: String::new(),
        }
    }

    /// Mark an element as failed, replacing any earlier status.
    pub fn fail(&mut self, id: &str, element_type: &str, error: impl Into<String>) {
        self.status
            .insert(id.to_string(), CreationStatus::failed(id, element_type, error));
    }

    pub fn has_slack(&self) -> bool {
        !self.net.ext_grid.is_empty()
    }

    fn bus_index(&self, bus_id: Option<&str>) -> Result<usize, String> {
        let bus_id = bus_id.unwrap_or("");
        self.buses
            .index_of(bus_id)
            .ok_or_else(|| format!("busId '{bus_id}' not found or invalid"))
    }
}

/// Record the outcome of one creation in the status map and, on success,
/// in the category registry.
fn finish(
    status: &mut BTreeMap<String, CreationStatus>,
    registry: &mut IndexRegistry,
    id: &str,
    element_type: &str,
    result: Result<usize, String>,
) {
    match result {
        Ok(idx) => {
            debug!(element = id, element_type, index = idx, "created");
            registry.insert(id, idx);
            status.insert(id.to_string(), CreationStatus::ok(id, element_type));
        }
        Err(reason) => {
            debug!(element = id, element_type, %reason, "creation failed");
            status.insert(
                id.to_string(),
                CreationStatus::failed(id, element_type, reason),
            );
        }
    }
}

fn model_err(e: ModelError) -> String {
    e.to_string()
}

fn count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

/// Build the model for every element not listed in `skip`.
pub fn assemble(index: &GraphIndex<'_>, skip: &HashSet<&str>, ctx: &mut AssemblyContext) {
    let keep = |id: &str| !skip.contains(id);

    add_buses(index, &keep, ctx);
    for edge in index.line_edges().filter(|e| keep(e.id())) {
        let result = create_line(ctx, edge);
        finish(&mut ctx.status, &mut ctx.lines, edge.id(), "line", result);
    }
    for node in index.nodes_of(ElementKind::Transformer).filter(|n| keep(&n.id)) {
        let result = create_transformer(ctx, node);
        finish(&mut ctx.status, &mut ctx.trafos, &node.id, "transformer", result);
    }
    for node in index.nodes_of(ElementKind::Trafo3w).filter(|n| keep(&n.id)) {
        let result = create_trafo3w(ctx, node);
        finish(&mut ctx.status, &mut ctx.trafo3ws, &node.id, "trafo3w", result);
    }

    for node in index.nodes_of(ElementKind::ExtGrid).filter(|n| keep(&n.id)) {
        let result = create_injection(ctx, index, node);
        finish(&mut ctx.status, &mut ctx.ext_grids, &node.id, "ext_grid", result);
    }
    ctx.slack_bus_id = index
        .nodes_of(ElementKind::ExtGrid)
        .next()
        .and_then(|n| index.resolve_bus(n))
        .filter(|bus| ctx.buses.contains(bus))
        .or_else(|| index.nodes_of(ElementKind::Bus).next().map(|n| n.id.as_str()))
        .unwrap_or_default()
        .to_string();

    for kind in [
        ElementKind::Load,
        ElementKind::Gen,
        ElementKind::Sgen,
        ElementKind::Motor,
        ElementKind::Shunt,
        ElementKind::Storage,
        ElementKind::Ward,
    ] {
        for node in index.nodes_of(kind).filter(|n| keep(&n.id)) {
            let result = create_injection(ctx, index, node);
            let registry = match kind {
                ElementKind::Load => &mut ctx.loads,
                ElementKind::Gen => &mut ctx.gens,
                ElementKind::Sgen => &mut ctx.sgens,
                ElementKind::Motor => &mut ctx.motors,
                ElementKind::Shunt => &mut ctx.shunts,
                ElementKind::Storage => &mut ctx.storages,
                _ => &mut ctx.wards,
            };
            finish(&mut ctx.status, registry, &node.id, kind.as_str(), result);
        }
    }

    for node in index.nodes_of(ElementKind::Switch).filter(|n| keep(&n.id)) {
        let result = create_switch(ctx, node);
        finish(&mut ctx.status, &mut ctx.switches, &node.id, "switch", result);
    }

    debug!(
        counts = ?ctx.net.counts(),
        failed = ctx.status.values().filter(|s| !s.success).count(),
        "assembly finished"
    );
}

fn add_buses(index: &GraphIndex<'_>, keep: &dyn Fn(&str) -> bool, ctx: &mut AssemblyContext) {
    for node in index.nodes_of(ElementKind::Bus).filter(|n| keep(&n.id)) {
        let NodeElement::Bus(d) = &node.element else {
            continue;
        };
        let row = BusRow {
            name: d.name.clone().unwrap_or_else(|| "Bus".to_string()),
            vn_kv: d.vn_kv.value_or(f64::NAN),
            min_vm_pu: d.min_vm_pu.number(),
            max_vm_pu: d.max_vm_pu.number(),
            in_service: d.in_service.unwrap_or(true),
            zone: d.zone.clone(),
            bus_type: d.bus_type.clone().unwrap_or_else(|| "b".to_string()),
        };
        let result = ctx.net.create_bus(row).map_err(model_err);
        finish(&mut ctx.status, &mut ctx.buses, &node.id, "bus", result);
    }
}

fn create_line(ctx: &mut AssemblyContext, edge: &GraphEdge) -> Result<usize, String> {
    let (Some(src), Some(tgt)) = (edge.source.as_deref(), edge.target.as_deref()) else {
        return Err("source or target missing".to_string());
    };
    let (Some(from), Some(to)) = (ctx.buses.index_of(src), ctx.buses.index_of(tgt)) else {
        return Err(format!("source '{src}' or target '{tgt}' bus not found"));
    };
    if src == tgt {
        return Err("source and target cannot be the same".to_string());
    }

    let data = edge.data_or_default();
    let length_km = data.length_km.value_or(1.0);
    if !(length_km > 0.0) {
        return Err("length_km must be > 0".to_string());
    }
    let opts = LineOptions {
        name: data.name.clone().unwrap_or_else(|| "Line".to_string()),
        parallel: count(data.parallel.value_or(1.0)),
        df: data.df.value_or(1.0),
        in_service: data.in_service.unwrap_or(true),
    };

    let created = match data.std_type.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(std_type) => ctx.net.create_line(from, to, length_km, std_type, opts),
        None => {
            let params = data.line_parameters();
            let missing: Vec<&'static str> = params
                .iter()
                .filter(|(_, v)| v.number().is_none())
                .map(|(name, _)| *name)
                .collect();
            if !missing.is_empty() {
                return Err(ModelError::MissingLineParameters(missing).to_string());
            }
            let params = LineParameters {
                r_ohm_per_km: data.r_ohm_per_km.value_or(0.0),
                x_ohm_per_km: data.x_ohm_per_km.value_or(0.0),
                c_nf_per_km: data.c_nf_per_km.value_or(0.0),
                max_i_ka: data.max_i_ka.value_or(0.0),
            };
            ctx.net
                .create_line_from_parameters(from, to, length_km, params, opts)
        }
    };
    created.map_err(model_err)
}

fn create_transformer(ctx: &mut AssemblyContext, node: &GraphNode) -> Result<usize, String> {
    let NodeElement::Transformer(d) = &node.element else {
        return Err("not a transformer".to_string());
    };
    let (Some(hv), Some(lv)) = (d.hv_bus_id.as_deref(), d.lv_bus_id.as_deref()) else {
        return Err("hvBusId or lvBusId missing".to_string());
    };
    let (Some(hv_bus), Some(lv_bus)) = (ctx.buses.index_of(hv), ctx.buses.index_of(lv)) else {
        return Err(format!("hvBusId '{hv}' or lvBusId '{lv}' not found"));
    };
    let std_type = d.std_type.as_deref().unwrap_or("").trim();
    if std_type.is_empty() {
        return Err("std_type is required".to_string());
    }
    let opts = TrafoOptions {
        name: d.name.clone().unwrap_or_else(|| "Transformer".to_string()),
        tap_pos: d.tap_pos.number().map(|t| t.round() as i32),
        parallel: count(d.parallel.value_or(1.0)),
        in_service: d.in_service.unwrap_or(true),
    };
    ctx.net
        .create_transformer(hv_bus, lv_bus, std_type, opts)
        .map_err(model_err)
}

fn create_trafo3w(ctx: &mut AssemblyContext, node: &GraphNode) -> Result<usize, String> {
    let NodeElement::Trafo3w(d) = &node.element else {
        return Err("not a trafo3w".to_string());
    };
    let (Some(hv), Some(mv), Some(lv)) = (
        d.hv_bus_id.as_deref(),
        d.mv_bus_id.as_deref(),
        d.lv_bus_id.as_deref(),
    ) else {
        return Err("hvBusId, mvBusId, or lvBusId missing".to_string());
    };
    let (Some(hv_bus), Some(mv_bus), Some(lv_bus)) = (
        ctx.buses.index_of(hv),
        ctx.buses.index_of(mv),
        ctx.buses.index_of(lv),
    ) else {
        return Err("One or more bus IDs not found".to_string());
    };
    let std_type = d.std_type.as_deref().unwrap_or("").trim();
    if std_type.is_empty() {
        return Err("std_type is required".to_string());
    }
    ctx.net
        .create_transformer3w(
            hv_bus,
            mv_bus,
            lv_bus,
            std_type,
            d.name.clone().unwrap_or_else(|| "Trafo3w".to_string()),
            d.in_service.unwrap_or(true),
        )
        .map_err(model_err)
}

/// ext_grids and every other single-bus element.
fn create_injection(
    ctx: &mut AssemblyContext,
    index: &GraphIndex<'_>,
    node: &GraphNode,
) -> Result<usize, String> {
    let bus = ctx.bus_index(index.resolve_bus(node))?;
    let name = |given: &Option<String>, fallback: &str| {
        given.clone().unwrap_or_else(|| fallback.to_string())
    };
    let net = &mut ctx.net;
    let created = match &node.element {
        NodeElement::ExtGrid(d) => net.create_ext_grid(ExtGridRow {
            name: name(&d.name, "External Grid"),
            bus,
            vm_pu: d.vm_pu.value_or(1.0),
            va_degree: d.va_degree.value_or(0.0),
            in_service: d.in_service.unwrap_or(true),
        }),
        NodeElement::Load(d) => net.create_load(LoadRow {
            name: name(&d.name, "Load"),
            bus,
            p_mw: d.p_mw.value_or(1.0),
            q_mvar: d.q_mvar.value_or(0.0),
            scaling: d.scaling.value_or(1.0),
            in_service: d.in_service.unwrap_or(true),
            controllable: d.controllable.unwrap_or(false),
        }),
        NodeElement::Gen(d) => net.create_gen(GenRow {
            name: name(&d.name, "Generator"),
            bus,
            p_mw: d.p_mw.value_or(1.0),
            vm_pu: d.vm_pu.value_or(1.0),
            min_q_mvar: d.min_q_mvar.number(),
            max_q_mvar: d.max_q_mvar.number(),
            in_service: d.in_service.unwrap_or(true),
            controllable: d.controllable.unwrap_or(true),
        }),
        NodeElement::Sgen(d) => net.create_sgen(SgenRow {
            name: name(&d.name, "Static Generator"),
            bus,
            p_mw: d.p_mw.value_or(1.0),
            q_mvar: d.q_mvar.value_or(0.0),
            scaling: d.scaling.value_or(1.0),
            in_service: d.in_service.unwrap_or(true),
        }),
        NodeElement::Motor(d) => net.create_motor(MotorRow {
            name: name(&d.name, "Motor"),
            bus,
            pn_mech_mw: d.pn_mech_mw.value_or(1.0),
            cos_phi: d.cos_phi.value_or(0.85),
            efficiency: d.efficiency.value_or(0.9),
            loading_percent: d.loading_percent.value_or(100.0),
            scaling: d.scaling.value_or(1.0),
            in_service: d.in_service.unwrap_or(true),
        }),
        NodeElement::Shunt(d) => {
            let step = count(d.step.value_or(1.0));
            let vn_kv = d.vn_kv.value_or(net.bus[bus].vn_kv);
            net.create_shunt(ShuntRow {
                name: name(&d.name, "Shunt"),
                bus,
                p_mw: d.p_mw.value_or(0.0),
                q_mvar: d.q_mvar.value_or(0.0),
                vn_kv,
                step,
                max_step: d.max_step.number().map_or(step.max(1), count),
                in_service: d.in_service.unwrap_or(true),
            })
        }
        NodeElement::Storage(d) => net.create_storage(StorageRow {
            name: name(&d.name, "Storage"),
            bus,
            p_mw: d.p_mw.value_or(0.0),
            q_mvar: d.q_mvar.value_or(0.0),
            max_e_mwh: d.max_e_mwh.number(),
            min_e_mwh: d.min_e_mwh.number(),
            max_p_mw: d.max_p_mw.number(),
            min_p_mw: d.min_p_mw.number(),
            soc_percent: d.soc_percent.number(),
            in_service: d.in_service.unwrap_or(true),
        }),
        NodeElement::Ward(d) => net.create_ward(WardRow {
            name: name(&d.name, "Ward"),
            bus,
            pz_mw: d.pz_mw.value_or(0.0),
            qz_mvar: d.qz_mvar.value_or(0.0),
            ps_mw: d.ps_mw.value_or(0.0),
            qs_mvar: d.qs_mvar.value_or(0.0),
            in_service: d.in_service.unwrap_or(true),
        }),
        other => return Err(format!("{} is not a single-bus element", other.kind())),
    };
    created.map_err(model_err)
}

fn create_switch(ctx: &mut AssemblyContext, node: &GraphNode) -> Result<usize, String> {
    let NodeElement::Switch(d) = &node.element else {
        return Err("not a switch".to_string());
    };
    let bus = ctx.bus_index(d.bus_id.as_deref())?;
    let element_type = d.element_type();
    let et = SwitchElement::parse(element_type)
        .ok_or_else(|| format!("Invalid elementType '{element_type}'"))?;
    let target = d.element_id.as_deref().unwrap_or("");
    let registry = match et {
        SwitchElement::Bus => &ctx.buses,
        SwitchElement::Line => &ctx.lines,
        SwitchElement::Trafo => &ctx.trafos,
    };
    let element = registry
        .index_of(target)
        .ok_or_else(|| format!("elementId '{target}' ({element_type}) not found"))?;
    ctx.net
        .create_switch(SwitchRow {
            name: d.name.clone().unwrap_or_else(|| "Switch".to_string()),
            bus,
            element,
            et,
            closed: d.is_closed(),
            switch_type: d.switch_type.clone(),
            z_ohm: d.z_ohm.value_or(0.0),
            in_service: d.in_service.unwrap_or(true),
        })
        .map_err(model_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn build(nodes: Value, edges: Value) -> AssemblyContext {
        let nodes: Vec<GraphNode> = serde_json::from_value(nodes).unwrap();
        let mut edges: Vec<GraphEdge> = serde_json::from_value(edges).unwrap();
        gridsim_core::assign_edge_ids(&mut edges);
        let index = GraphIndex::new(&nodes, &edges);
        let mut ctx = AssemblyContext::new(1.0, 50.0);
        assemble(&index, &HashSet::new(), &mut ctx);
        ctx
    }

    fn error_of<'a>(ctx: &'a AssemblyContext, id: &str) -> &'a str {
        ctx.status[id].error.as_deref().unwrap_or("")
    }

    #[test]
    fn creates_elements_in_dependency_order() {
        let ctx = build(
            json!([
                {"id": "sw", "type": "switch", "data": {"busId": "b2", "elementId": "l1", "closed": false}},
                {"id": "ld", "type": "load", "data": {"busId": "b2", "p_mw": 0.2}},
                {"id": "g", "type": "ext_grid", "data": {"busId": "b1", "vm_pu": 1.02}},
                {"id": "b1", "type": "bus", "data": {"vn_kv": 0.4}},
                {"id": "b2", "type": "bus", "data": {"vn_kv": 0.4}}
            ]),
            json!([{"id": "l1", "source": "b1", "target": "b2",
                    "data": {"kind": "line", "std_type": "NAYY 4x50 SE", "length_km": 0.3}}]),
        );
        assert!(ctx.status.values().all(|s| s.success), "{:?}", ctx.status);
        assert_eq!(ctx.buses.index_of("b2"), Some(1));
        assert_eq!(ctx.lines.index_of("l1"), Some(0));
        assert_eq!(ctx.net.switch[0].element, 0);
        assert!(!ctx.net.switch[0].closed);
        assert_eq!(ctx.net.ext_grid[0].vm_pu, 1.02);
        assert_eq!(ctx.net.load[0].p_mw, 0.2);
        assert_eq!(ctx.slack_bus_id, "b1");
    }

    #[test]
    fn line_failures_keep_going() {
        let ctx = build(
            json!([
                {"id": "a", "type": "bus", "data": {"vn_kv": 20}},
                {"id": "b", "type": "bus", "data": {"vn_kv": 0.4}},
                {"id": "c", "type": "bus", "data": {"vn_kv": 20}}
            ]),
            json!([
                {"id": "lv_mismatch", "source": "a", "target": "b", "data": {"kind": "line", "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV"}},
                {"id": "ghost", "source": "a", "target": "z", "data": {"kind": "line", "std_type": "NAYY 4x50 SE"}},
                {"id": "loop", "source": "a", "target": "a", "data": {"kind": "line", "std_type": "NAYY 4x50 SE"}},
                {"id": "bare", "source": "a", "target": "c", "data": {"kind": "line", "r_ohm_per_km": 0.1}},
                {"id": "neg", "source": "a", "target": "c", "data": {"kind": "line", "std_type": "NAYY 4x50 SE", "length_km": -1}},
                {"id": "odd", "source": "a", "target": "c", "data": {"kind": "line", "std_type": "no such cable"}},
                {"id": "good", "source": "a", "target": "c", "data": {"kind": "line", "r_ohm_per_km": 0.1, "x_ohm_per_km": 0.1, "c_nf_per_km": 10, "max_i_ka": 0.3}}
            ]),
        );
        assert!(error_of(&ctx, "lv_mismatch").starts_with("voltage level mismatch"));
        assert_eq!(error_of(&ctx, "ghost"), "source 'a' or target 'z' bus not found");
        assert_eq!(error_of(&ctx, "loop"), "source and target cannot be the same");
        assert_eq!(
            error_of(&ctx, "bare"),
            "Missing line parameters: x_ohm_per_km, c_nf_per_km, max_i_ka"
        );
        assert_eq!(error_of(&ctx, "neg"), "length_km must be > 0");
        assert_eq!(error_of(&ctx, "odd"), "unknown line standard type 'no such cable'");
        assert!(ctx.status["good"].success);
        assert_eq!(ctx.lines.len(), 1);
        assert_eq!(ctx.lines.index_of("good"), Some(0));
    }

    #[test]
    fn transformer_and_injection_failures() {
        let ctx = build(
            json!([
                {"id": "hv", "type": "bus", "data": {"vn_kv": 20}},
                {"id": "lv", "type": "bus", "data": {"vn_kv": 0.4}},
                {"id": "t_missing", "type": "transformer", "data": {"hvBusId": "hv"}},
                {"id": "t_unknown", "type": "transformer", "data": {"hvBusId": "hv", "lvBusId": "x", "std_type": "0.4 MVA 20/0.4 kV"}},
                {"id": "t_nostd", "type": "transformer", "data": {"hvBusId": "hv", "lvBusId": "lv"}},
                {"id": "t_ok", "type": "transformer", "data": {"hvBusId": "hv", "lvBusId": "lv", "std_type": "0.4 MVA 20/0.4 kV", "tap_pos": 1}},
                {"id": "t3", "type": "trafo3w", "data": {"hvBusId": "hv", "mvBusId": "lv", "lvBusId": "q", "std_type": "63/25/38 MVA 110/20/10 kV"}},
                {"id": "bad_load", "type": "load", "data": {"busId": "no_such_bus"}},
                {"id": "sh", "type": "shunt", "data": {"busId": "lv", "q_mvar": 0.05}}
            ]),
            json!([]),
        );
        assert_eq!(error_of(&ctx, "t_missing"), "hvBusId or lvBusId missing");
        assert_eq!(error_of(&ctx, "t_unknown"), "hvBusId 'hv' or lvBusId 'x' not found");
        assert_eq!(error_of(&ctx, "t_nostd"), "std_type is required");
        assert!(ctx.status["t_ok"].success);
        assert_eq!(ctx.net.trafo[0].tap_pos, 1);
        assert_eq!(error_of(&ctx, "t3"), "One or more bus IDs not found");
        assert_eq!(error_of(&ctx, "bad_load"), "busId 'no_such_bus' not found or invalid");
        assert_eq!(ctx.net.shunt[0].vn_kv, 0.4);
        assert!(!ctx.has_slack());
        assert_eq!(ctx.slack_bus_id, "hv");
    }

    #[test]
    fn switch_resolution() {
        let ctx = build(
            json!([
                {"id": "a", "type": "bus", "data": {"vn_kv": 0.4}},
                {"id": "b", "type": "bus", "data": {"vn_kv": 0.4}},
                {"id": "s_line", "type": "switch", "data": {"busId": "a", "elementId": "nope"}},
                {"id": "s_trafo", "type": "switch", "data": {"busId": "a", "elementType": "trafo", "elementId": "t"}},
                {"id": "s_bus", "type": "switch", "data": {"busId": "a", "elementType": "bus", "elementId": "b"}},
                {"id": "s_kind", "type": "switch", "data": {"busId": "a", "elementType": "valve", "elementId": "b"}},
                {"id": "s_nobus", "type": "switch", "data": {"elementType": "bus", "elementId": "b"}}
            ]),
            json!([]),
        );
        assert_eq!(error_of(&ctx, "s_line"), "elementId 'nope' (line) not found");
        assert_eq!(error_of(&ctx, "s_trafo"), "elementId 't' (trafo) not found");
        assert!(ctx.status["s_bus"].success);
        assert_eq!(ctx.net.switch[0].et, SwitchElement::Bus);
        assert_eq!(error_of(&ctx, "s_kind"), "Invalid elementType 'valve'");
        assert_eq!(error_of(&ctx, "s_nobus"), "busId '' not found or invalid");
    }

    #[test]
    fn skipped_elements_are_not_attempted() {
        let nodes: Vec<GraphNode> = serde_json::from_value(json!([
            {"id": "a", "type": "bus", "data": {"vn_kv": 0.4}},
            {"id": "ld", "type": "load", "data": {"busId": "a"}}
        ]))
        .unwrap();
        let index = GraphIndex::new(&nodes, &[]);
        let mut ctx = AssemblyContext::new(1.0, 50.0);
        assemble(&index, &HashSet::from(["ld"]), &mut ctx);
        assert!(ctx.status.get("ld").is_none());
        assert!(ctx.net.load.is_empty());
        assert_eq!(ctx.buses.len(), 1);
    }
}

//! End-to-end pipeline tests: diagram in, response out.

use gridsim_algo::{simulate, SimulationOptions};
use gridsim_core::{ReturnNetwork, SimulationRequest, SimulationResponse};
use serde_json::{json, Value};

fn request(nodes: Value, edges: Value) -> SimulationRequest {
    serde_json::from_value(json!({ "nodes": nodes, "edges": edges })).unwrap()
}

fn run(nodes: Value, edges: Value) -> SimulationResponse {
    simulate(&request(nodes, edges), &SimulationOptions::default())
}

fn bus(id: &str, vn_kv: f64) -> Value {
    json!({"id": id, "type": "bus", "data": {"vn_kv": vn_kv}})
}

fn std_line(id: &str, from: &str, to: &str, std_type: &str, length_km: f64) -> Value {
    json!({"id": id, "source": from, "target": to,
           "data": {"kind": "line", "std_type": std_type, "length_km": length_km}})
}

fn validation_messages(response: &SimulationResponse) -> Vec<String> {
    response
        .errors
        .get("validation")
        .map(|errs| errs.iter().map(|e| e.message.clone()).collect())
        .unwrap_or_default()
}

/// Every number in a JSON document, wherever it sits.
fn numbers(value: &Value, out: &mut Vec<f64>) {
    match value {
        Value::Number(n) => out.extend(n.as_f64()),
        Value::Array(items) => items.iter().for_each(|v| numbers(v, out)),
        Value::Object(map) => map.values().for_each(|v| numbers(v, out)),
        _ => {}
    }
}

fn two_bus_feeder() -> (Value, Value) {
    (
        json!([
            bus("bus-1", 22.0),
            bus("bus-2", 22.0),
            {"id": "grid", "type": "ext_grid", "data": {"busId": "bus-1", "vm_pu": 1.02}},
            {"id": "load", "type": "load", "data": {"busId": "bus-2", "p_mw": 10, "q_mvar": 4}}
        ]),
        json!([std_line("line-1", "bus-1", "bus-2", "NA2XS2Y 1x240 RM/25 12/20 kV", 1.0)]),
    )
}

#[test]
fn two_bus_feeder_converges() {
    let (nodes, edges) = two_bus_feeder();
    let response = run(nodes, edges);

    assert!(response.summary.converged, "{:?}", response.errors);
    assert_eq!(response.summary.slack_bus_id, "bus-1");
    assert!(response.bus_by_id.contains_key("bus-1"));
    assert!(response.bus_by_id.contains_key("bus-2"));
    assert!(!response.results.lines.is_empty());
    assert!(response.element_status.values().all(|s| s.success));

    let slack = &response.bus_by_id["bus-1"];
    assert!((slack.vm_pu.unwrap() - 1.02).abs() < 1e-9);
    let far = response.bus_by_id["bus-2"].vm_pu.unwrap();
    assert!(far < 1.02 && far > 0.95, "far-end voltage {far}");

    let line = &response.results.lines["line-1"];
    assert!(line.p_from_mw.unwrap() > 10.0);
    assert!((line.p_to_mw.unwrap() + 10.0).abs() < 1e-3);
    let load = &response.results.loads["load"];
    assert_eq!(load.p_mw, Some(10.0));
    let grid = &response.results.ext_grids["grid"];
    assert!((grid.p_mw.unwrap() - line.p_from_mw.unwrap()).abs() < 1e-3);
    assert_eq!(response.res_bus.len(), 2);
}

#[test]
fn load_on_missing_bus_without_grid_does_not_converge() {
    let response = run(
        json!([
            bus("bus-1", 0.4),
            {"id": "bad_load", "type": "load", "data": {"busId": "no_such_bus", "p_mw": 0.1}}
        ]),
        json!([]),
    );
    assert!(!response.summary.converged);
    assert!(!response.element_status["bad_load"].success);
    let messages = validation_messages(&response);
    assert!(messages.iter().any(|m| m.contains("no_such_bus")), "{messages:?}");
    assert!(response.bus_by_id.is_empty());
}

#[test]
fn every_missing_bus_reference_fails_its_element() {
    let response = run(
        json!([
            bus("b1", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "l", "type": "load", "data": {"busId": "nope-1"}},
            {"id": "s", "type": "sgen", "data": {"busId": "nope-2"}},
            {"id": "m", "type": "motor", "data": {"busId": "nope-3"}},
            {"id": "w", "type": "ward", "data": {"busId": "nope-4"}}
        ]),
        json!([]),
    );
    let messages = validation_messages(&response);
    for (id, bus) in [("l", "nope-1"), ("s", "nope-2"), ("m", "nope-3"), ("w", "nope-4")] {
        assert!(!response.element_status[id].success, "{id}");
        assert!(messages.iter().any(|m| m.contains(bus)), "{bus} not named");
    }
    assert!(response.summary.converged);
}

#[test]
fn missing_ext_grid_is_fatal() {
    let response = run(
        json!([
            bus("b1", 0.4),
            bus("b2", 0.4),
            {"id": "ld", "type": "load", "data": {"busId": "b2"}}
        ]),
        json!([std_line("l1", "b1", "b2", "NAYY 4x50 SE", 0.1)]),
    );
    assert!(!response.summary.converged);
    assert!(validation_messages(&response)
        .iter()
        .any(|m| m == "At least one ext_grid is required"));
    assert!(response.results.is_empty());
    assert!(response.element_status.is_empty());
}

fn island_case(closed: bool) -> SimulationResponse {
    run(
        json!([
            bus("b1", 0.4),
            bus("b2", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "ld", "type": "load", "data": {"busId": "b2", "p_mw": 0.05}},
            {"id": "sw", "type": "switch",
             "data": {"busId": "b2", "elementType": "line", "elementId": "l1", "closed": closed}}
        ]),
        json!([std_line("l1", "b1", "b2", "NAYY 4x150 SE", 0.1)]),
    )
}

#[test]
fn open_switch_islands_and_closing_it_heals() {
    let open = island_case(false);
    assert!(!open.summary.converged);
    let messages = validation_messages(&open);
    assert!(
        messages.iter().any(|m| m.starts_with("Island of 1 bus(es) has no ext_grid")),
        "{messages:?}"
    );

    let closed = island_case(true);
    assert!(validation_messages(&closed).is_empty());
    assert!(closed.summary.converged);
    assert!(closed.element_status["sw"].success);
}

#[test]
fn open_switch_carries_no_current_in_a_mesh() {
    let response = run(
        json!([
            bus("b1", 20.0),
            bus("b2", 20.0),
            bus("b3", 20.0),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "ld", "type": "load", "data": {"busId": "b3", "p_mw": 2.0, "q_mvar": 0.5}},
            {"id": "sw", "type": "switch",
             "data": {"busId": "b3", "elementType": "line", "elementId": "l23", "closed": false}}
        ]),
        json!([
            std_line("l12", "b1", "b2", "NA2XS2Y 1x185 RM/25 12/20 kV", 2.0),
            std_line("l13", "b1", "b3", "NA2XS2Y 1x185 RM/25 12/20 kV", 3.0),
            std_line("l23", "b2", "b3", "NA2XS2Y 1x185 RM/25 12/20 kV", 1.0)
        ]),
    );
    assert!(response.summary.converged, "{:?}", response.errors);
    let open = &response.results.lines["l23"];
    assert!(open.i_from_ka.unwrap().abs() < 1e-9);
    assert!(open.i_to_ka.unwrap().abs() < 1e-9);
    assert!(response.results.lines["l13"].i_from_ka.unwrap() > 0.03);
}

fn trafo(id: &str, hv: &str, lv: &str) -> Value {
    json!({"id": id, "type": "transformer",
           "data": {"hvBusId": hv, "lvBusId": lv, "std_type": "0.4 MVA 20/0.4 kV"}})
}

fn trafo_switch(id: &str, bus: &str, trafo: &str, closed: bool) -> Value {
    json!({"id": id, "type": "switch",
           "data": {"busId": bus, "elementType": "trafo", "elementId": trafo, "closed": closed}})
}

fn parallel_trafos(t2_closed: bool) -> SimulationResponse {
    run(
        json!([
            bus("hv", 20.0),
            bus("lv", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "hv"}},
            {"id": "ld", "type": "load", "data": {"busId": "lv", "p_mw": 0.2, "q_mvar": 0.05}},
            trafo("t1", "hv", "lv"),
            trafo("t2", "hv", "lv"),
            trafo_switch("sw", "hv", "t2", t2_closed)
        ]),
        json!([]),
    )
}

#[test]
fn open_trafo_switch_moves_the_load_to_the_other_unit() {
    let closed = parallel_trafos(true);
    assert!(closed.summary.converged, "{:?}", closed.errors);
    let t1 = closed.results.trafos["t1"].i_hv_ka.unwrap();
    let t2 = closed.results.trafos["t2"].i_hv_ka.unwrap();
    assert!(t1 > 1e-3);
    assert!((t1 - t2).abs() < 1e-6, "{t1} vs {t2}");

    let open = parallel_trafos(false);
    assert!(open.summary.converged, "{:?}", open.errors);
    assert!(open.element_status["sw"].success);
    let t1_alone = open.results.trafos["t1"].i_hv_ka.unwrap();
    let t2_open = open.results.trafos["t2"].i_hv_ka.unwrap();
    assert!(t2_open.abs() < 1e-9, "open trafo carries {t2_open} kA");
    assert!(t1_alone > 1.9 * t1 && t1_alone < 2.1 * t1, "{t1_alone} vs {t1}");
}

#[test]
fn opening_the_only_trafo_islands_its_lv_side() {
    let response = run(
        json!([
            bus("hv", 20.0),
            bus("lv", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "hv"}},
            {"id": "ld", "type": "load", "data": {"busId": "lv", "p_mw": 0.1}},
            trafo("t1", "hv", "lv"),
            trafo_switch("sw", "lv", "t1", false)
        ]),
        json!([]),
    );
    assert!(!response.summary.converged);
    let messages = validation_messages(&response);
    assert!(
        messages.iter().any(|m| m.starts_with("Island of 1 bus(es) has no ext_grid")),
        "{messages:?}"
    );
}

#[test]
fn switch_away_from_its_line_fails_only_itself() {
    let response = run(
        json!([
            bus("a", 0.4),
            bus("b", 0.4),
            bus("c", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "a"}},
            {"id": "ld", "type": "load", "data": {"busId": "c", "p_mw": 0.01}},
            {"id": "sw", "type": "switch",
             "data": {"busId": "a", "elementType": "line", "elementId": "l2", "closed": false}}
        ]),
        json!([
            std_line("l1", "a", "b", "NAYY 4x150 SE", 0.1),
            std_line("l2", "b", "c", "NAYY 4x150 SE", 0.1)
        ]),
    );
    let messages = validation_messages(&response);
    assert_eq!(messages, vec!["busId 'a' is not a terminal of line 'l2'".to_string()]);
    assert!(!response.element_status["sw"].success);
    assert!(response.summary.converged, "{:?}", response.errors);
    assert!(response.results.lines["l2"].i_from_ka.unwrap() > 0.0);
}

#[test]
fn rerun_is_identical() {
    let (nodes, edges) = two_bus_feeder();
    let req = request(nodes, edges);
    let first = simulate(&req, &SimulationOptions::default());
    let second = simulate(&req, &SimulationOptions::default());
    assert_eq!(first.bus_by_id, second.bus_by_id);
    assert_eq!(first.results, second.results);
    assert_eq!(first.element_status, second.element_status);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn deenergized_elements_serialize_as_null() {
    let req = request(
        json!([
            bus("b1", 0.4),
            bus("b2", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "ld", "type": "load", "data": {"busId": "b2", "p_mw": 0.01}}
        ]),
        json!([std_line("l1", "b1", "b2", "no such cable", 0.1)]),
    );
    let options = SimulationOptions::default().with_return_network(ReturnNetwork::Tables);
    let response = simulate(&req, &options);

    assert!(response.summary.converged);
    assert!(!response.element_status["l1"].success);
    assert_eq!(response.bus_by_id["b2"].vm_pu, None);
    assert_eq!(response.results.loads["ld"].p_mw, None);

    let payload = serde_json::to_value(&response).unwrap();
    assert_eq!(payload["bus_by_id"]["b2"]["vm_pu"], Value::Null);
    let mut all = Vec::new();
    numbers(&payload, &mut all);
    assert!(!all.is_empty());
    assert!(all.iter().all(|v| v.is_finite()));
    let text = serde_json::to_string(&response).unwrap();
    assert!(!text.contains("NaN"));
}

#[test]
fn one_bad_element_does_not_block_the_rest() {
    let response = run(
        json!([
            bus("b1", 0.4),
            bus("b2", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "ld", "type": "load", "data": {"busId": "b2", "p_mw": 0.05}},
            {"id": "pv", "type": "sgen", "data": {"busId": "b2", "p_mw": 0.02}},
            {"id": "bad_load", "type": "load", "data": {"busId": "no_such_bus"}}
        ]),
        json!([std_line("l1", "b1", "b2", "NAYY 4x150 SE", 0.1)]),
    );
    assert!(response.summary.converged);
    let failed: Vec<&str> = response
        .element_status
        .values()
        .filter(|s| !s.success)
        .map(|s| s.element_id.as_str())
        .collect();
    assert_eq!(failed, vec!["bad_load"]);
    for id in ["b1", "b2", "g", "ld", "pv", "l1"] {
        assert!(response.element_status[id].success, "{id}");
    }
    assert!(response.results.loads.contains_key("ld"));
    assert!(!response.results.loads.contains_key("bad_load"));
}

#[test]
fn undersized_line_is_flagged_as_overloaded() {
    let params = |max_i_ka: f64| {
        json!({"kind": "line", "length_km": 1.0, "r_ohm_per_km": 0.16,
               "x_ohm_per_km": 0.12, "c_nf_per_km": 250, "max_i_ka": max_i_ka})
    };
    let response = run(
        json!([
            bus("b1", 20.0),
            bus("b2", 20.0),
            bus("b3", 20.0),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "ld", "type": "load", "data": {"busId": "b3", "p_mw": 1.0, "q_mvar": 0.2}}
        ]),
        json!([
            {"id": "feeder", "source": "b1", "target": "b2", "data": params(0.4)},
            {"id": "weak", "source": "b2", "target": "b3", "data": params(0.001)}
        ]),
    );
    assert!(response.summary.converged);
    let loading = response.results.lines["weak"].loading_percent.unwrap();
    assert!(loading > 100.0, "loading {loading}");
    assert!(response.results.lines["feeder"].loading_percent.unwrap() < 100.0);

    let status = &response.element_status["weak"];
    assert!(!status.success);
    assert!(status.error.as_deref().unwrap().contains("loading_percent"));
    assert!(response
        .warnings
        .iter()
        .any(|w| w.starts_with("[loading] weak:")));
    assert!(response.element_status["feeder"].success);
}

#[test]
fn unknown_algorithm_lands_in_powerflow_bucket() {
    let (nodes, edges) = two_bus_feeder();
    let req: SimulationRequest = serde_json::from_value(json!({
        "nodes": nodes,
        "edges": edges,
        "settings": {"algorithm": "bfsw", "max_iter": 15}
    }))
    .unwrap();
    let response = simulate(&req, &SimulationOptions::default());
    assert!(!response.summary.converged);
    let entry = &response.errors["powerflow"][0];
    assert_eq!(entry.element_type, "powerflow");
    assert!(entry.message.contains("bfsw"));
    assert!(entry.message.contains("max_iter=15"));
}

#[test]
fn every_algorithm_agrees_on_the_feeder() {
    let (nodes, edges) = two_bus_feeder();
    let mut voltages = Vec::new();
    for algorithm in ["nr", "fdbx", "fdxb", "gs"] {
        let req: SimulationRequest = serde_json::from_value(json!({
            "nodes": nodes.clone(),
            "edges": edges.clone(),
            "settings": {"algorithm": algorithm, "max_iter": 500}
        }))
        .unwrap();
        let response = simulate(&req, &SimulationOptions::default());
        assert!(response.summary.converged, "{algorithm}: {:?}", response.warnings);
        voltages.push(response.bus_by_id["bus-2"].vm_pu.unwrap());
    }
    for v in &voltages[1..] {
        assert!((v - voltages[0]).abs() < 1e-4, "{voltages:?}");
    }
}

#[test]
fn line_nodes_become_warnings_and_edges_get_ids() {
    let response = run(
        json!([
            bus("b1", 0.4),
            bus("b2", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"busId": "b1"}},
            {"id": "drawn-line", "type": "line", "data": {}}
        ]),
        json!([{"source": "b1", "target": "b2",
                "data": {"kind": "line", "std_type": "NAYY 4x50 SE", "length_km": 0.1}}]),
    );
    assert!(response
        .warnings
        .iter()
        .any(|w| w.starts_with("[graph] drawn-line:")));
    assert!(response.element_status["edge_0"].success);
    assert!(response.results.lines.contains_key("edge_0"));
}

#[test]
fn attach_edges_resolve_buses_and_tables_are_exported() {
    let req: SimulationRequest = serde_json::from_value(json!({
        "nodes": [
            bus("hv", 20.0),
            bus("lv", 0.4),
            {"id": "g", "type": "ext_grid", "data": {"vm_pu": 1.0}},
            {"id": "t1", "type": "transformer",
             "data": {"hvBusId": "hv", "lvBusId": "lv", "std_type": "0.4 MVA 20/0.4 kV"}},
            {"id": "ld", "type": "load", "data": {"p_mw": 0.2, "q_mvar": 0.05}},
            {"id": "cap", "type": "shunt", "data": {"busId": "lv", "q_mvar": -0.02}}
        ],
        "edges": [
            {"id": "a1", "source": "g", "target": "hv", "data": {"kind": "attach", "attach_type": "ext_grid"}},
            {"id": "a2", "source": "lv", "target": "ld", "data": {"kind": "attach", "attach_type": "load"}}
        ],
        "settings": {"return_network": "tables"}
    }))
    .unwrap();
    let response = simulate(&req, &SimulationOptions::default());

    assert!(response.summary.converged, "{:?}", response.errors);
    assert_eq!(response.summary.slack_bus_id, "hv");
    let trafo = &response.results.trafos["t1"];
    assert!(trafo.p_hv_mw.unwrap() > 0.2);
    assert!(trafo.loading_percent.unwrap() > 40.0);
    assert!(response.results.shunts.contains_key("cap"));

    let network = response.network.expect("tables requested");
    assert!(network.meta.converged);
    let tables = network.tables.unwrap();
    assert_eq!(tables["trafo"].len(), 1);
    assert_eq!(tables["load"].len(), 1);
    assert!(network.results.unwrap().contains_key("res_bus"));
}

//! Result tables of a converged load flow.
//!
//! Every row of every element table gets a result row. Elements on
//! de-energized buses get NaN, out-of-service elements zero, and branches
//! taken out by an open switch zero flow and current.

use super::topology::{BranchOrigin, BusKind, PowerFlowProblem, Topology, Winding};
use super::NodeSolution;
use gridsim_core::model::{
    PowerNet, ResBus, ResGen, ResLine, ResPower, ResShunt, ResTrafo, ResTrafo3w, ResultTables,
};
use num_complex::Complex64;
use std::collections::HashMap;

const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Node voltages expanded back to topology numbering.
struct NodeVoltages {
    v: Vec<Option<Complex64>>,
}

impl NodeVoltages {
    fn new(topology: &Topology, problem: &PowerFlowProblem, solution: &NodeSolution) -> Self {
        let mut v = vec![None; topology.node_count];
        for (k, &n) in problem.node_of.iter().enumerate() {
            v[n] = Some(Complex64::from_polar(solution.vm[k], solution.va[k]));
        }
        Self { v }
    }

    fn vm(&self, node: usize) -> f64 {
        self.v[node].map_or(f64::NAN, |v| v.norm())
    }

    fn va_degree(&self, node: usize) -> f64 {
        self.v[node].map_or(f64::NAN, |v| v.arg().to_degrees())
    }
}

/// `|S| / (√3 · V)` in kA for `s` in MVA.
fn current_ka(s: Complex64, vm_pu: f64, vn_kv: f64) -> f64 {
    if vm_pu > 0.0 {
        s.norm() / (SQRT3 * vm_pu * vn_kv)
    } else {
        0.0
    }
}

/// Generation-side unknowns of slack and PV nodes, split among their sources.
struct SourceShares {
    ext_grid_p: HashMap<usize, f64>,
    q_share: HashMap<usize, f64>,
}

fn source_shares(
    net: &PowerNet,
    topology: &Topology,
    problem: &PowerFlowProblem,
    solution: &NodeSolution,
) -> SourceShares {
    let sn = net.sn_mva;
    let v: Vec<Complex64> = solution
        .vm
        .iter()
        .zip(solution.va.iter())
        .map(|(&m, &a)| Complex64::from_polar(m, a))
        .collect();
    let injections = problem.ybus.complex_injections(&v);
    let mut s_calc = vec![None; topology.node_count];
    for (k, &n) in problem.node_of.iter().enumerate() {
        s_calc[n] = Some(injections[k]);
    }

    let alive = |bus: usize| net.bus[bus].in_service;
    let mut ext_grids: HashMap<usize, usize> = HashMap::new();
    let mut sources: HashMap<usize, usize> = HashMap::new();
    for eg in net.ext_grid.iter().filter(|e| e.in_service && alive(e.bus)) {
        let n = topology.bus_node[eg.bus];
        *ext_grids.entry(n).or_default() += 1;
        *sources.entry(n).or_default() += 1;
    }
    for gen in net.gen.iter().filter(|e| e.in_service && alive(e.bus)) {
        *sources.entry(topology.bus_node[gen.bus]).or_default() += 1;
    }

    let mut ext_grid_p = HashMap::new();
    let mut q_share = HashMap::new();
    for (n, s) in s_calc.iter().enumerate() {
        let Some(s) = s else { continue };
        if topology.kind[n] == BusKind::Pq {
            continue;
        }
        if let Some(&count) = ext_grids.get(&n) {
            ext_grid_p.insert(n, (s.re - topology.p_spec[n]) * sn / count as f64);
        }
        if let Some(&count) = sources.get(&n) {
            q_share.insert(n, (s.im - topology.q_spec[n]) * sn / count as f64);
        }
    }
    SourceShares {
        ext_grid_p,
        q_share,
    }
}

/// Fill `net.res` from a converged solution.
pub fn write_results(
    net: &mut PowerNet,
    topology: &Topology,
    problem: &PowerFlowProblem,
    solution: &NodeSolution,
) {
    let volts = NodeVoltages::new(topology, problem, solution);
    let shares = source_shares(net, topology, problem, solution);
    let sn = net.sn_mva;
    let net_ref: &PowerNet = net;

    let bus_on = |bus: usize| {
        net_ref.bus[bus].in_service && volts.v[topology.bus_node[bus]].is_some()
    };
    let bus_vm = |bus: usize| volts.vm(topology.bus_node[bus]);
    let bus_va = |bus: usize| volts.va_degree(topology.bus_node[bus]);
    let power = |in_service: bool, bus: usize, p: f64, q: f64| {
        if !in_service {
            ResPower::ZERO
        } else if !bus_on(bus) {
            ResPower::NAN
        } else {
            ResPower { p_mw: p, q_mvar: q }
        }
    };

    let mut res = ResultTables::default();

    res.load = net_ref
        .load
        .iter()
        .map(|l| power(l.in_service, l.bus, l.p_mw * l.scaling, l.q_mvar * l.scaling))
        .collect();
    res.sgen = net_ref
        .sgen
        .iter()
        .map(|g| power(g.in_service, g.bus, g.p_mw * g.scaling, g.q_mvar * g.scaling))
        .collect();
    res.motor = net_ref
        .motor
        .iter()
        .map(|m| {
            let (p, q) = m.demand();
            power(m.in_service, m.bus, p, q)
        })
        .collect();
    res.storage = net_ref
        .storage
        .iter()
        .map(|s| power(s.in_service, s.bus, s.p_mw, s.q_mvar))
        .collect();
    res.ward = net_ref
        .ward
        .iter()
        .map(|w| {
            let vm2 = bus_vm(w.bus).powi(2);
            power(w.in_service, w.bus, w.ps_mw + vm2 * w.pz_mw, w.qs_mvar + vm2 * w.qz_mvar)
        })
        .collect();
    res.shunt = net_ref
        .shunt
        .iter()
        .map(|s| {
            let vm = bus_vm(s.bus);
            let scale = vm * vm * f64::from(s.step) * (net_ref.bus[s.bus].vn_kv / s.vn_kv).powi(2);
            let p = power(s.in_service, s.bus, s.p_mw * scale, s.q_mvar * scale);
            ResShunt {
                p_mw: p.p_mw,
                q_mvar: p.q_mvar,
                vm_pu: vm,
            }
        })
        .collect();
    res.ext_grid = net_ref
        .ext_grid
        .iter()
        .map(|eg| {
            let n = topology.bus_node[eg.bus];
            let p = shares.ext_grid_p.get(&n).copied().unwrap_or(f64::NAN);
            let q = shares.q_share.get(&n).copied().unwrap_or(f64::NAN);
            power(eg.in_service, eg.bus, p, q)
        })
        .collect();
    res.gen = net_ref
        .gen
        .iter()
        .map(|g| {
            let n = topology.bus_node[g.bus];
            let q = shares.q_share.get(&n).copied().unwrap_or(f64::NAN);
            let p = power(g.in_service, g.bus, g.p_mw, q);
            ResGen {
                p_mw: p.p_mw,
                q_mvar: p.q_mvar,
                va_degree: bus_va(g.bus),
                vm_pu: bus_vm(g.bus),
            }
        })
        .collect();

    // Branch flows in MVA, entering the branch at each end.
    let mut flows: HashMap<BranchOrigin, (Complex64, Complex64)> = HashMap::new();
    for br in &topology.branches {
        if let (Some(vf), Some(vt)) = (volts.v[br.from], volts.v[br.to]) {
            let (sf, st) = br.flows(vf, vt);
            flows.insert(br.origin, (sf * sn, st * sn));
        }
    }
    let zero = Complex64::new(0.0, 0.0);
    let nan = Complex64::new(f64::NAN, f64::NAN);
    // Flow pair of a two-terminal branch; NaN when it sits in a de-energized area.
    let branch_flows = |origin: BranchOrigin, in_service: bool, ends: [usize; 2]| {
        match flows.get(&origin) {
            Some(&f) => f,
            None if in_service && ends.iter().all(|&b| !bus_on(b)) => (nan, nan),
            None => (zero, zero),
        }
    };

    res.line = net_ref
        .line
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let (vm_f, vm_t) = (bus_vm(line.from_bus), bus_vm(line.to_bus));
            let (sf, st) = branch_flows(
                BranchOrigin::Line(i),
                line.in_service,
                [line.from_bus, line.to_bus],
            );
            let i_from = current_ka(sf, vm_f, net_ref.bus[line.from_bus].vn_kv);
            let i_to = current_ka(st, vm_t, net_ref.bus[line.to_bus].vn_kv);
            let i_ka = i_from.max(i_to);
            let rated = line.max_i_ka * line.df * f64::from(line.parallel);
            ResLine {
                p_from_mw: sf.re,
                q_from_mvar: sf.im,
                p_to_mw: st.re,
                q_to_mvar: st.im,
                pl_mw: sf.re + st.re,
                ql_mvar: sf.im + st.im,
                i_from_ka: i_from,
                i_to_ka: i_to,
                i_ka,
                vm_from_pu: vm_f,
                va_from_degree: bus_va(line.from_bus),
                vm_to_pu: vm_t,
                va_to_degree: bus_va(line.to_bus),
                loading_percent: i_ka / rated * 100.0,
            }
        })
        .collect();

    res.trafo = net_ref
        .trafo
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let (vm_hv, vm_lv) = (bus_vm(t.hv_bus), bus_vm(t.lv_bus));
            let (s_hv, s_lv) =
                branch_flows(BranchOrigin::Trafo(i), t.in_service, [t.hv_bus, t.lv_bus]);
            let i_hv = current_ka(s_hv, vm_hv, net_ref.bus[t.hv_bus].vn_kv);
            let i_lv = current_ka(s_lv, vm_lv, net_ref.bus[t.lv_bus].vn_kv);
            let loading = (i_hv * t.vn_hv_kv).max(i_lv * t.vn_lv_kv) * SQRT3
                / (t.sn_mva * f64::from(t.parallel))
                * 100.0;
            ResTrafo {
                p_hv_mw: s_hv.re,
                q_hv_mvar: s_hv.im,
                p_lv_mw: s_lv.re,
                q_lv_mvar: s_lv.im,
                pl_mw: s_hv.re + s_lv.re,
                ql_mvar: s_hv.im + s_lv.im,
                i_hv_ka: i_hv,
                i_lv_ka: i_lv,
                vm_hv_pu: vm_hv,
                va_hv_degree: bus_va(t.hv_bus),
                vm_lv_pu: vm_lv,
                va_lv_degree: bus_va(t.lv_bus),
                loading_percent: loading,
            }
        })
        .collect();

    res.trafo3w = net_ref
        .trafo3w
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let side = |winding: Winding, bus: usize, vn_rated: f64, sn_side: f64| {
                let entering = match flows.get(&BranchOrigin::Trafo3w(i, winding)) {
                    Some(&(sf, _)) if winding == Winding::Hv => sf,
                    Some(&(_, st)) => st,
                    None => zero,
                };
                let i_ka = current_ka(entering, bus_vm(bus), net_ref.bus[bus].vn_kv);
                (entering, i_ka, i_ka * vn_rated * SQRT3 / sn_side * 100.0)
            };
            let (s_hv, i_hv, l_hv) = side(Winding::Hv, t.hv_bus, t.vn_hv_kv, t.sn_hv_mva);
            let (s_mv, i_mv, l_mv) = side(Winding::Mv, t.mv_bus, t.vn_mv_kv, t.sn_mv_mva);
            let (s_lv, i_lv, l_lv) = side(Winding::Lv, t.lv_bus, t.vn_lv_kv, t.sn_lv_mva);
            let loss = s_hv + s_mv + s_lv;
            ResTrafo3w {
                p_hv_mw: s_hv.re,
                q_hv_mvar: s_hv.im,
                p_mv_mw: s_mv.re,
                q_mv_mvar: s_mv.im,
                p_lv_mw: s_lv.re,
                q_lv_mvar: s_lv.im,
                pl_mw: loss.re,
                ql_mvar: loss.im,
                i_hv_ka: i_hv,
                i_mv_ka: i_mv,
                i_lv_ka: i_lv,
                vm_hv_pu: bus_vm(t.hv_bus),
                vm_mv_pu: bus_vm(t.mv_bus),
                vm_lv_pu: bus_vm(t.lv_bus),
                loading_percent: l_hv.max(l_mv).max(l_lv),
            }
        })
        .collect();

    // Bus balance in load convention.
    let mut balance = vec![(0.0, 0.0); net_ref.bus.len()];
    let mut add = |bus: usize, p: f64, q: f64, sign: f64| {
        if p.is_finite() && q.is_finite() {
            balance[bus].0 += sign * p;
            balance[bus].1 += sign * q;
        }
    };
    let consumers = [
        (&res.load, net_ref.load.iter().map(|e| e.bus).collect::<Vec<_>>()),
        (&res.motor, net_ref.motor.iter().map(|e| e.bus).collect()),
        (&res.storage, net_ref.storage.iter().map(|e| e.bus).collect()),
        (&res.ward, net_ref.ward.iter().map(|e| e.bus).collect()),
    ];
    for (rows, buses) in consumers {
        for (r, &bus) in rows.iter().zip(buses.iter()) {
            add(bus, r.p_mw, r.q_mvar, 1.0);
        }
    }
    for (r, s) in res.shunt.iter().zip(net_ref.shunt.iter()) {
        add(s.bus, r.p_mw, r.q_mvar, 1.0);
    }
    for (r, g) in res.sgen.iter().zip(net_ref.sgen.iter()) {
        add(g.bus, r.p_mw, r.q_mvar, -1.0);
    }
    for (r, eg) in res.ext_grid.iter().zip(net_ref.ext_grid.iter()) {
        add(eg.bus, r.p_mw, r.q_mvar, -1.0);
    }
    for (r, g) in res.gen.iter().zip(net_ref.gen.iter()) {
        add(g.bus, r.p_mw, r.q_mvar, -1.0);
    }

    res.bus = (0..net_ref.bus.len())
        .map(|b| {
            if bus_on(b) {
                ResBus {
                    vm_pu: bus_vm(b),
                    va_degree: bus_va(b),
                    p_mw: balance[b].0,
                    q_mvar: balance[b].1,
                }
            } else {
                ResBus::NAN
            }
        })
        .collect();

    net.res = res;
}

#[cfg(test)]
mod tests {
    use crate::power_flow::{run_power_flow, PowerFlowSettings};
    use gridsim_core::model::{
        BusRow, ExtGridRow, GenRow, LineOptions, LoadRow, PowerNet, ShuntRow, TrafoOptions,
    };

    fn grid(net: &mut PowerNet, bus: usize) {
        net.create_ext_grid(ExtGridRow {
            name: "grid".into(),
            bus,
            vm_pu: 1.0,
            va_degree: 0.0,
            in_service: true,
        })
        .unwrap();
    }

    fn load(net: &mut PowerNet, bus: usize, p_mw: f64, q_mvar: f64) {
        net.create_load(LoadRow {
            name: "load".into(),
            bus,
            p_mw,
            q_mvar,
            scaling: 1.0,
            in_service: true,
            controllable: false,
        })
        .unwrap();
    }

    #[test]
    fn ext_grid_covers_load_and_losses() {
        let mut net = PowerNet::default();
        let a = net.create_bus(BusRow::new("a", 20.0)).unwrap();
        let b = net.create_bus(BusRow::new("b", 20.0)).unwrap();
        net.create_line(a, b, 2.0, "NA2XS2Y 1x95 RM/25 12/20 kV", LineOptions::default())
            .unwrap();
        grid(&mut net, a);
        load(&mut net, b, 2.0, 0.5);

        let outcome = run_power_flow(&mut net, &PowerFlowSettings::default()).unwrap();
        assert!(outcome.converged);
        let res = &net.res;
        let line = res.line[0];
        assert!(line.pl_mw > 0.0);
        assert!((res.ext_grid[0].p_mw - (2.0 + line.pl_mw)).abs() < 1e-6);
        assert!((line.p_to_mw + 2.0).abs() < 1e-6);
        assert!((res.bus[b].p_mw - 2.0).abs() < 1e-9);
        assert!((res.bus[a].p_mw + res.ext_grid[0].p_mw).abs() < 1e-9);
        assert!(res.bus[b].vm_pu < 1.0);
        assert!(line.loading_percent > 0.0);
    }

    #[test]
    fn transformer_feeds_low_voltage_load() {
        let mut net = PowerNet::default();
        let hv = net.create_bus(BusRow::new("hv", 20.0)).unwrap();
        let lv = net.create_bus(BusRow::new("lv", 0.4)).unwrap();
        net.create_transformer(hv, lv, "0.4 MVA 20/0.4 kV", TrafoOptions::default())
            .unwrap();
        grid(&mut net, hv);
        load(&mut net, lv, 0.2, 0.05);

        let outcome = run_power_flow(&mut net, &PowerFlowSettings::default()).unwrap();
        assert!(outcome.converged);
        let t = net.res.trafo[0];
        assert!(t.p_hv_mw > 0.2);
        assert!((t.p_lv_mw + 0.2).abs() < 1e-6);
        assert!(t.loading_percent > 40.0 && t.loading_percent < 70.0);
        assert!(net.res.bus[lv].vm_pu < 1.0);
    }

    #[test]
    fn generator_and_shunt_results() {
        let mut net = PowerNet::default();
        let a = net.create_bus(BusRow::new("a", 20.0)).unwrap();
        let b = net.create_bus(BusRow::new("b", 20.0)).unwrap();
        net.create_line(a, b, 1.0, "NA2XS2Y 1x95 RM/25 12/20 kV", LineOptions::default())
            .unwrap();
        grid(&mut net, a);
        net.create_gen(GenRow {
            name: "g".into(),
            bus: b,
            p_mw: 1.0,
            vm_pu: 1.01,
            min_q_mvar: None,
            max_q_mvar: None,
            in_service: true,
            controllable: true,
        })
        .unwrap();
        net.create_shunt(ShuntRow {
            name: "sh".into(),
            bus: b,
            p_mw: 0.0,
            q_mvar: 0.5,
            vn_kv: 20.0,
            step: 1,
            max_step: 1,
            in_service: true,
        })
        .unwrap();

        let outcome = run_power_flow(&mut net, &PowerFlowSettings::default()).unwrap();
        assert!(outcome.converged);
        let gen = net.res.gen[0];
        assert!((gen.vm_pu - 1.01).abs() < 1e-9);
        assert!((gen.p_mw - 1.0).abs() < 1e-12);
        let shunt = net.res.shunt[0];
        assert!((shunt.q_mvar - 0.5 * 1.01_f64.powi(2)).abs() < 1e-9);
        let line = net.res.line[0];
        assert!((gen.q_mvar - shunt.q_mvar - line.q_to_mvar).abs() < 1e-6);
        assert!((line.p_to_mw - 1.0).abs() < 1e-6);
    }
}

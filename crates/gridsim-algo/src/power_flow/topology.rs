//! Reduction of a [`PowerNet`] to the electrical nodes and π-branches the
//! load-flow engines work on.
//!
//! - closed bus-bus switches fuse their buses into one node
//! - open line/trafo switches take that branch out
//! - each in-service three-winding transformer adds an internal star node
//! - nodes not reachable from an in-service ext_grid are de-energized
//!
//! Everything is per-unit on the system base `sn_mva` and each node's
//! nominal voltage.

use super::ybus::SparseYBus;
use super::PowerFlowError;
use gridsim_core::graph_utils::find_islands;
use gridsim_core::model::{PowerNet, SwitchElement, Trafo3wRow, TrafoRow};
use num_complex::Complex64;
use petgraph::graph::UnGraph;
use petgraph::unionfind::UnionFind;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Slack,
    Pv,
    Pq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    Hv,
    Mv,
    Lv,
}

/// Model element a branch was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOrigin {
    Line(usize),
    Trafo(usize),
    /// One leg of a three-winding transformer's star equivalent.
    Trafo3w(usize, Winding),
}

/// π-model branch; `tau` is the off-nominal ratio on the from side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiBranch {
    pub origin: BranchOrigin,
    pub from: usize,
    pub to: usize,
    pub y_series: Complex64,
    pub y_shunt_from: Complex64,
    pub y_shunt_to: Complex64,
    pub tau: f64,
}

impl PiBranch {
    pub fn y_ff(&self) -> Complex64 {
        (self.y_series + self.y_shunt_from) / (self.tau * self.tau)
    }

    pub fn y_tt(&self) -> Complex64 {
        self.y_series + self.y_shunt_to
    }

    pub fn y_ft(&self) -> Complex64 {
        -self.y_series / self.tau
    }

    pub fn y_tf(&self) -> Complex64 {
        -self.y_series / self.tau
    }

    /// Complex power entering the branch at its from and to end (per unit).
    pub fn flows(&self, v_from: Complex64, v_to: Complex64) -> (Complex64, Complex64) {
        let i_from = self.y_ff() * v_from + self.y_ft() * v_to;
        let i_to = self.y_tf() * v_from + self.y_tt() * v_to;
        (v_from * i_from.conj(), v_to * i_to.conj())
    }

    fn with_nodes(&self, from: usize, to: usize) -> Self {
        Self { from, to, ..*self }
    }
}

/// Electrical node view of a network.
#[derive(Debug, Clone)]
pub struct Topology {
    pub node_count: usize,
    /// Model bus -> node.
    pub bus_node: Vec<usize>,
    /// Three-winding transformer -> internal star node.
    pub star_node: Vec<Option<usize>>,
    /// Nominal voltage of every node (kV).
    pub node_vn_kv: Vec<f64>,
    pub node_alive: Vec<bool>,
    pub energized: Vec<bool>,
    pub branches: Vec<PiBranch>,
    pub open_lines: HashSet<usize>,
    pub open_trafos: HashSet<usize>,
    /// Constant-admittance shunts per node.
    pub node_shunt: Vec<Complex64>,
    /// Constant-power injections per node, generation positive.
    pub p_spec: Vec<f64>,
    pub q_spec: Vec<f64>,
    pub kind: Vec<BusKind>,
    pub vm_set: Vec<f64>,
    /// Radians.
    pub va_set: Vec<f64>,
}

fn short_circuit_impedance(vk_percent: f64, vkr_percent: f64) -> Complex64 {
    let zk = vk_percent / 100.0;
    let rk = vkr_percent / 100.0;
    Complex64::new(rk, (zk * zk - rk * rk).max(0.0).sqrt())
}

fn magnetizing_admittance(pfe_kw: f64, i0_percent: f64, sn_mva: f64) -> Complex64 {
    let g = pfe_kw / 1000.0 / sn_mva;
    let ym = i0_percent / 100.0;
    Complex64::new(g, -(ym * ym - g * g).max(0.0).sqrt())
}

fn nonzero(z: Complex64) -> Complex64 {
    if z.norm() < 1e-9 {
        Complex64::new(0.0, 1e-6)
    } else {
        z
    }
}

/// Rated and base voltages of one transformer winding pair.
struct LegVoltages {
    rated_from: f64,
    rated_to: f64,
    base_from: f64,
    base_to: f64,
}

/// Transformer leg with impedance `z_t` on its own rating (`sn_t`), referred
/// to the to side. Returns the branch and the conversion factor from
/// transformer-base to system-base impedance.
fn transformer_leg(
    origin: BranchOrigin,
    from: usize,
    to: usize,
    v: LegVoltages,
    z_t: Complex64,
    sn_t: f64,
    sn_mva: f64,
    parallel: f64,
) -> (PiBranch, f64) {
    let k = (v.rated_to / v.base_to).powi(2) * sn_mva / sn_t;
    let z = nonzero(z_t * k / parallel);
    let tau = (v.rated_from / v.rated_to) / (v.base_from / v.base_to);
    let branch = PiBranch {
        origin,
        from,
        to,
        y_series: z.inv(),
        y_shunt_from: Complex64::new(0.0, 0.0),
        y_shunt_to: Complex64::new(0.0, 0.0),
        tau,
    };
    (branch, k)
}

fn trafo_branch(t: &TrafoRow, idx: usize, from: usize, to: usize, net: &PowerNet) -> PiBranch {
    let parallel = f64::from(t.parallel);
    let (mut branch, k) = transformer_leg(
        BranchOrigin::Trafo(idx),
        from,
        to,
        LegVoltages {
            rated_from: t.vn_hv_kv * t.tap_ratio(),
            rated_to: t.vn_lv_kv,
            base_from: net.bus[t.hv_bus].vn_kv,
            base_to: net.bus[t.lv_bus].vn_kv,
        },
        short_circuit_impedance(t.vk_percent, t.vkr_percent),
        t.sn_mva,
        net.sn_mva,
        parallel,
    );
    let y_m = magnetizing_admittance(t.pfe_kw, t.i0_percent, t.sn_mva) / k * parallel;
    branch.y_shunt_from = y_m / 2.0;
    branch.y_shunt_to = y_m / 2.0;
    branch
}

/// Star-equivalent legs (hv, mv, lv) and the magnetizing admittance at the star node.
fn trafo3w_legs(
    t: &Trafo3wRow,
    idx: usize,
    nodes: [usize; 3],
    star: usize,
    net: &PowerNet,
) -> ([PiBranch; 3], Complex64) {
    let base = t.sn_hv_mva;
    let pair = |vk: f64, vkr: f64, sn_a: f64, sn_b: f64| {
        short_circuit_impedance(vk, vkr) * base / sn_a.min(sn_b)
    };
    let z_hm = pair(t.vk_hv_percent, t.vkr_hv_percent, t.sn_hv_mva, t.sn_mv_mva);
    let z_ml = pair(t.vk_mv_percent, t.vkr_mv_percent, t.sn_mv_mva, t.sn_lv_mva);
    let z_hl = pair(t.vk_lv_percent, t.vkr_lv_percent, t.sn_hv_mva, t.sn_lv_mva);
    let z_h = (z_hm + z_hl - z_ml) / 2.0;
    let z_m = (z_hm + z_ml - z_hl) / 2.0;
    let z_l = (z_hl + z_ml - z_hm) / 2.0;

    let (hv, _) = transformer_leg(
        BranchOrigin::Trafo3w(idx, Winding::Hv),
        nodes[0],
        star,
        LegVoltages {
            rated_from: t.vn_hv_kv,
            rated_to: t.vn_hv_kv,
            base_from: net.bus[t.hv_bus].vn_kv,
            base_to: t.vn_hv_kv,
        },
        z_h,
        base,
        net.sn_mva,
        1.0,
    );
    let (mv, _) = transformer_leg(
        BranchOrigin::Trafo3w(idx, Winding::Mv),
        star,
        nodes[1],
        LegVoltages {
            rated_from: t.vn_hv_kv,
            rated_to: t.vn_mv_kv,
            base_from: t.vn_hv_kv,
            base_to: net.bus[t.mv_bus].vn_kv,
        },
        z_m,
        base,
        net.sn_mva,
        1.0,
    );
    let (lv, _) = transformer_leg(
        BranchOrigin::Trafo3w(idx, Winding::Lv),
        star,
        nodes[2],
        LegVoltages {
            rated_from: t.vn_hv_kv,
            rated_to: t.vn_lv_kv,
            base_from: t.vn_hv_kv,
            base_to: net.bus[t.lv_bus].vn_kv,
        },
        z_l,
        base,
        net.sn_mva,
        1.0,
    );
    let y_m = magnetizing_admittance(t.pfe_kw, t.i0_percent, base) * base / net.sn_mva;
    ([hv, mv, lv], y_m)
}

impl Topology {
    pub fn build(net: &PowerNet) -> Self {
        let n_bus = net.bus.len();

        let mut fused = UnionFind::<usize>::new(n_bus.max(1));
        for sw in &net.switch {
            let both_alive = net.bus.get(sw.bus).is_some_and(|b| b.in_service)
                && net.bus.get(sw.element).is_some_and(|b| b.in_service);
            if sw.in_service && sw.closed && sw.et == SwitchElement::Bus && both_alive {
                fused.union(sw.bus, sw.element);
            }
        }

        let mut root_node = vec![usize::MAX; n_bus];
        let mut bus_node = vec![0; n_bus];
        let mut node_vn_kv = Vec::new();
        let mut node_alive = Vec::new();
        for (b, row) in net.bus.iter().enumerate() {
            let root = fused.find(b);
            if root_node[root] == usize::MAX {
                root_node[root] = node_vn_kv.len();
                node_vn_kv.push(row.vn_kv);
                node_alive.push(false);
            }
            bus_node[b] = root_node[root];
            if row.in_service {
                node_alive[bus_node[b]] = true;
            }
        }

        let bus_alive = |b: usize| net.bus.get(b).is_some_and(|row| row.in_service);

        let mut star_node = vec![None; net.trafo3w.len()];
        for (i, t) in net.trafo3w.iter().enumerate() {
            if t.in_service && [t.hv_bus, t.mv_bus, t.lv_bus].into_iter().all(bus_alive) {
                star_node[i] = Some(node_vn_kv.len());
                node_vn_kv.push(t.vn_hv_kv);
                node_alive.push(true);
            }
        }
        let node_count = node_vn_kv.len();

        let mut open_lines = HashSet::new();
        let mut open_trafos = HashSet::new();
        for sw in net.switch.iter().filter(|s| s.in_service && !s.closed) {
            match sw.et {
                SwitchElement::Line => {
                    open_lines.insert(sw.element);
                }
                SwitchElement::Trafo => {
                    open_trafos.insert(sw.element);
                }
                SwitchElement::Bus => {}
            }
        }

        let mut branches = Vec::new();
        let mut node_shunt = vec![Complex64::new(0.0, 0.0); node_count];

        for (i, line) in net.line.iter().enumerate() {
            if !line.in_service || open_lines.contains(&i) {
                continue;
            }
            if !bus_alive(line.from_bus) || !bus_alive(line.to_bus) {
                continue;
            }
            let (from, to) = (bus_node[line.from_bus], bus_node[line.to_bus]);
            if from == to {
                continue;
            }
            let parallel = f64::from(line.parallel);
            let z_base = net.bus[line.from_bus].vn_kv.powi(2) / net.sn_mva;
            let z = Complex64::new(
                line.r_ohm_per_km * line.length_km / parallel,
                line.x_ohm_per_km * line.length_km / parallel,
            ) / z_base;
            let b = 2.0 * std::f64::consts::PI * net.f_hz * line.c_nf_per_km * 1e-9
                * line.length_km
                * parallel
                * z_base;
            branches.push(PiBranch {
                origin: BranchOrigin::Line(i),
                from,
                to,
                y_series: nonzero(z).inv(),
                y_shunt_from: Complex64::new(0.0, b / 2.0),
                y_shunt_to: Complex64::new(0.0, b / 2.0),
                tau: 1.0,
            });
        }

        for (i, t) in net.trafo.iter().enumerate() {
            if !t.in_service || open_trafos.contains(&i) {
                continue;
            }
            if !bus_alive(t.hv_bus) || !bus_alive(t.lv_bus) {
                continue;
            }
            let (from, to) = (bus_node[t.hv_bus], bus_node[t.lv_bus]);
            if from == to {
                continue;
            }
            branches.push(trafo_branch(t, i, from, to, net));
        }

        for (i, t) in net.trafo3w.iter().enumerate() {
            let Some(star) = star_node[i] else {
                continue;
            };
            let nodes = [bus_node[t.hv_bus], bus_node[t.mv_bus], bus_node[t.lv_bus]];
            let (legs, y_m) = trafo3w_legs(t, i, nodes, star, net);
            branches.extend(legs);
            node_shunt[star] += y_m;
        }

        let sn = net.sn_mva;
        let mut p_spec = vec![0.0; node_count];
        let mut q_spec = vec![0.0; node_count];
        let mut kind = vec![BusKind::Pq; node_count];
        let mut vm_set = vec![1.0; node_count];
        let mut va_set = vec![0.0; node_count];

        for load in net.load.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[load.bus];
            p_spec[n] -= load.p_mw * load.scaling / sn;
            q_spec[n] -= load.q_mvar * load.scaling / sn;
        }
        for motor in net.motor.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[motor.bus];
            let (p, q) = motor.demand();
            p_spec[n] -= p / sn;
            q_spec[n] -= q / sn;
        }
        for st in net.storage.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[st.bus];
            p_spec[n] -= st.p_mw / sn;
            q_spec[n] -= st.q_mvar / sn;
        }
        for sg in net.sgen.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[sg.bus];
            p_spec[n] += sg.p_mw * sg.scaling / sn;
            q_spec[n] += sg.q_mvar * sg.scaling / sn;
        }
        for ward in net.ward.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[ward.bus];
            p_spec[n] -= ward.ps_mw / sn;
            q_spec[n] -= ward.qs_mvar / sn;
            node_shunt[n] += Complex64::new(ward.pz_mw, -ward.qz_mvar) / sn;
        }
        for shunt in net.shunt.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[shunt.bus];
            let ratio = (net.bus[shunt.bus].vn_kv / shunt.vn_kv).powi(2);
            node_shunt[n] += Complex64::new(shunt.p_mw, -shunt.q_mvar)
                * f64::from(shunt.step)
                * ratio
                / sn;
        }
        for gen in net.gen.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[gen.bus];
            p_spec[n] += gen.p_mw / sn;
            if kind[n] == BusKind::Pq {
                kind[n] = BusKind::Pv;
                vm_set[n] = gen.vm_pu;
            }
        }
        for eg in net.ext_grid.iter().filter(|e| e.in_service && bus_alive(e.bus)) {
            let n = bus_node[eg.bus];
            if kind[n] != BusKind::Slack {
                kind[n] = BusKind::Slack;
                vm_set[n] = eg.vm_pu;
                va_set[n] = eg.va_degree.to_radians();
            }
        }

        let mut graph: UnGraph<usize, ()> = UnGraph::new_undirected();
        let idx: Vec<_> = (0..node_count).map(|n| graph.add_node(n)).collect();
        for br in &branches {
            graph.add_edge(idx[br.from], idx[br.to], ());
        }
        let mut energized = vec![false; node_count];
        for island in find_islands(&graph) {
            let nodes: Vec<usize> = island.into_iter().map(|ni| graph[ni]).collect();
            if nodes.iter().any(|&n| kind[n] == BusKind::Slack && node_alive[n]) {
                for n in nodes {
                    energized[n] = node_alive[n];
                }
            }
        }

        Self {
            node_count,
            bus_node,
            star_node,
            node_vn_kv,
            node_alive,
            energized,
            branches,
            open_lines,
            open_trafos,
            node_shunt,
            p_spec,
            q_spec,
            kind,
            vm_set,
            va_set,
        }
    }

    pub fn has_slack(&self) -> bool {
        (0..self.node_count).any(|n| self.energized[n] && self.kind[n] == BusKind::Slack)
    }

    pub fn energized_count(&self) -> usize {
        self.energized.iter().filter(|&&e| e).count()
    }

    /// Restrict the network to its energized nodes.
    pub fn problem(&self) -> Result<PowerFlowProblem, PowerFlowError> {
        let mut compact = vec![usize::MAX; self.node_count];
        let mut node_of = Vec::new();
        for n in (0..self.node_count).filter(|&n| self.energized[n]) {
            compact[n] = node_of.len();
            node_of.push(n);
        }
        let branches: Vec<PiBranch> = self
            .branches
            .iter()
            .filter(|b| self.energized[b.from] && self.energized[b.to])
            .map(|b| b.with_nodes(compact[b.from], compact[b.to]))
            .collect();
        let pick = |values: &[f64]| node_of.iter().map(|&n| values[n]).collect::<Vec<_>>();
        let shunts: Vec<Complex64> = node_of.iter().map(|&n| self.node_shunt[n]).collect();
        let ybus = SparseYBus::from_branches(node_of.len(), &branches, &shunts)
            .map_err(|e| PowerFlowError::InvalidModel(e.to_string()))?;
        Ok(PowerFlowProblem {
            kind: node_of.iter().map(|&n| self.kind[n]).collect(),
            p_spec: pick(&self.p_spec),
            q_spec: pick(&self.q_spec),
            vm0: pick(&self.vm_set),
            va0: pick(&self.va_set),
            node_of,
            ybus,
            branches,
            shunts,
        })
    }
}

/// The energized part of a network in compact node numbering.
#[derive(Debug, Clone)]
pub struct PowerFlowProblem {
    /// Compact index -> topology node.
    pub node_of: Vec<usize>,
    pub ybus: SparseYBus,
    pub branches: Vec<PiBranch>,
    pub shunts: Vec<Complex64>,
    pub kind: Vec<BusKind>,
    pub p_spec: Vec<f64>,
    pub q_spec: Vec<f64>,
    /// Initial magnitudes: setpoints on slack and PV nodes, 1.0 elsewhere.
    pub vm0: Vec<f64>,
    pub va0: Vec<f64>,
}

impl PowerFlowProblem {
    pub fn n(&self) -> usize {
        self.node_of.len()
    }

    /// Non-slack nodes (angle unknowns) and PQ nodes (magnitude unknowns).
    pub fn unknowns(&self) -> (Vec<usize>, Vec<usize>) {
        let p_buses = (0..self.n())
            .filter(|&i| self.kind[i] != BusKind::Slack)
            .collect();
        let q_buses = (0..self.n())
            .filter(|&i| self.kind[i] == BusKind::Pq)
            .collect();
        (p_buses, q_buses)
    }
}

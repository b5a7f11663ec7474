//! Result tables -> id-keyed response values.

use super::assembler::AssemblyContext;
use super::registry::IndexRegistry;
use gridsim_core::model::{ResPower, ResultTables};
use gridsim_core::schema::{
    BusResult, ElementResults, GenResult, LineResult, PowerResult, ResBusRow, Trafo3wResult,
    TrafoResult,
};
use gridsim_core::finite;
use std::collections::BTreeMap;

/// Everything the response carries about solved values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedResults {
    pub bus_by_id: BTreeMap<String, BusResult>,
    pub res_bus: Vec<ResBusRow>,
    pub results: ElementResults,
}

/// Gather results for every registered element. Empty unless the model
/// holds a converged solution.
pub fn collect(ctx: &AssemblyContext) -> CollectedResults {
    let net = &ctx.net;
    if !net.converged || net.res.is_empty() {
        return CollectedResults::default();
    }
    let res = &net.res;

    let mut out = CollectedResults::default();
    for (id, idx) in ctx.buses.iter() {
        let Some(row) = res.bus.get(idx) else {
            continue;
        };
        out.bus_by_id.insert(
            id.to_string(),
            BusResult {
                vm_pu: finite(row.vm_pu),
                va_degree: finite(row.va_degree),
                p_mw: finite(row.p_mw),
                q_mvar: finite(row.q_mvar),
            },
        );
        out.res_bus.push(ResBusRow {
            bus_id: id.to_string(),
            index: idx,
            vm_pu: finite(row.vm_pu),
            va_degree: finite(row.va_degree),
            p_mw: finite(row.p_mw),
            q_mvar: finite(row.q_mvar),
        });
    }
    out.res_bus.sort_by_key(|row| row.index);

    let r = &mut out.results;
    r.loads = powers(&ctx.loads, &res.load);
    r.sgens = powers(&ctx.sgens, &res.sgen);
    r.motors = powers(&ctx.motors, &res.motor);
    r.storages = powers(&ctx.storages, &res.storage);
    r.wards = powers(&ctx.wards, &res.ward);
    r.ext_grids = powers(&ctx.ext_grids, &res.ext_grid);
    r.shunts = keyed(&ctx.shunts, &res.shunt, |s| PowerResult {
        p_mw: finite(s.p_mw),
        q_mvar: finite(s.q_mvar),
    });
    r.gens = keyed(&ctx.gens, &res.gen, |g| GenResult {
        p_mw: finite(g.p_mw),
        q_mvar: finite(g.q_mvar),
        vm_pu: finite(g.vm_pu),
    });
    branch_results(ctx, res, r);
    out
}

fn keyed<R, T>(
    registry: &IndexRegistry,
    table: &[R],
    convert: impl Fn(&R) -> T,
) -> BTreeMap<String, T> {
    registry
        .iter()
        .filter_map(|(id, idx)| table.get(idx).map(|row| (id.to_string(), convert(row))))
        .collect()
}

fn powers(registry: &IndexRegistry, table: &[ResPower]) -> BTreeMap<String, PowerResult> {
    keyed(registry, table, |p| PowerResult {
        p_mw: finite(p.p_mw),
        q_mvar: finite(p.q_mvar),
    })
}

fn branch_results(ctx: &AssemblyContext, res: &ResultTables, r: &mut ElementResults) {
    r.lines = keyed(&ctx.lines, &res.line, |l| LineResult {
        p_from_mw: finite(l.p_from_mw),
        q_from_mvar: finite(l.q_from_mvar),
        p_to_mw: finite(l.p_to_mw),
        q_to_mvar: finite(l.q_to_mvar),
        i_from_ka: finite(l.i_from_ka),
        i_to_ka: finite(l.i_to_ka),
        loading_percent: finite(l.loading_percent),
    });
    r.trafos = keyed(&ctx.trafos, &res.trafo, |t| TrafoResult {
        p_hv_mw: finite(t.p_hv_mw),
        q_hv_mvar: finite(t.q_hv_mvar),
        p_lv_mw: finite(t.p_lv_mw),
        q_lv_mvar: finite(t.q_lv_mvar),
        i_hv_ka: finite(t.i_hv_ka),
        i_lv_ka: finite(t.i_lv_ka),
        loading_percent: finite(t.loading_percent),
    });
    r.trafo3ws = keyed(&ctx.trafo3ws, &res.trafo3w, |t| Trafo3wResult {
        p_hv_mw: finite(t.p_hv_mw),
        q_hv_mvar: finite(t.q_hv_mvar),
        p_mv_mw: finite(t.p_mv_mw),
        q_mv_mvar: finite(t.q_mv_mvar),
        p_lv_mw: finite(t.p_lv_mw),
        q_lv_mvar: finite(t.q_lv_mvar),
        i_hv_ka: finite(t.i_hv_ka),
        i_mv_ka: finite(t.i_mv_ka),
        i_lv_ka: finite(t.i_lv_ka),
        loading_percent: finite(t.loading_percent),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::model::{BusRow, ResBus};

    fn two_buses() -> AssemblyContext {
        let mut ctx = AssemblyContext::new(1.0, 50.0);
        for id in ["second", "first"] {
            let idx = ctx.net.create_bus(BusRow::new(id, 0.4)).unwrap();
            ctx.buses.insert(id, idx);
        }
        ctx
    }

    #[test]
    fn nothing_is_emitted_without_convergence() {
        let mut ctx = two_buses();
        ctx.net.res.bus = vec![ResBus::NAN, ResBus::NAN];
        assert_eq!(collect(&ctx), CollectedResults::default());
    }

    #[test]
    fn non_finite_values_become_none() {
        let mut ctx = two_buses();
        ctx.net.converged = true;
        ctx.net.res.bus = vec![
            ResBus {
                vm_pu: 1.01,
                va_degree: -0.5,
                p_mw: 0.1,
                q_mvar: 0.02,
            },
            ResBus::NAN,
        ];
        ctx.loads.insert("ld", 0);
        ctx.net.res.load = vec![ResPower {
            p_mw: 0.1,
            q_mvar: f64::INFINITY,
        }];

        let out = collect(&ctx);
        assert_eq!(out.bus_by_id["second"].vm_pu, Some(1.01));
        assert_eq!(out.bus_by_id["first"], BusResult::default());
        assert_eq!(out.res_bus[0].bus_id, "second");
        assert_eq!(out.res_bus[1].index, 1);
        assert_eq!(out.results.loads["ld"].p_mw, Some(0.1));
        assert_eq!(out.results.loads["ld"].q_mvar, None);
        assert!(out.results.lines.is_empty());
    }
}

//! Solved result tables, indexed like their element tables.
//!
//! Loads, motors, shunts, storages and wards report in load convention
//! (positive = consumption); gens, sgens and external grids in generation
//! convention. De-energized elements carry NaN.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResBus {
    pub vm_pu: f64,
    pub va_degree: f64,
    pub p_mw: f64,
    pub q_mvar: f64,
}

impl ResBus {
    pub const NAN: ResBus = ResBus {
        vm_pu: f64::NAN,
        va_degree: f64::NAN,
        p_mw: f64::NAN,
        q_mvar: f64::NAN,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResLine {
    pub p_from_mw: f64,
    pub q_from_mvar: f64,
    pub p_to_mw: f64,
    pub q_to_mvar: f64,
    pub pl_mw: f64,
    pub ql_mvar: f64,
    pub i_from_ka: f64,
    pub i_to_ka: f64,
    pub i_ka: f64,
    pub vm_from_pu: f64,
    pub va_from_degree: f64,
    pub vm_to_pu: f64,
    pub va_to_degree: f64,
    pub loading_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResTrafo {
    pub p_hv_mw: f64,
    pub q_hv_mvar: f64,
    pub p_lv_mw: f64,
    pub q_lv_mvar: f64,
    pub pl_mw: f64,
    pub ql_mvar: f64,
    pub i_hv_ka: f64,
    pub i_lv_ka: f64,
    pub vm_hv_pu: f64,
    pub va_hv_degree: f64,
    pub vm_lv_pu: f64,
    pub va_lv_degree: f64,
    pub loading_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResTrafo3w {
    pub p_hv_mw: f64,
    pub q_hv_mvar: f64,
    pub p_mv_mw: f64,
    pub q_mv_mvar: f64,
    pub p_lv_mw: f64,
    pub q_lv_mvar: f64,
    pub pl_mw: f64,
    pub ql_mvar: f64,
    pub i_hv_ka: f64,
    pub i_mv_ka: f64,
    pub i_lv_ka: f64,
    pub vm_hv_pu: f64,
    pub vm_mv_pu: f64,
    pub vm_lv_pu: f64,
    pub loading_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResGen {
    pub p_mw: f64,
    pub q_mvar: f64,
    pub va_degree: f64,
    pub vm_pu: f64,
}

/// Injection result shared by single-bus elements without extra columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResPower {
    pub p_mw: f64,
    pub q_mvar: f64,
}

impl ResPower {
    pub const NAN: ResPower = ResPower {
        p_mw: f64::NAN,
        q_mvar: f64::NAN,
    };

    pub const ZERO: ResPower = ResPower {
        p_mw: 0.0,
        q_mvar: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResShunt {
    pub p_mw: f64,
    pub q_mvar: f64,
    pub vm_pu: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTables {
    pub bus: Vec<ResBus>,
    pub line: Vec<ResLine>,
    pub trafo: Vec<ResTrafo>,
    pub trafo3w: Vec<ResTrafo3w>,
    pub ext_grid: Vec<ResPower>,
    pub load: Vec<ResPower>,
    pub gen: Vec<ResGen>,
    pub sgen: Vec<ResPower>,
    pub motor: Vec<ResPower>,
    pub shunt: Vec<ResShunt>,
    pub storage: Vec<ResPower>,
    pub ward: Vec<ResPower>,
}

impl ResultTables {
    pub fn is_empty(&self) -> bool {
        self.bus.is_empty()
    }
}

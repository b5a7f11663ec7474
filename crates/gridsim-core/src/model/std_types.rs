//! Standard-type library.
//!
//! Named electrical parameter sets for cables, overhead lines and
//! transformers, so a diagram can say `"std_type": "NAYY 4x50 SE"` instead of
//! spelling out impedances. Values follow the common European catalogue
//! types (NAYY / NA2XS2Y cables, AL/ST overhead conductors, 20/0.4 kV
//! distribution and 110/20 kV substation transformers).

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

/// Line construction: cable or overhead line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineConstruction {
    Cs,
    Ol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineType {
    pub c_nf_per_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub max_i_ka: f64,
    #[serde(rename = "type")]
    pub construction: LineConstruction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafoType {
    pub sn_mva: f64,
    pub vn_hv_kv: f64,
    pub vn_lv_kv: f64,
    pub vk_percent: f64,
    pub vkr_percent: f64,
    pub pfe_kw: f64,
    pub i0_percent: f64,
    pub shift_degree: f64,
    pub tap_neutral: i32,
    pub tap_min: i32,
    pub tap_max: i32,
    pub tap_step_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trafo3wType {
    pub sn_hv_mva: f64,
    pub sn_mv_mva: f64,
    pub sn_lv_mva: f64,
    pub vn_hv_kv: f64,
    pub vn_mv_kv: f64,
    pub vn_lv_kv: f64,
    pub vk_hv_percent: f64,
    pub vk_mv_percent: f64,
    pub vk_lv_percent: f64,
    pub vkr_hv_percent: f64,
    pub vkr_mv_percent: f64,
    pub vkr_lv_percent: f64,
    pub pfe_kw: f64,
    pub i0_percent: f64,
}

const fn cable(c: f64, r: f64, x: f64, max_i: f64) -> LineType {
    LineType {
        c_nf_per_km: c,
        r_ohm_per_km: r,
        x_ohm_per_km: x,
        max_i_ka: max_i,
        construction: LineConstruction::Cs,
    }
}

const fn overhead(c: f64, r: f64, x: f64, max_i: f64) -> LineType {
    LineType {
        c_nf_per_km: c,
        r_ohm_per_km: r,
        x_ohm_per_km: x,
        max_i_ka: max_i,
        construction: LineConstruction::Ol,
    }
}

#[allow(clippy::too_many_arguments)]
const fn trafo(
    sn_mva: f64,
    vn_hv_kv: f64,
    vn_lv_kv: f64,
    vk_percent: f64,
    vkr_percent: f64,
    pfe_kw: f64,
    i0_percent: f64,
    shift_degree: f64,
    tap_range: i32,
    tap_step_percent: f64,
) -> TrafoType {
    TrafoType {
        sn_mva,
        vn_hv_kv,
        vn_lv_kv,
        vk_percent,
        vkr_percent,
        pfe_kw,
        i0_percent,
        shift_degree,
        tap_neutral: 0,
        tap_min: -tap_range,
        tap_max: tap_range,
        tap_step_percent,
    }
}

pub static LINE_TYPES: Lazy<BTreeMap<&'static str, LineType>> = Lazy::new(|| {
    BTreeMap::from([
        ("NAYY 4x50 SE", cable(210.0, 0.642, 0.083, 0.142)),
        ("NAYY 4x120 SE", cable(264.0, 0.225, 0.08, 0.242)),
        ("NAYY 4x150 SE", cable(261.0, 0.208, 0.08, 0.27)),
        ("NA2XS2Y 1x95 RM/25 12/20 kV", cable(216.0, 0.313, 0.132, 0.252)),
        ("NA2XS2Y 1x185 RM/25 12/20 kV", cable(273.0, 0.161, 0.117, 0.362)),
        ("NA2XS2Y 1x240 RM/25 12/20 kV", cable(304.0, 0.122, 0.112, 0.421)),
        ("48-AL1/8-ST1A 10.0", overhead(10.1, 0.5939, 0.35, 0.21)),
        ("94-AL1/15-ST1A 20.0", overhead(10.0, 0.306, 0.38, 0.35)),
        ("149-AL1/24-ST1A 110.0", overhead(8.75, 0.194, 0.41, 0.47)),
        ("243-AL1/39-ST1A 110.0", overhead(9.0, 0.1188, 0.39, 0.645)),
        ("490-AL1/64-ST1A 220.0", overhead(10.0, 0.059, 0.285, 0.96)),
        ("490-AL1/64-ST1A 380.0", overhead(11.0, 0.059, 0.253, 0.96)),
    ])
});

pub static TRAFO_TYPES: Lazy<BTreeMap<&'static str, TrafoType>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "0.25 MVA 20/0.4 kV",
            trafo(0.25, 20.0, 0.4, 6.0, 1.44, 0.8, 0.32, 150.0, 2, 2.5),
        ),
        (
            "0.4 MVA 20/0.4 kV",
            trafo(0.4, 20.0, 0.4, 6.0, 1.425, 1.35, 0.3375, 150.0, 2, 2.5),
        ),
        (
            "0.63 MVA 20/0.4 kV",
            trafo(0.63, 20.0, 0.4, 6.0, 1.206, 1.65, 0.2619, 150.0, 2, 2.5),
        ),
        (
            "25 MVA 110/20 kV",
            trafo(25.0, 110.0, 20.0, 12.0, 0.41, 14.0, 0.07, 150.0, 9, 1.5),
        ),
        (
            "40 MVA 110/20 kV",
            trafo(40.0, 110.0, 20.0, 16.2, 0.34, 18.0, 0.05, 150.0, 9, 1.5),
        ),
        (
            "63 MVA 110/20 kV",
            trafo(63.0, 110.0, 20.0, 18.0, 0.32, 22.0, 0.04, 150.0, 9, 1.5),
        ),
        (
            "100 MVA 220/110 kV",
            trafo(100.0, 220.0, 110.0, 12.0, 0.26, 55.0, 0.06, 0.0, 9, 1.5),
        ),
        (
            "160 MVA 380/110 kV",
            trafo(160.0, 380.0, 110.0, 12.2, 0.25, 60.0, 0.06, 0.0, 9, 1.5),
        ),
    ])
});

pub static TRAFO3W_TYPES: Lazy<BTreeMap<&'static str, Trafo3wType>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "63/25/38 MVA 110/20/10 kV",
            Trafo3wType {
                sn_hv_mva: 63.0,
                sn_mv_mva: 25.0,
                sn_lv_mva: 38.0,
                vn_hv_kv: 110.0,
                vn_mv_kv: 20.0,
                vn_lv_kv: 10.0,
                vk_hv_percent: 10.4,
                vk_mv_percent: 10.4,
                vk_lv_percent: 10.4,
                vkr_hv_percent: 0.28,
                vkr_mv_percent: 0.32,
                vkr_lv_percent: 0.35,
                pfe_kw: 35.0,
                i0_percent: 0.89,
            },
        ),
        (
            "63/25/38 MVA 110/10/10 kV",
            Trafo3wType {
                sn_hv_mva: 63.0,
                sn_mv_mva: 25.0,
                sn_lv_mva: 38.0,
                vn_hv_kv: 110.0,
                vn_mv_kv: 10.0,
                vn_lv_kv: 10.0,
                vk_hv_percent: 10.4,
                vk_mv_percent: 10.4,
                vk_lv_percent: 10.4,
                vkr_hv_percent: 0.28,
                vkr_mv_percent: 0.32,
                vkr_lv_percent: 0.35,
                pfe_kw: 35.0,
                i0_percent: 0.89,
            },
        ),
    ])
});

pub fn line_type(name: &str) -> Option<&'static LineType> {
    LINE_TYPES.get(name.trim())
}

pub fn trafo_type(name: &str) -> Option<&'static TrafoType> {
    TRAFO_TYPES.get(name.trim())
}

pub fn trafo3w_type(name: &str) -> Option<&'static Trafo3wType> {
    TRAFO3W_TYPES.get(name.trim())
}

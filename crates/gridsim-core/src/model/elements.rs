//! Element tables of the electrical model.
//!
//! Rows are stored by internal index; the graph ids they came from live in
//! the assembler's registries, not here.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusRow {
    pub name: String,
    pub vn_kv: f64,
    pub min_vm_pu: Option<f64>,
    pub max_vm_pu: Option<f64>,
    pub in_service: bool,
    pub zone: Option<String>,
    #[serde(rename = "type")]
    pub bus_type: String,
}

impl BusRow {
    pub fn new(name: impl Into<String>, vn_kv: f64) -> Self {
        Self {
            name: name.into(),
            vn_kv,
            min_vm_pu: None,
            max_vm_pu: None,
            in_service: true,
            zone: None,
            bus_type: "b".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRow {
    pub name: String,
    pub from_bus: usize,
    pub to_bus: usize,
    pub std_type: Option<String>,
    pub length_km: f64,
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub max_i_ka: f64,
    pub parallel: u32,
    pub df: f64,
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafoRow {
    pub name: String,
    pub hv_bus: usize,
    pub lv_bus: usize,
    pub std_type: String,
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
    pub tap_pos: i32,
    pub parallel: u32,
    pub in_service: bool,
}

impl TrafoRow {
    /// HV-side voltage ratio correction of the current tap position.
    pub fn tap_ratio(&self) -> f64 {
        1.0 + f64::from(self.tap_pos - self.tap_neutral) * self.tap_step_percent / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trafo3wRow {
    pub name: String,
    pub hv_bus: usize,
    pub mv_bus: usize,
    pub lv_bus: usize,
    pub std_type: String,
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
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtGridRow {
    pub name: String,
    pub bus: usize,
    pub vm_pu: f64,
    pub va_degree: f64,
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadRow {
    pub name: String,
    pub bus: usize,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub scaling: f64,
    pub in_service: bool,
    pub controllable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenRow {
    pub name: String,
    pub bus: usize,
    pub p_mw: f64,
    pub vm_pu: f64,
    pub min_q_mvar: Option<f64>,
    pub max_q_mvar: Option<f64>,
    pub in_service: bool,
    pub controllable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SgenRow {
    pub name: String,
    pub bus: usize,
    pub p_mw: f64,
    pub q_mvar: f64,
    pub scaling: f64,
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotorRow {
    pub name: String,
    pub bus: usize,
    pub pn_mech_mw: f64,
    pub cos_phi: f64,
    /// Fraction, 0 < efficiency <= 1.
    pub efficiency: f64,
    pub loading_percent: f64,
    pub scaling: f64,
    pub in_service: bool,
}

impl MotorRow {
    /// Electrical demand (MW, MVAr) drawn at the terminals.
    pub fn demand(&self) -> (f64, f64) {
        let p = self.pn_mech_mw / self.efficiency * self.loading_percent / 100.0 * self.scaling;
        let q = p * self.cos_phi.acos().tan();
        (p, q)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShuntRow {
    pub name: String,
    pub bus: usize,
    /// Consumption at rated voltage for one step.
    pub p_mw: f64,
    pub q_mvar: f64,
    pub vn_kv: f64,
    pub step: u32,
    pub max_step: u32,
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageRow {
    pub name: String,
    pub bus: usize,
    /// Positive while charging.
    pub p_mw: f64,
    pub q_mvar: f64,
    pub max_e_mwh: Option<f64>,
    pub min_e_mwh: Option<f64>,
    pub max_p_mw: Option<f64>,
    pub min_p_mw: Option<f64>,
    pub soc_percent: Option<f64>,
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WardRow {
    pub name: String,
    pub bus: usize,
    pub pz_mw: f64,
    pub qz_mvar: f64,
    pub ps_mw: f64,
    pub qs_mvar: f64,
    pub in_service: bool,
}

/// What a switch connects its bus to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwitchElement {
    #[serde(rename = "b")]
    Bus,
    #[serde(rename = "l")]
    Line,
    #[serde(rename = "t")]
    Trafo,
}

impl SwitchElement {
    pub fn parse(element_type: &str) -> Option<Self> {
        match element_type {
            "bus" => Some(SwitchElement::Bus),
            "line" => Some(SwitchElement::Line),
            "trafo" => Some(SwitchElement::Trafo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchElement::Bus => "bus",
            SwitchElement::Line => "line",
            SwitchElement::Trafo => "trafo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchRow {
    pub name: String,
    pub bus: usize,
    pub element: usize,
    pub et: SwitchElement,
    pub closed: bool,
    #[serde(rename = "type")]
    pub switch_type: Option<String>,
    pub z_ohm: f64,
    pub in_service: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_demand_uses_efficiency_and_power_factor() {
        let motor = MotorRow {
            name: "m".into(),
            bus: 0,
            pn_mech_mw: 0.9,
            cos_phi: 0.8,
            efficiency: 0.9,
            loading_percent: 100.0,
            scaling: 1.0,
            in_service: true,
        };
        let (p, q) = motor.demand();
        assert!((p - 1.0).abs() < 1e-12);
        assert!((q - 0.75).abs() < 1e-12);
    }

    #[test]
    fn switch_element_names() {
        assert_eq!(SwitchElement::parse("trafo"), Some(SwitchElement::Trafo));
        assert_eq!(SwitchElement::parse("transformer"), None);
        assert_eq!(
            serde_json::to_value(SwitchElement::Line).unwrap(),
            serde_json::json!("l")
        );
    }
}

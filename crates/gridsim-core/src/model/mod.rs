//! Electrical network model.
//!
//! [`PowerNet`] holds one table per element category plus the solved result
//! tables. Rows are addressed by their position (the internal index). Every
//! `create_*` routine validates its own inputs and returns the new index or a
//! [`ModelError`]; a failed creation leaves the tables untouched.

pub mod elements;
pub mod export;
pub mod results;
pub mod std_types;

pub use elements::*;
pub use results::*;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Expected failures of a single element creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("bus index {0} does not exist")]
    UnknownBus(usize),

    #[error("unknown {kind} standard type '{name}'")]
    UnknownStdType { kind: &'static str, name: String },

    #[error("{field} must be > 0")]
    NonPositive { field: &'static str },

    #[error("an element cannot connect bus {0} to itself")]
    SameBus(usize),

    #[error(
        "voltage level mismatch: {from_kv} kV vs {to_kv} kV, use a transformer between different voltage levels"
    )]
    VoltageMismatch { from_kv: f64, to_kv: f64 },

    #[error("Missing line parameters: {}", .0.join(", "))]
    MissingLineParameters(Vec<&'static str>),

    #[error("switch target {element_type} {index} does not exist")]
    InvalidSwitchTarget {
        element_type: &'static str,
        index: usize,
    },

    #[error("{element_type} {index} is not connected to bus {bus}")]
    SwitchNotAtElement {
        element_type: &'static str,
        index: usize,
        bus: usize,
    },

    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

/// Largest nominal-voltage difference (kV) tolerated across a line.
pub const LINE_VOLTAGE_TOLERANCE_KV: f64 = 1.0;

/// Options shared by both line creation styles.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    pub name: String,
    pub parallel: u32,
    pub df: f64,
    pub in_service: bool,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            name: "Line".to_string(),
            parallel: 1,
            df: 1.0,
            in_service: true,
        }
    }
}

/// Explicit per-km electrical parameters of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParameters {
    pub r_ohm_per_km: f64,
    pub x_ohm_per_km: f64,
    pub c_nf_per_km: f64,
    pub max_i_ka: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafoOptions {
    pub name: String,
    pub tap_pos: Option<i32>,
    pub parallel: u32,
    pub in_service: bool,
}

impl Default for TrafoOptions {
    fn default() -> Self {
        Self {
            name: "Trafo".to_string(),
            tap_pos: None,
            parallel: 1,
            in_service: true,
        }
    }
}

/// An electrical network: element tables, system base and solved results.
#[derive(Debug, Clone, Serialize)]
pub struct PowerNet {
    pub sn_mva: f64,
    pub f_hz: f64,
    pub bus: Vec<BusRow>,
    pub line: Vec<LineRow>,
    pub trafo: Vec<TrafoRow>,
    pub trafo3w: Vec<Trafo3wRow>,
    pub ext_grid: Vec<ExtGridRow>,
    pub load: Vec<LoadRow>,
    pub gen: Vec<GenRow>,
    pub sgen: Vec<SgenRow>,
    pub motor: Vec<MotorRow>,
    pub shunt: Vec<ShuntRow>,
    pub storage: Vec<StorageRow>,
    pub ward: Vec<WardRow>,
    pub switch: Vec<SwitchRow>,
    #[serde(skip)]
    pub res: ResultTables,
    pub converged: bool,
}

impl Default for PowerNet {
    fn default() -> Self {
        Self::new(1.0, 50.0)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::NonPositive { field })
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidParameter {
        field,
        reason: reason.into(),
    }
}

impl PowerNet {
    pub fn new(sn_mva: f64, f_hz: f64) -> Self {
        Self {
            sn_mva,
            f_hz,
            bus: Vec::new(),
            line: Vec::new(),
            trafo: Vec::new(),
            trafo3w: Vec::new(),
            ext_grid: Vec::new(),
            load: Vec::new(),
            gen: Vec::new(),
            sgen: Vec::new(),
            motor: Vec::new(),
            shunt: Vec::new(),
            storage: Vec::new(),
            ward: Vec::new(),
            switch: Vec::new(),
            res: ResultTables::default(),
            converged: false,
        }
    }

    fn check_bus(&self, bus: usize) -> Result<&BusRow, ModelError> {
        self.bus.get(bus).ok_or(ModelError::UnknownBus(bus))
    }

    pub fn create_bus(&mut self, row: BusRow) -> Result<usize, ModelError> {
        positive("vn_kv", row.vn_kv)?;
        if let (Some(lo), Some(hi)) = (row.min_vm_pu, row.max_vm_pu) {
            if lo > hi {
                return Err(invalid(
                    "min_vm_pu",
                    format!("{lo} is above max_vm_pu {hi}"),
                ));
            }
        }
        self.bus.push(row);
        Ok(self.bus.len() - 1)
    }

    fn check_line_ends(&self, from: usize, to: usize, length_km: f64, opts: &LineOptions) -> Result<(), ModelError> {
        let from_kv = self.check_bus(from)?.vn_kv;
        let to_kv = self.check_bus(to)?.vn_kv;
        if from == to {
            return Err(ModelError::SameBus(from));
        }
        positive("length_km", length_km)?;
        if opts.parallel == 0 {
            return Err(ModelError::NonPositive { field: "parallel" });
        }
        if !(opts.df > 0.0 && opts.df <= 1.0) {
            return Err(invalid("df", format!("{} is outside (0, 1]", opts.df)));
        }
        if (from_kv - to_kv).abs() > LINE_VOLTAGE_TOLERANCE_KV {
            return Err(ModelError::VoltageMismatch { from_kv, to_kv });
        }
        Ok(())
    }

    /// Line with parameters taken from the standard-type library.
    pub fn create_line(
        &mut self,
        from_bus: usize,
        to_bus: usize,
        length_km: f64,
        std_type: &str,
        opts: LineOptions,
    ) -> Result<usize, ModelError> {
        let lt = std_types::line_type(std_type).ok_or_else(|| ModelError::UnknownStdType {
            kind: "line",
            name: std_type.to_string(),
        })?;
        self.check_line_ends(from_bus, to_bus, length_km, &opts)?;
        self.line.push(LineRow {
            name: opts.name,
            from_bus,
            to_bus,
            std_type: Some(std_type.trim().to_string()),
            length_km,
            r_ohm_per_km: lt.r_ohm_per_km,
            x_ohm_per_km: lt.x_ohm_per_km,
            c_nf_per_km: lt.c_nf_per_km,
            max_i_ka: lt.max_i_ka,
            parallel: opts.parallel,
            df: opts.df,
            in_service: opts.in_service,
        });
        Ok(self.line.len() - 1)
    }

    pub fn create_line_from_parameters(
        &mut self,
        from_bus: usize,
        to_bus: usize,
        length_km: f64,
        params: LineParameters,
        opts: LineOptions,
    ) -> Result<usize, ModelError> {
        self.check_line_ends(from_bus, to_bus, length_km, &opts)?;
        if params.r_ohm_per_km < 0.0 || params.x_ohm_per_km < 0.0 || params.c_nf_per_km < 0.0 {
            return Err(invalid("r/x/c", "line parameters must not be negative"));
        }
        if params.r_ohm_per_km == 0.0 && params.x_ohm_per_km == 0.0 {
            return Err(invalid("r/x", "line impedance must not be zero"));
        }
        positive("max_i_ka", params.max_i_ka)?;
        self.line.push(LineRow {
            name: opts.name,
            from_bus,
            to_bus,
            std_type: None,
            length_km,
            r_ohm_per_km: params.r_ohm_per_km,
            x_ohm_per_km: params.x_ohm_per_km,
            c_nf_per_km: params.c_nf_per_km,
            max_i_ka: params.max_i_ka,
            parallel: opts.parallel,
            df: opts.df,
            in_service: opts.in_service,
        });
        Ok(self.line.len() - 1)
    }

    pub fn create_transformer(
        &mut self,
        hv_bus: usize,
        lv_bus: usize,
        std_type: &str,
        opts: TrafoOptions,
    ) -> Result<usize, ModelError> {
        let tt = std_types::trafo_type(std_type).ok_or_else(|| ModelError::UnknownStdType {
            kind: "trafo",
            name: std_type.to_string(),
        })?;
        self.check_bus(hv_bus)?;
        self.check_bus(lv_bus)?;
        if hv_bus == lv_bus {
            return Err(ModelError::SameBus(hv_bus));
        }
        if opts.parallel == 0 {
            return Err(ModelError::NonPositive { field: "parallel" });
        }
        let tap_pos = opts.tap_pos.unwrap_or(tt.tap_neutral);
        if tap_pos < tt.tap_min || tap_pos > tt.tap_max {
            return Err(invalid(
                "tap_pos",
                format!("{tap_pos} is outside [{}, {}]", tt.tap_min, tt.tap_max),
            ));
        }
        self.trafo.push(TrafoRow {
            name: opts.name,
            hv_bus,
            lv_bus,
            std_type: std_type.trim().to_string(),
            sn_mva: tt.sn_mva,
            vn_hv_kv: tt.vn_hv_kv,
            vn_lv_kv: tt.vn_lv_kv,
            vk_percent: tt.vk_percent,
            vkr_percent: tt.vkr_percent,
            pfe_kw: tt.pfe_kw,
            i0_percent: tt.i0_percent,
            shift_degree: tt.shift_degree,
            tap_neutral: tt.tap_neutral,
            tap_min: tt.tap_min,
            tap_max: tt.tap_max,
            tap_step_percent: tt.tap_step_percent,
            tap_pos,
            parallel: opts.parallel,
            in_service: opts.in_service,
        });
        Ok(self.trafo.len() - 1)
    }

    pub fn create_transformer3w(
        &mut self,
        hv_bus: usize,
        mv_bus: usize,
        lv_bus: usize,
        std_type: &str,
        name: String,
        in_service: bool,
    ) -> Result<usize, ModelError> {
        let tt = std_types::trafo3w_type(std_type).ok_or_else(|| ModelError::UnknownStdType {
            kind: "trafo3w",
            name: std_type.to_string(),
        })?;
        for bus in [hv_bus, mv_bus, lv_bus] {
            self.check_bus(bus)?;
        }
        if hv_bus == mv_bus || hv_bus == lv_bus {
            return Err(ModelError::SameBus(hv_bus));
        }
        if mv_bus == lv_bus {
            return Err(ModelError::SameBus(mv_bus));
        }
        self.trafo3w.push(Trafo3wRow {
            name,
            hv_bus,
            mv_bus,
            lv_bus,
            std_type: std_type.trim().to_string(),
            sn_hv_mva: tt.sn_hv_mva,
            sn_mv_mva: tt.sn_mv_mva,
            sn_lv_mva: tt.sn_lv_mva,
            vn_hv_kv: tt.vn_hv_kv,
            vn_mv_kv: tt.vn_mv_kv,
            vn_lv_kv: tt.vn_lv_kv,
            vk_hv_percent: tt.vk_hv_percent,
            vk_mv_percent: tt.vk_mv_percent,
            vk_lv_percent: tt.vk_lv_percent,
            vkr_hv_percent: tt.vkr_hv_percent,
            vkr_mv_percent: tt.vkr_mv_percent,
            vkr_lv_percent: tt.vkr_lv_percent,
            pfe_kw: tt.pfe_kw,
            i0_percent: tt.i0_percent,
            in_service,
        });
        Ok(self.trafo3w.len() - 1)
    }

    pub fn create_ext_grid(&mut self, row: ExtGridRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        positive("vm_pu", row.vm_pu)?;
        self.ext_grid.push(row);
        Ok(self.ext_grid.len() - 1)
    }

    pub fn create_load(&mut self, row: LoadRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        if row.scaling < 0.0 {
            return Err(invalid("scaling", "must not be negative"));
        }
        self.load.push(row);
        Ok(self.load.len() - 1)
    }

    pub fn create_gen(&mut self, row: GenRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        positive("vm_pu", row.vm_pu)?;
        if let (Some(lo), Some(hi)) = (row.min_q_mvar, row.max_q_mvar) {
            if lo > hi {
                return Err(invalid(
                    "min_q_mvar",
                    format!("{lo} is above max_q_mvar {hi}"),
                ));
            }
        }
        self.gen.push(row);
        Ok(self.gen.len() - 1)
    }

    pub fn create_sgen(&mut self, row: SgenRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        if row.scaling < 0.0 {
            return Err(invalid("scaling", "must not be negative"));
        }
        self.sgen.push(row);
        Ok(self.sgen.len() - 1)
    }

    pub fn create_motor(&mut self, row: MotorRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        if !(row.efficiency > 0.0 && row.efficiency <= 1.0) {
            return Err(invalid(
                "efficiency",
                format!("{} is outside (0, 1]", row.efficiency),
            ));
        }
        if !(row.cos_phi > 0.0 && row.cos_phi <= 1.0) {
            return Err(invalid("cos_phi", format!("{} is outside (0, 1]", row.cos_phi)));
        }
        if row.loading_percent < 0.0 {
            return Err(invalid("loading_percent", "must not be negative"));
        }
        self.motor.push(row);
        Ok(self.motor.len() - 1)
    }

    pub fn create_shunt(&mut self, row: ShuntRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        positive("vn_kv", row.vn_kv)?;
        if row.step > row.max_step {
            return Err(invalid(
                "step",
                format!("{} exceeds max_step {}", row.step, row.max_step),
            ));
        }
        self.shunt.push(row);
        Ok(self.shunt.len() - 1)
    }

    pub fn create_storage(&mut self, row: StorageRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        if let Some(soc) = row.soc_percent {
            if !(0.0..=100.0).contains(&soc) {
                return Err(invalid("soc_percent", format!("{soc} is outside [0, 100]")));
            }
        }
        self.storage.push(row);
        Ok(self.storage.len() - 1)
    }

    pub fn create_ward(&mut self, row: WardRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        self.ward.push(row);
        Ok(self.ward.len() - 1)
    }

    pub fn create_switch(&mut self, row: SwitchRow) -> Result<usize, ModelError> {
        self.check_bus(row.bus)?;
        let target_err = || ModelError::InvalidSwitchTarget {
            element_type: row.et.as_str(),
            index: row.element,
        };
        let at_element = match row.et {
            SwitchElement::Bus => {
                self.check_bus(row.element).map_err(|_| target_err())?;
                true
            }
            SwitchElement::Line => {
                let line = self.line.get(row.element).ok_or_else(target_err)?;
                line.from_bus == row.bus || line.to_bus == row.bus
            }
            SwitchElement::Trafo => {
                let trafo = self.trafo.get(row.element).ok_or_else(target_err)?;
                trafo.hv_bus == row.bus || trafo.lv_bus == row.bus
            }
        };
        if !at_element {
            return Err(ModelError::SwitchNotAtElement {
                element_type: row.et.as_str(),
                index: row.element,
                bus: row.bus,
            });
        }
        if row.z_ohm < 0.0 {
            return Err(invalid("z_ohm", "must not be negative"));
        }
        self.switch.push(row);
        Ok(self.switch.len() - 1)
    }

    /// Row count per table, keyed by table name.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("bus", self.bus.len()),
            ("line", self.line.len()),
            ("trafo", self.trafo.len()),
            ("trafo3w", self.trafo3w.len()),
            ("ext_grid", self.ext_grid.len()),
            ("load", self.load.len()),
            ("gen", self.gen.len()),
            ("sgen", self.sgen.len()),
            ("motor", self.motor.len()),
            ("shunt", self.shunt.len()),
            ("storage", self.storage.len()),
            ("ward", self.ward.len()),
            ("switch", self.switch.len()),
        ])
    }

    pub fn clear_results(&mut self) {
        self.res = ResultTables::default();
        self.converged = false;
    }
}

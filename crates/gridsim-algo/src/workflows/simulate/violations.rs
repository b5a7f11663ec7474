//! Operating-limit checks on a solved network.
//!
//! Three families are checked: bus voltage magnitude against the bus's own
//! `min_vm_pu`/`max_vm_pu` (falling back to [`ViolationLimits`]), thermal
//! loading of lines and transformers, and generator reactive output against
//! `min_q_mvar`/`max_q_mvar` when those are given. Each violation becomes a
//! warning and downgrades the element's creation status.

use super::assembler::AssemblyContext;
use gridsim_core::{CreationStatus, Diagnostics};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationLimits {
    pub min_vm_pu: f64,
    pub max_vm_pu: f64,
    pub max_loading_percent: f64,
}

impl Default for ViolationLimits {
    fn default() -> Self {
        Self {
            min_vm_pu: 0.95,
            max_vm_pu: 1.05,
            max_loading_percent: 100.0,
        }
    }
}

impl ViolationLimits {
    pub fn with_voltage_band(mut self, min_vm_pu: f64, max_vm_pu: f64) -> Self {
        self.min_vm_pu = min_vm_pu;
        self.max_vm_pu = max_vm_pu;
        self
    }

    pub fn with_max_loading_percent(mut self, max_loading_percent: f64) -> Self {
        self.max_loading_percent = max_loading_percent;
        self
    }
}

/// A single limit breach on one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub element_id: String,
    /// `voltage`, `loading` or `reactive`.
    pub category: &'static str,
    pub message: String,
}

/// Check every solved element and record what is out of bounds.
/// Returns the number of violations found.
pub fn detect(
    ctx: &mut AssemblyContext,
    limits: &ViolationLimits,
    diagnostics: &mut Diagnostics,
) -> usize {
    if !ctx.net.converged {
        return 0;
    }
    let found = find_violations(ctx, limits);
    for v in &found {
        warn!(element = %v.element_id, category = v.category, "{}", v.message);
        diagnostics.add_warning_with_entity(v.category, &v.message, &v.element_id);
        downgrade(&mut ctx.status, &v.element_id, &v.message);
    }
    found.len()
}

pub fn find_violations(ctx: &AssemblyContext, limits: &ViolationLimits) -> Vec<Violation> {
    let net = &ctx.net;
    let res = &net.res;
    let mut out = Vec::new();
    let mut push = |id: &str, category: &'static str, message: String| {
        out.push(Violation {
            element_id: id.to_string(),
            category,
            message,
        })
    };

    for (id, idx) in ctx.buses.iter() {
        let (Some(bus), Some(r)) = (net.bus.get(idx), res.bus.get(idx)) else {
            continue;
        };
        let min = bus.min_vm_pu.unwrap_or(limits.min_vm_pu);
        let max = bus.max_vm_pu.unwrap_or(limits.max_vm_pu);
        if r.vm_pu < min {
            push(id, "voltage", format!("vm_pu {:.4} below min_vm_pu {min}", r.vm_pu));
        } else if r.vm_pu > max {
            push(id, "voltage", format!("vm_pu {:.4} above max_vm_pu {max}", r.vm_pu));
        }
    }

    let max_loading = limits.max_loading_percent;
    let loadings = [
        (&ctx.lines, res.line.iter().map(|r| r.loading_percent).collect::<Vec<_>>()),
        (&ctx.trafos, res.trafo.iter().map(|r| r.loading_percent).collect()),
        (&ctx.trafo3ws, res.trafo3w.iter().map(|r| r.loading_percent).collect()),
    ];
    for (registry, loading) in loadings {
        for (id, idx) in registry.iter() {
            if let Some(&pct) = loading.get(idx) {
                if pct > max_loading {
                    push(
                        id,
                        "loading",
                        format!("loading_percent {pct:.1} exceeds {max_loading}"),
                    );
                }
            }
        }
    }

    for (id, idx) in ctx.gens.iter() {
        let (Some(gen), Some(r)) = (net.gen.get(idx), res.gen.get(idx)) else {
            continue;
        };
        if let Some(min) = gen.min_q_mvar.filter(|&min| r.q_mvar < min) {
            push(id, "reactive", format!("q_mvar {:.3} below min_q_mvar {min}", r.q_mvar));
        } else if let Some(max) = gen.max_q_mvar.filter(|&max| r.q_mvar > max) {
            push(id, "reactive", format!("q_mvar {:.3} above max_q_mvar {max}", r.q_mvar));
        }
    }
    out
}

fn downgrade(status: &mut BTreeMap<String, CreationStatus>, id: &str, reason: &str) {
    let Some(entry) = status.get_mut(id) else {
        return;
    };
    entry.success = false;
    entry.error = Some(match entry.error.take() {
        Some(prev) => format!("{prev}; {reason}"),
        None => reason.to_string(),
    });
}

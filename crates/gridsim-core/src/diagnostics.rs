//! Warnings gathered during one simulation run.
//!
//! Stages that notice something odd but keep going (ignored line nodes,
//! limit violations, non-convergence) record a [`Warning`] here. The response
//! carries them as flat strings in insertion order:
//!
//! ```
//! use gridsim_core::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("voltage", "vm_pu 0.91 below min_vm_pu 0.95", "bus-2");
//! diag.add_warning("powerflow", "Power flow did not converge");
//! assert_eq!(
//!     diag.messages(),
//!     vec![
//!         "[voltage] bus-2: vm_pu 0.91 below min_vm_pu 0.95".to_string(),
//!         "[powerflow] Power flow did not converge".to_string(),
//!     ]
//! );
//! ```

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Stage or check that raised it: `graph`, `voltage`, `loading`, ...
    pub category: String,
    /// External id of the element concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "[{}] {}: {}", self.category, entity, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.warnings.push(Warning {
            category: category.to_string(),
            entity: None,
            message: message.to_string(),
        });
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.warnings.push(Warning {
            category: category.to_string(),
            entity: Some(entity.to_string()),
            message: message.to_string(),
        });
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Warnings about one element.
    pub fn for_entity<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Warning> {
        self.warnings
            .iter()
            .filter(move |w| w.entity.as_deref() == Some(entity))
    }

    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(Warning::to_string).collect()
    }
}

use std::process::ExitCode;

use anyhow::Result;
use gridsim_cli::{GridsimConfig, StdTypeKind};
use gridsim_core::model::std_types::{LINE_TYPES, TRAFO3W_TYPES, TRAFO_TYPES};
use gridsim_io::write_json;
use serde_json::{Map, Value};

pub fn handle(config: &GridsimConfig, kind: Option<StdTypeKind>) -> Result<ExitCode> {
    let wanted = |k: StdTypeKind| kind.map_or(true, |only| only == k);
    let mut library = Map::new();
    if wanted(StdTypeKind::Line) {
        library.insert("line".into(), serde_json::to_value(&*LINE_TYPES)?);
    }
    if wanted(StdTypeKind::Trafo) {
        library.insert("trafo".into(), serde_json::to_value(&*TRAFO_TYPES)?);
    }
    if wanted(StdTypeKind::Trafo3w) {
        library.insert("trafo3w".into(), serde_json::to_value(&*TRAFO3W_TYPES)?);
    }
    write_json(&Value::Object(library), None, config.output.pretty)?;
    Ok(ExitCode::SUCCESS)
}

//! JSON output for responses and reports.
//!
//! Non-finite floats never reach the writer: result values pass through
//! [`gridsim_core::finite`] upstream and `serde_json` writes any stray NaN as
//! `null`, so every document produced here is strict JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub fn to_json_string<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.context("serializing JSON output")
}

/// Write `value` to `output`, or to stdout when no path is given. Parent
/// directories are created as needed.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>, pretty: bool) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("creating output directory '{}'", parent.display())
                })?;
            }
            let file = File::create(path)
                .with_context(|| format!("creating output file '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_to(&mut writer, value, pretty)
                .with_context(|| format!("writing output file '{}'", path.display()))?;
            debug!(path = %path.display(), "response written");
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_to(&mut lock, value, pretty).context("writing to stdout")
        }
    }
}

fn write_to<W: Write, T: Serialize>(writer: &mut W, value: &T, pretty: bool) -> Result<()> {
    let text = to_json_string(value, pretty)?;
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::SimulationResponse;
    use serde_json::Value;

    #[test]
    fn compact_is_single_line() {
        let response = SimulationResponse::empty("b1");
        let compact = to_json_string(&response, false).unwrap();
        let pretty = to_json_string(&response, true).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let a: Value = serde_json::from_str(&compact).unwrap();
        let b: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["summary"]["slack_bus_id"], "b1");
    }

    #[test]
    fn nan_becomes_null() {
        let text = to_json_string(&vec![1.0, f64::NAN, f64::INFINITY], false).unwrap();
        assert_eq!(text, "[1.0,null,null]");
    }

    #[test]
    fn writes_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/response.json");
        write_json(&SimulationResponse::empty(""), Some(&path), true).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["summary"]["converged"], false);
    }
}

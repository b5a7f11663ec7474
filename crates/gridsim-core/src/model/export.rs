//! Optional echo of the assembled network in a response.

use super::PowerNet;
use crate::schema::ReturnNetwork;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportMeta {
    pub converged: bool,
    pub sn_mva: f64,
    pub f_hz: f64,
    pub counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkExport {
    pub meta: ExportMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<BTreeMap<String, Vec<Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<String, Vec<Value>>>,
}

/// Serialize table rows, tagging each with its internal index. Non-finite
/// floats come out as `null`.
fn rows<T: Serialize>(table: &[T]) -> Vec<Value> {
    table
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut obj = match serde_json::to_value(row) {
                Ok(Value::Object(map)) => map,
                Ok(other) => Map::from_iter([("value".to_string(), other)]),
                Err(_) => Map::new(),
            };
            obj.insert("index".to_string(), Value::from(index));
            Value::Object(obj)
        })
        .collect()
}

/// Build the export requested by `mode`; `None` for [`ReturnNetwork::None`].
pub fn export_network(net: &PowerNet, mode: ReturnNetwork) -> Option<NetworkExport> {
    let meta = ExportMeta {
        converged: net.converged,
        sn_mva: net.sn_mva,
        f_hz: net.f_hz,
        counts: net
            .counts()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    };
    match mode {
        ReturnNetwork::None => None,
        ReturnNetwork::Summary => Some(NetworkExport {
            meta,
            tables: None,
            results: None,
        }),
        ReturnNetwork::Tables => {
            let tables = BTreeMap::from([
                ("bus".to_string(), rows(&net.bus)),
                ("line".to_string(), rows(&net.line)),
                ("trafo".to_string(), rows(&net.trafo)),
                ("trafo3w".to_string(), rows(&net.trafo3w)),
                ("load".to_string(), rows(&net.load)),
                ("gen".to_string(), rows(&net.gen)),
                ("sgen".to_string(), rows(&net.sgen)),
                ("ext_grid".to_string(), rows(&net.ext_grid)),
                ("switch".to_string(), rows(&net.switch)),
                ("shunt".to_string(), rows(&net.shunt)),
                ("motor".to_string(), rows(&net.motor)),
                ("storage".to_string(), rows(&net.storage)),
                ("ward".to_string(), rows(&net.ward)),
            ]);
            let res = &net.res;
            let results = BTreeMap::from([
                ("res_bus".to_string(), rows(&res.bus)),
                ("res_line".to_string(), rows(&res.line)),
                ("res_trafo".to_string(), rows(&res.trafo)),
                ("res_trafo3w".to_string(), rows(&res.trafo3w)),
                ("res_load".to_string(), rows(&res.load)),
                ("res_gen".to_string(), rows(&res.gen)),
                ("res_sgen".to_string(), rows(&res.sgen)),
                ("res_ext_grid".to_string(), rows(&res.ext_grid)),
                ("res_shunt".to_string(), rows(&res.shunt)),
                ("res_motor".to_string(), rows(&res.motor)),
                ("res_storage".to_string(), rows(&res.storage)),
                ("res_ward".to_string(), rows(&res.ward)),
            ]);
            Some(NetworkExport {
                meta,
                tables: Some(tables),
                results: Some(results),
            })
        }
    }
}

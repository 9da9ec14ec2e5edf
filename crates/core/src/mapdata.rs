//! Map documents: JSON loading, validation and conversion into a `GridMap`.
//! This module exists so malformed maps are rejected with every problem listed
//! before any simulation state is built.
//! It does not own gameplay; spawning agents from the result is the world's job.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::grid::{Cell, CellKind, GridMap};
use crate::types::*;

mod check;

/// One `(field, message)` problem found while validating a map document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

fn render_errors(errors: &[FieldError]) -> String {
    errors.iter().map(|e| format!("\n{}: {}", e.field, e.message)).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum MapDataError {
    #[error("map '{name}' is invalid:{}", render_errors(.errors))]
    Invalid { name: String, errors: Vec<FieldError> },
    #[error("map '{name}' is not valid JSON: {source}")]
    Syntax {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MapDataError {
    /// Validation problems, empty for syntax and I/O failures.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            MapDataError::Invalid { errors, .. } => errors,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpcSpec {
    pub count: usize,
    pub model_name: String,
    pub texture: String,
    pub alert_texture: Option<String>,
    pub route: String,
}

/// A validated map ready to populate a world.
#[derive(Clone, Debug)]
pub struct MapData {
    pub name: String,
    pub map: GridMap,
    pub start_position: Pos,
    pub routes: BTreeMap<String, Vec<Pos>>,
    pub npcs: Vec<NpcSpec>,
}

impl MapData {
    pub fn load(path: &Path) -> Result<Self, MapDataError> {
        let text = fs::read_to_string(path)
            .map_err(|source| MapDataError::Io { path: path.to_path_buf(), source })?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("map");
        Self::from_json_str(name, &text)
    }

    pub fn from_json_str(name: &str, text: &str) -> Result<Self, MapDataError> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|source| MapDataError::Syntax { name: name.to_string(), source })?;
        Self::from_value(name, &doc)
    }

    pub fn from_value(name: &str, doc: &Value) -> Result<Self, MapDataError> {
        let invalid = |errors| MapDataError::Invalid { name: name.to_string(), errors };
        let errors = check::check_document(doc);
        if !errors.is_empty() {
            return Err(invalid(errors));
        }
        let data = build(name, doc);
        let errors = check::check_routes(&data);
        if !errors.is_empty() {
            return Err(invalid(errors));
        }
        log::debug!(
            "loaded map '{}' with {} squares, {} routes and {} npc groups",
            name,
            data.map.len(),
            data.routes.len(),
            data.npcs.len()
        );
        Ok(data)
    }
}

pub(crate) fn parse_actions(value: Option<&Value>) -> Capabilities {
    let Some(Value::Array(names)) = value else {
        return Capabilities::empty();
    };
    names
        .iter()
        .filter_map(Value::as_str)
        .filter_map(Capabilities::from_name)
        .fold(Capabilities::empty(), |acc, c| acc | c)
}

pub(crate) fn parse_pos(value: &Value) -> Option<Pos> {
    match value.as_array()?.as_slice() {
        [x, y] => Some(Pos::new(
            i32::try_from(x.as_i64()?).ok()?,
            i32::try_from(y.as_i64()?).ok()?,
        )),
        _ => None,
    }
}

fn text(info: &Value, field: &str) -> String {
    info.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn cell_kind(info: &Value) -> CellKind {
    let size = info.get("size").and_then(Value::as_f64).unwrap_or(1.0);
    match info.get("kind").and_then(Value::as_str) {
        Some("texture") => CellKind::Texture { texture: text(info, "texture") },
        Some("model") => CellKind::Model {
            model: text(info, "model"),
            angle: info.get("angle").and_then(Value::as_i64).unwrap_or(0) as i32,
            size,
        },
        Some("chain_model") => CellKind::ChainModel {
            vertical_model: text(info, "vertical_model"),
            left_bottom_model: text(info, "left_bottom_model"),
        },
        Some("sprite") => CellKind::Sprite { texture: text(info, "texture"), size },
        _ => CellKind::Empty,
    }
}

/// Converts an already validated document.
fn build(name: &str, doc: &Value) -> MapData {
    let substrate_texture = text(doc, "substrate_texture");
    let substrate_actions = parse_actions(doc.get("substrate_actions"));
    let definitions = doc.get("definitions").and_then(Value::as_object);
    let rows: Vec<&str> = doc
        .get("topology")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let map = GridMap::from_topology(&rows, |token| {
        if token == "ss" {
            return Some(Cell::substrate(&substrate_texture, substrate_actions));
        }
        let info = definitions?.get(token)?;
        Some(Cell {
            kind: cell_kind(info),
            ident: Some(token.to_string()),
            actions: parse_actions(info.get("actions")),
        })
    });

    let routes = doc
        .get("routes")
        .and_then(Value::as_object)
        .map(|routes| {
            routes
                .iter()
                .map(|(key, points)| {
                    let points = points
                        .as_array()
                        .map(|list| list.iter().filter_map(parse_pos).collect())
                        .unwrap_or_default();
                    (key.clone(), points)
                })
                .collect()
        })
        .unwrap_or_default();

    let npcs = doc
        .get("npcs")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|npc| NpcSpec {
                    count: npc.get("count").and_then(Value::as_u64).unwrap_or(0) as usize,
                    model_name: text(npc, "model_name"),
                    texture: text(npc, "texture"),
                    alert_texture: npc.get("alert_texture").and_then(Value::as_str).map(str::to_string),
                    route: text(npc, "route"),
                })
                .collect()
        })
        .unwrap_or_default();

    MapData {
        name: name.to_string(),
        map,
        start_position: doc.get("start_position").and_then(parse_pos).unwrap_or_default(),
        routes,
        npcs,
    }
}

//! Structural and semantic checks for map documents.
//! Every rule reports through `FieldError` so a single failed load lists all problems.

use std::collections::{BTreeSet, VecDeque};

use serde_json::{Map as JsonObject, Value};

use super::*;

const REQUIRED: [&str; 5] =
    ["substrate_texture", "substrate_actions", "definitions", "topology", "start_position"];

#[derive(Clone, Copy)]
enum FieldType {
    Str,
    Int,
    Float,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::Str => "a string",
            FieldType::Int => "an integer",
            FieldType::Float => "a number",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::Str => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
        }
    }
}

struct FieldSpec {
    name: &'static str,
    ty: FieldType,
    required: bool,
    positive: bool,
}

const fn field(name: &'static str, ty: FieldType, required: bool, positive: bool) -> FieldSpec {
    FieldSpec { name, ty, required, positive }
}

fn kind_fields(kind: &str) -> Option<&'static [FieldSpec]> {
    const TEXTURE: &[FieldSpec] = &[field("texture", FieldType::Str, true, false)];
    const MODEL: &[FieldSpec] = &[
        field("model", FieldType::Str, true, false),
        field("angle", FieldType::Int, false, false),
        field("size", FieldType::Float, false, true),
    ];
    const CHAIN_MODEL: &[FieldSpec] = &[
        field("vertical_model", FieldType::Str, true, false),
        field("left_bottom_model", FieldType::Str, true, false),
    ];
    const SPRITE: &[FieldSpec] =
        &[field("texture", FieldType::Str, true, false), field("size", FieldType::Float, false, true)];
    match kind {
        "texture" => Some(TEXTURE),
        "model" => Some(MODEL),
        "chain_model" => Some(CHAIN_MODEL),
        "sprite" => Some(SPRITE),
        _ => None,
    }
}

const NPC_FIELDS: &[FieldSpec] = &[
    field("count", FieldType::Int, true, true),
    field("model_name", FieldType::Str, true, false),
    field("texture", FieldType::Str, true, false),
    field("alert_texture", FieldType::Str, false, false),
    field("route", FieldType::Str, true, false),
];

fn check_fields(
    errors: &mut Vec<FieldError>,
    section: &str,
    owner: &str,
    info: &JsonObject<String, Value>,
    specs: &[FieldSpec],
) {
    for spec in specs {
        let Some(value) = info.get(spec.name) else {
            if spec.required {
                errors.push(FieldError::new(
                    section,
                    format!("{owner} doesn't contain '{}' field", spec.name),
                ));
            }
            continue;
        };
        if !spec.ty.matches(value) {
            errors.push(FieldError::new(
                section,
                format!("field '{}' of {owner} is not {}", spec.name, spec.ty.name()),
            ));
            continue;
        }
        if spec.positive && value.as_f64().is_some_and(|v| v <= 0.0) {
            errors.push(FieldError::new(
                section,
                format!("field '{}' of {owner} must be positive", spec.name),
            ));
        }
    }
}

fn check_action_list(errors: &mut Vec<FieldError>, section: &str, owner: &str, value: &Value) {
    let Some(names) = value.as_array() else {
        errors.push(FieldError::new(section, format!("actions of {owner} are not a list")));
        return;
    };
    for name in names {
        match name.as_str() {
            Some(n) if Capabilities::from_name(n).is_some() => {}
            _ => errors.push(FieldError::new(section, format!("{owner} has unknown action {name}"))),
        }
    }
}

/// Tokens of a topology row at a three-character stride.
fn row_tokens(row: &str) -> impl Iterator<Item = &str> {
    (0..row.len()).step_by(3).filter_map(move |i| row.get(i..i + 2))
}

/// Problems that can be found without building the grid.
pub(super) fn check_document(doc: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let Some(root) = doc.as_object() else {
        errors.push(FieldError::new("map", "is not an object"));
        return errors;
    };
    for key in REQUIRED {
        if !root.contains_key(key) {
            errors.push(FieldError::new(key, "is not specified"));
        }
    }
    if !errors.is_empty() {
        return errors;
    }

    if !root["substrate_texture"].is_string() {
        errors.push(FieldError::new("substrate_texture", "is not a string"));
    }
    check_action_list(&mut errors, "substrate_actions", "substrate", &root["substrate_actions"]);

    let rows: Vec<&str> = match root["topology"].as_array() {
        Some(rows) if !rows.is_empty() => {
            let strings: Vec<&str> = rows.iter().filter_map(Value::as_str).collect();
            if strings.len() != rows.len() {
                errors.push(FieldError::new("topology", "every row must be a string"));
            }
            strings
        }
        _ => {
            errors.push(FieldError::new("topology", "is not a non-empty list of rows"));
            Vec::new()
        }
    };
    let used: BTreeSet<&str> = rows.iter().flat_map(|row| row_tokens(row)).collect();

    let empty = JsonObject::new();
    let definitions = match root["definitions"].as_object() {
        Some(defs) => defs,
        None => {
            errors.push(FieldError::new("definitions", "is not an object"));
            &empty
        }
    };
    for (ident, info) in definitions {
        let owner = format!("'{ident}'");
        if ident.chars().count() != 2 {
            errors.push(FieldError::new(
                "definitions",
                format!("ident '{ident}' should contain two characters"),
            ));
        } else if ident == "ss" || ident == ".." {
            errors.push(FieldError::new("definitions", format!("ident '{ident}' is reserved")));
        }
        if !used.contains(ident.as_str()) {
            errors.push(FieldError::new("definitions", format!("'{ident}' is not in topology")));
        }
        let Some(info) = info.as_object() else {
            errors.push(FieldError::new("definitions", format!("{owner} is not an object")));
            continue;
        };
        if let Some(actions) = info.get("actions") {
            check_action_list(&mut errors, "definitions", &owner, actions);
        }
        let Some(kind) = info.get("kind") else {
            continue;
        };
        match kind.as_str().and_then(kind_fields) {
            Some(specs) => check_fields(&mut errors, "definitions", &owner, info, specs),
            None => errors.push(FieldError::new("definitions", format!("unknown kind for {owner}"))),
        }
    }

    let width = rows.first().map_or(0, |row| row.len());
    for (num, row) in rows.iter().enumerate() {
        if (row.len() + 1) % 3 != 0 {
            errors.push(FieldError::new("topology", format!("wrong length of row {num}")));
        }
        if row.len() != width {
            errors.push(FieldError::new("topology", format!("row {num} has a different length")));
        }
        for token in row_tokens(row) {
            if token != ".." && token != "ss" && !definitions.contains_key(token) {
                errors.push(FieldError::new("topology", format!("unknown ident '{token}'")));
            }
        }
    }

    match parse_pos(&root["start_position"]) {
        None => errors.push(FieldError::new("start_position", "is not an [x, y] pair")),
        Some(start) => {
            let present = usize::try_from(start.y)
                .ok()
                .and_then(|y| rows.len().checked_sub(1 + y))
                .and_then(|row| rows.get(row))
                .and_then(|row| usize::try_from(start.x).ok().and_then(|x| row.get(3 * x..3 * x + 2)))
                .is_some_and(|token| token != "..");
            if !present {
                errors.push(FieldError::new("start_position", "is not on the map"));
            }
        }
    }

    let routes = match root.get("routes") {
        None => None,
        Some(Value::Object(routes)) => {
            for (key, points) in routes {
                let well_formed = points
                    .as_array()
                    .is_some_and(|list| !list.is_empty() && list.iter().all(|p| parse_pos(p).is_some()));
                if !well_formed {
                    errors.push(FieldError::new(
                        "route",
                        format!("route '{key}' is not a non-empty list of [x, y] pairs"),
                    ));
                }
            }
            Some(routes)
        }
        Some(_) => {
            errors.push(FieldError::new("routes", "is not an object"));
            None
        }
    };

    match root.get("npcs") {
        None => {}
        Some(Value::Array(npcs)) => {
            for (num, npc) in npcs.iter().enumerate() {
                let Some(info) = npc.as_object() else {
                    errors.push(FieldError::new("npc", format!("{num}: is not an object")));
                    continue;
                };
                check_fields(&mut errors, "npc", &format!("npc {num}"), info, NPC_FIELDS);
                if let Some(route) = info.get("route").and_then(Value::as_str)
                    && !routes.is_some_and(|r| r.contains_key(route))
                {
                    errors.push(FieldError::new("npc", format!("{num}: unknown route '{route}'")));
                }
            }
        }
        Some(_) => errors.push(FieldError::new("npcs", "is not a list")),
    }

    errors
}

/// Route checks that need the built grid: waypoints must be walkable squares and
/// each consecutive pair, wrapping around, must be connected over walkable squares.
pub(super) fn check_routes(data: &MapData) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let walkable = |p: Pos| data.map.allows(p, Capabilities::WALK);
    for (key, route) in &data.routes {
        let mut passable = true;
        for (num, pos) in route.iter().enumerate() {
            if !data.map.contains(*pos) {
                errors.push(FieldError::new(
                    "route",
                    format!("{num} position of route '{key}' doesn't exist on the map"),
                ));
                passable = false;
            } else if !walkable(*pos) {
                errors.push(FieldError::new(
                    "route",
                    format!("{num} position of route '{key}' is not walkable"),
                ));
                passable = false;
            }
        }
        if !passable || route.len() < 2 {
            continue;
        }
        let mut ring: VecDeque<Pos> = route.iter().copied().collect();
        for _ in 0..ring.len() {
            let (s, e) = (ring[0], ring[1]);
            if data.map.get_path(s, e, walkable).is_none() {
                errors.push(FieldError::new(
                    "route",
                    format!("{s} - {e} interval of route '{key}' is not passable"),
                ));
            }
            ring.rotate_right(1);
        }
    }
    for (num, npc) in data.npcs.iter().enumerate() {
        let slots = data.routes.get(&npc.route).map_or(0, |r| r.len().saturating_sub(1));
        if npc.count > slots {
            errors.push(FieldError::new(
                "npc",
                format!("{num}: max count for route '{}' is {slots}", npc.route),
            ));
        }
    }
    errors
}

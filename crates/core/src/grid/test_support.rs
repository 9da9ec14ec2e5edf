//! Shared test fixtures for the grid and world test suites.
//! This module exists to avoid repeating topology setup across many tests.
//! It does not own production map loading.

use super::*;

pub(crate) const SUBSTRATE: Capabilities =
    Capabilities::WALK.union(Capabilities::JUMP).union(Capabilities::SEE);

/// `ss` is a fully capable substrate square; every other token becomes a
/// grouped cell with the capabilities listed in `defs` (none when unlisted).
pub(crate) fn map_from_rows(rows: &[&str], defs: &[(&str, Capabilities)]) -> GridMap {
    GridMap::from_topology(rows, |token| {
        if token == "ss" {
            return Some(Cell::substrate("floor", SUBSTRATE));
        }
        let actions = defs
            .iter()
            .find(|(ident, _)| *ident == token)
            .map(|(_, actions)| *actions)
            .unwrap_or_else(Capabilities::empty);
        Some(Cell { kind: CellKind::Empty, ident: Some(token.to_string()), actions })
    })
}

pub(crate) fn open_map(width: i32, height: i32) -> GridMap {
    let mut map = GridMap::new();
    for y in 0..height {
        for x in 0..width {
            map.insert(Pos::new(x, y), Cell::substrate("floor", SUBSTRATE));
        }
    }
    map
}

pub(crate) fn wall(map: &mut GridMap, pos: Pos) {
    map.insert(
        pos,
        Cell { kind: CellKind::Empty, ident: Some("WL".to_string()), actions: Capabilities::empty() },
    );
}

pub(crate) fn first(map: &GridMap, ident: &str) -> Pos {
    map.group(ident)[0]
}

pub(crate) fn not_in_group<'a>(map: &'a GridMap, ident: &'a str) -> impl Fn(Pos) -> bool + 'a {
    move |p| map.group_of(p) != Some(ident)
}

pub(crate) fn walkable(map: &GridMap) -> impl Fn(Pos) -> bool + '_ {
    |p| map.allows(p, Capabilities::WALK)
}

pub(crate) const WAVE_TOPOLOGY: [&str; 6] = [
    "ss ss ss ss ss ss ss ss",
    "ss WL ss ss ss ss ss ss",
    "ss ss ss ss ss ss ss ss",
    "ss ss st .. .. .. ss ss",
    "ss ss WL .. ss .. .. ss",
    "ss ss ss .. ss ss ss ss",
];

pub(crate) const DETOUR_TOPOLOGY: [&str; 6] = [
    "ss ss ss ss ss ss ss ss",
    "ss WL WL ss ss ss ss ss",
    "ss a5 a6 a7 a8 a9 b1 ss",
    "a4 ss ss ss .. .. ss b2",
    "a3 WL WL .. b7 ss .. b3",
    "a2 a1 st .. ss b6 b5 b4",
];

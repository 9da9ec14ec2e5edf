//! World fixtures shared by behavior and world tests.

use super::*;

pub(crate) fn world_on(map: GridMap, start: Pos) -> World {
    let data = MapData {
        name: "test".into(),
        map,
        start_position: start,
        routes: Default::default(),
        npcs: Vec::new(),
    };
    World::with_event_loop(data, Settings::default())
}

/// Ticks in 50 ms frames for `seconds`.
pub(crate) fn run(world: &mut World, seconds: f64) {
    for _ in 0..(seconds / 0.05).round() as usize {
        world.tick(0.05);
    }
}

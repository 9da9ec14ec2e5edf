use std::collections::BTreeSet;

use stealth::{
    ActionName, Capabilities, Cell, CellKind, Command, Direction, GridMap, LogEvent, MapData, Pos,
    Settings, Target, World,
};

fn open_grid(width: i32, height: i32) -> GridMap {
    let mut map = GridMap::new();
    for y in 0..height {
        for x in 0..width {
            map.insert(Pos::new(x, y), Cell::substrate("floor", Capabilities::all()));
        }
    }
    map
}

fn wall_at(map: &mut GridMap, pos: Pos) {
    map.insert(pos, Cell { kind: CellKind::Empty, ident: Some("WL".into()), actions: Capabilities::empty() });
}

fn world_on(map: GridMap, start: Pos) -> World {
    let data = MapData {
        name: "scenario".into(),
        map,
        start_position: start,
        routes: Default::default(),
        npcs: Vec::new(),
    };
    World::with_event_loop(data, Settings::default())
}

fn run(world: &mut World, seconds: f64) {
    for _ in 0..(seconds / 0.05).round() as usize {
        world.tick(0.05);
    }
}

fn position_of(log: &[LogEvent], wanted: &LogEvent) -> usize {
    log.iter().position(|e| e == wanted).unwrap_or_else(|| panic!("{wanted:?} not logged"))
}

#[test]
fn test_path_goes_around_the_wall_without_cutting_its_corner() {
    let mut map = open_grid(6, 5);
    let wall = Pos::new(1, 3);
    wall_at(&mut map, wall);
    let walkable = |p: Pos| map.allows(p, Capabilities::WALK);

    let path = map.get_path(Pos::new(2, 3), Pos::new(0, 1), walkable).expect("reachable");
    assert_eq!(path, vec![Pos::new(2, 2), Pos::new(1, 1), Pos::new(0, 1)]);

    let mut prev = Pos::new(2, 3);
    for step in &path {
        assert!(map.check_square(prev, *step, walkable), "{prev} -> {step} is not a legal step");
        prev = *step;
    }

    let weighted = map.weighted_path(Pos::new(2, 3), Pos::new(0, 1), walkable).expect("reachable");
    assert_eq!(weighted.len(), 3);
    assert_eq!(weighted.last(), Some(&Pos::new(0, 1)));
    let mut prev = Pos::new(2, 3);
    for step in &weighted {
        assert!(map.check_square(prev, *step, walkable), "{prev} -> {step} is not a legal step");
        prev = *step;
    }
}

#[test]
fn test_open_cone_sees_the_whole_fan() {
    let map = open_grid(25, 25);
    let eye = Pos::new(12, 12);
    let field = map.view_field(eye, 0.0, 92.0, 10.0, |_| true);

    let mut expected = BTreeSet::new();
    for dy in -10..=10 {
        for dx in -10..=10 {
            let sq = Pos::new(eye.x + dx, eye.y + dy);
            let bearing = f64::from(dy).atan2(f64::from(dx)).to_degrees();
            if sq != eye && eye.distance(sq) <= 10.0 && -46.0 < bearing && bearing < 46.0 {
                expected.insert(sq);
            }
        }
    }
    assert_eq!(field, expected);
    assert!(field.contains(&Pos::new(22, 12)));
    assert!(!field.contains(&Pos::new(12, 22)));
}

#[test]
fn test_walk_interrupted_by_death_signal_leaves_agent_idle() {
    let mut world = world_on(open_grid(5, 5), Pos::new(2, 2));
    let player = world.player();
    world.command(Command::Move(Direction::North));
    assert_eq!(world.agent(player).action, Some(ActionName::Walk));
    world.kill(player, player, Direction::South);
    world.command(Command::Stop);

    world.tick(0.05);
    world.tick(0.05);
    let log = world.log();
    let received = position_of(log, &LogEvent::DeathSignalReceived { agent: player });
    let finished = position_of(log, &LogEvent::ActionFinished { agent: player, action: ActionName::Walk });
    let dying = position_of(log, &LogEvent::ActionStarted { agent: player, action: ActionName::Die });
    assert!(received < finished && finished < dying);
    assert_eq!(world.agent(player).pos, Pos::new(2, 2));
    assert!(world.map().blocked().next().is_none());
}

#[test]
fn test_dragging_a_corpse_after_a_stealth_kill() {
    let mut world = world_on(open_grid(5, 7), Pos::new(2, 1));
    let player = world.player();
    let guard = world.spawn_npc(&[Pos::new(2, 2)], 0).expect("free square");

    world.command(Command::Hit);
    run(&mut world, 3.0);
    assert!(world.log().contains(&LogEvent::Killed { victim: guard, by: player }));
    assert!(world.agent(guard).dead);
    let (body, corpse) = world.bodies().next().expect("the guard left a corpse");
    assert_eq!(corpse.poses, (Pos::new(2, 2), Pos::new(2, 3)));

    world.command(Command::GrabBody);
    run(&mut world, 0.6);
    world.command(Command::Move(Direction::South));
    run(&mut world, 0.7);
    world.command(Command::Stop);
    run(&mut world, 1.0);
    assert_eq!(world.agent(player).pos, Pos::new(2, 0));
    assert_eq!(world.body(body).map(|b| b.poses), Some((Pos::new(2, 1), Pos::new(2, 2))));

    world.command(Command::ReleaseBody);
    run(&mut world, 0.5);
    assert!(world.log().contains(&LogEvent::BodyReleased { body }));
    assert!(world.agent(player).is_idle());
}

#[test]
fn test_guard_examines_a_corpse_it_spots() {
    let mut world = world_on(open_grid(9, 20), Pos::new(8, 19));
    let player = world.player();
    let sentry = world.spawn_npc(&[Pos::new(4, 6)], 0).expect("free square");
    let guard = world.spawn_npc(&[Pos::new(4, 2)], 0).expect("free square");
    world.kill(sentry, player, Direction::North);

    run(&mut world, 10.0);
    let (body, corpse) = world.bodies().next().expect("a corpse");
    assert!(corpse.discovered);
    assert!(world.log().contains(&LogEvent::BodyDiscovered { body, by: guard }));
    assert!(world.log().iter().any(|e| matches!(e, LogEvent::Alerted { agent, .. } if *agent == guard)));
    assert_eq!(world.agent(guard).target, Target::Square(Pos::new(4, 2)));
    assert!(!world.log().iter().any(|e| matches!(e, LogEvent::Killed { victim, .. } if *victim == player)));
}

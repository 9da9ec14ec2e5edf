use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use stealth::{Command, Direction, MapData, Settings, World};

const PATROL_MAP: &str = r#"{
    "substrate_texture": "grass",
    "substrate_actions": ["walk", "jump", "see"],
    "definitions": {
        "WL": {"kind": "model", "model": "wall", "actions": []},
        "BX": {"kind": "sprite", "texture": "box", "actions": ["jump", "see"]}
    },
    "topology": [
        "ss ss ss ss ss ss ss ss ss ss",
        "ss WL WL ss ss ss ss BX ss ss",
        "ss ss ss ss ss ss ss ss ss ss",
        "ss ss ss ss WL WL ss ss ss ss",
        "ss ss ss ss ss ss ss ss ss ss",
        "ss BX ss ss ss ss ss WL ss ss",
        "ss ss ss ss ss ss ss ss ss ss",
        "ss ss ss ss ss ss ss ss ss ss"
    ],
    "start_position": [0, 0],
    "routes": {"ring": [[3, 2], [8, 2], [8, 6], [3, 6]]},
    "npcs": [{"count": 2, "model_name": "guard", "texture": "grey", "route": "ring"}]
}"#;

const COMMANDS: [Command; 8] = [
    Command::Move(Direction::North),
    Command::Move(Direction::East),
    Command::Move(Direction::NorthEast),
    Command::Stop,
    Command::Hit,
    Command::Jump,
    Command::ConfirmJump,
    Command::JumpRight,
];

fn new_world() -> World {
    let data = MapData::from_json_str("patrol", PATROL_MAP).expect("valid map");
    World::with_event_loop(data, Settings::default())
}

/// Plays seeded random commands for `frames` ticks and returns the final hash.
fn play(seed: u64, frames: usize) -> u64 {
    let mut world = new_world();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..frames {
        if rng.next_u64() % 4 == 0 {
            let command = COMMANDS[rng.next_u64() as usize % COMMANDS.len()];
            world.command(command);
        }
        world.tick(0.05);
    }
    world.snapshot_hash()
}

#[test]
fn test_identical_inputs_produce_identical_hashes() {
    for seed in [1, 7, 12345] {
        assert_eq!(play(seed, 400), play(seed, 400), "seed {seed} diverged");
    }
}

#[test]
fn test_diverging_inputs_produce_different_hashes() {
    let mut north = new_world();
    let mut east = new_world();
    north.command(Command::Move(Direction::North));
    east.command(Command::Move(Direction::East));
    for _ in 0..20 {
        north.tick(0.05);
        east.tick(0.05);
    }
    assert_ne!(north.snapshot_hash(), east.snapshot_hash());
}

#[test]
fn test_hash_changes_as_the_patrol_moves() {
    let mut world = new_world();
    let before = world.snapshot_hash();
    for _ in 0..40 {
        world.tick(0.05);
    }
    assert_ne!(before, world.snapshot_hash());
    assert_eq!(world.npcs().len(), 2);
}

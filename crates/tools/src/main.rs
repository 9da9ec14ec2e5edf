use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use stealth::{
    Capabilities, Command, Direction, LogEvent, MapData, PathAlgorithm, Pos, Settings, World,
    draw_map_diag,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Tool,
}

#[derive(Subcommand)]
enum Tool {
    /// Validate a map file and print what it contains
    Check { map: PathBuf },
    /// Print a walking path between two squares
    Path {
        map: PathBuf,
        #[arg(long, value_parser = parse_pos)]
        from: Pos,
        #[arg(long, value_parser = parse_pos)]
        to: Pos,
        /// Use the diagonal-aware weighted search instead of the wave
        #[arg(long)]
        weighted: bool,
    },
    /// Print the squares seen from a position
    View {
        map: PathBuf,
        #[arg(long, value_parser = parse_pos)]
        at: Pos,
        #[arg(long, default_value_t = 90.0)]
        angle: f64,
        #[arg(long, default_value_t = 90.0)]
        cone: f64,
        #[arg(long, default_value_t = 6.0)]
        radius: f64,
    },
    /// Run the world headless with seeded random player input
    Simulate {
        map: PathBuf,
        #[arg(long)]
        settings: Option<PathBuf>,
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,
        #[arg(long, default_value_t = 0.05)]
        dt: f64,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_pos(text: &str) -> Result<Pos, String> {
    let (x, y) = text.split_once(',').ok_or_else(|| format!("expected x,y, got '{text}'"))?;
    let x = x.trim().parse().map_err(|_| format!("bad x in '{text}'"))?;
    let y = y.trim().parse().map_err(|_| format!("bad y in '{text}'"))?;
    Ok(Pos::new(x, y))
}

fn load_map(path: &Path) -> Result<MapData> {
    MapData::load(path).with_context(|| format!("Failed to load map: {}", path.display()))
}

fn check(path: &Path) -> Result<()> {
    let data = load_map(path)?;
    println!("Map '{}' is valid.", data.name);
    println!("Squares: {}", data.map.len());
    println!("Start: {}", data.start_position);
    for (name, points) in &data.routes {
        println!("Route '{}': {} waypoints", name, points.len());
    }
    for npc in &data.npcs {
        println!("Npcs: {} x {} on route '{}'", npc.count, npc.model_name, npc.route);
    }
    println!("{}", draw_map_diag(&data.map, &[(data.start_position, '@')]));
    Ok(())
}

fn path(map: &Path, from: Pos, to: Pos, weighted: bool) -> Result<()> {
    let data = load_map(map)?;
    let algorithm = if weighted { PathAlgorithm::Weighted } else { PathAlgorithm::Wave };
    let walkable = |p: Pos| data.map.allows(p, Capabilities::WALK);
    let Some(steps) = data.map.path(algorithm, from, to, walkable) else {
        bail!("No path from {from} to {to}");
    };
    let listed: Vec<String> = steps.iter().map(Pos::to_string).collect();
    println!("{} steps: {}", steps.len(), listed.join(" "));
    let mut marks: Vec<(Pos, char)> = steps.iter().map(|p| (*p, '*')).collect();
    marks.push((from, 'S'));
    marks.push((to, 'E'));
    println!("{}", draw_map_diag(&data.map, &marks));
    Ok(())
}

fn view(map: &Path, at: Pos, angle: f64, cone: f64, radius: f64) -> Result<()> {
    if !(0.0..360.0).contains(&angle) {
        bail!("Angle {angle} must be in [0, 360)");
    }
    if !(cone > 0.0 && cone < 180.0) {
        bail!("Cone {cone} must be in (0, 180)");
    }
    let data = load_map(map)?;
    let field = data.map.view_field(at, angle, cone, radius, |p| data.map.allows(p, Capabilities::SEE));
    println!("{} squares visible from {at}", field.len());
    let mut marks: Vec<(Pos, char)> = field.iter().map(|p| (*p, 'v')).collect();
    marks.push((at, '@'));
    println!("{}", draw_map_diag(&data.map, &marks));
    Ok(())
}

const COMMANDS: [Command; 12] = [
    Command::Move(Direction::North),
    Command::Move(Direction::East),
    Command::Move(Direction::South),
    Command::Move(Direction::West),
    Command::Move(Direction::NorthWest),
    Command::Stop,
    Command::Hit,
    Command::Jump,
    Command::JumpLeft,
    Command::ConfirmJump,
    Command::GrabBody,
    Command::ReleaseBody,
];

fn tally(log: &[LogEvent]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for event in log {
        let kind = match event {
            LogEvent::Moved { .. } => "moves",
            LogEvent::Killed { .. } => "kills",
            LogEvent::Died { .. } => "deaths",
            LogEvent::Respawned { .. } => "respawns",
            LogEvent::Jumped { .. } => "jumps",
            LogEvent::Alerted { .. } => "alerts",
            LogEvent::BodyDropped { .. } => "corpses",
            LogEvent::BodyMoved { .. } => "drags",
            LogEvent::BodyDiscovered { .. } => "discoveries",
            LogEvent::ActionFailed { .. } => "failed actions",
            LogEvent::JobTimedOut { .. } => "job timeouts",
            _ => continue,
        };
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}

fn simulate(map: &Path, settings: Option<&Path>, seconds: f64, dt: f64, seed: u64, json: bool) -> Result<()> {
    if dt <= 0.0 {
        bail!("Frame time must be positive, got {dt}");
    }
    let data = load_map(map)?;
    let settings = match settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?,
        None => Settings::default(),
    };
    let mut world = World::with_event_loop(data, settings);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let frames = (seconds / dt).ceil() as u64;
    log::info!("simulating {frames} frames of {dt}s with seed {seed}");
    for _ in 0..frames {
        if rng.next_u64() % 8 == 0 {
            let command = COMMANDS[rng.next_u64() as usize % COMMANDS.len()];
            world.command(command);
        }
        world.tick(dt);
    }

    let counts = tally(world.log());
    let hash = world.snapshot_hash();
    if json {
        let summary = serde_json::json!({
            "seed": seed,
            "time": world.now(),
            "events": counts,
            "snapshot_hash": hash,
        });
        println!("{}", serde_json::to_string_pretty(&summary).context("Failed to encode summary")?);
        return Ok(());
    }
    println!("Simulated {:.2}s on seed {}.", world.now(), seed);
    for (kind, count) in &counts {
        println!("{kind}: {count}");
    }
    println!("Snapshot Hash: {hash}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Tool::Check { map } => check(&map),
        Tool::Path { map, from, to, weighted } => path(&map, from, to, weighted),
        Tool::View { map, at, angle, cone, radius } => view(&map, at, angle, cone, radius),
        Tool::Simulate { map, settings, seconds, dt, seed, json } => {
            simulate(&map, settings.as_deref(), seconds, dt, seed, json)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::tempdir;

    const TINY_MAP: &str = r#"{
        "substrate_texture": "grass",
        "substrate_actions": ["walk", "see"],
        "definitions": {"WL": {"kind": "texture", "texture": "brick", "actions": []}},
        "topology": ["ss ss ss", "ss WL ss", "ss ss ss"],
        "start_position": [0, 0],
        "routes": {"loop": [[2, 0], [2, 2]]},
        "npcs": [{"count": 1, "model_name": "guard", "texture": "grey", "route": "loop"}]
    }"#;

    #[test]
    fn parses_positions() {
        assert_eq!(parse_pos("3,-4"), Ok(Pos::new(3, -4)));
        assert_eq!(parse_pos(" 1 , 2 "), Ok(Pos::new(1, 2)));
        assert!(parse_pos("12").is_err());
        assert!(parse_pos("a,1").is_err());
    }

    #[test]
    fn commands_run_against_a_map_file() {
        let dir = tempdir().expect("tempdir");
        let map = dir.path().join("tiny.json");
        fs::write(&map, TINY_MAP).expect("write map");
        check(&map).expect("valid map");
        path(&map, Pos::new(0, 0), Pos::new(2, 2), true).expect("path exists");
        assert!(path(&map, Pos::new(0, 0), Pos::new(1, 1), false).is_err(), "the wall is not walkable");
        view(&map, Pos::new(0, 0), 45.0, 90.0, 3.0).expect("view");
        simulate(&map, None, 2.0, 0.05, 7, true).expect("simulate");
        assert!(check(&dir.path().join("missing.json")).is_err());
    }
}

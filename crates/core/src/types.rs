use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct AgentId;
    pub struct BodyId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    pub fn chebyshev(self, other: Pos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn distance(self, other: Pos) -> f64 {
        f64::from(self.x - other.x).hypot(f64::from(self.y - other.y))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The eight compass directions in the order neighbor queries report them.
/// North is `+y`, east is `+x`; angles grow counter-clockwise from east.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const ORTHOGONAL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    pub const DIAGONAL: [Direction; 4] =
        [Direction::NorthEast, Direction::SouthEast, Direction::SouthWest, Direction::NorthWest];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::NorthEast => (1, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, -1),
            Direction::South => (0, -1),
            Direction::SouthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, 1),
        }
    }

    /// Direction of a non-zero straight or exactly diagonal displacement.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        if (dx, dy) == (0, 0) || (dx != 0 && dy != 0 && dx.abs() != dy.abs()) {
            return None;
        }
        let unit = (dx.signum(), dy.signum());
        Direction::ALL.into_iter().find(|dir| dir.delta() == unit)
    }

    /// Direction of the straight or diagonal line from `from` to `to`.
    pub fn between(from: Pos, to: Pos) -> Option<Direction> {
        Direction::from_delta(to.x - from.x, to.y - from.y)
    }

    /// Bearing in degrees, `0` for east and `90` for north.
    pub fn angle(self) -> i32 {
        match self {
            Direction::East => 0,
            Direction::NorthEast => 45,
            Direction::North => 90,
            Direction::NorthWest => 135,
            Direction::West => 180,
            Direction::SouthWest => 225,
            Direction::South => 270,
            Direction::SouthEast => 315,
        }
    }

    pub fn opposite(self) -> Direction {
        self.rotated(4)
    }

    /// Rotates by `eighths` steps of 45 degrees counter-clockwise.
    pub fn rotated(self, eighths: i32) -> Direction {
        // ALL runs clockwise, so counter-clockwise rotation walks it backwards.
        Direction::ALL[(self as i32 - eighths).rem_euclid(8) as usize]
    }

    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.delta();
        dx != 0 && dy != 0
    }

    /// Smallest angle between two directions, in degrees (`0..=180`).
    pub fn angle_to(self, other: Direction) -> i32 {
        let diff = (self.angle() - other.angle()).rem_euclid(360);
        diff.min(360 - diff)
    }
}

bitflags! {
    /// What an agent may do on a cell.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const WALK = 1;
        const JUMP = 1 << 1;
        const SEE = 1 << 2;
    }
}

impl Capabilities {
    pub fn from_name(name: &str) -> Option<Capabilities> {
        match name {
            "walk" => Some(Capabilities::WALK),
            "jump" => Some(Capabilities::JUMP),
            "see" => Some(Capabilities::SEE),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionName {
    Walk,
    Hit,
    Jump,
    MoveBody,
    Die,
    Revive,
}

impl ActionName {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionName::Walk => "walk",
            ActionName::Hit => "hit",
            ActionName::Jump => "jump",
            ActionName::MoveBody => "move_body",
            ActionName::Die => "die",
            ActionName::Revive => "revive",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Player,
    Npc,
}

impl Role {
    pub fn actions(self) -> &'static [ActionName] {
        match self {
            Role::Player => &[
                ActionName::Walk,
                ActionName::Hit,
                ActionName::Jump,
                ActionName::MoveBody,
                ActionName::Die,
            ],
            Role::Npc => &[ActionName::Walk, ActionName::Hit, ActionName::Die, ActionName::Revive],
        }
    }

    pub fn supports(self, action: ActionName) -> bool {
        self.actions().contains(&action)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Square(Pos),
    Agent(AgentId),
    Body(BodyId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogEvent {
    ActionStarted { agent: AgentId, action: ActionName },
    ActionFinished { agent: AgentId, action: ActionName },
    ActionFailed { agent: AgentId, action: ActionName, reason: String },
    Moved { agent: AgentId, from: Pos, to: Pos },
    Rotated { agent: AgentId, facing: Direction },
    DeathSignalReceived { agent: AgentId },
    Killed { victim: AgentId, by: AgentId },
    Died { agent: AgentId },
    Respawned { agent: AgentId, at: Pos },
    BodyDropped { body: BodyId, npc: AgentId, poses: (Pos, Pos) },
    BodyPickedUp { body: BodyId, by: AgentId },
    BodyMoved { body: BodyId, poses: (Pos, Pos) },
    BodyReleased { body: BodyId },
    BodyDiscovered { body: BodyId, by: AgentId },
    Revived { agent: AgentId, at: Pos },
    JumpPointer { agent: AgentId, at: Pos },
    Jumped { agent: AgentId, from: Pos, to: Pos },
    Alerted { agent: AgentId, origin: Pos },
    JobTimedOut { agent: AgentId },
}

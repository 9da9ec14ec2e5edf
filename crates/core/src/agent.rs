//! Agent and corpse records owned by the world.
//! This module exists to keep per-agent state plain data that behaviors mutate
//! through the world. It does not own scheduling or spatial indexing.

use std::collections::VecDeque;

use crate::config::{Settings, ViewCone};
use crate::types::*;

/// Patrol waypoints; the head is the current destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route(VecDeque<Pos>);

impl Route {
    pub fn new(points: impl IntoIterator<Item = Pos>) -> Self {
        Self(points.into_iter().collect())
    }

    pub fn current(&self) -> Option<Pos> {
        self.0.front().copied()
    }

    /// Moves the head to the back and returns the new head.
    pub fn advance(&mut self) -> Option<Pos> {
        self.0.rotate_left(1.min(self.0.len()));
        self.current()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = Pos> + '_ {
        self.0.iter().copied()
    }
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub role: Role,
    pub pos: Pos,
    pub facing: Direction,
    /// Running action; `None` means idle.
    pub action: Option<ActionName>,
    pub must_die: bool,
    pub dead: bool,
    pub fall_forward: bool,
    /// Set while a move job is carrying the agent between squares.
    pub walking: bool,
    pub speed: f64,
    pub init_position: Pos,
    pub target: Target,
    pub route: Route,
    pub view: ViewCone,
}

impl Agent {
    pub fn player(pos: Pos, settings: &Settings) -> Self {
        Self {
            role: Role::Player,
            pos,
            facing: Direction::North,
            action: None,
            must_die: false,
            dead: false,
            fall_forward: false,
            walking: false,
            speed: settings.player.speed,
            init_position: pos,
            target: Target::Square(pos),
            route: Route::default(),
            view: settings.npc.normal_view,
        }
    }

    /// An NPC standing on the head of `route`.
    pub fn npc(route: Route, settings: &Settings) -> Self {
        let pos = route.current().unwrap_or_default();
        Self {
            role: Role::Npc,
            pos,
            facing: Direction::North,
            action: None,
            must_die: false,
            dead: false,
            fall_forward: false,
            walking: false,
            speed: settings.npc.speed,
            init_position: pos,
            target: Target::Square(pos),
            route,
            view: settings.npc.normal_view,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.action.is_none()
    }

    /// The square the agent is facing.
    pub fn ahead(&self) -> Pos {
        self.pos.step(self.facing)
    }

    pub fn is_excited(&self, settings: &Settings) -> bool {
        self.speed != settings.npc.speed
    }
}

/// A corpse lying across two adjacent squares.
#[derive(Clone, Debug)]
pub struct Body {
    pub npc: AgentId,
    pub poses: (Pos, Pos),
    pub carrier: Option<AgentId>,
    pub discovered: bool,
}

impl Body {
    pub fn new(npc: AgentId, poses: (Pos, Pos)) -> Self {
        Self { npc, poses, carrier: None, discovered: false }
    }

    pub fn occupies(&self, pos: Pos) -> bool {
        self.poses.0 == pos || self.poses.1 == pos
    }

    pub fn is_carried(&self) -> bool {
        self.carrier.is_some()
    }
}

/// Squares a body covers when its head is at `head` and it extends along `dir`.
pub fn body_poses(head: Pos, dir: Direction) -> (Pos, Pos) {
    (head, head.step(dir))
}

//! Agent behaviors written as resumable state machines.
//! This module exists to map each action name onto the coroutine the scheduler
//! drives for it, and to hold the small sub-behaviors they share.
//! It does not own scheduling, and every world change goes through `World`.

use crate::action::{ActionError, Clip, Coroutine, Job, JobKind, Resume, Step, Suspend};
use crate::types::*;
use crate::world::World;

mod body;
mod die;
mod hit;
mod jump;
mod walk;

/// Pause before an action first looks at the world, so input arriving in the
/// same frame is seen.
const SETTLE: f64 = 0.05;

pub(crate) fn spawn(action: ActionName, agent: AgentId, role: Role) -> Box<dyn Coroutine<World>> {
    match (action, role) {
        (ActionName::Walk, _) => Box::new(walk::Walk::new(agent)),
        (ActionName::Hit, _) => Box::new(hit::Hit::new(agent)),
        (ActionName::Jump, _) => Box::new(jump::Jump::new(agent)),
        (ActionName::MoveBody, _) => Box::new(body::MoveBody::new(agent)),
        (ActionName::Die, Role::Player) => Box::new(die::PlayerDie::new(agent)),
        (ActionName::Die, Role::Npc) => Box::new(die::NpcDie::new(agent)),
        (ActionName::Revive, _) => Box::new(die::Revive::new(agent)),
    }
}

fn job(agent: AgentId, kind: JobKind, duration: f64) -> Step<World> {
    Step::Suspend(Suspend::Job(Job { agent, kind, duration }))
}

fn wait(secs: f64) -> Step<World> {
    Step::Suspend(Suspend::Wait(secs))
}

/// Parks until the agent's death event arrives.
fn await_death(agent: AgentId) -> Step<World> {
    Step::Suspend(Suspend::Events(vec![World::death_event(agent)]))
}

fn unexpected(expected: &'static str, got: Resume) -> Step<World> {
    Step::Fail(ActionError::UnexpectedResume { expected, got })
}

/// Seconds a one-square move takes; diagonal steps are slower.
fn step_duration(from: Pos, to: Pos, speed: f64) -> f64 {
    if from.x != to.x && from.y != to.y { 1.4 / speed } else { 1.0 / speed }
}

/// Turns an agent to face a direction; a half turn at speed 1 takes one second.
pub(crate) struct RotateTo {
    agent: AgentId,
    target: Direction,
    speed: Option<f64>,
    turning: bool,
}

impl RotateTo {
    pub(crate) fn new(agent: AgentId, target: Direction) -> Self {
        Self { agent, target, speed: None, turning: false }
    }

    /// Rotation toward the square `to` as seen from `from`, if it lies on a
    /// straight or diagonal line.
    pub(crate) fn towards(agent: AgentId, from: Pos, to: Pos) -> Option<Self> {
        Direction::between(from, to).map(|dir| Self::new(agent, dir))
    }

    pub(crate) fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

impl Coroutine<World> for RotateTo {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        if self.turning {
            world.set_facing(self.agent, self.target);
            return Step::Done;
        }
        let facing = world.agent(self.agent).facing;
        if facing == self.target {
            return Step::Done;
        }
        let speed = self.speed.unwrap_or_else(|| world.rotation_speed(self.agent));
        let turn = f64::from(facing.angle_to(self.target));
        self.turning = true;
        job(self.agent, JobKind::Rotate { from: facing, to: self.target }, turn / 360.0 / speed * 2.0)
    }
}

/// Fall animation followed by a fade-out.
pub(crate) struct Falling {
    agent: AgentId,
    stage: u8,
}

impl Falling {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, stage: 0 }
    }
}

impl Coroutine<World> for Falling {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        self.stage += 1;
        let anim = &world.settings().animation;
        match self.stage {
            1 => {
                let clip = if world.agent(self.agent).fall_forward { Clip::FallForward } else { Clip::FallBackward };
                job(self.agent, JobKind::Clip(clip), anim.fall)
            }
            2 => job(self.agent, JobKind::Fade { visible: false }, anim.fade),
            _ => Step::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::*;

    #[test]
    fn diagonal_steps_take_longer() {
        let o = Pos::new(0, 0);
        assert_eq!(step_duration(o, Pos::new(1, 0), 2.0), 0.5);
        assert_eq!(step_duration(o, Pos::new(1, 1), 2.0), 0.7);
    }
}

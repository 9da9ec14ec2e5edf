//! Dragging a corpse: pick it up, swing it behind the player and pull it along.

use std::collections::VecDeque;
use std::mem;

use super::*;
use crate::action::Value;
use crate::agent::body_poses;
use crate::world::{CONTINUE_MOVE_BODY, RELEASE_BODY};

enum State {
    Start,
    PickingUp { body: BodyId },
    Holding { body: BodyId },
    Settling { body: BodyId },
    Stepping { body: BodyId },
    Releasing { body: BodyId },
    Finished,
}

/// Picks up the corpse on the faced square and drags it while the grab key is
/// held and movement keys keep coming.
pub(crate) struct MoveBody {
    agent: AgentId,
    state: State,
}

impl MoveBody {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, state: State::Start }
    }

    fn pick_up(&mut self, world: &mut World) -> Step<World> {
        let player = world.agent(self.agent);
        let (head, facing) = (player.ahead(), player.facing);
        let Some(body) = world.body_at(head) else {
            return Step::Done;
        };
        let Some(b) = world.body(body) else {
            return Step::Done;
        };
        if b.is_carried() {
            return Step::Done;
        }
        let current = b.poses;
        let (first, second) = body_poses(head, facing);
        let fits = |p: Pos| p == current.0 || p == current.1 || world.walk_pred(p);
        if !fits(first) || !fits(second) {
            return Step::Done;
        }
        self.state = State::PickingUp { body };
        job(self.agent, JobKind::Clip(Clip::PickUp), world.settings().animation.pick_up)
    }

    /// Parks until the player either moves or lets go.
    fn hold(&mut self, world: &mut World, body: BodyId) -> Step<World> {
        if world.agent(self.agent).must_die || !world.is_grabbing() {
            return self.release(world, body);
        }
        self.state = State::Holding { body };
        Step::Suspend(Suspend::Events(vec![
            World::death_event(self.agent),
            RELEASE_BODY.to_string(),
            CONTINUE_MOVE_BODY.to_string(),
        ]))
    }

    fn step(&mut self, world: &mut World, body: BodyId) -> Step<World> {
        if world.agent(self.agent).must_die || !world.is_grabbing() {
            return self.hold(world, body);
        }
        self.state = State::Stepping { body };
        Step::Call(Box::new(BodyMovingStep::new(self.agent, body)))
    }

    /// Fades the body back in and then lets go of it where it lies.
    fn release(&mut self, world: &mut World, body: BodyId) -> Step<World> {
        let owner = world.body(body).map_or(self.agent, |b| b.npc);
        self.state = State::Releasing { body };
        job(owner, JobKind::Fade { visible: true }, world.settings().animation.fade)
    }
}

impl Coroutine<World> for MoveBody {
    fn resume(&mut self, world: &mut World, input: Resume) -> Step<World> {
        match mem::replace(&mut self.state, State::Finished) {
            State::Start => self.pick_up(world),
            State::PickingUp { body } => {
                if let Err(err) = world.bind_body(body, self.agent) {
                    world.release_body(body);
                    return Step::Fail(err.into());
                }
                self.hold(world, body)
            }
            State::Holding { body } => match input {
                Resume::Event(name) if name == CONTINUE_MOVE_BODY => {
                    self.state = State::Settling { body };
                    wait(SETTLE)
                }
                Resume::Event(_) => self.release(world, body),
                other => unexpected("a body moving event", other),
            },
            State::Settling { body } => self.step(world, body),
            State::Stepping { body } => match input {
                Resume::Returned(Value::Bool(false)) => self.hold(world, body),
                _ => self.step(world, body),
            },
            State::Releasing { body } => {
                world.release_body(body);
                Step::Done
            }
            State::Finished => Step::Done,
        }
    }
}

enum StepState {
    Start,
    Swinging { next: Pos, target: Pos, arc: VecDeque<Pos>, prev: Pos, last: Option<Pos> },
    Moving { to: Pos },
    Finished,
}

/// One square of dragging. A carried body lies on the faced square and the one
/// beyond, so the player walks backwards: the body is first swung around the
/// player until it sits opposite the move, then the player steps and pulls it
/// along. Returns `false` when no progress was possible.
pub(crate) struct BodyMovingStep {
    agent: AgentId,
    body: BodyId,
    speed: f64,
    state: StepState,
}

impl BodyMovingStep {
    pub(crate) fn new(agent: AgentId, body: BodyId) -> Self {
        Self { agent, body, speed: 1.0, state: StepState::Start }
    }

    fn plan(&mut self, world: &mut World) -> Step<World> {
        self.speed = world.settings().player.body_moving_speed;
        if world.agent(self.agent).must_die {
            return Step::Return(Value::Bool(false));
        }
        let Some(next) = world.next_step(self.agent) else {
            return Step::Return(Value::Bool(false));
        };
        let Some(head) = world.body(self.body).map(|b| b.poses.0) else {
            return Step::Return(Value::Bool(false));
        };
        let pos = world.agent(self.agent).pos;
        // The body must end up on the square opposite the move.
        let target = Pos::new(2 * pos.x - next.x, 2 * pos.y - next.y);
        if head == target {
            return self.advance(world, next);
        }
        let arc: VecDeque<Pos> = world
            .map()
            .radial_path(pos, head, target, |p| world.walk_pred(p), 2)
            .into();
        if arc.is_empty() {
            return Step::Return(Value::Bool(false));
        }
        self.swing(world, next, target, arc, head, None)
    }

    fn swing(
        &mut self,
        world: &mut World,
        next: Pos,
        target: Pos,
        mut arc: VecDeque<Pos>,
        prev: Pos,
        last: Option<Pos>,
    ) -> Step<World> {
        let pos = world.agent(self.agent).pos;
        let cur = arc.pop_front().filter(|cur| {
            !world.map().radial_path(pos, prev, *cur, |p| world.walk_pred(p), 2).is_empty()
        });
        let Some(cur) = cur else {
            if last != Some(target) {
                return Step::Return(Value::Bool(false));
            }
            return self.advance(world, next);
        };
        let Some(rotate) = RotateTo::towards(self.agent, pos, cur) else {
            return Step::Return(Value::Bool(false));
        };
        self.state = StepState::Swinging { next, target, arc, prev: cur, last: Some(cur) };
        Step::Call(Box::new(rotate.with_speed(self.speed)))
    }

    fn advance(&mut self, world: &mut World, next: Pos) -> Step<World> {
        let pos = world.agent(self.agent).pos;
        if !world.map().check_square(pos, next, |p| world.walk_pred(p)) {
            return Step::Return(Value::Bool(false));
        }
        if world.next_step(self.agent) != Some(next) {
            return Step::Return(Value::Bool(false));
        }
        if let Err(err) = world.map_mut().block(next) {
            return Step::Fail(err.into());
        }
        world.agent_mut(self.agent).walking = true;
        self.state = StepState::Moving { to: next };
        job(self.agent, JobKind::Move { from: pos, to: next }, step_duration(pos, next, self.speed))
    }
}

impl Coroutine<World> for BodyMovingStep {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        match mem::replace(&mut self.state, StepState::Finished) {
            StepState::Start => self.plan(world),
            StepState::Swinging { next, target, arc, prev, last } => {
                if let Err(err) = world.refresh_body(self.body) {
                    return Step::Fail(err.into());
                }
                self.swing(world, next, target, arc, prev, last)
            }
            StepState::Moving { to } => {
                let committed = world.commit_move(self.agent, to);
                world.agent_mut(self.agent).walking = false;
                let released = world.map_mut().unblock(to);
                if let Err(err) = committed.and(released) {
                    return Step::Fail(err.into());
                }
                if let Err(err) = world.refresh_body(self.body) {
                    return Step::Fail(err.into());
                }
                Step::Done
            }
            StepState::Finished => Step::Done,
        }
    }
}

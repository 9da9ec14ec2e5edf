//! Player jump: pick a landing square from the jump field, then leap.

use std::collections::VecDeque;
use std::mem;

use super::*;
use crate::world::{JUMP_CONFIRM, JUMP_LEFT, JUMP_RIGHT};

enum State {
    Start,
    Choosing { field: VecDeque<Pos> },
    Turning { to: Pos },
    Crouching { from: Pos, to: Pos },
    Rising { to: Pos },
    Landing,
    Settling,
    Finished,
}

pub(crate) struct Jump {
    agent: AgentId,
    state: State,
}

impl Jump {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, state: State::Start }
    }

    fn choose(&mut self, world: &mut World, field: VecDeque<Pos>) -> Step<World> {
        let Some(&pointer) = field.front() else {
            return Step::Done;
        };
        world.record(LogEvent::JumpPointer { agent: self.agent, at: pointer });
        self.state = State::Choosing { field };
        Step::Suspend(Suspend::Events(vec![
            JUMP_LEFT.to_string(),
            JUMP_RIGHT.to_string(),
            JUMP_CONFIRM.to_string(),
            World::death_event(self.agent),
        ]))
    }

    fn take_off(&mut self, world: &mut World, to: Pos) -> Step<World> {
        let from = world.agent(self.agent).pos;
        if !world.walk_pred(to) {
            return Step::Done;
        }
        if let Err(err) = world.map_mut().block(to) {
            return Step::Fail(err.into());
        }
        self.state = State::Crouching { from, to };
        job(self.agent, JobKind::Clip(Clip::PreJump), world.settings().animation.pre_jump)
    }
}

impl Coroutine<World> for Jump {
    fn resume(&mut self, world: &mut World, input: Resume) -> Step<World> {
        let half = world.settings().player.jump_half_duration;
        match mem::replace(&mut self.state, State::Finished) {
            State::Start => {
                let pos = world.agent(self.agent).pos;
                let field = world.map().jump_field(pos).into();
                self.choose(world, field)
            }
            State::Choosing { mut field } => {
                let name = match input {
                    Resume::Event(name) => name,
                    other => return unexpected("a jump selection event", other),
                };
                match name.as_str() {
                    JUMP_LEFT => {
                        field.rotate_right(1);
                        self.choose(world, field)
                    }
                    JUMP_RIGHT => {
                        field.rotate_left(1);
                        self.choose(world, field)
                    }
                    _ if world.agent(self.agent).must_die => Step::Done,
                    _ => {
                        let pos = world.agent(self.agent).pos;
                        let Some(&to) = field.front() else {
                            return Step::Done;
                        };
                        match RotateTo::towards(self.agent, pos, to) {
                            Some(rotate) => {
                                self.state = State::Turning { to };
                                Step::Call(Box::new(rotate))
                            }
                            None => self.take_off(world, to),
                        }
                    }
                }
            }
            State::Turning { to } => self.take_off(world, to),
            State::Crouching { from, to } => {
                self.state = State::Rising { to };
                job(self.agent, JobKind::Move { from, to }, half)
            }
            State::Rising { to } => {
                let from = world.agent(self.agent).pos;
                let committed = world.commit_move(self.agent, to);
                let released = world.map_mut().unblock(to);
                if let Err(err) = committed.and(released) {
                    return Step::Fail(err.into());
                }
                world.record(LogEvent::Jumped { agent: self.agent, from, to });
                self.state = State::Landing;
                job(self.agent, JobKind::Move { from: to, to }, half)
            }
            State::Landing => {
                self.state = State::Settling;
                job(self.agent, JobKind::Clip(Clip::PostJump), world.settings().animation.post_jump)
            }
            State::Settling => {
                self.state = State::Finished;
                wait(world.settings().player.jump_settle)
            }
            State::Finished => Step::Done,
        }
    }
}

//! Step-by-step walking toward wherever the agent wants to go next.

use super::*;

#[derive(Clone, Copy)]
enum State {
    Start,
    Planning,
    Turning { next: Pos },
    Moving { to: Pos },
    Dying,
}

/// Walks one reserved square at a time until there is nowhere to go, the
/// agent's speed changes, or it is killed.
pub(crate) struct Walk {
    agent: AgentId,
    speed: f64,
    state: State,
}

impl Walk {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, speed: 0.0, state: State::Start }
    }

    fn plan(&mut self, world: &mut World) -> Step<World> {
        let agent = world.agent(self.agent);
        if agent.speed != self.speed {
            return Step::Done;
        }
        if agent.must_die {
            return self.die();
        }
        let pos = agent.pos;
        let Some(next) = world.next_step(self.agent) else {
            return Step::Done;
        };
        if world.agent(self.agent).must_die {
            return self.die();
        }
        let Some(rotate) = RotateTo::towards(self.agent, pos, next) else {
            return Step::Done;
        };
        self.state = State::Turning { next };
        Step::Call(Box::new(rotate))
    }

    fn reserve(&mut self, world: &mut World, next: Pos) -> Step<World> {
        let pos = world.agent(self.agent).pos;
        if !world.map().check_square(pos, next, |p| world.walk_pred(p)) {
            return Step::Done;
        }
        // The player may have let go of the key while turning.
        if world.agent(self.agent).role == Role::Player && world.next_step(self.agent) != Some(next) {
            return Step::Done;
        }
        if let Err(err) = world.map_mut().block(next) {
            return Step::Fail(err.into());
        }
        if world.agent(self.agent).must_die {
            if let Err(err) = world.map_mut().unblock(next) {
                return Step::Fail(err.into());
            }
            return self.die();
        }
        world.agent_mut(self.agent).walking = true;
        self.state = State::Moving { to: next };
        job(self.agent, JobKind::Move { from: pos, to: next }, step_duration(pos, next, self.speed))
    }

    fn arrive(&mut self, world: &mut World, to: Pos) -> Step<World> {
        let committed = world.commit_move(self.agent, to);
        world.agent_mut(self.agent).walking = false;
        let released = world.map_mut().unblock(to);
        if let Err(err) = committed.and(released) {
            return Step::Fail(err.into());
        }
        self.plan(world)
    }

    fn die(&mut self) -> Step<World> {
        self.state = State::Dying;
        await_death(self.agent)
    }
}

impl Coroutine<World> for Walk {
    fn resume(&mut self, world: &mut World, input: Resume) -> Step<World> {
        match self.state {
            State::Start => {
                self.speed = world.agent(self.agent).speed;
                self.state = State::Planning;
                wait(SETTLE)
            }
            State::Planning => self.plan(world),
            State::Turning { next } => self.reserve(world, next),
            State::Moving { to } => self.arrive(world, to),
            State::Dying => match input {
                Resume::Event(_) => {
                    world.record(LogEvent::DeathSignalReceived { agent: self.agent });
                    Step::Done
                }
                other => unexpected("the death event", other),
            },
        }
    }
}

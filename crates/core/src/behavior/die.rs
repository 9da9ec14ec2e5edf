//! Dying, respawning and coming back from a corpse.

use std::mem;

use super::*;

enum PlayerState {
    Start,
    Falling,
    Waiting,
    FadingIn,
    Finished,
}

/// The player falls, waits out the respawn delay and reappears on its start
/// square once nobody stands there.
pub(crate) struct PlayerDie {
    agent: AgentId,
    state: PlayerState,
}

impl PlayerDie {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, state: PlayerState::Start }
    }

    fn respawn(&mut self, world: &mut World) -> Step<World> {
        let home = world.agent(self.agent).init_position;
        if let Some(other) = world.agent_at(home)
            && other != self.agent
        {
            log::debug!("respawn square {home} taken by {other:?}, waiting");
            self.state = PlayerState::Waiting;
            return wait(world.settings().player.respawn_delay);
        }
        world.place_agent(self.agent, home);
        world.agent_mut(self.agent).dead = false;
        log::info!("{:?} respawned on {home}", self.agent);
        world.record(LogEvent::Respawned { agent: self.agent, at: home });
        self.state = PlayerState::FadingIn;
        job(self.agent, JobKind::Fade { visible: true }, world.settings().animation.fade)
    }
}

impl Coroutine<World> for PlayerDie {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        match mem::replace(&mut self.state, PlayerState::Finished) {
            PlayerState::Start => {
                let a = world.agent_mut(self.agent);
                a.dead = true;
                a.must_die = false;
                log::info!("{:?} died", self.agent);
                world.record(LogEvent::Died { agent: self.agent });
                self.state = PlayerState::Falling;
                Step::Call(Box::new(Falling::new(self.agent)))
            }
            PlayerState::Falling => {
                self.state = PlayerState::Waiting;
                wait(world.settings().player.respawn_delay)
            }
            PlayerState::Waiting => self.respawn(world),
            PlayerState::FadingIn | PlayerState::Finished => Step::Done,
        }
    }
}

enum NpcState {
    Start,
    Falling,
    Appearing,
    Settling,
    Finished,
}

/// An NPC falls and leaves a corpse behind.
pub(crate) struct NpcDie {
    agent: AgentId,
    state: NpcState,
}

impl NpcDie {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, state: NpcState::Start }
    }
}

impl Coroutine<World> for NpcDie {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        match mem::replace(&mut self.state, NpcState::Finished) {
            NpcState::Start => {
                world.agent_mut(self.agent).must_die = false;
                self.state = NpcState::Falling;
                Step::Call(Box::new(Falling::new(self.agent)))
            }
            NpcState::Falling => {
                world.agent_mut(self.agent).dead = true;
                log::info!("{:?} died", self.agent);
                world.record(LogEvent::Died { agent: self.agent });
                if world.drop_body(self.agent).is_none() {
                    self.state = NpcState::Settling;
                    return wait(world.settings().npc.corpse_settle);
                }
                self.state = NpcState::Appearing;
                job(self.agent, JobKind::Fade { visible: true }, world.settings().animation.fade)
            }
            NpcState::Appearing => {
                self.state = NpcState::Settling;
                wait(world.settings().npc.corpse_settle)
            }
            NpcState::Settling | NpcState::Finished => Step::Done,
        }
    }
}

/// Brings a dead NPC back on the first square of its corpse, heading home.
pub(crate) struct Revive {
    agent: AgentId,
    started: bool,
}

impl Revive {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, started: false }
    }

    fn rise(&mut self, world: &mut World) -> Step<World> {
        if !world.agent(self.agent).dead {
            return Step::Done;
        }
        let Some(body) = world.body_of(self.agent) else {
            log::debug!("{:?} has no corpse to rise from", self.agent);
            return Step::Done;
        };
        let Some(b) = world.body(body) else {
            return Step::Done;
        };
        let at = b.poses.0;
        if b.is_carried() || world.agent_at(at).is_some() {
            return Step::Done;
        }
        world.remove_body(body);
        world.place_agent(self.agent, at);

        let (speed, view) = (world.settings().npc.speed, world.settings().npc.normal_view);
        let a = world.agent_mut(self.agent);
        a.dead = false;
        a.must_die = false;
        a.target = Target::Square(a.init_position);
        a.speed = speed;
        a.view = view;
        log::info!("{:?} revived on {at}", self.agent);
        world.record(LogEvent::Revived { agent: self.agent, at });
        job(self.agent, JobKind::Fade { visible: true }, world.settings().animation.fade)
    }
}

impl Coroutine<World> for Revive {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        if mem::replace(&mut self.started, true) {
            return Step::Done;
        }
        self.rise(world)
    }
}

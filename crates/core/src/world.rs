//! Simulation state: the map, agents, corpses and the runners driving actions.
//! This module exists to be the single owner that behaviors read and mutate
//! between suspensions, and to route scheduler wakes to the right agent.
//! It does not own presentation; jobs leave through the dispatcher and come
//! back as wakes.

use std::collections::HashMap;
use std::mem;

use slotmap::{Key, SecondaryMap, SlotMap};

use crate::action::{ActionError, Dispatcher, Drive, EventLoop, Host, Runner, Wake, WakeKey};
use crate::agent::{Agent, Body, Route, body_poses};
use crate::behavior;
use crate::config::Settings;
use crate::grid::{GridError, GridMap};
use crate::mapdata::MapData;
use crate::types::*;

mod hash;
mod index;
mod input;
mod npc;
#[cfg(test)]
pub(crate) mod test_support;

pub use index::SpatialIndex;
pub use input::{CONTINUE_MOVE_BODY, Command, JUMP_CONFIRM, JUMP_LEFT, JUMP_RIGHT, RELEASE_BODY};

pub struct World {
    map: GridMap,
    settings: Settings,
    dispatcher: Box<dyn Dispatcher>,
    agents: SlotMap<AgentId, Agent>,
    bodies: SlotMap<BodyId, Body>,
    index: SpatialIndex,
    player: AgentId,
    // Spawn order; NPCs are polled in this order every tick.
    npcs: Vec<AgentId>,
    runners: SecondaryMap<AgentId, Runner<World>>,
    wake_owners: HashMap<WakeKey, AgentId>,
    input: input::InputState,
    log: Vec<LogEvent>,
}

impl Host for World {
    fn dispatcher(&mut self) -> &mut dyn Dispatcher {
        self.dispatcher.as_mut()
    }

    fn resume_grace(&self) -> f64 {
        self.settings.resume_action_timeout
    }
}

impl World {
    /// Places the player on the start position and spawns every NPC group; the
    /// i-th NPC of a group starts on waypoint i of its route.
    pub fn new(data: MapData, settings: Settings, dispatcher: Box<dyn Dispatcher>) -> Self {
        let MapData { map, start_position, routes, npcs, .. } = data;
        let mut agents = SlotMap::with_key();
        let player = agents.insert(Agent::player(start_position, &settings));
        let mut index = SpatialIndex::default();
        index.place_agent(start_position, player);

        let mut world = Self {
            map,
            settings,
            dispatcher,
            agents,
            bodies: SlotMap::with_key(),
            index,
            player,
            npcs: Vec::new(),
            runners: SecondaryMap::new(),
            wake_owners: HashMap::new(),
            input: input::InputState::default(),
            log: Vec::new(),
        };
        for spec in &npcs {
            let Some(points) = routes.get(&spec.route) else {
                log::warn!("npc group '{}' refers to unknown route '{}'", spec.model_name, spec.route);
                continue;
            };
            for i in 0..spec.count {
                world.spawn_npc(points, i);
            }
        }
        world
    }

    pub fn with_event_loop(data: MapData, settings: Settings) -> Self {
        Self::new(data, settings, Box::new(EventLoop::new()))
    }

    /// Adds an NPC on waypoint `offset` of `points`, patrolling onward from there.
    pub fn spawn_npc(&mut self, points: &[Pos], offset: usize) -> Option<AgentId> {
        if points.is_empty() {
            return None;
        }
        let mut route = Route::new(points.iter().copied());
        for _ in 0..offset % points.len() {
            route.advance();
        }
        let pos = route.current()?;
        if !self.map.contains(pos) || self.index.agent_at(pos).is_some() {
            log::warn!("cannot spawn npc on {pos}: square is missing or taken");
            return None;
        }
        let id = self.agents.insert(Agent::npc(route, &self.settings));
        self.index.place_agent(pos, id);
        self.npcs.push(id);
        log::debug!("spawned npc {id:?} on {pos}");
        Some(id)
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut GridMap {
        &mut self.map
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn player(&self) -> AgentId {
        self.player
    }

    pub fn npcs(&self) -> &[AgentId] {
        &self.npcs
    }

    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id]
    }

    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.agents.iter()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> + '_ {
        self.bodies.iter()
    }

    pub fn agent_at(&self, pos: Pos) -> Option<AgentId> {
        self.index.agent_at(pos)
    }

    pub fn body_at(&self, pos: Pos) -> Option<BodyId> {
        self.index.body_at(pos)
    }

    pub fn log(&self) -> &[LogEvent] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<LogEvent> {
        mem::take(&mut self.log)
    }

    pub fn now(&self) -> f64 {
        self.dispatcher.now()
    }

    /// Name of the event that interrupts `agent` when it has been killed.
    pub fn death_event(agent: AgentId) -> String {
        format!("death-{}", agent.data().as_ffi())
    }

    /// On the map and free of agents.
    pub fn is_available(&self, pos: Pos) -> bool {
        self.map.contains(pos) && self.index.agent_at(pos).is_none()
    }

    /// A square an agent may step onto right now.
    pub fn walk_pred(&self, pos: Pos) -> bool {
        self.map.allows(pos, Capabilities::WALK) && self.map.is_available(pos) && self.is_available(pos)
    }

    /// Advances the clock by `dt`, resumes every action whose wake came due and
    /// then gives idle agents a chance to start something new.
    pub fn tick(&mut self, dt: f64) {
        // Death is a persistent signal: re-announce it until the victim listens.
        let doomed: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|(_, a)| a.must_die && a.action.is_some())
            .map(|(id, _)| id)
            .collect();
        for agent in doomed {
            self.dispatcher.emit(&Self::death_event(agent));
        }

        for wake in self.dispatcher.advance(dt) {
            self.deliver(&wake);
        }

        self.update_player(None);
        for npc in self.npcs.clone() {
            self.update_npc(npc);
        }
    }

    /// Starts `requested` on an idle agent. An agent marked to die starts
    /// dying instead.
    pub fn start_action(&mut self, agent: AgentId, requested: ActionName) -> Result<(), ActionError> {
        let a = &self.agents[agent];
        let role = a.role;
        if let Some(running) = a.action {
            return Err(ActionError::Busy { requested, running });
        }
        let action = if a.must_die { ActionName::Die } else { requested };
        if !role.supports(action) {
            return Err(ActionError::Unsupported { role, action });
        }
        if a.dead && action != ActionName::Revive {
            return Err(ActionError::Dead(action));
        }

        self.agents[agent].action = Some(action);
        self.record(LogEvent::ActionStarted { agent, action });
        log::debug!("{agent:?} starts {action}");

        let mut runner = Runner::new(behavior::spawn(action, agent, role));
        let drive = runner.start(self);
        self.settle(agent, runner, drive);
        Ok(())
    }

    fn deliver(&mut self, wake: &Wake) {
        let Some(agent) = self.wake_owners.remove(&wake.key) else {
            log::trace!("dropping stale wake {:?}", wake.key);
            return;
        };
        let Some(mut runner) = self.runners.remove(agent) else {
            return;
        };
        let keys = runner.pending_keys();
        let missed = runner.missed_signals();
        let Some(drive) = runner.deliver(self, wake) else {
            self.runners.insert(agent, runner);
            return;
        };
        for key in keys {
            self.wake_owners.remove(&key);
        }
        if runner.missed_signals() > missed {
            self.record(LogEvent::JobTimedOut { agent });
        }
        self.settle(agent, runner, drive);
    }

    fn settle(&mut self, agent: AgentId, runner: Runner<World>, drive: Drive) {
        match drive {
            Drive::Parked => {
                for key in runner.pending_keys() {
                    self.wake_owners.insert(key, agent);
                }
                self.runners.insert(agent, runner);
            }
            Drive::Finished => self.finish_action(agent, None),
            Drive::Failed(err) => self.finish_action(agent, Some(err)),
        }
    }

    fn finish_action(&mut self, agent: AgentId, failure: Option<ActionError>) {
        let Some(action) = self.agents[agent].action.take() else {
            return;
        };
        self.agents[agent].walking = false;
        match failure {
            None => {
                log::debug!("{agent:?} finished {action}");
                self.record(LogEvent::ActionFinished { agent, action });
            }
            Some(err) => {
                log::error!("{agent:?} failed {action}: {err}");
                self.record(LogEvent::ActionFailed { agent, action, reason: err.to_string() });
            }
        }
    }

    /// Marks `victim` to die at its next safe point. It falls forward when hit
    /// from behind. Hits on the dead or the already doomed are ignored.
    pub fn kill(&mut self, victim: AgentId, by: AgentId, hit: Direction) {
        let v = &mut self.agents[victim];
        if v.dead || v.must_die {
            return;
        }
        v.must_die = true;
        v.fall_forward = v.facing.angle_to(hit) < 90;
        log::info!("{by:?} killed {victim:?}");
        self.record(LogEvent::Killed { victim, by });
    }

    /// Excites every live NPC within the alert radius of `origin` and sets it
    /// on the player.
    pub fn alert(&mut self, origin: Pos) {
        let radius = self.settings.alert_radius;
        let view = self.settings.npc.excited_view;
        let speed = self.settings.npc.excited_speed;
        for &npc in &self.npcs {
            let a = &mut self.agents[npc];
            if a.dead || a.pos.distance(origin) > radius {
                continue;
            }
            a.target = Target::Agent(self.player);
            a.view = view;
            a.speed = speed;
            self.log.push(LogEvent::Alerted { agent: npc, origin });
        }
        log::info!("alert raised at {origin}");
    }

    pub(crate) fn record(&mut self, event: LogEvent) {
        self.log.push(event);
    }

    pub(crate) fn agent_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id]
    }

    pub(crate) fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Where `agent` wants to go next: the held direction for the player, the
    /// next square toward its target for an NPC.
    pub(crate) fn next_step(&mut self, agent: AgentId) -> Option<Pos> {
        match self.agents[agent].role {
            Role::Player => self.player_next_step(),
            Role::Npc => self.npc_next_step(agent),
        }
    }

    pub(crate) fn rotation_speed(&self, agent: AgentId) -> f64 {
        match self.agents[agent].role {
            Role::Player => self.settings.player.rotation_speed,
            Role::Npc => self.settings.npc.rotation_speed,
        }
    }

    pub(crate) fn commit_move(&mut self, agent: AgentId, to: Pos) -> Result<(), GridError> {
        if !self.map.contains(to) {
            return Err(GridError::NotOnMap(to));
        }
        let from = self.agents[agent].pos;
        self.index.move_agent(agent, from, to);
        self.agents[agent].pos = to;
        self.record(LogEvent::Moved { agent, from, to });
        Ok(())
    }

    pub(crate) fn set_facing(&mut self, agent: AgentId, facing: Direction) {
        if self.agents[agent].facing != facing {
            self.agents[agent].facing = facing;
            self.record(LogEvent::Rotated { agent, facing });
        }
    }

    /// Puts an agent that was off the index back onto `pos`.
    pub(crate) fn place_agent(&mut self, agent: AgentId, pos: Pos) {
        let old = self.agents[agent].pos;
        self.index.remove_agent(old, agent);
        self.index.place_agent(pos, agent);
        self.agents[agent].pos = pos;
    }

    /// Drops a dead NPC's corpse on its square and the one it fell toward, or
    /// the first free neighbor. With no room there is no corpse.
    pub(crate) fn drop_body(&mut self, npc: AgentId) -> Option<BodyId> {
        let a = &self.agents[npc];
        let pos = a.pos;
        let fall = if a.fall_forward { a.facing } else { a.facing.opposite() };
        self.index.remove_agent(pos, npc);

        let free = |p: Pos| self.walk_pred(p) && self.index.body_at(p).is_none();
        let preferred = pos.step(fall);
        let tail = if self.map.check_square(pos, preferred, free) {
            Some(preferred)
        } else {
            self.map.neighbors(pos, true).find(|nb| self.map.check_square(pos, *nb, free))
        };
        let Some(tail) = tail else {
            log::info!("no room for the corpse of {npc:?} at {pos}");
            return None;
        };
        let poses = (pos, tail);
        let body = self.bodies.insert(Body::new(npc, poses));
        self.index.place_body(body, poses);
        log::info!("{npc:?} left a corpse on {} and {}", poses.0, poses.1);
        self.record(LogEvent::BodyDropped { body, npc, poses });
        Some(body)
    }

    pub(crate) fn remove_body(&mut self, body: BodyId) -> Option<Body> {
        let removed = self.bodies.remove(body)?;
        self.index.remove_body(body, removed.poses);
        Some(removed)
    }

    /// Squares a body carried by `carrier` covers: the faced square and the one
    /// beyond it.
    pub(crate) fn carried_poses(&self, carrier: AgentId) -> (Pos, Pos) {
        let a = &self.agents[carrier];
        body_poses(a.ahead(), a.facing)
    }

    pub(crate) fn bind_body(&mut self, body: BodyId, carrier: AgentId) -> Result<(), GridError> {
        if let Some(b) = self.bodies.get_mut(body) {
            b.carrier = Some(carrier);
            self.record(LogEvent::BodyPickedUp { body, by: carrier });
        }
        self.refresh_body(body)
    }

    /// Re-derives a carried body's squares from its carrier.
    pub(crate) fn refresh_body(&mut self, body: BodyId) -> Result<(), GridError> {
        let Some(b) = self.bodies.get(body) else {
            return Ok(());
        };
        let Some(carrier) = b.carrier else {
            return Ok(());
        };
        let from = b.poses;
        let to = self.carried_poses(carrier);
        if from == to {
            return Ok(());
        }
        for pos in [to.0, to.1] {
            if !self.map.contains(pos) {
                return Err(GridError::NotOnMap(pos));
            }
        }
        self.index.move_body(body, from, to);
        if let Some(b) = self.bodies.get_mut(body) {
            b.poses = to;
        }
        self.record(LogEvent::BodyMoved { body, poses: to });
        Ok(())
    }

    pub(crate) fn release_body(&mut self, body: BodyId) {
        if let Some(b) = self.bodies.get_mut(body)
            && b.carrier.take().is_some()
        {
            self.record(LogEvent::BodyReleased { body });
        }
    }

    pub(crate) fn body_of(&self, npc: AgentId) -> Option<BodyId> {
        self.bodies.iter().find(|(_, b)| b.npc == npc).map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::action::{Clip, JobKind};
    use crate::grid::test_support::*;
    use crate::world::test_support::*;
    use crate::*;

    #[test]
    fn busy_and_unsupported_actions_are_rejected() {
        let mut world = world_on(open_map(5, 5), Pos::new(2, 2));
        let player = world.player();
        world.start_action(player, ActionName::Hit).expect("idle player can hit");
        let err = world.start_action(player, ActionName::Walk).expect_err("busy");
        assert!(matches!(err, ActionError::Busy { requested: ActionName::Walk, running: ActionName::Hit }));

        run(&mut world, 1.0);
        let err = world.start_action(player, ActionName::Revive).expect_err("players do not revive");
        assert!(matches!(err, ActionError::Unsupported { role: Role::Player, .. }));
    }

    #[test]
    fn walk_interrupted_by_death_releases_and_ends_idle() {
        let mut world = world_on(open_map(5, 5), Pos::new(2, 2));
        let player = world.player();
        world.command(Command::Move(Direction::North));
        assert_eq!(world.agent(player).action, Some(ActionName::Walk));
        world.agent_mut(player).must_die = true;

        world.tick(0.05);
        world.tick(0.0);
        let finished = world
            .log()
            .iter()
            .position(|e| *e == LogEvent::ActionFinished { agent: player, action: ActionName::Walk })
            .expect("walk returns after the death event");
        assert!(world.log()[..finished].contains(&LogEvent::DeathSignalReceived { agent: player }));
        assert_eq!(world.agent(player).pos, Pos::new(2, 2), "no step after death");
        assert_eq!(world.map().blocked().count(), 0);
        assert_eq!(world.agent(player).action, Some(ActionName::Die), "death is forced next");
    }

    #[test]
    fn death_during_rotation_releases_the_reserved_square() {
        let mut world = world_on(open_map(5, 5), Pos::new(2, 2));
        let player = world.player();
        world.command(Command::Move(Direction::South));
        world.tick(0.05);
        assert_eq!(world.map().blocked().count(), 0, "still turning");
        world.agent_mut(player).must_die = true;

        run(&mut world, 1.0);
        assert!(world.log().contains(&LogEvent::DeathSignalReceived { agent: player }));
        assert_eq!(world.agent(player).pos, Pos::new(2, 2));
        assert_eq!(world.map().blocked().count(), 0);
    }

    #[test]
    fn walking_moves_one_square_per_job() {
        let mut world = world_on(open_map(5, 5), Pos::new(0, 0));
        let player = world.player();
        world.command(Command::Move(Direction::North));
        run(&mut world, 1.2);
        world.command(Command::Stop);
        run(&mut world, 1.0);
        assert!(world.agent(player).is_idle());
        // The step in flight when the key was released still lands.
        assert_eq!(world.agent(player).pos, Pos::new(0, 3));
        assert!(world.map().blocked().next().is_none());
        assert_eq!(world.agent_at(Pos::new(0, 3)), Some(player));
        assert_eq!(world.agent_at(Pos::new(0, 0)), None);
    }

    #[test]
    fn hit_kills_the_faced_agent() {
        let mut world = world_on(open_map(5, 5), Pos::new(2, 2));
        let npc = world.spawn_npc(&[Pos::new(2, 3)], 0).expect("free square");
        let player = world.player();
        world.command(Command::Hit);
        run(&mut world, 0.5);
        assert!(world.log().contains(&LogEvent::Killed { victim: npc, by: player }));
        assert!(world.agent(npc).must_die || world.agent(npc).dead);
        assert!(world.agent(npc).fall_forward, "both face north, so the hit lands from behind");
    }

    #[test]
    fn lost_job_signals_still_finish_actions() {
        let mut events = EventLoop::new();
        events.lose_job_signals(true);
        let data = MapData {
            name: "test".into(),
            map: open_map(3, 3),
            start_position: Pos::new(1, 1),
            routes: Default::default(),
            npcs: Vec::new(),
        };
        let mut world = World::new(data, Settings::default(), Box::new(events));
        let player = world.player();
        world.command(Command::Hit);
        run(&mut world, 3.0);
        assert!(world.agent(player).is_idle());
        let timeouts = world.log().iter().filter(|e| matches!(e, LogEvent::JobTimedOut { .. })).count();
        assert_eq!(timeouts, 2, "hit and post-hit clips");
    }

    #[test]
    fn death_events_are_per_agent() {
        let mut world = world_on(open_map(3, 3), Pos::new(0, 0));
        let npc = world.spawn_npc(&[Pos::new(2, 2)], 0).expect("free square");
        assert_ne!(World::death_event(world.player()), World::death_event(npc));
    }

    #[test]
    fn alert_only_reaches_npcs_in_range() {
        let mut world = world_on(open_map(20, 3), Pos::new(0, 0));
        let near = world.spawn_npc(&[Pos::new(3, 1)], 0).expect("free");
        let far = world.spawn_npc(&[Pos::new(19, 1)], 0).expect("free");
        world.alert(Pos::new(2, 1));
        assert_eq!(world.agent(near).target, Target::Agent(world.player()));
        assert_eq!(world.agent(near).speed, world.settings().npc.excited_speed);
        assert_eq!(world.agent(far).speed, world.settings().npc.speed);
    }
}

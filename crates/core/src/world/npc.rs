//! NPC decisions: patrolling, chasing, corpse discovery and path steps.
//! This module exists to keep the per-tick NPC policy in one place. It does not
//! own the actions it picks; those run as behaviors.

use std::collections::BTreeSet;

use super::*;

impl World {
    /// Squares the NPC can see right now.
    pub fn view_field_of(&self, npc: AgentId) -> BTreeSet<Pos> {
        let a = &self.agents[npc];
        self.map.view_field(a.pos, f64::from(a.facing.angle()), a.view.angle, a.view.radius, |p| {
            self.map.allows(p, Capabilities::SEE)
        })
    }

    /// Squares an NPC's path may cross: walkable, unreserved, free of corpses,
    /// and empty unless the occupant is the player or is walking away.
    pub fn npc_path_pred(&self, pos: Pos) -> bool {
        if !self.map.allows(pos, Capabilities::WALK) || !self.map.is_available(pos) {
            return false;
        }
        if self.index.body_at(pos).is_some() {
            return false;
        }
        match self.index.agent_at(pos) {
            None => true,
            Some(id) => id == self.player || self.agents[id].walking,
        }
    }

    /// Picks what an idle NPC should do and updates its target on the way.
    pub(crate) fn decide(&mut self, npc: AgentId) -> ActionName {
        let player = self.player;
        let player_pos = self.agents[player].pos;
        let player_dead = self.agents[player].dead;
        let field = self.view_field_of(npc);
        let me = &self.agents[npc];
        let (pos, ahead, target) = (me.pos, me.ahead(), me.target);

        if target == Target::Agent(player) {
            if !field.contains(&player_pos) {
                log::debug!("{npc:?} lost sight of the player, heading to {player_pos}");
                self.agents[npc].target = Target::Square(player_pos);
            } else if player_dead {
                self.advance_route(npc);
            } else if pos.distance(player_pos) < 1.5 && ahead == player_pos {
                return ActionName::Hit;
            }
            return ActionName::Walk;
        }

        if !player_dead && field.contains(&player_pos) {
            log::info!("{npc:?} spotted the player at {player_pos}");
            self.alert(pos);
            return ActionName::Walk;
        }

        match target {
            Target::Body(body) => match self.bodies.get_mut(body) {
                Some(b) if pos.chebyshev(b.poses.0) > 1 && pos.chebyshev(b.poses.1) > 1 => {}
                Some(b) => {
                    b.discovered = true;
                    log::info!("{npc:?} examined the corpse of {:?}", b.npc);
                    self.record(LogEvent::BodyDiscovered { body, by: npc });
                    self.resume_route(npc);
                }
                None => self.resume_route(npc),
            },
            Target::Square(square) if square == pos => self.advance_route(npc),
            _ => {}
        }

        if !matches!(self.agents[npc].target, Target::Body(_))
            && let Some(body) = self.spotted_corpse(&field)
        {
            log::info!("{npc:?} spotted a corpse");
            self.alert(pos);
            self.agents[npc].target = Target::Body(body);
        }
        ActionName::Walk
    }

    fn spotted_corpse(&self, field: &BTreeSet<Pos>) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, b)| !b.discovered && (field.contains(&b.poses.0) || field.contains(&b.poses.1)))
            .map(|(id, _)| id)
    }

    fn resume_route(&mut self, npc: AgentId) {
        let a = &mut self.agents[npc];
        a.target = Target::Square(a.route.current().unwrap_or(a.init_position));
    }

    fn advance_route(&mut self, npc: AgentId) {
        let a = &mut self.agents[npc];
        a.route.advance();
        a.target = Target::Square(a.route.current().unwrap_or(a.init_position));
    }

    /// First square of the path toward the NPC's target, or `None` when it
    /// should not walk or cannot get closer.
    pub(crate) fn npc_next_step(&mut self, npc: AgentId) -> Option<Pos> {
        if self.decide(npc) != ActionName::Walk {
            return None;
        }
        let me = &self.agents[npc];
        let end = match me.target {
            Target::Square(pos) => pos,
            Target::Agent(id) => self.agents[id].pos,
            Target::Body(body) => self.bodies.get(body)?.poses.0,
        };
        let path = self
            .map
            .path(self.settings.path_algorithm, me.pos, end, |p| p == end || self.npc_path_pred(p))?;
        let next = path.first().copied();
        log::trace!("{npc:?} at {} heading to {end}, next {next:?}", me.pos);
        next
    }

    /// Starts the NPC's next action when it is idle and alive.
    pub(super) fn update_npc(&mut self, npc: AgentId) {
        let me = &self.agents[npc];
        if me.dead || me.action.is_some() {
            return;
        }
        let action = if me.must_die { ActionName::Die } else { self.decide(npc) };
        if let Err(err) = self.start_action(npc, action) {
            log::warn!("{npc:?} cannot {action}: {err}");
        }
    }

    /// Brings a dead NPC back on its corpse's first square.
    pub fn revive(&mut self, npc: AgentId) -> Result<(), ActionError> {
        self.start_action(npc, ActionName::Revive)
    }
}

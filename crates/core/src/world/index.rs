//! Square-to-occupant lookups for agents and corpses.
//! This module exists so every change of who stands where goes through one
//! small set of calls. It does not own agents or bodies.

use std::collections::HashMap;

use crate::types::*;

#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    agents: HashMap<Pos, AgentId>,
    bodies: HashMap<Pos, BodyId>,
}

impl SpatialIndex {
    pub fn agent_at(&self, pos: Pos) -> Option<AgentId> {
        self.agents.get(&pos).copied()
    }

    pub fn body_at(&self, pos: Pos) -> Option<BodyId> {
        self.bodies.get(&pos).copied()
    }

    /// Records `agent` on `pos`; returns the agent that was there before, if any.
    pub fn place_agent(&mut self, pos: Pos, agent: AgentId) -> Option<AgentId> {
        self.agents.insert(pos, agent)
    }

    /// Clears `pos` only if `agent` is the one recorded there.
    pub fn remove_agent(&mut self, pos: Pos, agent: AgentId) {
        if self.agents.get(&pos) == Some(&agent) {
            self.agents.remove(&pos);
        }
    }

    pub fn move_agent(&mut self, agent: AgentId, from: Pos, to: Pos) {
        self.remove_agent(from, agent);
        self.agents.insert(to, agent);
    }

    pub fn place_body(&mut self, body: BodyId, poses: (Pos, Pos)) {
        self.bodies.insert(poses.0, body);
        self.bodies.insert(poses.1, body);
    }

    pub fn remove_body(&mut self, body: BodyId, poses: (Pos, Pos)) {
        for pos in [poses.0, poses.1] {
            if self.bodies.get(&pos) == Some(&body) {
                self.bodies.remove(&pos);
            }
        }
    }

    pub fn move_body(&mut self, body: BodyId, from: (Pos, Pos), to: (Pos, Pos)) {
        self.remove_body(body, from);
        self.place_body(body, to);
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn moves_only_clear_the_mover() {
        let mut ids: SlotMap<AgentId, ()> = SlotMap::with_key();
        let (a, b) = (ids.insert(()), ids.insert(()));
        let mut index = SpatialIndex::default();
        index.place_agent(Pos::new(0, 0), a);
        index.place_agent(Pos::new(1, 0), b);

        index.move_agent(a, Pos::new(1, 0), Pos::new(2, 0));
        assert_eq!(index.agent_at(Pos::new(1, 0)), Some(b), "stale source must not evict others");
        assert_eq!(index.agent_at(Pos::new(2, 0)), Some(a));

        index.remove_agent(Pos::new(0, 0), a);
        assert_eq!(index.agent_at(Pos::new(0, 0)), None);
        assert_eq!(index.agent_count(), 2);
    }

    #[test]
    fn bodies_cover_both_squares() {
        let mut ids: SlotMap<BodyId, ()> = SlotMap::with_key();
        let body = ids.insert(());
        let mut index = SpatialIndex::default();
        index.place_body(body, (Pos::new(0, 0), Pos::new(0, 1)));
        assert_eq!(index.body_at(Pos::new(0, 1)), Some(body));

        index.move_body(body, (Pos::new(0, 0), Pos::new(0, 1)), (Pos::new(0, 1), Pos::new(0, 2)));
        assert_eq!(index.body_at(Pos::new(0, 0)), None);
        assert_eq!(index.body_at(Pos::new(0, 1)), Some(body));
        assert_eq!(index.body_at(Pos::new(0, 2)), Some(body));
    }
}

//! Stable snapshot hashing for deterministic verification.
//! This module exists to keep hashing concerns separate from simulation control code.
//! It does not own the clock or any replay policy.

use std::hash::Hasher;

use xxhash_rust::xxh3::Xxh3;

use super::*;

fn write_pos(hasher: &mut Xxh3, pos: Pos) {
    hasher.write_i32(pos.x);
    hasher.write_i32(pos.y);
}

impl World {
    /// Hash of everything that decides future behavior: the clock, every agent
    /// and corpse, and reserved squares.
    pub fn snapshot_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.write_u64(self.dispatcher.now().to_bits());
        for (id, agent) in &self.agents {
            hasher.write_u64(id.data().as_ffi());
            write_pos(&mut hasher, agent.pos);
            hasher.write_u8(agent.facing as u8);
            hasher.write_u8(agent.action.map_or(0, |a| a as u8 + 1));
            hasher.write_u8(
                u8::from(agent.must_die)
                    | u8::from(agent.dead) << 1
                    | u8::from(agent.walking) << 2
                    | u8::from(agent.fall_forward) << 3,
            );
            hasher.write_u64(agent.speed.to_bits());
            match agent.target {
                Target::Square(pos) => {
                    hasher.write_u8(0);
                    write_pos(&mut hasher, pos);
                }
                Target::Agent(other) => {
                    hasher.write_u8(1);
                    hasher.write_u64(other.data().as_ffi());
                }
                Target::Body(body) => {
                    hasher.write_u8(2);
                    hasher.write_u64(body.data().as_ffi());
                }
            }
            for pos in agent.route.points() {
                write_pos(&mut hasher, pos);
            }
        }
        for (id, body) in &self.bodies {
            hasher.write_u64(id.data().as_ffi());
            write_pos(&mut hasher, body.poses.0);
            write_pos(&mut hasher, body.poses.1);
            hasher.write_u64(body.carrier.map_or(0, |c| c.data().as_ffi()));
            hasher.write_u8(u8::from(body.discovered));
        }
        for pos in self.map.blocked() {
            write_pos(&mut hasher, pos);
        }
        hasher.finish()
    }
}

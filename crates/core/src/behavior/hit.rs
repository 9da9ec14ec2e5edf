//! A single strike at the faced square.

use super::*;

#[derive(Clone, Copy)]
enum State {
    Start,
    Swinging,
    Recovering,
}

pub(crate) struct Hit {
    agent: AgentId,
    state: State,
}

impl Hit {
    pub(crate) fn new(agent: AgentId) -> Self {
        Self { agent, state: State::Start }
    }
}

impl Coroutine<World> for Hit {
    fn resume(&mut self, world: &mut World, _input: Resume) -> Step<World> {
        let anim = &world.settings().animation;
        match self.state {
            State::Start => {
                self.state = State::Swinging;
                job(self.agent, JobKind::Clip(Clip::Hit), anim.hit)
            }
            State::Swinging => {
                let recover = anim.post_hit;
                let striker = world.agent(self.agent);
                if striker.must_die {
                    return Step::Done;
                }
                let facing = striker.facing;
                if let Some(victim) = world.agent_at(striker.ahead())
                    && victim != self.agent
                {
                    world.kill(victim, self.agent, facing);
                }
                self.state = State::Recovering;
                job(self.agent, JobKind::Clip(Clip::PostHit), recover)
            }
            State::Recovering => Step::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::grid::test_support::*;
    use crate::world::Command;
    use crate::world::test_support::*;
    use crate::*;

    #[test]
    fn swing_at_empty_square_kills_nobody() {
        let mut world = world_on(open_map(3, 3), Pos::new(1, 1));
        world.command(Command::Hit);
        run(&mut world, 1.0);
        assert!(!world.log().iter().any(|e| matches!(e, LogEvent::Killed { .. })));
        let player = world.player();
        assert!(world.log().contains(&LogEvent::ActionFinished { agent: player, action: ActionName::Hit }));
    }

    #[test]
    fn npc_hit_from_the_front_falls_backward() {
        let mut world = world_on(open_map(3, 3), Pos::new(1, 0));
        let npc = world.spawn_npc(&[Pos::new(1, 1)], 0).expect("free square");
        world.agent_mut(npc).facing = Direction::South;
        world.command(Command::Hit);
        run(&mut world, 0.45);
        assert!(world.agent(npc).must_die || world.agent(npc).dead);
        assert!(!world.agent(npc).fall_forward);
    }
}

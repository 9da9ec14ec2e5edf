//! Player commands and the events they raise for running actions.
//! This module exists so key handling stays outside behaviors; behaviors only
//! see the held direction and named events.

use super::*;

pub const JUMP_LEFT: &str = "jump-left";
pub const JUMP_RIGHT: &str = "jump-right";
pub const JUMP_CONFIRM: &str = "jump-confirm";
pub const RELEASE_BODY: &str = "release-body";
pub const CONTINUE_MOVE_BODY: &str = "continue-move-body";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start or keep walking; while dragging a body, keep dragging.
    Move(Direction),
    /// Release the movement key.
    Stop,
    Hit,
    Jump,
    JumpLeft,
    JumpRight,
    ConfirmJump,
    GrabBody,
    ReleaseBody,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct InputState {
    pub direction: Option<Direction>,
    pub grabbing: bool,
}

impl World {
    pub fn command(&mut self, command: Command) {
        log::trace!("command {command:?}");
        match command {
            Command::Move(dir) => {
                self.input.direction = Some(dir);
                if self.input.grabbing {
                    self.dispatcher.emit(CONTINUE_MOVE_BODY);
                } else {
                    self.update_player(Some(ActionName::Walk));
                }
            }
            Command::Stop => self.input.direction = None,
            Command::Hit => self.update_player(Some(ActionName::Hit)),
            Command::Jump => self.update_player(Some(ActionName::Jump)),
            Command::JumpLeft => self.dispatcher.emit(JUMP_LEFT),
            Command::JumpRight => self.dispatcher.emit(JUMP_RIGHT),
            Command::ConfirmJump => self.dispatcher.emit(JUMP_CONFIRM),
            Command::GrabBody => {
                self.input.grabbing = true;
                self.update_player(Some(ActionName::MoveBody));
            }
            Command::ReleaseBody => {
                self.input.grabbing = false;
                self.dispatcher.emit(RELEASE_BODY);
            }
        }
    }

    pub fn held_direction(&self) -> Option<Direction> {
        self.input.direction
    }

    /// Whether the grab key is held.
    pub fn is_grabbing(&self) -> bool {
        self.input.grabbing
    }

    pub(crate) fn player_next_step(&self) -> Option<Pos> {
        let dir = self.input.direction?;
        Some(self.agents[self.player].pos.step(dir))
    }

    /// Starts `requested` on an idle player; a held direction alone means walk.
    pub(super) fn update_player(&mut self, requested: Option<ActionName>) {
        let player = &self.agents[self.player];
        if player.dead || player.action.is_some() {
            return;
        }
        let action = if player.must_die {
            Some(ActionName::Die)
        } else {
            requested.or(self.input.direction.map(|_| ActionName::Walk))
        };
        let Some(action) = action else {
            return;
        };
        if let Err(err) = self.start_action(self.player, action) {
            log::warn!("player cannot {action}: {err}");
        }
    }
}

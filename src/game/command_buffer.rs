//! Lock-free command buffer
//!
//! Producers (players, admin tooling) push commands through a bounded
//! crossbeam channel; the host drains everything pending at the start of
//! each tick and applies it to the game in submission order.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::config::AdminConfig;
use crate::game::game_loop::Game;
use crate::game::map::MapError;
use crate::game::state::Team;
use crate::util::vec2::Point;

/// Something a participant asks the game to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send units (by id string) towards a point
    Move {
        team: Team,
        ids: Vec<String>,
        destination: Point,
    },
    Admin(AdminConfig),
    /// Toggle a team's autonomous player
    SetAi { team: Team, enabled: bool },
}

impl Command {
    /// Apply to `game`. Only a bad map in an admin command fails.
    pub fn apply(self, game: &mut Game) -> Result<(), MapError> {
        match self {
            Command::Move { team, ids, destination } => {
                game.submit_move(team, &ids, destination);
            }
            Command::Admin(admin) => game.apply_config(&admin)?,
            Command::SetAi { team, enabled } => {
                if !game.set_ai_enabled(team, enabled) {
                    warn!("No player for {} to toggle AI on", team);
                }
            }
        }
        Ok(())
    }
}

/// Bounded MPSC buffer between producers and the tick loop
pub struct CommandBuffer {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
    capacity: usize,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver, capacity }
    }

    /// A sender handle for one producer
    pub fn sender(&self) -> CommandSender {
        CommandSender { sender: self.sender.clone() }
    }

    /// Non-blocking submit; false if the buffer is full
    #[inline]
    pub fn try_submit(&self, command: Command) -> bool {
        self.sender.try_send(command).is_ok()
    }

    /// Everything pending, oldest first
    pub fn drain(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Clonable producer handle
#[derive(Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
}

impl CommandSender {
    #[inline]
    pub fn try_send(&self, command: Command) -> Result<(), CommandBufferError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => CommandBufferError::Full,
            TrySendError::Disconnected(_) => CommandBufferError::Disconnected,
        })
    }

    pub fn send_move(&self, team: Team, ids: Vec<String>, destination: Point) -> Result<(), CommandBufferError> {
        self.try_send(Command::Move { team, ids, destination })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandBufferError {
    #[error("command buffer full")]
    Full,
    #[error("command buffer disconnected")]
    Disconnected,
}

pub mod command_buffer;
pub mod constants;
pub mod game_loop;
pub mod map;
pub mod performance;
pub mod planet;
pub mod spatial;
pub mod state;
pub mod sync;
pub mod systems;

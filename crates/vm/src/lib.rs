pub mod board;
pub mod logger;
pub mod memory;

pub use board::{Board, BoardConfig, IoRequest, DEVICE_READY};
pub use memory::Memory;

use kernel::Scheduler;

/// The nucleus running on a simulated board.
pub type Nucleus = Scheduler<Board>;

pub fn boot(config: BoardConfig) -> Nucleus {
    Scheduler::new(Board::new(config))
}

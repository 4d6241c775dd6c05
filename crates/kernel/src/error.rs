use core::fmt;

use thiserror::Error;

/// Recoverable failures reported back to the requesting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("resource pool exhausted")]
    ResourceExhausted,
    #[error("custom handler already registered")]
    AlreadyRegistered,
    #[error("no such process")]
    NoSuchProcess,
    #[error("invalid exception type {0}")]
    InvalidExceptionType(u32),
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Halts the nucleus on a broken invariant. There is no supervisor to
/// recover into, so this never returns.
#[cold]
#[track_caller]
pub fn kernel_panic(args: fmt::Arguments<'_>) -> ! {
    log::error!("kernel panic: {}", args);
    panic!("kernel panic: {}", args)
}

macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::error::kernel_panic(format_args!($($arg)*))
    };
}

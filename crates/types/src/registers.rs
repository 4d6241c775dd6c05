/// General-purpose register indices of the saved CPU state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    Zero = 0, // x0: hardwired zero
    Ra = 1,   // x1: return address
    Sp = 2,   // x2: stack pointer
    Gp = 3,   // x3: global pointer
    Tp = 4,   // x4: thread pointer

    T0 = 5,
    T1 = 6,
    T2 = 7,

    S0 = 8, // x8: saved register / frame pointer
    S1 = 9,

    A0 = 10, // x10: syscall arg 0 / return value
    A1 = 11, // x11: syscall arg 1
    A2 = 12, // x12: syscall arg 2
    A3 = 13,
    A4 = 14,
    A5 = 15,
    A6 = 16,
    A7 = 17, // x17: syscall number

    S2 = 18,
    S3 = 19,
    S4 = 20,
    S5 = 21,
    S6 = 22,
    S7 = 23,
    S8 = 24,
    S9 = 25,
    S10 = 26,
    S11 = 27,

    T3 = 28,
    T4 = 29,
    T5 = 30,
    T6 = 31,
}

impl Register {
    #[inline]
    pub const fn idx(self) -> usize {
        self as usize
    }
}

//! Fatal boundary conditions.
//!
//! A misconfigured boundary (no allocator, null allocator) or an exhausted
//! allocator cannot be reported as a status, because building a status needs
//! the very allocator that is missing. These paths end the process.

pub use qgate_contracts::{
    QG_TRAP_ALLOC_FAILED, QG_TRAP_ALLOC_MISALIGNED, QG_TRAP_BAD_TYPE_CONFIG,
    QG_TRAP_NO_ALLOCATOR, QG_TRAP_NULL_ALLOCATOR, QG_TRAP_SIZE_OVERFLOW,
};

#[cold]
#[inline(never)]
pub fn trap(code: i32, msg: &str) -> ! {
    tracing::error!(code, "qgate boundary trap: {msg}");
    trap_exit(code, msg)
}

#[cfg(not(test))]
fn trap_exit(_code: i32, _msg: &str) -> ! {
    std::process::abort()
}

// Unit tests observe traps as panics instead of losing the test process.
#[cfg(test)]
fn trap_exit(code: i32, msg: &str) -> ! {
    panic!("qg_trap({code}): {msg}")
}

//! Allocation indirection.
//!
//! Every block that crosses the boundary is allocated with the caller's
//! allocator so the caller's memory-context rules decide its lifetime. The
//! engine never frees these blocks.
//!
//! Bridge functions take the allocator explicitly (`&A where A: BoundaryAlloc`).
//! The process-wide registry behind `qg_set_palloc_fn` is one such allocator
//! ([`RegisteredPAlloc`]); [`HostPAlloc`] carries a function pointer as a plain
//! value for callers that prefer scoped context passing.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::trap::{
    trap, QG_TRAP_ALLOC_FAILED, QG_TRAP_ALLOC_MISALIGNED, QG_TRAP_NO_ALLOCATOR,
    QG_TRAP_NULL_ALLOCATOR,
};

/// `void *(*)(size_t)`: returns an uninitialized block of at least `size` bytes.
pub type qg_palloc_fn = unsafe extern "C" fn(size: usize) -> *mut c_void;

pub trait BoundaryAlloc {
    /// Raw allocation; may return null. Callers go through [`palloc_with`].
    fn alloc_raw(&self, size: usize) -> *mut u8;

    /// Boundary precondition check run by every bridge entry point, including
    /// the ones that end up allocating nothing.
    fn ensure_ready(&self) {}
}

static PALLOC_FN: AtomicPtr<c_void> = AtomicPtr::new(std::ptr::null_mut());

/// Install the process-wide allocator, replacing any previous one.
///
/// Must happen during single-threaded startup, before any other boundary call.
pub fn set_palloc_fn(palloc_fn: Option<qg_palloc_fn>) {
    let Some(palloc_fn) = palloc_fn else {
        trap(
            QG_TRAP_NULL_ALLOCATOR,
            "qg_set_palloc_fn called with a null allocator",
        );
    };
    let prev = PALLOC_FN.swap(palloc_fn as *mut c_void, Ordering::AcqRel);
    tracing::debug!(replaced = !prev.is_null(), "boundary allocator registered");
}

pub fn registered_palloc_fn() -> Option<qg_palloc_fn> {
    let raw = PALLOC_FN.load(Ordering::Acquire);
    if raw.is_null() {
        return None;
    }
    // SAFETY: `set_palloc_fn` is the only writer and it stores a `qg_palloc_fn`.
    Some(unsafe { std::mem::transmute::<*mut c_void, qg_palloc_fn>(raw) })
}

#[cfg(test)]
pub(crate) fn clear_palloc_fn() {
    PALLOC_FN.store(std::ptr::null_mut(), Ordering::Release);
}

/// The allocator installed with [`set_palloc_fn`], looked up on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegisteredPAlloc;

impl BoundaryAlloc for RegisteredPAlloc {
    fn alloc_raw(&self, size: usize) -> *mut u8 {
        let Some(palloc_fn) = registered_palloc_fn() else {
            trap(
                QG_TRAP_NO_ALLOCATOR,
                "boundary allocation before qg_set_palloc_fn",
            );
        };
        unsafe { palloc_fn(size).cast::<u8>() }
    }

    fn ensure_ready(&self) {
        if registered_palloc_fn().is_none() {
            trap(QG_TRAP_NO_ALLOCATOR, "boundary call before qg_set_palloc_fn");
        }
    }
}

/// A caller allocator passed around as an explicit value.
#[derive(Clone, Copy)]
pub struct HostPAlloc {
    palloc_fn: qg_palloc_fn,
}

impl HostPAlloc {
    pub fn new(palloc_fn: qg_palloc_fn) -> Self {
        HostPAlloc { palloc_fn }
    }

    /// Snapshot of the registry; traps when nothing is registered.
    pub fn registered() -> Self {
        match registered_palloc_fn() {
            Some(palloc_fn) => HostPAlloc { palloc_fn },
            None => trap(
                QG_TRAP_NO_ALLOCATOR,
                "boundary allocation before qg_set_palloc_fn",
            ),
        }
    }
}

impl std::fmt::Debug for HostPAlloc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPAlloc")
            .field("palloc_fn", &(self.palloc_fn as *const c_void))
            .finish()
    }
}

impl BoundaryAlloc for HostPAlloc {
    fn alloc_raw(&self, size: usize) -> *mut u8 {
        unsafe { (self.palloc_fn)(size).cast::<u8>() }
    }
}

/// Allocate `size` bytes aligned to `align`, trapping on null or misalignment.
pub fn palloc_with<A: BoundaryAlloc + ?Sized>(alloc: &A, size: usize, align: usize) -> NonNull<u8> {
    let raw = alloc.alloc_raw(size);
    let Some(block) = NonNull::new(raw) else {
        trap(
            QG_TRAP_ALLOC_FAILED,
            &format!("boundary allocator returned null for {size} bytes"),
        );
    };
    if align > 1 && (block.as_ptr() as usize) % align != 0 {
        trap(
            QG_TRAP_ALLOC_MISALIGNED,
            &format!("boundary allocator returned a block not aligned to {align}"),
        );
    }
    block
}

/// `palloc` through the process-wide registry.
pub fn palloc(size: usize) -> NonNull<u8> {
    palloc_with(&RegisteredPAlloc, size, 1)
}

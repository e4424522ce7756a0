//! Rust-owned status blocks.
//!
//! When the caller is itself Rust there is no foreign memory context to
//! follow: `OwnedStatus` holds the same flat bytes the bridge hands to C
//! callers, allocated from the Rust heap and released on `Drop`. Ownership
//! rules take over the "caller frees with the producing allocator" convention.

use std::alloc::Layout;
use std::ffi::{c_int, CStr};
use std::fmt;
use std::ptr::NonNull;

use crate::status::{
    qg_status, status_alloc_size, write_status, EngineResult, STATUS_ALIGN, STATUS_HEADER_SIZE,
};
use crate::trap::{trap, QG_TRAP_SIZE_OVERFLOW};

pub struct OwnedStatus {
    block: NonNull<u8>,
    layout: Layout,
}

// The block is immutable after construction and exclusively owned.
unsafe impl Send for OwnedStatus {}
unsafe impl Sync for OwnedStatus {}

impl OwnedStatus {
    /// `None` for a successful result, mirroring the null status.
    pub fn encode<R: EngineResult + ?Sized>(result: &R) -> Option<OwnedStatus> {
        if result.succeeded() {
            return None;
        }
        let message = result.status_message();
        Some(Self::from_parts(result.status_code().code(), &message))
    }

    pub fn from_parts(code: c_int, message: &str) -> OwnedStatus {
        let bytes = message.as_bytes();
        let layout = status_alloc_size(bytes.len())
            .and_then(|size| Layout::from_size_align(size, STATUS_ALIGN).ok());
        let Some(layout) = layout else {
            trap(
                QG_TRAP_SIZE_OVERFLOW,
                "status message length overflows the allocation size",
            );
        };
        let raw = unsafe { std::alloc::alloc(layout) };
        let Some(block) = NonNull::new(raw) else {
            std::alloc::handle_alloc_error(layout);
        };
        unsafe { write_status(block, code, bytes) };
        OwnedStatus { block, layout }
    }

    pub fn code(&self) -> c_int {
        unsafe { std::ptr::addr_of!((*self.as_ptr()).code).read() }
    }

    pub fn message(&self) -> &CStr {
        let bytes = &self.as_bytes()[STATUS_HEADER_SIZE..];
        // The block always ends in NUL, so a terminator is always found.
        CStr::from_bytes_until_nul(bytes).unwrap_or_default()
    }

    /// The whole flat block, header included.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.block.as_ptr(), self.layout.size()) }
    }

    pub fn alloc_size(&self) -> usize {
        self.layout.size()
    }

    /// Borrowed view usable with the C-side readers; must not be freed.
    pub fn as_ptr(&self) -> qg_status {
        self.block.as_ptr().cast()
    }
}

impl Drop for OwnedStatus {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.block.as_ptr(), self.layout) }
    }
}

impl fmt::Debug for OwnedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedStatus")
            .field("code", &self.code())
            .field("message", &self.message())
            .finish()
    }
}

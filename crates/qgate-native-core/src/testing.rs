//! Allocators used by the unit tests.

use std::alloc::Layout;
use std::cell::RefCell;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::palloc::BoundaryAlloc;

/// Fill pattern for fresh blocks, so tests can tell written bytes from garbage.
pub const UNINIT_BYTE: u8 = 0xA5;

/// Explicit-context allocator that keeps every block alive and records sizes.
#[derive(Default)]
pub struct TrackingAlloc {
    blocks: RefCell<Vec<(Vec<u64>, usize)>>,
}

impl TrackingAlloc {
    pub fn sizes(&self) -> Vec<usize> {
        self.blocks.borrow().iter().map(|(_, size)| *size).collect()
    }
}

impl BoundaryAlloc for TrackingAlloc {
    fn alloc_raw(&self, size: usize) -> *mut u8 {
        let words = size.div_ceil(8).max(1);
        let mut block = vec![u64::from_ne_bytes([UNINIT_BYTE; 8]); words];
        let ptr = block.as_mut_ptr().cast::<u8>();
        self.blocks.borrow_mut().push((block, size));
        ptr
    }
}

static PALLOC_CALLS: AtomicUsize = AtomicUsize::new(0);
static PALLOC_LAST_SIZE: AtomicUsize = AtomicUsize::new(0);

pub fn test_palloc_calls() -> usize {
    PALLOC_CALLS.load(Ordering::SeqCst)
}

pub fn test_palloc_last_size() -> usize {
    PALLOC_LAST_SIZE.load(Ordering::SeqCst)
}

/// Leaking registry allocator; test processes are short-lived.
pub unsafe extern "C" fn test_palloc(size: usize) -> *mut c_void {
    PALLOC_CALLS.fetch_add(1, Ordering::SeqCst);
    PALLOC_LAST_SIZE.store(size, Ordering::SeqCst);
    let Ok(layout) = Layout::from_size_align(size.max(1), 8) else {
        return std::ptr::null_mut();
    };
    let ptr = std::alloc::alloc(layout);
    if !ptr.is_null() {
        std::ptr::write_bytes(ptr, UNINIT_BYTE, size);
    }
    ptr.cast::<c_void>()
}

pub unsafe extern "C" fn null_palloc(_size: usize) -> *mut c_void {
    std::ptr::null_mut()
}

#[repr(C, align(8))]
struct Scratch([u8; 64]);

static mut MISALIGNED_SCRATCH: Scratch = Scratch([0; 64]);

pub unsafe extern "C" fn misaligned_palloc(_size: usize) -> *mut c_void {
    std::ptr::addr_of_mut!(MISALIGNED_SCRATCH)
        .cast::<u8>()
        .add(1)
        .cast::<c_void>()
}

#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

//! Native side of the qgate boundary: the status protocol, the caller
//! allocator registry and the type resolver behind the C ABI in
//! `include/qgate.h`.

pub mod ffi;
pub mod owned;
pub mod palloc;
pub mod status;
pub mod trap;
pub mod types;

#[cfg(test)]
mod testing;

pub use ffi::qg_type_descriptor;
pub use owned::OwnedStatus;
pub use palloc::{
    palloc, palloc_with, qg_palloc_fn, registered_palloc_fn, set_palloc_fn, BoundaryAlloc,
    HostPAlloc, RegisteredPAlloc,
};
pub use status::{
    encode_failure, encode_success, not_supported, qg_status, qg_status_struct, status_code,
    status_message, to_qg_status, EngineResult, Status, StatusCode, STATUS_HEADER_SIZE,
};
pub use trap::trap;
pub use types::{
    init_type_resolver, init_type_resolver_from_env, init_type_resolver_json, resolve_type,
    type_resolver,
};

//! C-ABI surface consumed by the front-end. Declared in `include/qgate.h`.
//!
//! Nothing here unwinds into the caller: fallible bodies run under
//! `catch_unwind` and a panic comes back as an `InternalError` status.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::AssertUnwindSafe;

use qgate_contracts::QG_WIRE_TYPE_NOT_SUPPORTED;
use qgate_types::TypeDescriptor;

use crate::palloc::{palloc, qg_palloc_fn, set_palloc_fn, BoundaryAlloc, RegisteredPAlloc};
use crate::status::{encode_success, not_supported, qg_status, to_qg_status, Status, StatusCode};
use crate::types::{
    init_type_resolver_from_env, init_type_resolver_json, resolve_type, type_resolver,
};

#[repr(C)]
#[derive(Copy, Clone)]
pub struct qg_type_descriptor {
    pub schema: *const c_char, // nullable
    pub name: *const c_char,
    pub typmods: *const i32,
    pub num_typmods: usize,
    pub array_dims: c_int,
}

fn guard(entry: &str, f: impl FnOnce() -> qg_status) -> qg_status {
    std::panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        to_qg_status(
            &RegisteredPAlloc,
            &Status::new(StatusCode::InternalError, format!("panic in {entry}")),
        )
    })
}

fn invalid(msg: impl Into<String>) -> Status {
    Status::new(StatusCode::InvalidArgument, msg)
}

unsafe fn c_str_arg<'a>(p: *const c_char, what: &str) -> Result<&'a str, Status> {
    CStr::from_ptr(p)
        .to_str()
        .map_err(|_| invalid(format!("{what} is not valid UTF-8")))
}

unsafe fn descriptor_from_c(d: *const qg_type_descriptor) -> Result<TypeDescriptor, Status> {
    let Some(d) = d.as_ref() else {
        return Err(invalid("type descriptor is null"));
    };
    if d.name.is_null() {
        return Err(invalid("type name is null"));
    }
    let name = c_str_arg(d.name, "type name")?;
    let schema = if d.schema.is_null() {
        None
    } else {
        Some(c_str_arg(d.schema, "type schema")?.to_string())
    };
    let typmods = match (d.typmods.is_null(), d.num_typmods) {
        (_, 0) => Vec::new(),
        (true, n) => return Err(invalid(format!("typmods is null but num_typmods is {n}"))),
        (false, n) => std::slice::from_raw_parts(d.typmods, n).to_vec(),
    };
    let Ok(array_dims) = u32::try_from(d.array_dims) else {
        return Err(invalid(format!("array_dims {} is negative", d.array_dims)));
    };
    Ok(TypeDescriptor {
        schema,
        name: name.to_string(),
        typmods,
        array_dims,
    })
}

#[no_mangle]
pub extern "C" fn qg_set_palloc_fn(palloc_fn: Option<qg_palloc_fn>) {
    set_palloc_fn(palloc_fn);
}

#[no_mangle]
pub extern "C" fn qg_palloc(size: usize) -> *mut c_void {
    palloc(size).as_ptr().cast()
}

#[no_mangle]
pub extern "C" fn qg_status_ok() -> qg_status {
    RegisteredPAlloc.ensure_ready();
    encode_success()
}

/// `feature_name` may be null, which reads as the empty name.
#[no_mangle]
pub unsafe extern "C" fn qg_status_not_supported(feature_name: *const c_char) -> qg_status {
    guard("qg_status_not_supported", || {
        let name = if feature_name.is_null() {
            String::new()
        } else {
            CStr::from_ptr(feature_name).to_string_lossy().into_owned()
        };
        not_supported(&RegisteredPAlloc, &name)
    })
}

/// Build the process-wide resolver from `QGATE_TYPE_POLICY`/`QGATE_TYPE_TABLE`.
#[no_mangle]
pub extern "C" fn qg_init_type_resolver() -> qg_status {
    guard("qg_init_type_resolver", || {
        to_qg_status(&RegisteredPAlloc, &init_type_resolver_from_env())
    })
}

/// Install a catalog-supplied type table given as `len` bytes of JSON.
#[no_mangle]
pub unsafe extern "C" fn qg_init_type_resolver_json(json: *const u8, len: usize) -> qg_status {
    guard("qg_init_type_resolver_json", || {
        if json.is_null() {
            return to_qg_status(&RegisteredPAlloc, &invalid("type table JSON is null"));
        }
        let bytes = std::slice::from_raw_parts(json, len);
        to_qg_status(&RegisteredPAlloc, &init_type_resolver_json(bytes))
    })
}

/// On success writes the wire type code to `*out_type` and returns the null
/// status; `*out_type` is left untouched on failure.
#[no_mangle]
pub unsafe extern "C" fn qg_resolve_type(
    desc: *const qg_type_descriptor,
    out_type: *mut c_int,
) -> qg_status {
    guard("qg_resolve_type", || {
        RegisteredPAlloc.ensure_ready();
        if out_type.is_null() {
            return to_qg_status(&RegisteredPAlloc, &invalid("out_type is null"));
        }
        let res = descriptor_from_c(desc).and_then(|d| resolve_type(type_resolver(), &d));
        match res {
            Ok(wire) => {
                out_type.write(wire.code());
                encode_success()
            }
            Err(status) => to_qg_status(&RegisteredPAlloc, &status),
        }
    })
}

/// Flat lookup: the wire type code, or `QG_WIRE_TYPE_NOT_SUPPORTED` (-1).
/// Allocates nothing.
#[no_mangle]
pub unsafe extern "C" fn qg_data_type_from_name(desc: *const qg_type_descriptor) -> c_int {
    std::panic::catch_unwind(AssertUnwindSafe(|| {
        match descriptor_from_c(desc).and_then(|d| resolve_type(type_resolver(), &d)) {
            Ok(wire) => wire.code(),
            Err(_) => QG_WIRE_TYPE_NOT_SUPPORTED,
        }
    }))
    .unwrap_or(QG_WIRE_TYPE_NOT_SUPPORTED)
}

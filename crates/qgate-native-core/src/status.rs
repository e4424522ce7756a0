//! Status bridge: internal results to flat, caller-owned status blocks.
//!
//! Layout of a failure block (`qg_status_struct`):
//!
//! ```text
//! +------------+---------------------------+-----+
//! | int code   | message bytes             | NUL |
//! +------------+---------------------------+-----+
//!  header        len(message)               1
//! ```
//!
//! There is no length field; the NUL terminator delimits the message. Success
//! is the null pointer and allocates nothing.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, CStr};
use std::fmt;
use std::ptr::NonNull;

use crate::palloc::{palloc_with, BoundaryAlloc};
use crate::trap::{trap, QG_TRAP_SIZE_OVERFLOW};

#[repr(C)]
pub struct qg_status_struct {
    pub code: c_int,
    pub msg: [c_char; 0],
}

pub type qg_status = *mut qg_status_struct;

pub const STATUS_HEADER_SIZE: usize = std::mem::size_of::<qg_status_struct>();
pub const STATUS_ALIGN: usize = std::mem::align_of::<qg_status_struct>();

// -------------------------
// Engine status taxonomy
// -------------------------

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok = 0,
    NotFound = 1,
    Corruption = 2,
    NotSupported = 3,
    InvalidArgument = 4,
    IoError = 5,
    AlreadyPresent = 6,
    RuntimeError = 7,
    NetworkError = 8,
    IllegalState = 9,
    NotAuthorized = 10,
    Aborted = 11,
    RemoteError = 12,
    ServiceUnavailable = 13,
    TimedOut = 14,
    Uninitialized = 15,
    ConfigurationError = 16,
    Incomplete = 17,
    EndOfFile = 18,
    InvalidCommand = 19,
    QlError = 20,
    InternalError = 21,
}

impl StatusCode {
    pub const ALL: [StatusCode; 22] = [
        StatusCode::Ok,
        StatusCode::NotFound,
        StatusCode::Corruption,
        StatusCode::NotSupported,
        StatusCode::InvalidArgument,
        StatusCode::IoError,
        StatusCode::AlreadyPresent,
        StatusCode::RuntimeError,
        StatusCode::NetworkError,
        StatusCode::IllegalState,
        StatusCode::NotAuthorized,
        StatusCode::Aborted,
        StatusCode::RemoteError,
        StatusCode::ServiceUnavailable,
        StatusCode::TimedOut,
        StatusCode::Uninitialized,
        StatusCode::ConfigurationError,
        StatusCode::Incomplete,
        StatusCode::EndOfFile,
        StatusCode::InvalidCommand,
        StatusCode::QlError,
        StatusCode::InternalError,
    ];

    pub fn code(self) -> c_int {
        self as c_int
    }

    pub fn from_code(code: c_int) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not found",
            StatusCode::Corruption => "Corruption",
            StatusCode::NotSupported => "Not implemented",
            StatusCode::InvalidArgument => "Invalid argument",
            StatusCode::IoError => "IO error",
            StatusCode::AlreadyPresent => "Already present",
            StatusCode::RuntimeError => "Runtime error",
            StatusCode::NetworkError => "Network error",
            StatusCode::IllegalState => "Illegal state",
            StatusCode::NotAuthorized => "Not authorized",
            StatusCode::Aborted => "Aborted",
            StatusCode::RemoteError => "Remote error",
            StatusCode::ServiceUnavailable => "Service unavailable",
            StatusCode::TimedOut => "Timed out",
            StatusCode::Uninitialized => "Uninitialized",
            StatusCode::ConfigurationError => "Configuration error",
            StatusCode::Incomplete => "Incomplete",
            StatusCode::EndOfFile => "End of file",
            StatusCode::InvalidCommand => "Invalid command",
            StatusCode::QlError => "Query error",
            StatusCode::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rich engine-side result. Only the code and message cross the boundary;
/// `detail` stays on this side and is logged when the status is encoded.
#[derive(Debug)]
pub struct Status {
    code: StatusCode,
    message: String,
    detail: Option<anyhow::Error>,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: StatusCode::Ok,
            message: String::new(),
            detail: None,
        }
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Status {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn not_supported(feature_name: &str) -> Self {
        if feature_name.is_empty() {
            Status::new(StatusCode::NotSupported, "Feature is not supported")
        } else {
            Status::new(
                StatusCode::NotSupported,
                format!("Feature '{feature_name}' not supported"),
            )
        }
    }

    pub fn with_detail(mut self, detail: impl Into<anyhow::Error>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&anyhow::Error> {
        self.detail.as_ref()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str(self.code.as_str());
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.detail
            .as_ref()
            .map(|d| &**d as &(dyn std::error::Error + 'static))
    }
}

/// What the bridge needs to know about an engine result.
pub trait EngineResult {
    fn status_code(&self) -> StatusCode;

    fn status_message(&self) -> Cow<'_, str>;

    fn status_detail(&self) -> Option<String> {
        None
    }

    fn succeeded(&self) -> bool {
        self.status_code() == StatusCode::Ok
    }
}

impl EngineResult for Status {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn status_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn status_detail(&self) -> Option<String> {
        self.detail.as_ref().map(|d| format!("{d:#}"))
    }
}

impl<T, E: EngineResult> EngineResult for Result<T, E> {
    fn status_code(&self) -> StatusCode {
        match self {
            Ok(_) => StatusCode::Ok,
            Err(e) => e.status_code(),
        }
    }

    fn status_message(&self) -> Cow<'_, str> {
        match self {
            Ok(_) => Cow::Borrowed(""),
            Err(e) => e.status_message(),
        }
    }

    fn status_detail(&self) -> Option<String> {
        self.as_ref().err().and_then(|e| e.status_detail())
    }
}

// -------------------------
// Encoding
// -------------------------

/// Exact block size for a message of `msg_len` bytes: header + message + NUL.
pub fn status_alloc_size(msg_len: usize) -> Option<usize> {
    STATUS_HEADER_SIZE.checked_add(msg_len)?.checked_add(1)
}

pub fn encode_success() -> qg_status {
    std::ptr::null_mut()
}

pub fn encode_failure<A: BoundaryAlloc + ?Sized>(
    alloc: &A,
    code: c_int,
    message: &str,
) -> qg_status {
    let bytes = message.as_bytes();
    let Some(total) = status_alloc_size(bytes.len()) else {
        trap(
            QG_TRAP_SIZE_OVERFLOW,
            "status message length overflows the allocation size",
        );
    };
    let block = palloc_with(alloc, total, STATUS_ALIGN);
    unsafe { write_status(block, code, bytes) }
}

/// Writes header and message with `strncpy` semantics: bytes after an
/// embedded NUL are zero-filled, never copied.
///
/// # Safety
///
/// `block` must be writable for `status_alloc_size(msg.len())` bytes and
/// aligned for `qg_status_struct`.
pub(crate) unsafe fn write_status(block: NonNull<u8>, code: c_int, msg: &[u8]) -> qg_status {
    let st = block.as_ptr().cast::<qg_status_struct>();
    std::ptr::addr_of_mut!((*st).code).write(code);
    let dst = block.as_ptr().add(STATUS_HEADER_SIZE);
    let copy_len = msg.iter().position(|&b| b == 0).unwrap_or(msg.len());
    std::ptr::copy_nonoverlapping(msg.as_ptr(), dst, copy_len);
    std::ptr::write_bytes(dst.add(copy_len), 0, msg.len() + 1 - copy_len);
    st
}

/// Encode any engine result; success yields the null status.
pub fn to_qg_status<A, R>(alloc: &A, result: &R) -> qg_status
where
    A: BoundaryAlloc + ?Sized,
    R: EngineResult + ?Sized,
{
    alloc.ensure_ready();
    if result.succeeded() {
        return encode_success();
    }
    let code = result.status_code();
    let message = result.status_message();
    match result.status_detail() {
        Some(detail) => tracing::debug!(
            code = code.code(),
            kind = code.as_str(),
            %message,
            %detail,
            "encoding boundary status"
        ),
        None => tracing::debug!(
            code = code.code(),
            kind = code.as_str(),
            %message,
            "encoding boundary status"
        ),
    }
    encode_failure(alloc, code.code(), &message)
}

pub fn not_supported<A: BoundaryAlloc + ?Sized>(alloc: &A, feature_name: &str) -> qg_status {
    to_qg_status(alloc, &Status::not_supported(feature_name))
}

// -------------------------
// Caller-side readers
// -------------------------

/// # Safety
///
/// `status` must be null or a live block produced by this bridge.
pub unsafe fn status_code(status: qg_status) -> Option<c_int> {
    if status.is_null() {
        return None;
    }
    Some(std::ptr::addr_of!((*status).code).read())
}

/// # Safety
///
/// `status` must be null or a live block produced by this bridge, and must
/// outlive the returned reference.
pub unsafe fn status_message<'a>(status: qg_status) -> Option<&'a CStr> {
    if status.is_null() {
        return None;
    }
    let msg = status
        .cast::<u8>()
        .add(STATUS_HEADER_SIZE)
        .cast::<c_char>();
    Some(CStr::from_ptr(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palloc::{clear_palloc_fn, set_palloc_fn, RegisteredPAlloc};
    use crate::testing::{test_palloc, test_palloc_last_size, TrackingAlloc, UNINIT_BYTE};
    use serial_test::serial;

    fn read(status: qg_status) -> (c_int, String) {
        unsafe {
            (
                status_code(status).expect("failure status"),
                status_message(status)
                    .expect("failure status")
                    .to_str()
                    .expect("utf-8")
                    .to_string(),
            )
        }
    }

    #[test]
    fn header_is_a_bare_int() {
        assert_eq!(STATUS_HEADER_SIZE, std::mem::size_of::<c_int>());
        assert_eq!(STATUS_ALIGN, std::mem::align_of::<c_int>());
        assert_eq!(std::mem::offset_of!(qg_status_struct, msg), STATUS_HEADER_SIZE);
    }

    #[test]
    fn success_is_null_and_allocates_nothing() {
        let alloc = TrackingAlloc::default();
        assert!(encode_success().is_null());
        assert!(to_qg_status(&alloc, &Status::ok()).is_null());
        let ok: Result<u64, Status> = Ok(7);
        assert!(to_qg_status(&alloc, &ok).is_null());
        assert!(alloc.sizes().is_empty());
        unsafe {
            assert_eq!(status_code(encode_success()), None);
            assert!(status_message(encode_success()).is_none());
        }
    }

    #[test]
    fn failure_round_trips_code_and_message() {
        let alloc = TrackingAlloc::default();
        for (code, msg) in [
            (5, "disk full"),
            (21, "x"),
            (-3, "négatif: ünïcödé"),
            (i32::MAX, "tablet 7f0c not found in catalog"),
        ] {
            let st = encode_failure(&alloc, code, msg);
            assert_eq!(read(st), (code, msg.to_string()));
        }
    }

    #[test]
    fn allocation_is_exactly_header_message_nul() {
        let alloc = TrackingAlloc::default();
        let msg = "the quick brown fox";
        let _ = encode_failure(&alloc, 4, msg);
        let _ = encode_failure(&alloc, 4, "");
        assert_eq!(
            alloc.sizes(),
            vec![STATUS_HEADER_SIZE + msg.len() + 1, STATUS_HEADER_SIZE + 1]
        );
        assert_eq!(status_alloc_size(msg.len()), Some(STATUS_HEADER_SIZE + 20));
        assert_eq!(status_alloc_size(usize::MAX), None);
    }

    #[test]
    fn empty_message_is_a_lone_terminator() {
        let alloc = TrackingAlloc::default();
        let st = encode_failure(&alloc, 7, "");
        assert_eq!(read(st), (7, String::new()));
        let byte = unsafe { *st.cast::<u8>().add(STATUS_HEADER_SIZE) };
        assert_eq!(byte, 0);
    }

    #[test]
    fn embedded_nul_truncates_and_zero_fills() {
        let alloc = TrackingAlloc::default();
        let msg = "abc\0def";
        let st = encode_failure(&alloc, 2, msg);
        assert_eq!(read(st), (2, "abc".to_string()));
        assert_eq!(alloc.sizes(), vec![STATUS_HEADER_SIZE + msg.len() + 1]);

        let tail = unsafe {
            std::slice::from_raw_parts(st.cast::<u8>().add(STATUS_HEADER_SIZE), msg.len() + 1)
        };
        assert_eq!(tail, b"abc\0\0\0\0\0");
        assert!(!tail.contains(&UNINIT_BYTE));
    }

    #[test]
    fn not_supported_messages() {
        let alloc = TrackingAlloc::default();
        let generic = not_supported(&alloc, "");
        assert_eq!(
            read(generic),
            (
                StatusCode::NotSupported.code(),
                "Feature is not supported".to_string()
            )
        );
        let named = not_supported(&alloc, "foo");
        assert_eq!(
            read(named),
            (
                StatusCode::NotSupported.code(),
                "Feature 'foo' not supported".to_string()
            )
        );
    }

    #[test]
    fn result_errors_encode_their_status() {
        let alloc = TrackingAlloc::default();
        let io = std::io::Error::new(std::io::ErrorKind::Other, "ENOSPC");
        let res: Result<(), Status> =
            Err(Status::new(StatusCode::IoError, "disk full").with_detail(io));
        assert_eq!(res.status_detail().as_deref(), Some("ENOSPC"));
        let st = to_qg_status(&alloc, &res);
        assert_eq!(read(st), (5, "disk full".to_string()));
    }

    #[test]
    fn display_and_source() {
        let st = Status::new(StatusCode::IoError, "disk full")
            .with_detail(anyhow::anyhow!("write to wal segment 12"));
        assert_eq!(st.to_string(), "IO error: disk full");
        let src = std::error::Error::source(&st).expect("detail as source");
        assert_eq!(src.to_string(), "write to wal segment 12");
        assert_eq!(
            st.detail().map(|d| d.to_string()).as_deref(),
            Some("write to wal segment 12")
        );
        assert!(Status::ok().detail().is_none());
        assert_eq!(Status::ok().to_string(), "OK");
    }

    #[test]
    fn status_codes_round_trip() {
        for c in StatusCode::ALL {
            assert_eq!(StatusCode::from_code(c.code()), Some(c));
        }
        assert_eq!(StatusCode::from_code(22), None);
        assert_eq!(StatusCode::NotSupported.code(), 3);
        assert_eq!(StatusCode::IoError.code(), 5);
    }

    #[test]
    #[serial]
    fn registry_backed_encoding() {
        clear_palloc_fn();
        set_palloc_fn(Some(test_palloc));
        let st = encode_failure(&RegisteredPAlloc, 5, "disk full");
        assert_eq!(test_palloc_last_size(), STATUS_HEADER_SIZE + 10);
        assert_eq!(read(st), (5, "disk full".to_string()));
        clear_palloc_fn();
    }

    #[test]
    #[serial]
    #[should_panic(expected = "qg_trap(9801)")]
    fn encoding_before_registration_traps() {
        clear_palloc_fn();
        let _ = not_supported(&RegisteredPAlloc, "foo");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "qg_trap(9801)")]
    fn success_before_registration_traps_too() {
        clear_palloc_fn();
        let _ = to_qg_status(&RegisteredPAlloc, &Status::ok());
    }
}

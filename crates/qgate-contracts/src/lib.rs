//! Shared, version-pinned boundary identifiers.
//!
//! These constants are the single source of truth for schema/version strings,
//! environment variable names and trap codes that appear on either side of the
//! front-end/engine boundary. Bump the `@x.y.z` suffix whenever the shape of the
//! corresponding document changes.

pub const TYPE_TABLE_SCHEMA_VERSION: &str = "qgate.type-table@0.1.0";

pub const TABLE_CHECK_REPORT_SCHEMA_VERSION: &str = "qgate.table-check.report@0.1.0";
pub const RESOLVE_REPORT_SCHEMA_VERSION: &str = "qgate.resolve.report@0.1.0";
pub const ABI_REPORT_SCHEMA_VERSION: &str = "qgate.abi.report@0.1.0";

pub const ENV_TYPE_POLICY: &str = "QGATE_TYPE_POLICY";
pub const ENV_TYPE_TABLE: &str = "QGATE_TYPE_TABLE";

// -------------------------
// Trap codes (fatal, never surfaced as a status)
// -------------------------

pub const QG_TRAP_NO_ALLOCATOR: i32 = 9801;
pub const QG_TRAP_NULL_ALLOCATOR: i32 = 9802;
pub const QG_TRAP_ALLOC_FAILED: i32 = 9803;
pub const QG_TRAP_ALLOC_MISALIGNED: i32 = 9804;
pub const QG_TRAP_SIZE_OVERFLOW: i32 = 9805;
pub const QG_TRAP_BAD_TYPE_CONFIG: i32 = 9806;

pub const ALL_TRAP_CODES: &[(&str, i32)] = &[
    ("no_allocator", QG_TRAP_NO_ALLOCATOR),
    ("null_allocator", QG_TRAP_NULL_ALLOCATOR),
    ("alloc_failed", QG_TRAP_ALLOC_FAILED),
    ("alloc_misaligned", QG_TRAP_ALLOC_MISALIGNED),
    ("size_overflow", QG_TRAP_SIZE_OVERFLOW),
    ("bad_type_config", QG_TRAP_BAD_TYPE_CONFIG),
];

/// C-ABI sentinel returned by the flat type lookup when no wire type applies.
pub const QG_WIRE_TYPE_NOT_SUPPORTED: i32 = -1;

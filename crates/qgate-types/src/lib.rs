//! Type descriptors, engine wire type codes and the resolver between them.
//!
//! Nothing in this crate crosses the C ABI; `qgate-native-core` wraps it and
//! turns resolution failures into boundary statuses.

pub mod config;
pub mod descriptor;
pub mod resolver;
pub mod table;
pub mod wire;

pub use config::ResolverConfig;
pub use descriptor::{normalize_type_name, TypeDescriptor};
pub use resolver::{PolicyParseError, ResolveError, ResolvePolicy, TypeResolver};
pub use table::{IssueSeverity, TableIssue, TypeTable, TypeTableEntry, TypmodBound, TypmodRule};
pub use wire::WireTypeCode;

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use serde::Serialize;

use crate::descriptor::TypeDescriptor;
use crate::table::TypeTable;
use crate::wire::WireTypeCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Accept every descriptor as the default integral wire type.
    Placeholder,
    /// Look descriptors up in a catalog-supplied [`TypeTable`].
    Table,
}

impl ResolvePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvePolicy::Placeholder => "placeholder",
            ResolvePolicy::Table => "table",
        }
    }
}

impl fmt::Display for ResolvePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PolicyParseError {
    value: String,
}

impl fmt::Display for PolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid type policy {:?} (expected one of: placeholder, table)",
            self.value
        )
    }
}

impl std::error::Error for PolicyParseError {}

impl FromStr for ResolvePolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "placeholder" | "default" => Ok(ResolvePolicy::Placeholder),
            "table" => Ok(ResolvePolicy::Table),
            _ => Err(PolicyParseError { value: s }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnsupportedType { descriptor: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnsupportedType { descriptor } => {
                write!(f, "Type '{descriptor}' not supported")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

#[derive(Debug, Clone)]
enum Mode {
    Placeholder,
    Table(TypeTable),
}

/// Maps caller-level type descriptors to engine wire type codes.
///
/// `resolve` is a pure function of the descriptor and the resolver's
/// configuration: it never allocates across the boundary and never logs.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    mode: Mode,
}

static PLACEHOLDER_WARNING: Once = Once::new();

impl TypeResolver {
    /// Constant-`Int64` resolver standing in until a mapping table is supplied.
    pub fn placeholder() -> Self {
        PLACEHOLDER_WARNING.call_once(|| {
            tracing::warn!(
                wire_type = %WireTypeCode::default(),
                "type resolver running placeholder policy; every type maps to the default wire type"
            );
        });
        TypeResolver {
            mode: Mode::Placeholder,
        }
    }

    pub fn with_table(table: TypeTable) -> Self {
        TypeResolver {
            mode: Mode::Table(table),
        }
    }

    pub fn policy(&self) -> ResolvePolicy {
        match self.mode {
            Mode::Placeholder => ResolvePolicy::Placeholder,
            Mode::Table(_) => ResolvePolicy::Table,
        }
    }

    pub fn table(&self) -> Option<&TypeTable> {
        match &self.mode {
            Mode::Placeholder => None,
            Mode::Table(t) => Some(t),
        }
    }

    pub fn resolve(&self, d: &TypeDescriptor) -> Result<WireTypeCode, ResolveError> {
        match &self.mode {
            Mode::Placeholder => Ok(WireTypeCode::default()),
            Mode::Table(table) => table.lookup(d).map(|e| e.wire).ok_or_else(|| {
                ResolveError::UnsupportedType {
                    descriptor: d.to_string(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TypeTableEntry;
    use qgate_contracts::TYPE_TABLE_SCHEMA_VERSION;

    fn small_table() -> TypeTable {
        TypeTable {
            schema_version: TYPE_TABLE_SCHEMA_VERSION.to_string(),
            table_version: "t1".to_string(),
            entries: vec![TypeTableEntry {
                name: "bool".to_string(),
                schema: None,
                array: false,
                typmods: Default::default(),
                wire: WireTypeCode::Bool,
            }],
        }
    }

    #[test]
    fn policy_from_str() {
        assert_eq!(
            ResolvePolicy::from_str(" Table ").unwrap(),
            ResolvePolicy::Table
        );
        assert_eq!(
            ResolvePolicy::from_str("placeholder").unwrap(),
            ResolvePolicy::Placeholder
        );
        assert_eq!(
            ResolvePolicy::from_str("default").unwrap(),
            ResolvePolicy::Placeholder
        );
        let err = ResolvePolicy::from_str("strict").unwrap_err();
        assert!(err.to_string().contains("\"strict\""));
    }

    #[test]
    fn policy_serializes_as_its_name() {
        for p in [ResolvePolicy::Placeholder, ResolvePolicy::Table] {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
        }
    }

    #[test]
    fn placeholder_accepts_everything_as_int64() {
        let r = TypeResolver::placeholder();
        assert_eq!(r.policy(), ResolvePolicy::Placeholder);
        for d in [
            TypeDescriptor::new("text"),
            TypeDescriptor::new("no such type").with_array_dims(3),
            TypeDescriptor::new("numeric").with_typmods([38, 10]),
        ] {
            assert_eq!(r.resolve(&d), Ok(WireTypeCode::Int64));
        }
    }

    #[test]
    fn table_misses_are_unsupported() {
        let r = TypeResolver::with_table(small_table());
        assert_eq!(r.policy(), ResolvePolicy::Table);
        assert_eq!(
            r.resolve(&TypeDescriptor::new("BOOL")),
            Ok(WireTypeCode::Bool)
        );
        let err = r
            .resolve(&TypeDescriptor::new("bool").with_array_dims(1))
            .unwrap_err();
        assert_eq!(err.to_string(), "Type 'bool[]' not supported");
    }

    #[test]
    fn resolve_is_deterministic() {
        let r = TypeResolver::with_table(small_table());
        let d = TypeDescriptor::new("bool");
        let first = r.resolve(&d);
        for _ in 0..16 {
            assert_eq!(r.resolve(&d), first);
        }
        assert_eq!(d, TypeDescriptor::new("bool"));
    }
}

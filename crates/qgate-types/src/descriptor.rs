use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied source-level type, as produced by the front-end catalog.
///
/// The resolver only ever reads a descriptor; it never takes ownership of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub typmods: Vec<i32>,
    #[serde(default)]
    pub array_dims: u32,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            ..TypeDescriptor::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_typmods(mut self, typmods: impl Into<Vec<i32>>) -> Self {
        self.typmods = typmods.into();
        self
    }

    pub fn with_array_dims(mut self, dims: u32) -> Self {
        self.array_dims = dims;
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    pub fn normalized_name(&self) -> String {
        normalize_type_name(&self.name)
    }

    pub fn normalized_schema(&self) -> Option<String> {
        self.schema
            .as_deref()
            .map(normalize_type_name)
            .filter(|s| !s.is_empty())
    }
}

/// Trim, ASCII-lowercase, and collapse internal whitespace runs to one space.
pub fn normalize_type_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&word.to_ascii_lowercase());
    }
    out
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        f.write_str(&self.name)?;
        if !self.typmods.is_empty() {
            f.write_str("(")?;
            for (idx, m) in self.typmods.iter().enumerate() {
                if idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{m}")?;
            }
            f.write_str(")")?;
        }
        for _ in 0..self.array_dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_lowercases_and_collapses() {
        assert_eq!(normalize_type_name("  Double \t  PRECISION "), "double precision");
        assert_eq!(normalize_type_name("int8"), "int8");
        assert_eq!(normalize_type_name("   "), "");
    }

    #[test]
    fn display_renders_schema_typmods_and_arrays() {
        let d = TypeDescriptor::new("numeric")
            .with_schema("pg_catalog")
            .with_typmods([10, 2])
            .with_array_dims(2);
        assert_eq!(d.to_string(), "pg_catalog.numeric(10,2)[][]");
        assert_eq!(TypeDescriptor::new("text").to_string(), "text");
    }

    #[test]
    fn blank_schema_normalizes_to_none() {
        let d = TypeDescriptor::new("int4").with_schema("  ");
        assert_eq!(d.normalized_schema(), None);
        let d = TypeDescriptor::new("int4").with_schema(" PG_Catalog ");
        assert_eq!(d.normalized_schema().as_deref(), Some("pg_catalog"));
    }
}

//! Versioned type mapping table.
//!
//! The table is data owned by the catalog component; this module only defines
//! its document shape (`qgate.type-table@0.1.0`), validates it and evaluates
//! lookups. Entries are tried in order and the first match wins, so more
//! specific modifier rules must precede the catch-all entry for a name.

use std::path::Path;

use anyhow::{Context, Result};
use qgate_contracts::TYPE_TABLE_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

use crate::descriptor::{normalize_type_name, TypeDescriptor};
use crate::wire::WireTypeCode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    pub schema_version: String,
    pub table_version: String,
    pub entries: Vec<TypeTableEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTableEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub typmods: TypmodRule,
    pub wire: WireTypeCode,
}

/// Constraint on the descriptor's type modifiers (precision, scale, length...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypmodRule {
    /// Exact number of modifiers required, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Positional bounds; a bound only applies when the modifier is present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<TypmodBound>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypmodBound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
}

impl TypmodBound {
    pub fn contains(&self, v: i32) -> bool {
        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
    }
}

impl TypmodRule {
    pub fn is_unconstrained(&self) -> bool {
        self.count.is_none() && self.bounds.is_empty()
    }

    pub fn matches(&self, typmods: &[i32]) -> bool {
        if let Some(count) = self.count {
            if typmods.len() != count {
                return false;
            }
        }
        self.bounds
            .iter()
            .zip(typmods.iter())
            .all(|(b, v)| b.contains(*v))
    }
}

impl TypeTableEntry {
    /// `name`/`schema` are the descriptor's already-normalized parts.
    fn matches(&self, d: &TypeDescriptor, name: &str, schema: Option<&str>) -> bool {
        if self.name != name || self.array != d.is_array() {
            return false;
        }
        if let Some(want) = self.schema.as_deref() {
            if schema != Some(want) {
                return false;
            }
        }
        self.typmods.matches(&d.typmods)
    }

    fn shadows(&self, later: &TypeTableEntry) -> bool {
        self.name == later.name
            && self.array == later.array
            && (self.schema.is_none() || self.schema == later.schema)
            && (self.typmods.is_unconstrained() || self.typmods == later.typmods)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableIssue {
    pub severity: IssueSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<usize>,
    pub message: String,
}

impl TableIssue {
    fn error(entry: Option<usize>, message: impl Into<String>) -> Self {
        TableIssue {
            severity: IssueSeverity::Error,
            entry,
            message: message.into(),
        }
    }

    fn warning(entry: Option<usize>, message: impl Into<String>) -> Self {
        TableIssue {
            severity: IssueSeverity::Warning,
            entry,
            message: message.into(),
        }
    }
}

impl TypeTable {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read type table: {}", path.display()))?;
        Self::from_json_slice(&bytes)
            .with_context(|| format!("load type table: {}", path.display()))
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let table: TypeTable =
            serde_json::from_slice(bytes).context("parse type table JSON")?;
        let errors: Vec<String> = table
            .issues()
            .into_iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .map(|i| match i.entry {
                Some(idx) => format!("entries[{idx}]: {}", i.message),
                None => i.message,
            })
            .collect();
        if !errors.is_empty() {
            anyhow::bail!("invalid type table: {}", errors.join("; "));
        }
        tracing::info!(
            table_version = %table.table_version,
            entries = table.entries.len(),
            "type table loaded"
        );
        Ok(table)
    }

    pub fn lookup(&self, d: &TypeDescriptor) -> Option<&TypeTableEntry> {
        let name = d.normalized_name();
        let schema = d.normalized_schema();
        self.entries
            .iter()
            .find(|e| e.matches(d, &name, schema.as_deref()))
    }

    pub fn issues(&self) -> Vec<TableIssue> {
        let mut out = Vec::new();
        if self.schema_version.trim() != TYPE_TABLE_SCHEMA_VERSION {
            out.push(TableIssue::error(
                None,
                format!(
                    "schema_version mismatch: expected {TYPE_TABLE_SCHEMA_VERSION} got {:?}",
                    self.schema_version
                ),
            ));
        }
        if self.table_version.trim().is_empty() {
            out.push(TableIssue::error(None, "table_version must be non-empty"));
        }
        if self.entries.is_empty() {
            out.push(TableIssue::warning(
                None,
                "table has no entries; every type resolves as unsupported",
            ));
        }

        for (idx, e) in self.entries.iter().enumerate() {
            let at = Some(idx);
            if e.name.is_empty() {
                out.push(TableIssue::error(at, "name must be non-empty"));
            } else if normalize_type_name(&e.name) != e.name {
                out.push(TableIssue::error(
                    at,
                    format!(
                        "name {:?} is not normalized (expected {:?})",
                        e.name,
                        normalize_type_name(&e.name)
                    ),
                ));
            }
            if let Some(schema) = &e.schema {
                if schema.is_empty() || normalize_type_name(schema) != *schema {
                    out.push(TableIssue::error(
                        at,
                        format!("schema {schema:?} must be non-empty and normalized"),
                    ));
                }
            }
            for (pos, b) in e.typmods.bounds.iter().enumerate() {
                if let (Some(min), Some(max)) = (b.min, b.max) {
                    if min > max {
                        out.push(TableIssue::error(
                            at,
                            format!("typmods.bounds[{pos}]: min {min} > max {max}"),
                        ));
                    }
                }
            }
            if let Some(count) = e.typmods.count {
                if e.typmods.bounds.len() > count {
                    out.push(TableIssue::error(
                        at,
                        format!(
                            "typmods.bounds has {} entries but count is {count}",
                            e.typmods.bounds.len()
                        ),
                    ));
                }
            }
            if let Some(prev) = self.entries[..idx].iter().position(|p| p.shadows(e)) {
                out.push(TableIssue::warning(
                    at,
                    format!("unreachable: shadowed by entries[{prev}]"),
                ));
            }
        }
        out
    }
}

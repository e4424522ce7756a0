use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use qgate_contracts::{ENV_TYPE_POLICY, ENV_TYPE_TABLE};

use crate::resolver::{ResolvePolicy, TypeResolver};
use crate::table::TypeTable;

/// How the process-wide resolver should be built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    pub policy: Option<ResolvePolicy>,
    pub table_path: Option<PathBuf>,
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ResolverConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_env_values(
            std::env::var(ENV_TYPE_POLICY).ok(),
            std::env::var(ENV_TYPE_TABLE).ok(),
        )
    }

    pub fn from_env_values(
        policy_raw: Option<String>,
        table_raw: Option<String>,
    ) -> anyhow::Result<Self> {
        let policy = match non_empty(policy_raw) {
            Some(raw) => Some(
                ResolvePolicy::from_str(&raw)
                    .with_context(|| format!("invalid environment variable {ENV_TYPE_POLICY}"))?,
            ),
            None => None,
        };
        Ok(ResolverConfig {
            policy,
            table_path: non_empty(table_raw).map(PathBuf::from),
        })
    }

    /// Explicit policy wins; otherwise a configured table path implies `table`.
    pub fn effective_policy(&self) -> ResolvePolicy {
        match (self.policy, &self.table_path) {
            (Some(p), _) => p,
            (None, Some(_)) => ResolvePolicy::Table,
            (None, None) => ResolvePolicy::Placeholder,
        }
    }

    pub fn build(&self) -> anyhow::Result<TypeResolver> {
        match self.effective_policy() {
            ResolvePolicy::Placeholder => Ok(TypeResolver::placeholder()),
            ResolvePolicy::Table => {
                let Some(path) = &self.table_path else {
                    anyhow::bail!(
                        "type policy 'table' requires {ENV_TYPE_TABLE} to name a type table"
                    );
                };
                Ok(TypeResolver::with_table(TypeTable::load(path)?))
            }
        }
    }
}

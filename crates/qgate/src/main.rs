use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qgate_contracts::{
    ABI_REPORT_SCHEMA_VERSION, ALL_TRAP_CODES, ENV_TYPE_POLICY, ENV_TYPE_TABLE,
    QG_WIRE_TYPE_NOT_SUPPORTED, RESOLVE_REPORT_SCHEMA_VERSION, TABLE_CHECK_REPORT_SCHEMA_VERSION,
};
use qgate_native::{resolve_type, OwnedStatus, StatusCode, STATUS_HEADER_SIZE};
use qgate_types::{
    IssueSeverity, ResolvePolicy, ResolverConfig, TableIssue, TypeDescriptor, TypeTable,
    WireTypeCode,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "qgate")]
#[command(about = "Inspect qgate type tables and the boundary ABI.", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Type table and type resolution tools.
    #[command(subcommand)]
    Types(TypesCommand),
    /// Print the boundary ABI constants.
    Abi,
}

#[derive(Subcommand, Debug)]
enum TypesCommand {
    /// Validate a type table document.
    Check {
        #[arg(long, env = ENV_TYPE_TABLE)]
        table: PathBuf,
    },
    /// Resolve one type descriptor to a wire type code.
    Resolve(ResolveArgs),
}

#[derive(Args, Debug)]
struct ResolveArgs {
    #[arg(long, env = ENV_TYPE_TABLE)]
    table: Option<PathBuf>,
    /// `placeholder` or `table`.
    #[arg(long, env = ENV_TYPE_POLICY)]
    policy: Option<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    schema: Option<String>,
    /// Repeat once per type modifier, in order.
    #[arg(long = "typmod", allow_negative_numbers = true)]
    typmods: Vec<i32>,
    #[arg(long, default_value_t = 0)]
    array_dims: u32,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Types(TypesCommand::Check { table }) => cmd_types_check(&table),
        Command::Types(TypesCommand::Resolve(args)) => cmd_types_resolve(args),
        Command::Abi => cmd_abi(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(report: &T, ok: bool) -> Result<ExitCode> {
    println!("{}", serde_json::to_string(report)?);
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[derive(Debug, Serialize)]
struct TableCheckReport {
    schema_version: &'static str,
    ok: bool,
    table: String,
    sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    table_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<usize>,
    issues: Vec<TableIssue>,
}

fn cmd_types_check(path: &Path) -> Result<ExitCode> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read type table: {}", path.display()))?;
    let mut report = TableCheckReport {
        schema_version: TABLE_CHECK_REPORT_SCHEMA_VERSION,
        ok: false,
        table: path.display().to_string(),
        sha256: sha256_hex(&bytes),
        table_version: None,
        entries: None,
        issues: Vec::new(),
    };
    // Structural validation is reported, not raised, so parse without it.
    let table: TypeTable = match serde_json::from_slice(&bytes) {
        Ok(table) => table,
        Err(err) => {
            report.issues.push(TableIssue {
                severity: IssueSeverity::Error,
                entry: None,
                message: format!("parse type table JSON: {err}"),
            });
            return emit(&report, false);
        }
    };
    report.issues = table.issues();
    report.ok = !report.issues.iter().any(|i| i.severity == IssueSeverity::Error);
    report.entries = Some(table.entries.len());
    report.table_version = Some(table.table_version);
    let ok = report.ok;
    emit(&report, ok)
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    schema_version: &'static str,
    ok: bool,
    policy: ResolvePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    table_version: Option<String>,
    descriptor: DescriptorInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    wire_type: Option<CodeName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<StatusInfo>,
}

#[derive(Debug, Serialize)]
struct DescriptorInfo {
    schema: Option<String>,
    name: String,
    typmods: Vec<i32>,
    array_dims: u32,
    display: String,
}

#[derive(Debug, Serialize)]
struct CodeName {
    code: i32,
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusInfo {
    code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_name: Option<&'static str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn cmd_types_resolve(args: ResolveArgs) -> Result<ExitCode> {
    let policy = args
        .policy
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.parse::<ResolvePolicy>()
                .with_context(|| format!("invalid --policy {raw:?}"))
        })
        .transpose()?;
    let cfg = ResolverConfig {
        policy,
        table_path: args.table,
    };
    let resolver = cfg.build()?;
    tracing::debug!(policy = %resolver.policy(), "resolver built");

    let mut desc = TypeDescriptor::new(args.name)
        .with_typmods(args.typmods)
        .with_array_dims(args.array_dims);
    if let Some(schema) = args.schema {
        desc = desc.with_schema(schema);
    }

    let mut report = ResolveReport {
        schema_version: RESOLVE_REPORT_SCHEMA_VERSION,
        ok: false,
        policy: resolver.policy(),
        table_version: resolver.table().map(|t| t.table_version.clone()),
        descriptor: DescriptorInfo {
            schema: desc.schema.clone(),
            name: desc.name.clone(),
            typmods: desc.typmods.clone(),
            array_dims: desc.array_dims,
            display: desc.to_string(),
        },
        wire_type: None,
        status: None,
    };
    match resolve_type(&resolver, &desc) {
        Ok(wire) => {
            report.ok = true;
            report.wire_type = Some(CodeName {
                code: wire.code(),
                name: wire.as_str(),
            });
        }
        Err(status) => {
            // Report exactly what a C caller would read out of the status block.
            let Some(block) = OwnedStatus::encode(&status) else {
                anyhow::bail!("resolution failed with a success status");
            };
            let code = block.code();
            report.status = Some(StatusInfo {
                code,
                code_name: StatusCode::from_code(code).map(StatusCode::as_str),
                message: block.message().to_string_lossy().into_owned(),
                detail: status.detail().map(|d| format!("{d:#}")),
            });
        }
    }
    let ok = report.ok;
    emit(&report, ok)
}

#[derive(Debug, Serialize)]
struct AbiReport {
    schema_version: &'static str,
    status: StatusLayout,
    trap_codes: BTreeMap<&'static str, i32>,
    status_codes: Vec<CodeName>,
    wire_types: Vec<CodeName>,
    wire_type_default: i32,
    wire_type_not_supported: i32,
}

#[derive(Debug, Serialize)]
struct StatusLayout {
    header_size: usize,
    align: usize,
    message_offset: usize,
}

fn cmd_abi() -> Result<ExitCode> {
    let report = AbiReport {
        schema_version: ABI_REPORT_SCHEMA_VERSION,
        status: StatusLayout {
            header_size: STATUS_HEADER_SIZE,
            align: std::mem::align_of::<qgate_native::qg_status_struct>(),
            message_offset: STATUS_HEADER_SIZE,
        },
        trap_codes: ALL_TRAP_CODES.iter().copied().collect(),
        status_codes: StatusCode::ALL
            .iter()
            .map(|c| CodeName {
                code: c.code(),
                name: c.as_str(),
            })
            .collect(),
        wire_types: WireTypeCode::ALL
            .iter()
            .map(|w| CodeName {
                code: w.code(),
                name: w.as_str(),
            })
            .collect(),
        wire_type_default: WireTypeCode::default().code(),
        wire_type_not_supported: QG_WIRE_TYPE_NOT_SUPPORTED,
    };
    emit(&report, true)
}

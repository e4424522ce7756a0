use once_cell::sync::OnceCell;
use qgate_types::{
    ResolveError, ResolverConfig, TypeDescriptor, TypeResolver, TypeTable, WireTypeCode,
};

use crate::status::{Status, StatusCode};
use crate::trap::{trap, QG_TRAP_BAD_TYPE_CONFIG};

static RESOLVER: OnceCell<TypeResolver> = OnceCell::new();

impl From<ResolveError> for Status {
    fn from(err: ResolveError) -> Self {
        Status::new(StatusCode::NotSupported, err.to_string())
    }
}

/// The process-wide resolver, built from the environment on first use.
///
/// A broken environment configuration at this point is a boundary
/// misconfiguration and traps; hosts that want a status instead call one of
/// the `init_*` functions during startup.
pub fn type_resolver() -> &'static TypeResolver {
    RESOLVER.get_or_init(|| {
        match ResolverConfig::from_env().and_then(|cfg| cfg.build()) {
            Ok(resolver) => resolver,
            Err(err) => trap(QG_TRAP_BAD_TYPE_CONFIG, &format!("{err:#}")),
        }
    })
}

pub fn init_type_resolver(resolver: TypeResolver) -> Result<&'static TypeResolver, Status> {
    let policy = resolver.policy();
    RESOLVER.set(resolver).map_err(|_| {
        Status::new(
            StatusCode::IllegalState,
            "type resolver already initialized",
        )
    })?;
    tracing::debug!(%policy, "type resolver initialized");
    Ok(type_resolver())
}

pub fn init_type_resolver_from_env() -> Result<&'static TypeResolver, Status> {
    let resolver = ResolverConfig::from_env()
        .and_then(|cfg| cfg.build())
        .map_err(|err| {
            Status::new(StatusCode::ConfigurationError, format!("{err:#}")).with_detail(err)
        })?;
    init_type_resolver(resolver)
}

/// Install a catalog-supplied table document (`qgate.type-table@...`).
pub fn init_type_resolver_json(json: &[u8]) -> Result<&'static TypeResolver, Status> {
    let table = TypeTable::from_json_slice(json).map_err(|err| {
        Status::new(StatusCode::ConfigurationError, format!("{err:#}")).with_detail(err)
    })?;
    init_type_resolver(TypeResolver::with_table(table))
}

pub fn resolve_type(resolver: &TypeResolver, d: &TypeDescriptor) -> Result<WireTypeCode, Status> {
    Ok(resolver.resolve(d)?)
}

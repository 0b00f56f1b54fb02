use thiserror::Error;

/// Errors raised by workspace operations.
///
/// Only usage and refusal errors are raised from `create_net`; construction
/// and run failures of persistent nets are logged and reported through
/// `None` / `false` instead.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("net definition should have a name")]
    MissingNetName,

    #[error(
        "refusing to overwrite an existing net of the same name \"{0}\" unless overwrite=true is specified"
    )]
    NetExists(String),

    #[error("could not create net: {name} of type {net_type}")]
    NetConstruction {
        name: String,
        net_type: String,
        #[source]
        source: ConstructionError,
    },

    #[error("blob {0} not in the workspace")]
    BlobNotFound(String),

    #[error("blob {0} already exists in the workspace")]
    BlobExists(String),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Failure of a net or operator factory.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("net type [{0}] does not exist")]
    UnknownNetType(String),

    #[error("operator type [{0}] does not exist")]
    UnknownOperatorType(String),

    #[error("operator {op_type}: missing input blob {blob}")]
    MissingInput { op_type: String, blob: String },

    #[error("operator {op_type}: invalid argument {arg}: {reason}")]
    InvalidArgument {
        op_type: String,
        arg: String,
        reason: String,
    },

    #[error("operator {op_type}: expected {expected} {what}, got {actual}")]
    Arity {
        op_type: String,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("failed to construct operator {index} ({op_type}) of net {net}")]
    Operator {
        net: String,
        index: usize,
        op_type: String,
        #[source]
        source: Box<ConstructionError>,
    },
}

/// Typed access to a blob's value failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob is empty")]
    Empty,

    #[error("blob holds {actual}, expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} type '{name}' is already registered")]
    AlreadyRegistered { kind: &'static str, name: String },
}

#[derive(Debug, Error)]
pub enum ThreadPoolError {
    #[error("failed to build thread pool with {threads} threads: {source}")]
    Build {
        threads: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("thread pool task {index} failed: {reason}")]
    Task { index: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("execution step {0} has both networks and substeps")]
    MixedStep(String),

    #[error("execution step {step} references unknown net {net}")]
    UnknownNet { step: String, net: String },

    #[error("failed to create net {0} for plan")]
    NetCreation(String),

    #[error("execution step {step}: stop blob {blob}: {reason}")]
    StopBlob {
        step: String,
        blob: String,
        reason: String,
    },

    #[error("a concurrent substep of {0} panicked")]
    SubstepPanicked(String),
}

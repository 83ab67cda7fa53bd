//! Error taxonomy for the mesh core.
//!
//! The core distinguishes three kinds of failure: recoverable errors
//! returned to the caller as [`CoreError`], fatal
//! aborts that terminate the whole process group via [`fatal`], and
//! warn-only conditions that are just logged with `tracing::warn!` at
//! the call site.

use crate::mach_env::MachEnv;

/// Recoverable failures that a caller may want to retry or report.
///
/// These never originate from MPI or backend I/O failures, which are
/// always fatal (see [`fatal`]); they cover the handful of places the
/// core hands a typed failure back instead of aborting, chiefly the
/// dual-named mesh reader and the Field/Dimension/IOStream registries.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CoreError {
    /// None of the candidate variable names were present in the file.
    #[error("variable not found: tried {candidates:?} looking for {name}")]
    VariableNotFound {
        name: String,
        candidates: Vec<String>,
    },

    /// The named dimension is not defined in the open file.
    #[error("dimension not found: {name}")]
    DimensionNotFound { name: String },

    /// Requested metadata key is absent on the named field.
    #[error("metadata not found: field={field} key={key}")]
    MetadataNotFound { field: String, key: String },

    /// No IO stream registered under this name.
    #[error("stream not found: {name}")]
    StreamNotFound { name: String },

    /// A caller-supplied argument was outside its valid range, e.g. a
    /// `MachEnv` subset request naming ranks outside the parent group.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A name collision in one of the process-wide registries
    /// (`MachEnv`, `Decomp`, `Field`, `Dimension`, ...).
    #[error("'{name}' already registered in {registry}")]
    AlreadyRegistered { registry: String, name: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Abort the entire process group with a single diagnostic line: one
/// line naming the file, line, message and rank, followed by a flush of
/// every log sink and a call into the group's termination primitive.
/// This function never returns.
pub fn fatal(env: &MachEnv, file: &str, line: u32, message: &str) -> ! {
    tracing::error!(
        rank = env.rank(),
        file = file,
        line = line,
        "{message}"
    );
    // Give the subscriber a chance to flush buffered writers before we
    // tear the process down from under it.
    let _ = std::io::Write::flush(&mut std::io::stderr());
    env.abort(1)
}

/// Log-and-abort, capturing `file!()`/`line!()` at the call site.
#[macro_export]
macro_rules! fatal {
    ($env:expr, $($arg:tt)*) => {
        $crate::error::fatal($env, file!(), line!(), &format!($($arg)*))
    };
}

//! Error types for the ERGON scheduler.

/// Result type alias for ERGON operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building graphs, planning schedules or
/// talking to the platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The submitted task set contains a dependency cycle
    #[error("dependency cycle involving tasks {0:?}")]
    Cycle(Vec<String>),

    /// A task depends on an identifier that is not part of the submission
    #[error("task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency { task: String, dependency: String },

    /// Two tasks in one submission share an identifier
    #[error("duplicate task id `{0}`")]
    DuplicateTask(String),

    /// No resource kind in the task's profile is present in the resource set
    #[error("no feasible resource for task `{0}`")]
    NoFeasibleResource(String),

    /// Every kind-compatible resource lacks the free memory the task needs
    #[error("insufficient free memory for task `{0}` on every feasible resource")]
    MemoryExhausted(String),

    /// A fitted model needs more sample points than were supplied
    #[error("insufficient data: need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Runtime error (worker spawning, channel plumbing)
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The platform does not implement the requested capability
    #[error("operation not supported on this platform")]
    Unsupported,

    /// The platform refused the actuation (typically missing privileges)
    #[error("permission denied by platform")]
    PermissionDenied,

    /// The platform rejected the requested value
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl Error {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a runtime error
    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        Error::Runtime(msg.into())
    }

    /// Create an invalid-value error
    pub fn invalid_value<S: Into<String>>(msg: S) -> Self {
        Error::InvalidValue(msg.into())
    }
}

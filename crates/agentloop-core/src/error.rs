#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("path '{path}' escapes workspace root '{root}'")]
    PathEscapesWorkspace { path: String, root: String },

    #[error("absolute paths are not allowed: '{0}'")]
    AbsolutePathRejected(String),

    #[error("command blocked by sandbox rule: {0}")]
    ShellCommandBlocked(String),

    #[error("unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("malformed arguments for tool '{tool}': {reason}")]
    MalformedToolArguments { tool: String, reason: String },

    #[error("backend transport error: {0}")]
    BackendTransport(String),

    #[error("state snapshot is corrupt: {0}")]
    StateCorrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

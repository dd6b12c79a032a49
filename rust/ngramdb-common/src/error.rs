use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn malformed_line(line_number: u64, reason: impl Into<String>) -> Error {
        Error(
            ErrorKind::MalformedLine {
                line_number,
                reason: reason.into(),
            }
            .into(),
        )
    }

    pub fn unexpected_eof(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnexpectedEndOfInput {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn worker_lost(job: impl Into<String>) -> Error {
        Error(ErrorKind::WorkerLost { job: job.into() }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn config(context: impl Into<String>, source: serde_json::Error) -> Error {
        Error(
            ErrorKind::Config {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` for errors caused by the input stream rather than by
    /// the engine itself.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MalformedLine { .. } | ErrorKind::UnexpectedEndOfInput { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("malformed input at line {line_number}: {reason}")]
    MalformedLine { line_number: u64, reason: String },

    #[error("unexpected end of input: {context}")]
    UnexpectedEndOfInput { context: String },

    #[error("worker exited without delivering the result of {job}")]
    WorkerLost { job: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("invalid configuration '{context}': {source}")]
    Config {
        context: String,
        source: serde_json::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed_line(7, "unknown command prefix 'X'");
        assert_eq!(
            err.to_string(),
            "malformed input at line 7: unknown command prefix 'X'"
        );
        assert!(err.is_input_error());

        let err = Error::invalid_arg("pool_size", "pool_size > 0");
        assert_eq!(err.to_string(), "invalid argument pool_size: pool_size > 0");
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_into_kind() {
        let err: Error = std::io::Error::other("boom").into();
        match err.into_kind() {
            ErrorKind::Io { context, source } => {
                assert!(context.is_empty());
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}

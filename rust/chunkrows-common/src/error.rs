use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

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

    /// The engine reported a fault for a chunk of the result stream.
    pub fn chunk(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Chunk {
                message: message.into(),
            }
            .into(),
        )
    }

    /// A decoded record does not match the declared schema.
    pub fn decode(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Decode {
                message: message.into(),
            }
            .into(),
        )
    }

    /// No conversion rule exists for the column's physical type tag.
    pub fn type_conversion(type_name: impl Into<String>) -> Error {
        Error(
            ErrorKind::TypeConversion {
                type_name: type_name.into(),
            }
            .into(),
        )
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

    pub fn arrow<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Arrow {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    pub fn parquet<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Parquet {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Returns `true` for the failure classes that abort a cursor
    /// (chunk, decode and type conversion faults).
    pub fn is_data_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Chunk { .. } | ErrorKind::Decode { .. } | ErrorKind::TypeConversion { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("error in chunk: {message}")]
    Chunk { message: String },

    #[error("malformed row: {message}")]
    Decode { message: String },

    #[error("could not cast to type: {type_name}")]
    TypeConversion { type_name: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("Arrow error: {context}: {source}")]
    Arrow {
        context: String,
        source: StdErrorBoxed,
    },

    #[error("Parquet error: {context}: {source}")]
    Parquet {
        context: String,
        source: StdErrorBoxed,
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

use loft_metadata::MetadataError;
use loft_storage::StorageError;
use std::borrow::Cow;

/// Errors surfaced at the engine boundary.
///
/// Message-only and [`Clone`], so a closed write handle can replay its outcome.
#[loft_derive::loft_error]
#[derive(Clone)]
pub enum NamespaceError {
    /// The path, or the entry or blob behind it, does not exist.
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Path collision on create, mkdir or a rename destination.
    #[error("Already exists{}: {message}", format_context(.context))]
    AlreadyExists { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Malformed or empty path, or an operation the root may not take part in.
    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Lost an optimistic concurrency race. Retried inside the engine and never
    /// returned from a public operation.
    #[error("Version conflict{}: {message}", format_context(.context))]
    VersionConflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Backend transport failure, or conflicts that outlasted every retry.
    #[error("Unavailable{}: {message}", format_context(.context))]
    Unavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The operation is not meaningful for the target, e.g. writing to a directory.
    #[error("Not supported{}: {message}", format_context(.context))]
    NotSupported { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal namespace error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Flat discriminant of [`NamespaceError`] for mapping onto protocol status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    VersionConflict,
    Unavailable,
    NotSupported,
    Internal,
}

impl NamespaceError {
    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub(crate) fn already_exists(message: impl Into<Cow<'static, str>>) -> Self {
        Self::AlreadyExists { message: message.into(), context: None }
    }

    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument { message: message.into(), context: None }
    }

    pub(crate) fn unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unavailable { message: message.into(), context: None }
    }

    pub(crate) fn not_supported(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotSupported { message: message.into(), context: None }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether repeating the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::VersionConflict | ErrorKind::Unavailable)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<MetadataError> for NamespaceError {
    fn from(err: MetadataError) -> Self {
        let message = Cow::Owned(err.to_string());
        match err {
            MetadataError::NotFound { .. } => Self::NotFound { message, context: None },
            MetadataError::VersionConflict { .. } => {
                Self::VersionConflict { message, context: None }
            },
            _ if err.is_unavailable() => Self::Unavailable { message, context: None },
            _ => Self::Internal { message, context: None },
        }
    }
}

impl From<StorageError> for NamespaceError {
    fn from(err: StorageError) -> Self {
        let message = Cow::Owned(err.to_string());
        match err {
            StorageError::NotFound { .. } => Self::NotFound { message, context: None },
            StorageError::Io { .. } => Self::Unavailable { message, context: None },
            StorageError::InvalidKey { .. } | StorageError::Internal { .. } => {
                Self::Internal { message, context: None }
            },
        }
    }
}

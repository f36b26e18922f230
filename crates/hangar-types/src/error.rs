use thiserror::Error;

/// Errors produced when validating directory types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("lookup component `{component}` must not be empty")]
    EmptyComponent { component: &'static str },

    #[error("optional lookup component `{component}` is present but empty")]
    EmptyOptional { component: &'static str },
}

/// Convenience alias for type-level operations.
pub type Result<T> = std::result::Result<T, TypeError>;

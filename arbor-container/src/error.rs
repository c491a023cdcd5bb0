//! Error types for container operations.
//!
//! Every failure is classified by an [`ArborError`] variant, so callers
//! match on the kind rather than on message text. The richer variants carry
//! dedicated payload structs whose `Display` output is meant to be read by
//! a human fixing their registrations.

use std::fmt;

use crate::key::TypeKey;

/// Boxed error type carried by pass-through variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all container operations.
#[derive(Debug, thiserror::Error)]
pub enum ArborError {
    /// Resolve or shutdown was called before [`build`](crate::container::Container::build).
    #[error("container not built")]
    NotBuilt,

    /// Register or build was called after the container was sealed.
    #[error("container already built")]
    AlreadyBuilt,

    /// Shutdown was called a second time.
    #[error("container already shut down")]
    AlreadyShutdown,

    /// A provider already occupies the requested type slot or name.
    #[error("duplicate provider: {0}")]
    DuplicateProvider(ProviderSlot),

    /// The registration itself is malformed (e.g. an empty name).
    #[error("invalid constructor registration: {reason}")]
    InvalidConstructorShape { reason: &'static str },

    /// No provider is registered for the requested type or name.
    #[error("{0}")]
    ProviderNotFound(ProviderNotFoundError),

    /// The dependency graph contains a cycle.
    #[error("{0}")]
    CircularDependency(CircularDependencyError),

    /// A resolved value does not have the requested type.
    #[error("{0}")]
    TypeMismatch(TypeMismatchError),

    /// A user constructor returned an error.
    ///
    /// Nested `ConstructorFailed` sources form a breadcrumb trail from the
    /// outermost request down to the root cause.
    #[error("constructing {key}: {source}")]
    ConstructorFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// A closer returned an error during shutdown.
    #[error("closing resource: {source}")]
    CloseFailed {
        #[source]
        source: BoxError,
    },

    /// The shutdown deadline expired before all closers ran.
    #[error("shutdown deadline exceeded")]
    DeadlineExceeded,

    /// One or more closers failed during shutdown.
    #[error("{0}")]
    ShutdownFailed(ShutdownFailedError),
}

/// Identifies the registration slot a provider occupies: the default slot
/// for its output type, or a symbolic name.
#[derive(Debug, Clone)]
pub enum ProviderSlot {
    Type(TypeKey),
    Name(String),
}

impl fmt::Display for ProviderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSlot::Type(key) => write!(f, "{key}"),
            ProviderSlot::Name(name) => write!(f, "named {name:?}"),
        }
    }
}

/// Error when no provider is registered for a requested type or name.
#[derive(Debug)]
pub struct ProviderNotFoundError {
    /// The slot that was requested.
    pub slot: ProviderSlot,
    /// The provider whose constructor declared the missing input, if known.
    pub required_by: Option<TypeKey>,
    /// Set when the missing input belongs to a named provider.
    pub owner: Option<String>,
}

impl fmt::Display for ProviderNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider not found: {}", self.slot)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  required by: {parent}")?;
        }
        if let Some(ref owner) = self.owner {
            write!(f, "\n  required by named provider {owner:?}")?;
        }

        if let ProviderSlot::Type(key) = self.slot {
            write!(
                f,
                "\n  hint: did you forget to register a constructor for `{}`?",
                key.type_name()
            )?;
        }
        Ok(())
    }
}

/// Error when the dependency graph contains a cycle.
///
/// The chain runs from the first still-in-progress ancestor through the
/// repeated type, so the report shows exactly where the cycle closes.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: `[A, B, C, A]`.
    pub chain: Vec<TypeKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circular dependency detected:\n  ")?;

        let chain: Vec<&str> = self.chain.iter().map(TypeKey::type_name).collect();
        write!(f, "{}", chain.join(" → "))?;

        write!(
            f,
            "\n  hint: break the cycle by restructuring one of these constructors"
        )
    }
}

/// Error when a value cannot be narrowed to the requested type.
#[derive(Debug)]
pub struct TypeMismatchError {
    /// Set when the mismatch came from a named provider lookup.
    pub name: Option<String>,
    /// The type the caller asked for.
    pub expected: TypeKey,
    /// The type the provider actually produces, when known.
    pub actual: Option<TypeKey>,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.actual) {
            (Some(name), Some(actual)) => write!(
                f,
                "named provider {name:?} returns {actual}, not {expected}",
                expected = self.expected
            ),
            (None, Some(actual)) => {
                write!(f, "cannot convert {actual} to {}", self.expected)
            }
            _ => write!(f, "resolved value is not a {}", self.expected),
        }
    }
}

/// Aggregate of everything that failed during shutdown.
#[derive(Debug)]
pub struct ShutdownFailedError {
    /// Individual close failures, plus [`ArborError::DeadlineExceeded`] if
    /// the deadline expired mid-drain. Never empty.
    pub failures: Vec<ArborError>,
}

impl fmt::Display for ShutdownFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shutdown finished with {} failure(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// Convenient Result type for container operations.
pub type Result<T> = std::result::Result<T, ArborError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_not_found_display() {
        let err = ArborError::ProviderNotFound(ProviderNotFoundError {
            slot: ProviderSlot::Type(TypeKey::of::<String>()),
            required_by: Some(TypeKey::of::<Vec<u8>>()),
            owner: None,
        });

        let msg = format!("{err}");
        assert!(msg.contains("provider not found"));
        assert!(msg.contains("String"));
        assert!(msg.contains("required by"));
    }

    #[test]
    fn circular_dependency_display() {
        let err = ArborError::CircularDependency(CircularDependencyError {
            chain: vec![
                TypeKey::of::<String>(),
                TypeKey::of::<i32>(),
                TypeKey::of::<String>(),
            ],
        });

        let msg = format!("{err}");
        assert!(msg.contains("circular dependency"));
        assert!(msg.contains("→"));
    }

    #[test]
    fn type_mismatch_display() {
        let err = ArborError::TypeMismatch(TypeMismatchError {
            name: Some("primary".into()),
            expected: TypeKey::of::<i32>(),
            actual: Some(TypeKey::of::<String>()),
        });

        let msg = format!("{err}");
        assert!(msg.contains("primary"));
        assert!(msg.contains("i32"));
        assert!(msg.contains("String"));
    }

    #[test]
    fn constructor_failed_nests_into_breadcrumb() {
        let root = std::io::Error::other("connection refused");
        let inner = ArborError::ConstructorFailed {
            key: TypeKey::of::<String>(),
            source: Box::new(root),
        };
        let outer = ArborError::ConstructorFailed {
            key: TypeKey::of::<Vec<u8>>(),
            source: Box::new(inner),
        };

        let msg = format!("{outer}");
        assert!(msg.contains("Vec<u8>"));
        assert!(msg.contains("String"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn shutdown_failed_lists_everything() {
        let err = ArborError::ShutdownFailed(ShutdownFailedError {
            failures: vec![
                ArborError::CloseFailed {
                    source: "socket already closed".into(),
                },
                ArborError::DeadlineExceeded,
            ],
        });

        let msg = format!("{err}");
        assert!(msg.contains("2 failure(s)"));
        assert!(msg.contains("socket already closed"));
        assert!(msg.contains("deadline exceeded"));
    }
}

//! Engine error types

use crate::config::ConfigError;
use crate::ir::Position;
use crate::parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while lowering one method body.
///
/// A lowering error aborts only the method being lowered; the model driver
/// logs it and leaves that method without a body.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LowerError {
    /// A construct the engine cannot express in IR at all
    #[error("Unsupported {construct} at {position}")]
    Unsupported {
        construct: String,
        position: Position,
    },

    /// Assignment or update of something that is not a place
    #[error("Invalid assignment target at {position}")]
    InvalidAssignmentTarget { position: Position },

    /// Expression or statement nesting beyond the lowering limit
    #[error("Nesting depth exceeded at {position}")]
    DepthExceeded { position: Position },

    #[error("Internal lowering error: {0}")]
    Internal(String),
}

impl LowerError {
    pub fn unsupported(construct: impl Into<String>, position: Position) -> Self {
        LowerError::Unsupported {
            construct: construct.into(),
            position,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            LowerError::Unsupported { position, .. }
            | LowerError::InvalidAssignmentTarget { position }
            | LowerError::DepthExceeded { position } => Some(*position),
            LowerError::Internal(_) => None,
        }
    }
}

/// Failure to load a file before any lowering starts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} parse error(s) in {file}", errors.len())]
    Parse {
        file: String,
        errors: Vec<ParseError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_error_display() {
        let err = LowerError::unsupported("computed class member", Position::new(3, 5, 3, 9));
        assert_eq!(err.to_string(), "Unsupported computed class member at 3:5");
        assert_eq!(err.position(), Some(Position::new(3, 5, 3, 9)));
        assert_eq!(LowerError::Internal("x".into()).position(), None);
    }
}

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Fatal assembly failures. None of these are retryable: every variant
/// indicates a recipe or caller bug, and the correct response is to abort
/// the affected construct build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyError {
    /// The filler source has zero usable bytes.
    EmptyFiller,
    /// A recipe asked to place content before the current write cursor.
    BackwardPlacement { target: usize, cursor: usize },
    /// Accumulated content exceeds a reserved position or the target length.
    ConstructOverflow {
        cursor: usize,
        limit: usize,
        context: String,
    },
    /// Orientation symbol outside "+"/"-".
    UnknownOrientation(String),
    /// Operation attempted on a builder after `finish()`.
    BuilderFinalized,
    /// A recipe referenced a module name the registry does not hold.
    UnknownModule(String),
    /// A recipe is internally inconsistent (e.g. orientation pattern length
    /// does not match module order length).
    RecipeMismatch(String),
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::EmptyFiller => write!(f, "Filler sequence is empty"),
            AssemblyError::BackwardPlacement { target, cursor } => write!(
                f,
                "Cannot move cursor backwards (target={target}, cursor={cursor})"
            ),
            AssemblyError::ConstructOverflow {
                cursor,
                limit,
                context,
            } => write!(f, "{context} (cursor={cursor}, limit={limit})"),
            AssemblyError::UnknownOrientation(symbol) => {
                write!(f, "Unknown orientation '{symbol}', expected '+' or '-'")
            }
            AssemblyError::BuilderFinalized => {
                write!(f, "Builder already finished; create a new one per construct")
            }
            AssemblyError::UnknownModule(name) => {
                write!(f, "No module named '{name}' in the part registry")
            }
            AssemblyError::RecipeMismatch(message) => write!(f, "{message}"),
        }
    }
}

impl Error for AssemblyError {}

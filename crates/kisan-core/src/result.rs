//! Result type aliases for Kisan.

use crate::KisanError;

/// A specialized `Result` type for Kisan operations.
pub type KisanResult<T> = Result<T, KisanError>;

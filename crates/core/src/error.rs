//! Error taxonomy shared by every crate in the workspace.

use serde::{Deserialize, Serialize};

/// Stable machine-readable issue code, used for hard errors and warnings alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MetadataMissing,
    OutOfBounds,
    Collision,
    ProductNotFound,
    PlacementModelNotFound,
    FixtureNotFound,
    ShelfNotFound,
    AssetMissing,
    PositionMismatch,
    ExpansionLimit,
    InvalidPlacementModel,
    // warnings
    UnusualFacings,
    ExtremeScale,
    ConstraintViolation,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MetadataMissing => "METADATA_MISSING",
            ErrorCode::OutOfBounds => "OUT_OF_BOUNDS",
            ErrorCode::Collision => "COLLISION",
            ErrorCode::ProductNotFound => "PRODUCT_NOT_FOUND",
            ErrorCode::PlacementModelNotFound => "PLACEMENT_MODEL_NOT_FOUND",
            ErrorCode::FixtureNotFound => "FIXTURE_NOT_FOUND",
            ErrorCode::ShelfNotFound => "SHELF_NOT_FOUND",
            ErrorCode::AssetMissing => "ASSET_MISSING",
            ErrorCode::PositionMismatch => "POSITION_MISMATCH",
            ErrorCode::ExpansionLimit => "EXPANSION_LIMIT",
            ErrorCode::InvalidPlacementModel => "INVALID_PLACEMENT_MODEL",
            ErrorCode::UnusualFacings => "UNUSUAL_FACINGS",
            ErrorCode::ExtremeScale => "EXTREME_SCALE",
            ErrorCode::ConstraintViolation => "CONSTRAINT_VIOLATION",
        }
    }

    /// Errors that leave nothing drawable. Bounds and collision problems still
    /// render (e.g. as a drag ghost) even though they block a commit.
    pub fn blocks_render(&self) -> bool {
        matches!(
            self,
            ErrorCode::MetadataMissing
                | ErrorCode::AssetMissing
                | ErrorCode::ProductNotFound
                | ErrorCode::PlacementModelNotFound
                | ErrorCode::FixtureNotFound
                | ErrorCode::PositionMismatch
                | ErrorCode::ExpansionLimit
                | ErrorCode::InvalidPlacementModel
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PlanoError {
    #[error("metadata missing for sku {0}")]
    MetadataMissing(String),
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    #[error("product not found: {0}")]
    ProductNotFound(String),
    #[error("placement model not found: {0}")]
    PlacementModelNotFound(String),
    #[error("fixture type not found: {0}")]
    FixtureNotFound(String),
    #[error("placement model {expected} cannot place a {found} position")]
    PositionMismatch { expected: String, found: String },
    #[error("invalid placement model registration: {0}")]
    InvalidModel(String),
    #[error("{product_id} expands to {count} instances, limit is {limit}")]
    ExpansionLimit { product_id: String, count: u64, limit: u64 },
    #[error("catalog: {0}")]
    Catalog(String),
}

impl PlanoError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PlanoError::MetadataMissing(_) => ErrorCode::MetadataMissing,
            PlanoError::OutOfBounds(_) => ErrorCode::OutOfBounds,
            PlanoError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            PlanoError::PlacementModelNotFound(_) => ErrorCode::PlacementModelNotFound,
            PlanoError::InvalidModel(_) => ErrorCode::InvalidPlacementModel,
            PlanoError::ExpansionLimit { .. } => ErrorCode::ExpansionLimit,
            PlanoError::FixtureNotFound(_) => ErrorCode::FixtureNotFound,
            PlanoError::PositionMismatch { .. } => ErrorCode::PositionMismatch,
            PlanoError::Catalog(_) => ErrorCode::MetadataMissing,
        }
    }

    /// Structural errors invalidate the whole projection rather than one product.
    pub fn is_structural(&self) -> bool {
        matches!(self, PlanoError::FixtureNotFound(_) | PlanoError::PlacementModelNotFound(_))
    }
}

pub type PlanoResult<T> = Result<T, PlanoError>;

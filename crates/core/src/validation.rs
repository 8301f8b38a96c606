use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{ErrorCode, PlanoError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: ErrorCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self { Self { code, message: message.into() } }
}

impl From<&PlanoError> for ValidationIssue {
    fn from(e: &PlanoError) -> Self { Self::new(e.code(), e.to_string()) }
}

/// Outcome of validating one placement or action.
///
/// `valid` gates a commit; `can_render` tells a caller whether a preview can still be
/// drawn. Warnings never affect either flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub can_render: bool,
    pub errors: SmallVec<[ValidationIssue; 2]>,
    pub warnings: SmallVec<[ValidationIssue; 2]>,
}

impl Default for ValidationResult {
    fn default() -> Self { Self::ok() }
}

impl ValidationResult {
    pub fn ok() -> Self { Self { valid: true, can_render: true, errors: SmallVec::new(), warnings: SmallVec::new() } }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let mut r = Self::ok();
        r.push_error(code, message);
        r
    }

    pub fn push_error(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.valid = false;
        if code.blocks_render() { self.can_render = false; }
        self.errors.push(ValidationIssue::new(code, message));
    }

    pub fn push_warning(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(code, message));
    }

    /// Fold another result into this one; validity is the conjunction.
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.can_render &= other.can_render;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_error(&self, code: ErrorCode) -> bool { self.errors.iter().any(|e| e.code == code) }

    pub fn first_error(&self) -> Option<&ValidationIssue> { self.errors.first() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_blocks_commit_but_not_preview() {
        let r = ValidationResult::error(ErrorCode::Collision, "overlaps b");
        assert!(!r.valid);
        assert!(r.can_render);

        let mut m = ValidationResult::ok();
        m.push_warning(ErrorCode::UnusualFacings, "12 wide");
        assert!(m.valid);
        m.merge(ValidationResult::error(ErrorCode::MetadataMissing, "no sku"));
        assert!(!m.valid && !m.can_render);
        assert_eq!(m.errors.len(), 1);
        assert_eq!(m.warnings.len(), 1);
    }

    #[test]
    fn codes_serialize_screaming_snake() {
        let v = serde_json::to_value(ValidationIssue::new(ErrorCode::OutOfBounds, "x")).unwrap();
        assert_eq!(v["code"], "OUT_OF_BOUNDS");
        assert_eq!(ErrorCode::PlacementModelNotFound.to_string(), "PLACEMENT_MODEL_NOT_FOUND");
    }
}

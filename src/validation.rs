//! Input validation for packing problems.
//!
//! Checks structural integrity of the truck and its boxes before
//! rasterization. Detects:
//! - Duplicate or empty box IDs
//! - Non-positive or non-finite extents
//! - Boxes larger than the truck along some axis
//!
//! A box that exceeds the truck can never be placed at any resolution, so
//! it is reported here instead of surfacing later as a failed grid search.

use crate::models::{BoxSpec, Extent};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two boxes share the same ID.
    DuplicateId,
    /// A box has an empty ID.
    EmptyId,
    /// The truck or a box has a non-positive or non-finite extent.
    InvalidExtent,
    /// A box is larger than the truck along some axis.
    OversizedBox,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input data for a packing problem.
///
/// Checks:
/// 1. The truck extent is finite and strictly positive
/// 2. Every box has a non-empty, unique ID
/// 3. Every box extent is finite and strictly positive
/// 4. Every box fits inside the truck along each axis (no rotation)
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(truck: &Extent, boxes: &[BoxSpec]) -> ValidationResult {
    let mut errors = Vec::new();

    let truck_ok = truck.is_positive();
    if !truck_ok {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidExtent,
            format!(
                "Truck extent ({}, {}, {}) must be finite and positive",
                truck.width, truck.height, truck.length
            ),
        ));
    }

    let mut ids = HashSet::new();
    for b in boxes {
        if b.id.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                "Box with empty ID",
            ));
        } else if !ids.insert(b.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate box ID: {}", b.id),
            ));
        }

        if !b.size.is_positive() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidExtent,
                format!(
                    "Box '{}' extent ({}, {}, {}) must be finite and positive",
                    b.id, b.size.width, b.size.height, b.size.length
                ),
            ));
        } else if truck_ok && !truck.fits(&b.size) {
            errors.push(ValidationError::new(
                ValidationErrorKind::OversizedBox,
                format!(
                    "Box '{}' ({}, {}, {}) exceeds the truck ({}, {}, {})",
                    b.id,
                    b.size.width,
                    b.size.height,
                    b.size.length,
                    truck.width,
                    truck.height,
                    truck.length
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Joins validation messages into one line.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

//! Validation utilities for season plan inputs

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{PlanError, PlanResult};
use crate::types::PlantingMethod;

/// Shortest variety duration whose grain filling window still has
/// non-negative length
pub const MIN_DURATION_DAYS: u32 = 71;

/// Longest variety duration accepted from the catalog
pub const MAX_DURATION_DAYS: u32 = 240;

/// Longest accepted free-text field
pub const MAX_TEXT_LENGTH: usize = 2000;

// ============================================================================
// Schedule Inputs
// ============================================================================

/// Validate variety duration fits the stage table
pub fn validate_duration_days(duration_days: u32) -> Result<(), &'static str> {
    if duration_days < MIN_DURATION_DAYS {
        return Err("Variety duration is too short for the growing stage calendar");
    }
    if duration_days > MAX_DURATION_DAYS {
        return Err("Variety duration exceeds the supported maximum");
    }
    Ok(())
}

/// Validate area given to the schedule generator (zero is allowed)
pub fn validate_schedule_area(area: Decimal) -> Result<(), &'static str> {
    if area.is_sign_negative() && !area.is_zero() {
        return Err("Cultivated area cannot be negative");
    }
    Ok(())
}

/// Validate cultivating area for a stored plan (must be positive)
pub fn validate_cultivating_area(area: Decimal) -> Result<(), &'static str> {
    if area <= Decimal::ZERO {
        return Err("Cultivating area must be greater than zero");
    }
    Ok(())
}

/// Validate the anchoring inputs of a plan
pub fn validate_anchor_inputs(
    cultivation_date: NaiveDate,
    planting_method: Option<PlantingMethod>,
    transplanting_date: Option<NaiveDate>,
) -> PlanResult<()> {
    if planting_method == Some(PlantingMethod::Transplanting) {
        let transplanting_date = transplanting_date.ok_or_else(|| {
            PlanError::validation(
                "transplantingDate",
                "Transplanting date is required when the planting method is transplanting",
            )
        })?;
        if transplanting_date < cultivation_date {
            return Err(PlanError::validation(
                "transplantingDate",
                "Transplanting date cannot be before the cultivation date",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Tracking Inputs
// ============================================================================

/// Validate a measured quantity (yield, kg) is not negative
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err("Value cannot be negative");
    }
    Ok(())
}

/// Validate an actual date range when both ends are known
pub fn validate_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), &'static str> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err("Actual start cannot be after actual end"),
        _ => Ok(()),
    }
}

/// Validate a free-text field length
pub fn validate_text_length(text: &str) -> Result<(), &'static str> {
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err("Text exceeds the maximum length of 2000 characters");
    }
    Ok(())
}

/// Validate remark description is present
pub fn validate_remark_description(description: &str) -> Result<(), &'static str> {
    if description.trim().is_empty() {
        return Err("Description cannot be empty");
    }
    validate_text_length(description)
}

/// Validate an image reference is an opaque filename, never a path
pub fn validate_image_filename(filename: &str) -> Result<(), &'static str> {
    if filename.is_empty() || filename.len() > 255 {
        return Err("Image filename must be between 1 and 255 characters");
    }
    if filename.starts_with('.') {
        return Err("Image filename cannot start with a dot");
    }
    if !filename
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err("Image filename may only contain letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

/// Normalize optional notes: blank strings clear the field
pub fn normalize_notes(notes: Option<&str>) -> PlanResult<Option<String>> {
    match notes.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => {
            validate_text_length(text).map_err(|m| PlanError::validation("notes", m))?;
            Ok(Some(text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_duration_days() {
        assert!(validate_duration_days(MIN_DURATION_DAYS).is_ok());
        assert!(validate_duration_days(105).is_ok());
        assert!(validate_duration_days(MAX_DURATION_DAYS).is_ok());
        assert!(validate_duration_days(MIN_DURATION_DAYS - 1).is_err());
        assert!(validate_duration_days(0).is_err());
        assert!(validate_duration_days(MAX_DURATION_DAYS + 1).is_err());
    }

    #[test]
    fn test_area_rules() {
        assert!(validate_schedule_area(Decimal::ZERO).is_ok());
        assert!(validate_schedule_area(Decimal::from(3)).is_ok());
        assert!(validate_schedule_area(Decimal::from(-1)).is_err());

        assert!(validate_cultivating_area(Decimal::ZERO).is_err());
        assert!(validate_cultivating_area(Decimal::from(-2)).is_err());
        assert!(validate_cultivating_area(Decimal::new(25, 1)).is_ok());
    }

    #[test]
    fn test_validate_anchor_inputs() {
        let cultivation = date(2025, 1, 1);
        assert!(validate_anchor_inputs(cultivation, None, None).is_ok());
        assert!(validate_anchor_inputs(cultivation, Some(PlantingMethod::Direct), None).is_ok());
        assert!(validate_anchor_inputs(
            cultivation,
            Some(PlantingMethod::Transplanting),
            Some(date(2025, 1, 21))
        )
        .is_ok());

        let missing =
            validate_anchor_inputs(cultivation, Some(PlantingMethod::Transplanting), None);
        assert!(matches!(missing, Err(PlanError::Validation { ref field, .. }) if field == "transplantingDate"));

        assert!(validate_anchor_inputs(
            cultivation,
            Some(PlantingMethod::Transplanting),
            Some(date(2024, 12, 20))
        )
        .is_err());
    }

    #[test]
    fn test_validate_date_order() {
        assert!(validate_date_order(None, None).is_ok());
        assert!(validate_date_order(Some(date(2025, 1, 1)), None).is_ok());
        assert!(validate_date_order(Some(date(2025, 1, 1)), Some(date(2025, 1, 1))).is_ok());
        assert!(validate_date_order(Some(date(2025, 1, 2)), Some(date(2025, 1, 1))).is_err());
    }

    #[test]
    fn test_validate_remark_description() {
        assert!(validate_remark_description("Heavy rain overnight").is_ok());
        assert!(validate_remark_description("").is_err());
        assert!(validate_remark_description("   ").is_err());
        assert!(validate_remark_description(&"x".repeat(MAX_TEXT_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_image_filename() {
        assert!(validate_image_filename("4b1c9e0a-remark.jpg").is_ok());
        assert!(validate_image_filename("").is_err());
        assert!(validate_image_filename("../etc/passwd").is_err());
        assert!(validate_image_filename("dir/file.png").is_err());
        assert!(validate_image_filename(".hidden").is_err());
    }

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(None).unwrap(), None);
        assert_eq!(normalize_notes(Some("  ")).unwrap(), None);
        assert_eq!(normalize_notes(Some(" ok ")).unwrap(), Some("ok".to_string()));
    }
}

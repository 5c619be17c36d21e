//! Declarative field validation for the wizard form.
//!
//! Rules are declared per field as a constraint set (required-ness, length
//! bounds, pattern, enumerated membership) plus a cross-field predicate for
//! conditional requirements. All routines are pure and deterministic; the
//! controller decides when they run (blur, step gate, submit).

use once_cell::sync::Lazy;
use regex::Regex;

use super::{FieldId, FormData, ValidationErrors, WizardStep};

/// Durations the backend accepts, in seconds.
pub const ALLOWED_DURATIONS: &[u32] = &[15, 30, 60, 90];

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern compiles"));

/// Constraint set for a single field.
struct FieldRule {
    field: FieldId,
    /// Cross-field predicate deciding whether the field is required given
    /// the full form (for example CTA text only when the CTA flag is set).
    required_if: fn(&FormData) -> bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<(&'static Lazy<Regex>, &'static str)>,
    allowed_durations: &'static [u32],
}

const fn never(_: &FormData) -> bool {
    false
}

const fn always(_: &FormData) -> bool {
    true
}

fn has_brand_name(data: &FormData) -> bool {
    !data.brand_name.trim().is_empty()
}

fn cta_enabled(data: &FormData) -> bool {
    data.include_cta
}

const HEX_HINT: &str = "must be a hex color like #1A2B3C";

static RULES: &[FieldRule] = &[
    FieldRule {
        field: FieldId::Concept,
        required_if: always,
        min_length: Some(10),
        max_length: Some(500),
        pattern: None,
        allowed_durations: &[],
    },
    FieldRule {
        field: FieldId::BrandName,
        required_if: never,
        min_length: None,
        max_length: Some(60),
        pattern: None,
        allowed_durations: &[],
    },
    FieldRule {
        field: FieldId::BrandColor(super::BrandColorField::Primary),
        required_if: has_brand_name,
        min_length: None,
        max_length: None,
        pattern: Some((&HEX_COLOR, HEX_HINT)),
        allowed_durations: &[],
    },
    FieldRule {
        field: FieldId::BrandColor(super::BrandColorField::Secondary),
        required_if: never,
        min_length: None,
        max_length: None,
        pattern: Some((&HEX_COLOR, HEX_HINT)),
        allowed_durations: &[],
    },
    FieldRule {
        field: FieldId::CtaText,
        required_if: cta_enabled,
        min_length: None,
        max_length: Some(40),
        pattern: None,
        allowed_durations: &[],
    },
    FieldRule {
        field: FieldId::DurationSeconds,
        required_if: never,
        min_length: None,
        max_length: None,
        pattern: None,
        allowed_durations: ALLOWED_DURATIONS,
    },
];

/// Current textual value of a field, for fields with textual constraints.
fn text_value<'a>(field: FieldId, data: &'a FormData) -> Option<&'a str> {
    match field {
        FieldId::Concept => Some(&data.concept),
        FieldId::BrandName => Some(&data.brand_name),
        FieldId::BrandColor(super::BrandColorField::Primary) => Some(&data.brand_colors.primary),
        FieldId::BrandColor(super::BrandColorField::Secondary) => Some(&data.brand_colors.secondary),
        FieldId::CtaText => Some(&data.cta_text),
        _ => None,
    }
}

/// Validate one field against its declared constraints.
///
/// Returns `None` when the field is valid or carries no rule. Fields left
/// empty fail only when the cross-field predicate says they are required;
/// length and pattern checks apply to non-empty values only.
pub fn validate_field(field: FieldId, data: &FormData) -> Option<String> {
    let rule = RULES.iter().find(|rule| rule.field == field)?;

    if !rule.allowed_durations.is_empty() {
        if rule.allowed_durations.contains(&data.duration_seconds) {
            return None;
        }
        let choices = rule
            .allowed_durations
            .iter()
            .map(|seconds| seconds.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Some(format!("{} must be one of {} seconds", field.label(), choices));
    }

    let value = text_value(field, data)?.trim();

    if value.is_empty() {
        if (rule.required_if)(data) {
            return Some(format!("{} is required", field.label()));
        }
        return None;
    }

    if let Some(min_length) = rule.min_length
        && value.chars().count() < min_length
    {
        return Some(format!("{} must be at least {} characters", field.label(), min_length));
    }

    if let Some(max_length) = rule.max_length
        && value.chars().count() > max_length
    {
        return Some(format!("{} must be at most {} characters", field.label(), max_length));
    }

    if let Some((pattern, hint)) = &rule.pattern
        && !pattern.is_match(value)
    {
        return Some(format!("{} {}", field.label(), hint));
    }

    None
}

/// Validate every field mapped to `step`. Fields belonging to other steps
/// are never evaluated here, so out-of-order navigation cannot produce
/// false negatives for untouched steps.
pub fn validate_step(step: WizardStep, data: &FormData) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for field in step.fields() {
        if let Some(message) = validate_field(*field, data) {
            errors.insert(*field, message);
        }
    }
    errors
}

/// Validate the union of all steps, used at submit time.
pub fn validate_all(data: &FormData) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for step in WizardStep::ALL {
        errors.extend(validate_step(step, data));
    }
    errors
}

//! Wizard form schema: the fixed field set, typed field addressing, step
//! mapping, and the persisted draft snapshot.
//!
//! Field addressing is a closed union rather than dotted-path strings; the
//! only nested record (`brand_colors`) gets its own two-case variant. The
//! dotted notation survives solely as the rendering used by the widget
//! contract (`"brandColors.primary"`).

use std::fmt;

use chrono::serde::ts_seconds;
use chrono::{DateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{AspectRatio, MusicStyle, Quality, VideoStyle};

pub mod validation;

/// Version gate for persisted drafts. Bump whenever `FormData` changes shape
/// so stale snapshots are dropped instead of resurrected.
pub const DRAFT_SCHEMA_VERSION: u32 = 2;

/// Complete wizard form state. The field set is exactly this schema; there
/// are no ad-hoc keys. Mutation goes through the wizard controller only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    pub concept: String,
    pub style: VideoStyle,
    pub duration_seconds: u32,
    pub aspect_ratio: AspectRatio,
    pub music_style: MusicStyle,
    pub brand_name: String,
    pub brand_colors: BrandColors,
    pub include_cta: bool,
    pub cta_text: String,
    pub quality: Quality,
    pub fast_generation: bool,
    pub parallelize: bool,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            concept: String::new(),
            style: VideoStyle::default(),
            duration_seconds: 30,
            aspect_ratio: AspectRatio::default(),
            music_style: MusicStyle::default(),
            brand_name: String::new(),
            brand_colors: BrandColors::default(),
            include_cta: false,
            cta_text: String::new(),
            quality: Quality::default(),
            fast_generation: false,
            parallelize: false,
        }
    }
}

/// The one nested sub-record of the form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandColors {
    pub primary: String,
    pub secondary: String,
}

/// Addressable slot inside [`BrandColors`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BrandColorField {
    Primary,
    Secondary,
}

/// Typed address of a form field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldId {
    Concept,
    Style,
    DurationSeconds,
    AspectRatio,
    MusicStyle,
    BrandName,
    BrandColor(BrandColorField),
    IncludeCta,
    CtaText,
    Quality,
    FastGeneration,
    Parallelize,
}

impl FieldId {
    /// Every addressable field, in display order.
    pub const ALL: &'static [FieldId] = &[
        FieldId::Concept,
        FieldId::Style,
        FieldId::BrandName,
        FieldId::BrandColor(BrandColorField::Primary),
        FieldId::BrandColor(BrandColorField::Secondary),
        FieldId::IncludeCta,
        FieldId::CtaText,
        FieldId::DurationSeconds,
        FieldId::AspectRatio,
        FieldId::MusicStyle,
        FieldId::Quality,
        FieldId::FastGeneration,
        FieldId::Parallelize,
    ];

    /// Dotted-path rendering used by the widget contract.
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Style => "style",
            Self::DurationSeconds => "durationSeconds",
            Self::AspectRatio => "aspectRatio",
            Self::MusicStyle => "musicStyle",
            Self::BrandName => "brandName",
            Self::BrandColor(BrandColorField::Primary) => "brandColors.primary",
            Self::BrandColor(BrandColorField::Secondary) => "brandColors.secondary",
            Self::IncludeCta => "includeCta",
            Self::CtaText => "ctaText",
            Self::Quality => "quality",
            Self::FastGeneration => "fastGeneration",
            Self::Parallelize => "parallelize",
        }
    }

    /// Parse the widget-contract dotted path back into a typed id.
    pub fn parse(path: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.as_path() == path)
    }

    /// Human-readable label used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Concept => "Video concept",
            Self::Style => "Style",
            Self::DurationSeconds => "Duration",
            Self::AspectRatio => "Aspect ratio",
            Self::MusicStyle => "Music style",
            Self::BrandName => "Brand name",
            Self::BrandColor(BrandColorField::Primary) => "Primary brand color",
            Self::BrandColor(BrandColorField::Secondary) => "Secondary brand color",
            Self::IncludeCta => "Call to action",
            Self::CtaText => "Call-to-action text",
            Self::Quality => "Quality",
            Self::FastGeneration => "Fast generation",
            Self::Parallelize => "Parallel generation",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Value shapes a widget can emit. Widgets only emit validated shapes, so a
/// field/value type mismatch is a caller bug, not user input.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Style(VideoStyle),
    Duration(u32),
    Aspect(AspectRatio),
    Music(MusicStyle),
    Quality(Quality),
}

impl FormData {
    /// Apply a typed value to a field. Returns false when the value shape
    /// does not match the field, leaving the form untouched.
    pub fn set(&mut self, field: FieldId, value: FieldValue) -> bool {
        match (field, value) {
            (FieldId::Concept, FieldValue::Text(text)) => self.concept = text,
            (FieldId::Style, FieldValue::Style(style)) => self.style = style,
            (FieldId::DurationSeconds, FieldValue::Duration(seconds)) => self.duration_seconds = seconds,
            (FieldId::AspectRatio, FieldValue::Aspect(ratio)) => self.aspect_ratio = ratio,
            (FieldId::MusicStyle, FieldValue::Music(music)) => self.music_style = music,
            (FieldId::BrandName, FieldValue::Text(text)) => self.brand_name = text,
            (FieldId::BrandColor(BrandColorField::Primary), FieldValue::Text(text)) => self.brand_colors.primary = text,
            (FieldId::BrandColor(BrandColorField::Secondary), FieldValue::Text(text)) => self.brand_colors.secondary = text,
            (FieldId::IncludeCta, FieldValue::Flag(flag)) => self.include_cta = flag,
            (FieldId::CtaText, FieldValue::Text(text)) => self.cta_text = text,
            (FieldId::Quality, FieldValue::Quality(quality)) => self.quality = quality,
            (FieldId::FastGeneration, FieldValue::Flag(flag)) => self.fast_generation = flag,
            (FieldId::Parallelize, FieldValue::Flag(flag)) => self.parallelize = flag,
            _ => return false,
        }
        true
    }
}

/// Wizard position, totally ordered 1..=4.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Concept,
    Branding,
    Format,
    Review,
}

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep::Concept;
    pub const LAST: WizardStep = WizardStep::Review;

    pub const ALL: [WizardStep; 4] = [WizardStep::Concept, WizardStep::Branding, WizardStep::Format, WizardStep::Review];

    /// 1-based position shown in the step indicator.
    pub fn number(self) -> u8 {
        match self {
            Self::Concept => 1,
            Self::Branding => 2,
            Self::Format => 3,
            Self::Review => 4,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.number() == number)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    /// Fields relevant to this step. Step-level validation evaluates exactly
    /// this set and nothing else.
    pub fn fields(self) -> &'static [FieldId] {
        match self {
            Self::Concept => &[FieldId::Concept, FieldId::Style],
            Self::Branding => &[
                FieldId::BrandName,
                FieldId::BrandColor(BrandColorField::Primary),
                FieldId::BrandColor(BrandColorField::Secondary),
                FieldId::IncludeCta,
                FieldId::CtaText,
            ],
            Self::Format => &[FieldId::DurationSeconds, FieldId::AspectRatio, FieldId::MusicStyle],
            Self::Review => &[FieldId::Quality, FieldId::FastGeneration, FieldId::Parallelize],
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Concept => "Concept",
            Self::Branding => "Branding",
            Self::Format => "Format",
            Self::Review => "Review",
        };
        write!(f, "{} ({}/4)", name, self.number())
    }
}

/// Field-keyed validation messages. Absence of a key means "no known error",
/// not "validated"; insertion order is the order fields are shown in.
pub type ValidationErrors = IndexMap<FieldId, String>;

/// Crash-safe snapshot of in-progress form state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub data: FormData,
    pub step: WizardStep,
    #[serde(with = "ts_seconds")]
    pub saved_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl Draft {
    /// Snapshot the given state at the current time under the live schema
    /// version.
    pub fn capture(data: &FormData, step: WizardStep) -> Self {
        Self {
            data: data.clone(),
            step,
            // Stored with second precision; truncate here so a reloaded
            // draft compares equal to the captured one.
            saved_at: Utc::now().trunc_subsecs(0),
            schema_version: DRAFT_SCHEMA_VERSION,
        }
    }

    /// A draft equal to the blank initial state carries no user work and is
    /// not worth offering to restore.
    pub fn is_blank(&self) -> bool {
        self.data == FormData::default() && self.step == WizardStep::FIRST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_paths_round_trip() {
        for field in FieldId::ALL {
            assert_eq!(FieldId::parse(field.as_path()), Some(*field));
        }
        assert_eq!(FieldId::parse("brandColors.primary"), Some(FieldId::BrandColor(BrandColorField::Primary)));
        assert_eq!(FieldId::parse("brandColors.tertiary"), None);
    }

    #[test]
    fn nested_update_leaves_sibling_untouched() {
        let mut data = FormData::default();
        data.brand_colors.secondary = "#fefefe".into();

        let applied = data.set(FieldId::BrandColor(BrandColorField::Primary), FieldValue::Text("#111111".into()));

        assert!(applied);
        assert_eq!(data.brand_colors.primary, "#111111");
        assert_eq!(data.brand_colors.secondary, "#fefefe");
    }

    #[test]
    fn mismatched_value_shape_is_rejected() {
        let mut data = FormData::default();
        let applied = data.set(FieldId::IncludeCta, FieldValue::Text("yes".into()));
        assert!(!applied);
        assert_eq!(data, FormData::default());
    }

    #[test]
    fn steps_are_ordered_and_bounded() {
        assert_eq!(WizardStep::Concept.next(), Some(WizardStep::Branding));
        assert_eq!(WizardStep::Review.next(), None);
        assert_eq!(WizardStep::Concept.previous(), None);
        assert_eq!(WizardStep::Review.previous(), Some(WizardStep::Format));
        assert!(WizardStep::Concept < WizardStep::Review);
    }

    #[test]
    fn every_field_belongs_to_exactly_one_step() {
        for field in FieldId::ALL {
            let owners = WizardStep::ALL.iter().filter(|step| step.fields().contains(field)).count();
            assert_eq!(owners, 1, "field {} mapped to {} steps", field, owners);
        }
    }

    #[test]
    fn captured_draft_survives_serde_round_trip_exactly() {
        let mut data = FormData::default();
        data.concept = "sneaker launch teaser".into();
        let draft = Draft::capture(&data, WizardStep::Branding);

        let encoded = serde_json::to_string(&draft).unwrap();
        let decoded: Draft = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, draft);
        assert_eq!(draft.saved_at.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn draft_blank_detection() {
        let blank = Draft::capture(&FormData::default(), WizardStep::FIRST);
        assert!(blank.is_blank());

        let mut data = FormData::default();
        data.concept = "sneaker launch teaser".into();
        assert!(!Draft::capture(&data, WizardStep::FIRST).is_blank());
        assert!(!Draft::capture(&FormData::default(), WizardStep::Format).is_blank());
    }
}

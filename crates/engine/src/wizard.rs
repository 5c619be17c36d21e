//! Wizard state machine driving the four-step creation form.
//!
//! The controller is the single owner of form state: widgets report edits
//! through [`WizardController::update_field`] and [`WizardController::blur`],
//! navigation goes through [`WizardController::next`] and friends, and every
//! accepted edit is snapshotted to the draft store so a crash mid-form loses
//! nothing. Draft persistence is best-effort; a failing disk never blocks
//! the user from finishing the form.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use reelgen_types::form::validation::{validate_all, validate_field, validate_step};
use reelgen_types::{CreateGenerationResponse, Draft, FieldId, FieldValue, FormData, ValidationErrors, WizardStep};
use reelgen_util::DraftStore;

use crate::backend::GenerationBackend;
use crate::errors::map_api_error;
use crate::request::build_request;

/// Shown when submission is blocked by field-level validation.
pub const MSG_FIX_FIELDS: &str = "Please fix the highlighted fields before submitting.";

/// Lifecycle of the current submission attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded(CreateGenerationResponse),
    /// Holds the user-facing message. The form stays intact so the user can
    /// retry without re-entering anything.
    Failed(String),
}

/// Why a submit attempt did not produce a job.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Rejected(String),
}

/// Owns the form, the step position, validation results, and the submission
/// lifecycle for one wizard session.
pub struct WizardController {
    data: FormData,
    step: WizardStep,
    errors: ValidationErrors,
    touched: HashSet<FieldId>,
    submission: SubmissionState,
    restore: Option<Draft>,
    store: Arc<dyn DraftStore>,
}

impl WizardController {
    /// Start a session on a blank form. When the store holds a compatible,
    /// non-blank draft, the session opens with a pending restore offer; the
    /// caller surfaces it and routes the answer to [`Self::resume`] or
    /// [`Self::discard`].
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        let restore = match store.load() {
            Ok(Some(draft)) if !draft.is_blank() => Some(draft),
            Ok(_) => None,
            Err(error) => {
                warn!(%error, "failed to read stored draft; starting blank");
                None
            }
        };

        Self {
            data: FormData::default(),
            step: WizardStep::FIRST,
            errors: ValidationErrors::default(),
            touched: HashSet::new(),
            submission: SubmissionState::default(),
            restore,
            store,
        }
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn is_submitting(&self) -> bool {
        self.submission == SubmissionState::Submitting
    }

    pub fn submit_error(&self) -> Option<&str> {
        match &self.submission {
            SubmissionState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&CreateGenerationResponse> {
        match &self.submission {
            SubmissionState::Succeeded(response) => Some(response),
            _ => None,
        }
    }

    /// True while a restore offer is pending.
    pub fn show_restore_dialog(&self) -> bool {
        self.restore.is_some()
    }

    /// Accept the restore offer: the saved form and step replace the blank
    /// session.
    pub fn resume(&mut self) {
        if let Some(draft) = self.restore.take() {
            debug!(step = %draft.step, "resuming saved draft");
            self.data = draft.data;
            self.step = draft.step;
        }
    }

    /// Decline the restore offer and delete the saved draft.
    pub fn discard(&mut self) {
        if self.restore.take().is_some()
            && let Err(error) = self.store.clear()
        {
            warn!(%error, "failed to delete declined draft");
        }
    }

    /// Apply a widget edit. Returns false (and changes nothing) when the
    /// value shape does not match the field.
    pub fn update_field(&mut self, field: FieldId, value: FieldValue) -> bool {
        if !self.data.set(field, value) {
            warn!(%field, "ignoring value with mismatched shape");
            return false;
        }

        // Editing clears the stale error. Fields the user has already
        // visited revalidate live; the rest wait for blur or navigation.
        self.errors.shift_remove(&field);
        if self.touched.contains(&field)
            && let Some(message) = validate_field(field, &self.data)
        {
            self.errors.insert(field, message);
        }
        if matches!(self.submission, SubmissionState::Failed(_)) {
            self.submission = SubmissionState::Idle;
        }
        self.persist_draft();
        true
    }

    /// Validate one field as its widget loses focus.
    pub fn blur(&mut self, field: FieldId) {
        self.touched.insert(field);
        match validate_field(field, &self.data) {
            Some(message) => {
                self.errors.insert(field, message);
            }
            None => {
                self.errors.shift_remove(&field);
            }
        }
    }

    /// Try to advance one step. On validation failure the step does not
    /// change and the identifier of the first invalid field is returned so
    /// the caller can focus it.
    pub fn next(&mut self) -> Option<FieldId> {
        let step_errors = validate_step(self.step, &self.data);
        // Refresh this step's entries only; errors recorded for other
        // steps' fields stay untouched either way.
        for field in self.step.fields() {
            self.errors.shift_remove(field);
        }
        if !step_errors.is_empty() {
            let first = step_errors.keys().next().copied();
            self.errors.extend(step_errors);
            return first;
        }

        if let Some(next) = self.step.next() {
            self.step = next;
            self.persist_draft();
        }
        None
    }

    /// Move back one step. Always allowed; errors on the step being left are
    /// dropped so the user is not nagged about half-finished input.
    pub fn previous(&mut self) {
        if let Some(previous) = self.step.previous() {
            for field in self.step.fields() {
                self.errors.shift_remove(field);
            }
            self.step = previous;
            self.persist_draft();
        }
    }

    /// Jump directly to a step (review-screen edit links). All validation
    /// state is discarded; the target step revalidates on its own next().
    pub fn go_to(&mut self, step: WizardStep) {
        self.errors.clear();
        self.step = step;
        self.persist_draft();
    }

    /// Validate the whole form and submit it. On success the stored draft is
    /// deleted and the response is retained; on rejection the form survives
    /// for a retry.
    pub async fn submit(&mut self, backend: &dyn GenerationBackend) -> Result<CreateGenerationResponse, SubmitError> {
        let all_errors = validate_all(&self.data);
        if !all_errors.is_empty() {
            self.errors = all_errors;
            self.submission = SubmissionState::Failed(MSG_FIX_FIELDS.to_string());
            return Err(SubmitError::Validation(MSG_FIX_FIELDS.to_string()));
        }

        self.submission = SubmissionState::Submitting;
        let request = build_request(&self.data);

        match backend.create_generation(&request).await {
            Ok(response) => {
                debug!(generation_id = %response.generation_id, "generation created");
                if let Err(error) = self.store.clear() {
                    warn!(%error, "failed to delete draft after submission");
                }
                self.submission = SubmissionState::Succeeded(response.clone());
                Ok(response)
            }
            Err(error) => {
                let message = map_api_error(&error);
                warn!(%error, "generation request rejected");
                self.submission = SubmissionState::Failed(message.clone());
                Err(SubmitError::Rejected(message))
            }
        }
    }

    /// Return to a blank session: default form, first step, no errors, no
    /// stored draft.
    pub fn reset(&mut self) {
        self.data = FormData::default();
        self.step = WizardStep::FIRST;
        self.errors.clear();
        self.touched.clear();
        self.submission = SubmissionState::Idle;
        self.restore = None;
        if let Err(error) = self.store.clear() {
            warn!(%error, "failed to delete draft during reset");
        }
    }

    fn persist_draft(&self) {
        let draft = Draft::capture(&self.data, self.step);
        if let Err(error) = self.store.save(&draft) {
            warn!(%error, "failed to persist draft");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::errors::MSG_RATE_LIMIT;
    use reelgen_api::ApiError;
    use reelgen_types::form::BrandColorField;
    use reelgen_util::InMemoryDraftStore;

    fn controller() -> WizardController {
        WizardController::new(Arc::new(InMemoryDraftStore::new()))
    }

    fn fill_valid_concept(controller: &mut WizardController) {
        controller.update_field(FieldId::Concept, FieldValue::Text("A teaser for our sneaker launch".into()));
    }

    #[test]
    fn blank_store_opens_without_restore_offer() {
        let controller = controller();
        assert!(!controller.show_restore_dialog());
        assert_eq!(controller.step(), WizardStep::Concept);
    }

    #[test]
    fn non_blank_draft_is_offered_and_resumable() {
        let store = Arc::new(InMemoryDraftStore::new());
        let mut data = FormData::default();
        data.concept = "Holiday promo for the flagship store".into();
        store.save(&Draft::capture(&data, WizardStep::Format)).unwrap();

        let mut controller = WizardController::new(store);
        assert!(controller.show_restore_dialog());

        controller.resume();
        assert!(!controller.show_restore_dialog());
        assert_eq!(controller.step(), WizardStep::Format);
        assert_eq!(controller.data().concept, "Holiday promo for the flagship store");
    }

    #[test]
    fn declined_draft_is_deleted() {
        let store = Arc::new(InMemoryDraftStore::new());
        let mut data = FormData::default();
        data.concept = "Spring clearance spot".into();
        store.save(&Draft::capture(&data, WizardStep::Concept)).unwrap();

        let mut controller = WizardController::new(store.clone());
        controller.discard();

        assert!(!controller.show_restore_dialog());
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(controller.data().concept, "");
    }

    #[test]
    fn blank_draft_is_not_offered() {
        let store = Arc::new(InMemoryDraftStore::new());
        store.save(&Draft::capture(&FormData::default(), WizardStep::FIRST)).unwrap();
        let controller = WizardController::new(store);
        assert!(!controller.show_restore_dialog());
    }

    #[test]
    fn every_accepted_edit_is_persisted() {
        let store = Arc::new(InMemoryDraftStore::new());
        let mut controller = WizardController::new(store.clone());

        controller.update_field(FieldId::Concept, FieldValue::Text("Launch day recap reel".into()));

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.data.concept, "Launch day recap reel");
        assert_eq!(saved.step, WizardStep::Concept);
    }

    #[test]
    fn next_blocks_on_missing_cta_text_and_names_the_field() {
        let mut controller = controller();
        fill_valid_concept(&mut controller);
        assert_eq!(controller.next(), None);
        assert_eq!(controller.step(), WizardStep::Branding);

        controller.update_field(FieldId::IncludeCta, FieldValue::Flag(true));

        let blocked = controller.next();
        assert_eq!(blocked, Some(FieldId::CtaText));
        assert_eq!(controller.step(), WizardStep::Branding, "step must not advance");
        assert!(controller.errors().contains_key(&FieldId::CtaText));

        controller.update_field(FieldId::CtaText, FieldValue::Text("Shop now".into()));
        assert_eq!(controller.next(), None);
        assert_eq!(controller.step(), WizardStep::Format);
    }

    #[test]
    fn next_validates_only_the_current_step() {
        // Concept is invalid, but step 3 must still advance on its own rules.
        let mut controller = controller();
        controller.go_to(WizardStep::Format);
        assert_eq!(controller.next(), None);
        assert_eq!(controller.step(), WizardStep::Review);
    }

    #[test]
    fn previous_drops_errors_for_the_step_being_left() {
        let mut controller = controller();
        fill_valid_concept(&mut controller);
        controller.next();
        controller.update_field(FieldId::BrandName, FieldValue::Text("Acme".into()));
        controller.next();
        assert!(controller.errors().contains_key(&FieldId::BrandColor(BrandColorField::Primary)));

        controller.previous();
        assert_eq!(controller.step(), WizardStep::Concept);
        assert!(controller.errors().is_empty());
    }

    #[test]
    fn blur_validates_a_single_field() {
        let mut controller = controller();
        controller.update_field(FieldId::Concept, FieldValue::Text("too short".into()));
        controller.blur(FieldId::Concept);
        assert!(controller.errors().contains_key(&FieldId::Concept));

        fill_valid_concept(&mut controller);
        controller.blur(FieldId::Concept);
        assert!(controller.errors().is_empty());
    }

    #[test]
    fn editing_a_field_clears_its_error_but_not_others() {
        let mut controller = controller();
        controller.update_field(FieldId::IncludeCta, FieldValue::Flag(true));
        controller.blur(FieldId::Concept);
        controller.blur(FieldId::CtaText);
        assert_eq!(controller.errors().len(), 2);

        fill_valid_concept(&mut controller);
        assert!(!controller.errors().contains_key(&FieldId::Concept));
        assert!(controller.errors().contains_key(&FieldId::CtaText));
    }

    #[test]
    fn touched_fields_revalidate_on_edit() {
        let mut controller = controller();
        controller.update_field(FieldId::Concept, FieldValue::Text("too short".into()));
        controller.blur(FieldId::Concept);
        assert!(controller.errors().contains_key(&FieldId::Concept));

        controller.update_field(FieldId::Concept, FieldValue::Text("still bad".into()));
        assert!(controller.errors().contains_key(&FieldId::Concept), "visited fields revalidate live");

        fill_valid_concept(&mut controller);
        assert!(controller.errors().is_empty());

        // Fields never blurred still wait for blur or navigation.
        controller.update_field(FieldId::IncludeCta, FieldValue::Flag(true));
        controller.update_field(FieldId::CtaText, FieldValue::Text("  ".into()));
        assert!(!controller.errors().contains_key(&FieldId::CtaText));
    }

    #[test]
    fn refused_next_keeps_errors_for_other_steps() {
        let mut controller = controller();
        controller.update_field(FieldId::IncludeCta, FieldValue::Flag(true));
        controller.blur(FieldId::CtaText);
        assert!(controller.errors().contains_key(&FieldId::CtaText));

        let blocked = controller.next();

        assert_eq!(blocked, Some(FieldId::Concept));
        assert!(controller.errors().contains_key(&FieldId::Concept));
        assert!(
            controller.errors().contains_key(&FieldId::CtaText),
            "a refused transition must not wipe other steps' errors"
        );
    }

    #[tokio::test]
    async fn submit_rejects_invalid_form_without_calling_the_backend() {
        let backend = ScriptedBackend::new();
        let mut controller = controller();

        let error = controller.submit(&backend).await.unwrap_err();

        assert!(matches!(error, SubmitError::Validation(_)));
        assert_eq!(controller.submit_error(), Some(MSG_FIX_FIELDS));
        assert!(controller.errors().contains_key(&FieldId::Concept));
    }

    #[tokio::test]
    async fn successful_submit_clears_the_draft() {
        let backend = ScriptedBackend::new();
        backend.push_create(Ok(ScriptedBackend::created("gen-9")));

        let store = Arc::new(InMemoryDraftStore::new());
        let mut controller = WizardController::new(store.clone());
        fill_valid_concept(&mut controller);
        assert!(store.load().unwrap().is_some());

        let response = controller.submit(&backend).await.unwrap();

        assert_eq!(response.generation_id, "gen-9");
        assert_eq!(controller.result().map(|r| r.generation_id.as_str()), Some("gen-9"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn rejected_submit_keeps_the_form_for_retry() {
        let backend = ScriptedBackend::new();
        backend.push_create(Err(ApiError::Backend {
            code: "RATE_LIMIT_EXCEEDED".into(),
            message: "slow down".into(),
            status: 429,
        }));

        let store = Arc::new(InMemoryDraftStore::new());
        let mut controller = WizardController::new(store.clone());
        fill_valid_concept(&mut controller);

        let error = controller.submit(&backend).await.unwrap_err();

        assert!(matches!(error, SubmitError::Rejected(_)));
        assert_eq!(controller.submit_error(), Some(MSG_RATE_LIMIT));
        assert_eq!(controller.data().concept, "A teaser for our sneaker launch");
        assert!(store.load().unwrap().is_some(), "draft survives a rejected submit");

        // The next edit returns the submission to idle.
        controller.update_field(FieldId::Concept, FieldValue::Text("A fresh angle on the sneaker drop".into()));
        assert_eq!(controller.submit_error(), None);
    }

    #[test]
    fn reset_returns_to_a_blank_session() {
        let store = Arc::new(InMemoryDraftStore::new());
        let mut controller = WizardController::new(store.clone());
        fill_valid_concept(&mut controller);
        controller.next();
        controller.blur(FieldId::CtaText);

        controller.reset();

        assert_eq!(controller.data(), &FormData::default());
        assert_eq!(controller.step(), WizardStep::FIRST);
        assert!(controller.errors().is_empty());
        assert_eq!(controller.submission(), &SubmissionState::Idle);
        assert_eq!(store.load().unwrap(), None);
    }
}

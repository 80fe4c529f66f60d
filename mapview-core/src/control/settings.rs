//! Overlay editing forms.

use log::debug;
use thiserror::Error;
use uuid::Uuid;

use super::{MapControl, SharedSurface};
use crate::{OverlayRecord, SharedStore, StoreError, UpsertOutcome};

/// Name given to overlays created through [`SettingsControl::add_overlay_form`].
pub const NEW_OVERLAY_NAME: &str = "New Overlay";

/// Errors raised when submitting a form.
#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    /// The opacity field did not hold a number.
    #[error("opacity {input:?} for overlay {id:?} is not a number")]
    InvalidOpacity {
        /// Overlay being edited.
        id: String,
        /// Text entered by the user.
        input: String,
    },
    /// No form is open for the overlay.
    #[error("no form is open for overlay {0:?}")]
    UnknownForm(String),
    /// The store rejected the edited record.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Editable fields of one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayForm {
    /// Overlay being edited; doubles as the form id.
    pub overlay_id: String,
    /// Name input.
    pub name: String,
    /// URL input.
    pub url: String,
    /// Opacity input as typed.
    pub opacity: String,
    /// Whether the overlay does not exist in the store yet.
    pub draft: bool,
}

impl OverlayForm {
    fn for_record(record: &OverlayRecord, draft: bool) -> Self {
        Self {
            overlay_id: record.id.clone(),
            name: record.name.clone(),
            url: record.url.clone(),
            opacity: record.opacity.to_string(),
            draft,
        }
    }

    fn parse_opacity(&self) -> Result<f64, FormError> {
        self.opacity
            .trim()
            .parse::<f64>()
            .map_err(|_| FormError::InvalidOpacity {
                id: self.overlay_id.clone(),
                input: self.opacity.clone(),
            })
    }
}

/// State rendered by the host for the settings panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsView {
    /// Whether the panel is shown.
    pub open: bool,
    /// Forms in display order.
    pub forms: Vec<OverlayForm>,
}

/// Full-screen panel for creating and editing overlays.
///
/// Submitting a form upserts the edited record, so every other control
/// learns about the change through the store.
#[derive(Debug)]
pub struct SettingsControl {
    store: SharedStore,
    open: bool,
    forms: Vec<OverlayForm>,
}

impl SettingsControl {
    /// Create a closed panel over `store`.
    #[must_use]
    pub const fn new(store: SharedStore) -> Self {
        Self {
            store,
            open: false,
            forms: Vec::new(),
        }
    }

    /// Show or hide the panel.
    pub const fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Whether the panel is shown.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Current panel state.
    #[must_use]
    pub fn view(&self) -> SettingsView {
        SettingsView {
            open: self.open,
            forms: self.forms.clone(),
        }
    }

    /// Rebuild the form list with one form per stored overlay.
    ///
    /// Unsaved drafts are discarded.
    pub fn open_overlay_menu(&mut self) -> &[OverlayForm] {
        self.forms = self
            .store
            .list()
            .iter()
            .map(|overlay| OverlayForm::for_record(overlay, false))
            .collect();
        &self.forms
    }

    /// Append a draft form for a new overlay and return its id.
    pub fn add_overlay_form(&mut self) -> String {
        let id = format!("o-{}", Uuid::new_v4());
        let record = OverlayRecord::new(id.as_str(), NEW_OVERLAY_NAME, "");
        self.forms.push(OverlayForm::for_record(&record, true));
        id
    }

    /// Form editing `overlay_id`.
    #[must_use]
    pub fn form(&self, overlay_id: &str) -> Option<&OverlayForm> {
        self.forms.iter().find(|form| form.overlay_id == overlay_id)
    }

    /// Mutable access to the form editing `overlay_id`.
    pub fn form_mut(&mut self, overlay_id: &str) -> Option<&mut OverlayForm> {
        self.forms
            .iter_mut()
            .find(|form| form.overlay_id == overlay_id)
    }

    /// Save a form's contents to the store.
    ///
    /// Fields the form does not edit keep their stored values; drafts take
    /// the defaults of a new overlay.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownForm`] when no form is open for the id,
    /// [`FormError::InvalidOpacity`] when the opacity text is not numeric,
    /// and [`FormError::Store`] when the store rejects the record.
    pub fn submit(&mut self, overlay_id: &str) -> Result<UpsertOutcome, FormError> {
        let form = self
            .form(overlay_id)
            .cloned()
            .ok_or_else(|| FormError::UnknownForm(overlay_id.to_owned()))?;
        let opacity = form.parse_opacity()?;
        let base = self
            .store
            .get(overlay_id)
            .unwrap_or_else(|| OverlayRecord::new(overlay_id, "", ""));
        let edited = OverlayRecord {
            name: form.name,
            url: form.url,
            opacity,
            ..base
        };
        let outcome = self.store.upsert(overlay_id, edited)?;
        debug!("saved overlay form {overlay_id}");
        if let Some(saved) = self.form_mut(overlay_id) {
            saved.draft = false;
        }
        Ok(outcome)
    }
}

impl MapControl for SettingsControl {
    type Handle = SettingsView;

    fn attach(&mut self, _host: SharedSurface) -> SettingsView {
        self.open_overlay_menu();
        self.view()
    }

    fn detach(&mut self) {
        self.open = false;
        self.forms.clear();
    }
}

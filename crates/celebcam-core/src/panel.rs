//! The result container: one [`ResultView`] at a time, replaced wholesale.

use crate::render::ResultView;

/// Message shown when a capture or upload could not be completed.
pub const RETRY_MESSAGE: &str = "Upload failed, please retry.";

/// The result container. Every update replaces the whole content.
#[derive(Debug, Default)]
pub struct ResultPanel {
    view: ResultView,
    revision: u64,
}

impl ResultPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current content with `view`; nothing from the previous
    /// render survives.
    pub fn replace(&mut self, view: ResultView) {
        self.view = view;
        self.revision += 1;
    }

    /// Replace the content with a visible failure message.
    pub fn show_error(&mut self, message: &str) {
        self.replace(ResultView::error(message));
    }

    pub fn view(&self) -> &ResultView {
        &self.view
    }

    /// Number of updates applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

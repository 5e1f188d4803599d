//! celebcam-core — Recognition response model and result rendering.
//!
//! Decodes the recognition service's responses into named-field types and
//! turns them into a [`ResultView`] that can be written out as HTML or text.

pub mod date;
pub mod output;
pub mod panel;
pub mod render;
pub mod types;

pub use panel::{ResultPanel, RETRY_MESSAGE};
pub use render::{render, Card, ResultItem, ResultView};
pub use types::{CelebrityInfo, FaceEntry, RecognitionResponse};

//! Field and laboratory-value extraction from the rendered character stream.
//!
//! Every field is extracted independently by walking an ordered list of
//! pattern rules and accepting the first match that survives validation and
//! normalization. An unmatched field is an absent field, never an error: the
//! only fatal per-document condition is the rendering backend itself failing,
//! which callers represent as a [`DocumentReadError`].

pub mod dates;
pub mod fields;
pub mod lab_values;
pub mod orchestrator;
pub mod patterns;
pub mod sanitize;
pub mod title;

pub use fields::*;
pub use lab_values::extract_lab_values;
pub use orchestrator::extract_metadata;
pub use sanitize::sanitize_extracted_text;
pub use title::extract_exam_title;

use thiserror::Error;

/// The rendering backend could not produce a character stream for a
/// document. Fatal for that document only; a batch reports it and moves on.
#[derive(Error, Debug, Clone)]
#[error("Lettura del documento non riuscita: {0}")]
pub struct DocumentReadError(pub String);

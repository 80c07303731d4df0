//! Reference-based label transfer by rank correlation.
//!
//! Marker features are chosen from per-label medians of a labelled
//! reference, the reference profiles are ranked over those markers,
//! and every query column takes the label whose profiles it correlates
//! with best. Close calls are narrowed down on the markers separating
//! the contenders. Several references can be combined by scoring each
//! column against the label every reference assigned to it.

pub mod annotate;
pub mod classify;
pub mod error;
pub mod fine_tune;
pub mod integrated_build;
pub mod integrated_classify;
pub mod marker_selection;
pub mod markers;
pub mod medians;
pub mod names;
pub mod reference;

pub use annotate::{annotate_integrated, annotate_single, AnnotateArgs};
pub use classify::{classify, classify_by_name, ClassifyArgs, SingleClassification};
pub use error::{LabelError, Result};
pub use fine_tune::{FineTuneRound, FineTuneStatus};
pub use integrated_build::{IntegratedBuilder, IntegratedModel};
pub use integrated_classify::{classify_integrated, IntegratedClassification};
pub use marker_selection::{number_of_markers, select_markers, NamedReference};
pub use markers::{MarkerSet, NamedMarkers};
pub use reference::{BuildArgs, ReferenceBuilder, ReferenceModel};

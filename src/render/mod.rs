//! Marker selection and reconciliation for the map surface.
//!
//! - [`ViewportRenderer`] turns the active index and viewport into a target
//!   marker set and applies the difference to a [`MarkerSurface`]
//! - [`MarkerKey`] gives markers identities that are stable across passes
//! - [`InMemorySurface`] is a surface that only records what it was told

pub mod features;
mod marker;
mod surface;
mod viewport;

pub use features::{to_feature, to_feature_collection};
pub use marker::{MarkerAction, MarkerHandle, MarkerKey, MarkerKind, MarkerSpec, MarkerSurface};
pub use surface::InMemorySurface;
pub use viewport::{MarkerSet, RenderDiff, RenderMode, RenderOutcome, Viewport, ViewportRenderer};

//! Application-level orchestration.
//!
//! This module owns the run lifecycle (priming, running, completing) and the
//! completion timeline. UI/CLI layers talk to it through [`UiCommand`]s and
//! observe it through a [`VisualSurface`].
//!
//! [`UiCommand`]: crate::model::UiCommand
//! [`VisualSurface`]: crate::surface::VisualSurface

mod completion;
mod controller;

pub use completion::Outcome;
pub use controller::{run_controller, ExecutionController};

//! Service layer for the catalog generator.
//!
//! This module contains the collaborators the pipeline talks to:
//! - Child process execution (`ProcessRunner`, `TokioRunner`)
//! - Page rendering (`PageRenderer`, `TemplateRenderer`)
//! - Release notification (`ReleaseNotifier`, `LogNotifier`)

mod notify;
mod process;
mod render;

pub use notify::{LogNotifier, Release, ReleaseNotifier};
pub use process::{
    BUILD_TIMEOUT_CODE, CommandSpec, ProcessOutput, ProcessRunner, ProcessStatus, TokioRunner,
};
pub use render::{DETAIL_TEMPLATE, PageParams, PageRenderer, TemplateRenderer};

#[cfg(test)]
pub(crate) mod testing {
    pub use super::notify::testing::RecordingNotifier;
    pub use super::process::testing::ScriptedRunner;
}

//! Activity launcher classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime family of an activity, derived from its `exec` launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Python3,
    Python2,
    Web,
    Other,
}

/// Known launcher names and the runtime they imply.
const LAUNCHERS: &[(&str, ActivityType)] = &[
    ("sugar-activity3", ActivityType::Python3),
    ("sugar-activity", ActivityType::Python2),
    ("sugar-activity-web", ActivityType::Web),
];

impl ActivityType {
    /// Classify an `exec` command line by the basename of its first token.
    ///
    /// Returns `None` when there is no command to classify.
    pub fn classify(exec_command: Option<&str>) -> Option<Self> {
        let launcher = exec_command?.split_whitespace().next()?;
        let basename = launcher.rsplit(['/', '\\']).next().unwrap_or(launcher);

        Some(
            LAUNCHERS
                .iter()
                .find(|(name, _)| *name == basename)
                .map(|(_, kind)| *kind)
                .unwrap_or(ActivityType::Other),
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Python3 => "python3",
            ActivityType::Python2 => "python2",
            ActivityType::Web => "web",
            ActivityType::Other => "other",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

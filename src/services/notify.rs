// src/services/notify.rs

//! New-release notification hook.

use async_trait::async_trait;

use crate::error::Result;

/// A bundle version seen for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub bundle_id: String,
    pub name: String,
    pub version: String,
    /// Notes for this version from the bundle's NEWS file
    pub notes: Option<String>,
}

/// Receives new releases detected during feed generation.
#[async_trait]
pub trait ReleaseNotifier: Send + Sync {
    async fn notify(&self, release: &Release) -> Result<()>;
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ReleaseNotifier for LogNotifier {
    async fn notify(&self, release: &Release) -> Result<()> {
        log::info!(
            "[RELEASE] {} ({}) v{}",
            release.name,
            release.bundle_id,
            release.version
        );
        if let Some(notes) = &release.notes {
            for line in notes.lines().filter(|l| !l.trim().is_empty()) {
                log::info!("[RELEASE]   {}", line.trim());
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_accepts_release_without_notes() {
        let release = Release {
            bundle_id: "org.laptop.Pippy".into(),
            name: "Pippy".into(),
            version: "6".into(),
            notes: None,
        };
        assert!(LogNotifier.notify(&release).await.is_ok());
    }
}

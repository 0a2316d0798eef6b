// src/bundle/build.rs

//! Per-bundle build step.

use std::fs;
use std::path::Path;

use crate::bundle::Bundle;
use crate::bundle::vcs::{self, TagCheckout};
use crate::error::{AppError, Result};
use crate::models::{ActivityType, BuildConfig};
use crate::services::{CommandSpec, ProcessOutput, ProcessRunner};
use crate::utils::find_executable;

/// Message reported for bundles that are already packaged.
pub const ALREADY_BUILT: &str = "[xo] Already Built.";

/// Interpreter used when the configured one is not on `PATH`.
const FALLBACK_PYTHON: &str = "python";

/// Installer for packaged `.xo` bundles.
pub const INSTALL_BUNDLE_PROGRAM: &str = "sugar-install-bundle";

impl Bundle {
    /// Build this bundle's distributable artifact.
    ///
    /// The entrypoint script, when configured, runs first; with
    /// `override_default` it replaces the default `setup.py dist_xo` step.
    /// With `checkout_latest_tag` the checkout is moved to its newest tag for
    /// the duration of the build. A successful build re-resolves the artifact
    /// under `dist/`.
    pub async fn generate_build(
        &mut self,
        runner: &dyn ProcessRunner,
        config: &BuildConfig,
    ) -> Result<ProcessOutput> {
        if self.is_archive() {
            return Ok(ProcessOutput::exited(0, ALREADY_BUILT, ""));
        }

        if config.override_default && config.entrypoint.is_none() {
            return Err(AppError::config(
                "build.override_default requires build.entrypoint",
            ));
        }

        let checkout = if config.checkout_latest_tag {
            self.checkout_latest_tag()
        } else {
            None
        };

        let result = self.run_build(runner, config).await;

        if let Some(checkout) = checkout {
            if let Err(e) = checkout.restore() {
                log::warn!("[BUILD][{}] restoring checkout failed: {}", self.label(), e);
            }
        }
        result
    }

    /// Install this bundle for the current user, or system-wide.
    ///
    /// Packaged bundles go through `sugar-install-bundle`; source checkouts
    /// run `setup.py install`.
    pub async fn install(
        &self,
        runner: &dyn ProcessRunner,
        config: &BuildConfig,
        system: bool,
    ) -> Result<ProcessOutput> {
        let mut spec = if self.is_archive() {
            CommandSpec::new(INSTALL_BUNDLE_PROGRAM)
                .arg(self.path().to_string_lossy())
                .cwd(self.path().parent().unwrap_or(Path::new(".")))
                .timeout(config.timeout(), true)
        } else {
            CommandSpec::new(resolve_python(&config.python3))
                .arg("setup.py")
                .arg("install")
                .cwd(self.path())
                .timeout(config.timeout(), false)
        };
        if !system {
            spec = spec.arg("--user");
        }
        log::info!("[INSTALL][{}] {}", self.label(), spec);

        runner.run(&spec).await
    }

    async fn run_build(
        &mut self,
        runner: &dyn ProcessRunner,
        config: &BuildConfig,
    ) -> Result<ProcessOutput> {
        if let Some(entrypoint) = &config.entrypoint {
            let output = self.run_entrypoint(runner, config, entrypoint).await?;
            if config.override_default {
                if output.success() {
                    self.refresh_artifact();
                }
                return Ok(output);
            }
            if !output.success() {
                log::warn!(
                    "[BUILD][{}] entrypoint exited with {}",
                    self.label(),
                    output.code()
                );
            }
        }

        let spec = CommandSpec::new(self.interpreter(config))
            .arg("setup.py")
            .arg("dist_xo")
            .cwd(self.path())
            .timeout(config.timeout(), config.retry);
        log::info!("[BUILD][{}] {}", self.label(), spec);

        let output = runner.run(&spec).await?;
        if output.success() {
            self.refresh_artifact();
        }
        Ok(output)
    }

    fn checkout_latest_tag(&self) -> Option<TagCheckout> {
        match vcs::checkout_latest_tag(self.path()) {
            Ok(Some(checkout)) => {
                log::info!("[BUILD][{}] building tag {}", self.label(), checkout.tag());
                Some(checkout)
            }
            Ok(None) => {
                log::warn!("[BUILD][{}] no tags, building current checkout", self.label());
                None
            }
            Err(e) => {
                log::warn!("[BUILD][{}] checkout of latest tag failed: {}", self.label(), e);
                None
            }
        }
    }

    /// Interpreter for the default build step.
    fn interpreter(&self, config: &BuildConfig) -> String {
        match self.activity_type() {
            Some(ActivityType::Python2) => resolve_python(&config.python2),
            _ => resolve_python(&config.python3),
        }
    }

    /// Fill the entrypoint template for this bundle and run it with `sh`.
    async fn run_entrypoint(
        &self,
        runner: &dyn ProcessRunner,
        config: &BuildConfig,
        entrypoint: &Path,
    ) -> Result<ProcessOutput> {
        let template = fs::read_to_string(entrypoint).map_err(|e| {
            AppError::config(format!("entrypoint {:?} unreadable: {}", entrypoint, e))
        })?;
        let script = self.fill_entrypoint(&template);

        let scratch = tempfile::Builder::new()
            .prefix("bundlestore-build-")
            .suffix(".sh")
            .tempfile()?;
        fs::write(scratch.path(), script)?;

        let mut spec = CommandSpec::new("sh")
            .arg(scratch.path().to_string_lossy())
            .timeout(config.timeout(), config.retry);
        if config.chdir {
            spec = spec.cwd(self.path());
        }
        log::info!("[BUILD][{}] entrypoint {:?}", self.label(), entrypoint);

        runner.run(&spec).await
    }

    fn fill_entrypoint(&self, template: &str) -> String {
        let icon_path = self
            .path()
            .join("activity")
            .join(format!("{}.svg", self.icon_name()));
        template
            .replace("{name}", self.name().unwrap_or_default())
            .replace("{v}", self.version().unwrap_or_default())
            .replace("{activity_dir}", &self.path().to_string_lossy())
            .replace("{icon_path}", &icon_path.to_string_lossy())
    }
}

fn resolve_python(wanted: &str) -> String {
    if find_executable(wanted).is_some() {
        wanted.to_string()
    } else {
        log::debug!("{} not found on PATH, using {}", wanted, FALLBACK_PYTHON);
        FALLBACK_PYTHON.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::source::test_support::write_zip;
    use crate::bundle::test_support::*;
    use crate::services::testing::ScriptedRunner;
    use crate::services::{BUILD_TIMEOUT_CODE, ProcessStatus, TokioRunner};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_archive_is_already_built() {
        let tmp = TempDir::new().unwrap();
        let xo = tmp.path().join("Pippy-5.xo");
        write_zip(
            &xo,
            &[("Pippy.activity/activity/activity.info", PIPPY_MANIFEST.as_bytes())],
        );
        let mut bundle = Bundle::open(&xo).unwrap();
        let runner = ScriptedRunner::default();

        let out = bundle
            .generate_build(&runner, &BuildConfig::default())
            .await
            .unwrap();
        assert_eq!(out.stdout, ALREADY_BUILT);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_step_runs_setup_in_bundle_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let mut bundle = Bundle::open(&dir).unwrap();
        assert!(bundle.artifact_path().is_none());

        // Simulate the build tool producing an artifact.
        fs::create_dir_all(dir.join("dist")).unwrap();
        fs::write(dir.join("dist/Pippy-5.xo"), "xo").unwrap();
        let runner = ScriptedRunner::new([ProcessOutput::exited(0, "ok", "")]);

        let out = bundle
            .generate_build(&runner, &BuildConfig::default())
            .await
            .unwrap();
        assert!(out.success());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["setup.py", "dist_xo"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(dir.as_path()));
        assert!(bundle.artifact_path().is_some());
    }

    #[tokio::test]
    async fn test_timeout_leaves_artifact_unresolved() {
        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let mut bundle = Bundle::open(&dir).unwrap();
        let runner = ScriptedRunner::new([ProcessOutput::timed_out()]);

        let out = bundle
            .generate_build(&runner, &BuildConfig::default())
            .await
            .unwrap();
        assert_eq!(out.code(), BUILD_TIMEOUT_CODE);
        assert!(bundle.artifact_path().is_none());
    }

    #[tokio::test]
    async fn test_override_requires_entrypoint() {
        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let mut bundle = Bundle::open(&dir).unwrap();
        let config = BuildConfig {
            override_default: true,
            ..BuildConfig::default()
        };

        let result = bundle
            .generate_build(&ScriptedRunner::default(), &config)
            .await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_override_entrypoint_runs_filled_script() {
        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let script = tmp.path().join("build.sh");
        fs::write(
            &script,
            "mkdir -p {activity_dir}/dist\necho {name} > {activity_dir}/dist/{name}-{v}.xo\n",
        )
        .unwrap();

        let mut bundle = Bundle::open(&dir).unwrap();
        let config = BuildConfig {
            override_default: true,
            entrypoint: Some(script),
            chdir: true,
            timeout_secs: 30,
            ..BuildConfig::default()
        };

        let out = bundle.generate_build(&TokioRunner, &config).await.unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert_eq!(
            fs::read_to_string(dir.join("dist/Pippy-5.xo")).unwrap().trim(),
            "Pippy"
        );
        assert_eq!(bundle.artifact_path(), Some(dir.join("dist/Pippy-5.xo").as_path()));
    }

    #[tokio::test]
    async fn test_builds_latest_tag_then_restores_checkout() {
        use crate::bundle::vcs::test_support::{commit_file, tag};

        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let repo = git2::Repository::init(&dir).unwrap();
        let released = commit_file(&repo, "version.txt", "released", 1_000);
        tag(&repo, "v5", released);
        commit_file(&repo, "version.txt", "unreleased", 2_000);

        let script = tmp.path().join("build.sh");
        fs::write(&script, "mkdir -p dist\ncp version.txt dist/{name}-{v}.xo\n").unwrap();

        let mut bundle = Bundle::open(&dir).unwrap();
        let config = BuildConfig {
            override_default: true,
            entrypoint: Some(script),
            chdir: true,
            checkout_latest_tag: true,
            timeout_secs: 30,
            ..BuildConfig::default()
        };

        let out = bundle.generate_build(&TokioRunner, &config).await.unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert_eq!(
            fs::read_to_string(dir.join("dist/Pippy-5.xo")).unwrap(),
            "released"
        );
        assert_eq!(
            fs::read_to_string(dir.join("version.txt")).unwrap(),
            "unreleased"
        );
        assert!(!repo.head_detached().unwrap());
    }

    #[tokio::test]
    async fn test_checkout_restored_after_failed_build() {
        use crate::bundle::vcs::test_support::{commit_file, tag};

        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let repo = git2::Repository::init(&dir).unwrap();
        let released = commit_file(&repo, "version.txt", "released", 1_000);
        tag(&repo, "v5", released);
        commit_file(&repo, "version.txt", "unreleased", 2_000);

        let mut bundle = Bundle::open(&dir).unwrap();
        let config = BuildConfig {
            checkout_latest_tag: true,
            ..BuildConfig::default()
        };
        let runner = ScriptedRunner::new([ProcessOutput::exited(1, "", "boom")]);

        let out = bundle.generate_build(&runner, &config).await.unwrap();
        assert_eq!(out.code(), 1);
        assert_eq!(
            fs::read_to_string(dir.join("version.txt")).unwrap(),
            "unreleased"
        );
        assert!(!repo.head_detached().unwrap());
    }

    #[tokio::test]
    async fn test_install_commands() {
        let tmp = TempDir::new().unwrap();
        let dir = write_source_bundle(tmp.path(), "Pippy.activity", PIPPY_MANIFEST);
        let source = Bundle::open(&dir).unwrap();
        let xo = tmp.path().join("Pippy-5.xo");
        write_zip(
            &xo,
            &[("Pippy.activity/activity/activity.info", PIPPY_MANIFEST.as_bytes())],
        );
        let archive = Bundle::open(&xo).unwrap();

        let runner = ScriptedRunner::new([
            ProcessOutput::exited(0, "", ""),
            ProcessOutput::exited(0, "", ""),
            ProcessOutput::exited(0, "", ""),
        ]);
        let config = BuildConfig::default();
        source.install(&runner, &config, false).await.unwrap();
        archive.install(&runner, &config, false).await.unwrap();
        archive.install(&runner, &config, true).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["setup.py", "install", "--user"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(dir.as_path()));
        assert_eq!(calls[1].program, INSTALL_BUNDLE_PROGRAM);
        assert_eq!(
            calls[1].args,
            vec![xo.to_string_lossy().into_owned(), "--user".to_string()]
        );
        assert!(calls[1].retry);
        assert_eq!(calls[2].args, vec![xo.to_string_lossy().into_owned()]);
    }
}

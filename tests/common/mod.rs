//! Common test utilities for bundlestore integration tests

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A temporary input/output tree
#[allow(dead_code)]
pub struct TestWorkspace {
    pub temp: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let input = temp.path().join("bundles");
        let output = temp.path().join("site");
        fs::create_dir_all(&input).expect("Failed to create input directory");
        Self {
            temp,
            input,
            output,
        }
    }

    /// Source checkout `<input>/<dir_name>` with a manifest and a packaged
    /// artifact under `dist/`.
    pub fn add_built_source(
        &self,
        dir_name: &str,
        name: &str,
        bundle_id: &str,
        version: &str,
    ) -> PathBuf {
        let dir = self.input.join(dir_name);
        fs::create_dir_all(dir.join("activity")).expect("Failed to create activity dir");
        fs::create_dir_all(dir.join("dist")).expect("Failed to create dist dir");
        fs::write(
            dir.join("activity/activity.info"),
            manifest(name, bundle_id, version),
        )
        .expect("Failed to write manifest");
        fs::write(dir.join("activity/activity-icon.svg"), "<svg/>").expect("Failed to write icon");
        fs::write(
            dir.join("NEWS"),
            format!("v{version}\n\n* Release {version}\n* More tests"),
        )
        .expect("Failed to write NEWS");
        fs::write(
            dir.join("dist").join(format!("{name}-{version}.xo")),
            format!("{name} {version}"),
        )
        .expect("Failed to write artifact");
        dir
    }

    /// Packaged `<input>/<name>-<version>.xo`.
    pub fn add_archive(&self, name: &str, bundle_id: &str, version: &str) -> PathBuf {
        let path = self.input.join(format!("{name}-{version}.xo"));
        let prefix = format!("{name}.activity");
        write_zip(
            &path,
            &[
                (
                    &format!("{prefix}/activity/activity.info"),
                    manifest(name, bundle_id, version).as_bytes(),
                ),
                (&format!("{prefix}/activity/activity-icon.svg"), b"<svg/>"),
            ],
        );
        path
    }

    pub fn output_file(&self, rel: &str) -> PathBuf {
        self.output.join(rel)
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.output_file(rel))
            .unwrap_or_else(|e| panic!("Failed to read {rel}: {e}"))
    }
}

pub fn manifest(name: &str, bundle_id: &str, version: &str) -> String {
    format!(
        "[Activity]\nname = {name}\nbundle_id = {bundle_id}\nactivity_version = {version}\n\
         exec = sugar-activity3 activity.Main\nicon = activity-icon\nlicense = GPLv3+\n\
         tags = Programming;Python\nsummary = {name} for tests\n"
    )
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = fs::File::create(path).expect("Failed to create archive");
    let mut zip = ZipWriter::new(file);
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start entry");
        zip.write_all(bytes).expect("Failed to write entry");
    }
    zip.finish().expect("Failed to finish archive");
}

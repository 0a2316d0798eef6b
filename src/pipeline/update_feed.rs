// src/pipeline/update_feed.rs

//! Update-check feed documents (`api/<bundle_id>.xml`).
//!
//! The layout is consumed by an external update checker and must not
//! change: element order, indentation and the missing trailing newline are
//! all significant.

use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::FeedConfig;
use crate::utils::{file_name_string, sha256_file};

const RDF_TEMPLATE: &str = r#"<?xml version="1.0"?>
<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:em="http://www.mozilla.org/2004/em-rdf#">
    <RDF:Description about="urn:mozilla:extension:{bundle_id}">
        <em:updates>
            <RDF:Seq>
                <RDF:li resource="urn:mozilla:extension:{bundle_id}:{version}"/>
            </RDF:Seq>
        </em:updates>
    </RDF:Description>
    <RDF:Description about="urn:mozilla:extension:{bundle_id}:{version}">
        <em:version>{version}</em:version>
        <em:targetApplication>
            <RDF:Description>
                <em:id>{uuid}</em:id>
                <em:minVersion>{min_version}</em:minVersion>
                <em:maxVersion>{max_version}</em:maxVersion>
                <em:updateLink>{update_link}</em:updateLink>
                <em:updateSize>{update_size}</em:updateSize>
                <em:updateInfoURL>{update_info}</em:updateInfoURL>
                <em:updateHash>sha256:{sha_hash}</em:updateHash>
            </RDF:Description>
        </em:targetApplication>
    </RDF:Description>
</RDF:RDF>"#;

/// Fields of one update-check document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFeedDocument {
    pub bundle_id: String,
    pub version: String,
    /// Fresh per document
    pub instance_id: Uuid,
    pub min_version: String,
    pub max_version: String,
    pub update_link: String,
    /// Artifact size in kilobytes (bytes / 1000)
    pub update_size: u64,
    pub update_info: String,
    /// Hex SHA-256 of the artifact bytes
    pub sha256: String,
}

impl UpdateFeedDocument {
    /// Describe `artifact` as the current release of `bundle_id`.
    pub fn for_artifact(
        bundle_id: &str,
        version: Option<&str>,
        artifact: &Path,
        feed: &FeedConfig,
    ) -> Result<Self> {
        let file_name = file_name_string(artifact)
            .ok_or_else(|| AppError::MissingArtifact(bundle_id.to_string()))?;
        let size = fs::metadata(artifact)?.len();
        let base = feed.base_url();

        Ok(Self {
            bundle_id: bundle_id.to_string(),
            version: version.unwrap_or_default().to_string(),
            instance_id: Uuid::new_v4(),
            min_version: feed.min_version.clone(),
            max_version: feed.max_version.clone(),
            update_link: format!("{base}/bundles/{file_name}"),
            update_size: size / 1000,
            update_info: format!("{base}/app/{bundle_id}.html"),
            sha256: sha256_file(artifact)?,
        })
    }

    pub fn render(&self) -> String {
        RDF_TEMPLATE
            .replace("{bundle_id}", &self.bundle_id)
            .replace("{version}", &self.version)
            .replace("{uuid}", &format!("{{{}}}", self.instance_id))
            .replace("{min_version}", &self.min_version)
            .replace("{max_version}", &self.max_version)
            .replace("{update_link}", &self.update_link)
            .replace("{update_size}", &self.update_size.to_string())
            .replace("{update_info}", &self.update_info)
            .replace("{sha_hash}", &self.sha256)
    }
}

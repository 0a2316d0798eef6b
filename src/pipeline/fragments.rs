// src/pipeline/fragments.rs

//! HTML fragments embedded in detail pages.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use html_escape::encode_quoted_attribute as escape;
use serde::Deserialize;

use crate::error::Result;
use crate::utils::file_name_string;

/// License badge emitted when a bundle declares none.
pub const NO_ASSERTION: &str = "NOASSERTION";

const CAROUSEL_TEMPLATE: &str = r##"
<div id="carouselExampleIndicators" class="carousel slide" data-ride="carousel" style="margin-top:1rem;">
  <ol class="carousel-indicators">{indicators}</ol>
  <div class="carousel-inner">{items}</div>
  <a class="carousel-control-prev" href="#carouselExampleIndicators" role="button" data-slide="prev">
    <span class="carousel-control-prev-icon" aria-hidden="true"></span>
    <span class="sr-only">Previous</span>
  </a>
  <a class="carousel-control-next" href="#carouselExampleIndicators" role="button" data-slide="next">
    <span class="carousel-control-next-icon" aria-hidden="true"></span>
    <span class="sr-only">Next</span>
  </a>
</div>
"##;

const FLATPAK_TEMPLATE: &str = r#"<div class="card text-white bg-info mb-3" style="border-radius: 1rem;">
  <div class="card-header"><i class="fa fa-box" aria-hidden="true"></i> Flatpak</div>
  <div class="card-body">
    <h5 class="card-title">{activity_name} Activity is also available as a flatpak!</h5>
    <p class="card-text">Installing activities as flatpaks helps to run Activities made for Sugar desktop to be run on any linux.</p>
    <a href="https://flathub.org/repo/appstream/{bundle_id}.flatpakref" class="btn btn-light saas-activity-download-button">
        <i class="fa fa-download" aria-hidden="true"></i> Download .flatpakref
    </a>
    <a href="https://flathub.org/apps/details/{bundle_id}" class="btn btn-light saas-activity-download-button" style="margin-right:0.5rem">
        <i class="fa fa-box" aria-hidden="true"></i> Flathub
    </a>
</div></div>"#;

const NEW_FEATURE_TEMPLATE: &str = r#"<div class="saas-new-features">
<h5>What's new in this version</h5>
<ul>{new_features}</ul>
</div>"#;

const CHANGELOG_TEMPLATE: &str = r#"<div class="saas-changelog">
<h5>Changelog</h5>
<pre>{changelog}</pre>
</div>"#;

/// One badge per non-blank tag.
pub fn tags_html(tags: &[String]) -> String {
    tags.iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!(r#"<span class="badge badge-primary saas-badge">{}</span>"#, escape(t)))
        .collect()
}

/// Author badges, most commits first.
pub fn authors_html(authors: &BTreeMap<String, usize>) -> String {
    let mut ranked: Vec<(&String, &usize)> = authors.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .map(|(author, commits)| {
            format!(
                r#"<span class="badge badge-secondary saas-badge">{}  <span class="badge badge-dark">{}</span></span>"#,
                escape(author),
                commits
            )
        })
        .collect()
}

/// List items for the current release's notes.
///
/// Leading `*` bullets are dropped; a trailing empty item is pruned.
pub fn release_note_items(notes: Option<&str>) -> Vec<String> {
    let Some(notes) = notes.filter(|n| !n.is_empty()) else {
        return Vec::new();
    };
    let escaped = escape(notes);
    let mut items: Vec<String> = escaped
        .split('\n')
        .map(|line| {
            let split = line.char_indices().nth(2).map(|(i, _)| i).unwrap_or(line.len());
            let (head, tail) = line.split_at(split);
            format!("<li>{}{}</li>", head.replace('*', ""), tail)
        })
        .collect();
    if items.last().is_some_and(|last| last == "<li></li>") {
        items.pop();
    }
    items
}

/// "What's new" block, or empty text when there are no notes.
pub fn new_feature_html(notes: Option<&str>) -> String {
    let items = release_note_items(notes);
    if items.is_empty() {
        return String::new();
    }
    NEW_FEATURE_TEMPLATE.replace("{new_features}", &items.concat())
}

/// Full changelog block, or empty text for a blank changelog.
pub fn changelog_html(changelog: Option<&str>) -> String {
    match changelog {
        Some(text) if !text.trim().is_empty() => {
            CHANGELOG_TEMPLATE.replace("{changelog}", &escape(text))
        }
        _ => String::new(),
    }
}

/// One badge per non-blank license token, or a single `NOASSERTION` badge.
pub fn licenses_html(licenses: &[String]) -> String {
    let parsed: Vec<&str> = licenses
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let badge = |lic: &str| format!(r#"<span class="badge badge-info">{}</span>"#, escape(lic));
    if parsed.is_empty() {
        return badge(NO_ASSERTION);
    }
    parsed.into_iter().map(badge).collect()
}

/// Copy screenshots to `<output>/app/<bundle_id>/` and build a carousel.
///
/// The per-bundle directory is recreated on every call. Image sources are
/// relative to the detail page.
pub fn carousel_html(
    output_dir: &Path,
    bundle_id: &str,
    activity_name: &str,
    screenshots: &[PathBuf],
) -> Result<String> {
    let target_dir = output_dir.join("app").join(bundle_id);
    if target_dir.exists() {
        fs::remove_dir_all(&target_dir)?;
    }
    fs::create_dir_all(&target_dir)?;

    let mut indicators = String::new();
    let mut items = String::new();
    for (i, screenshot) in screenshots.iter().enumerate() {
        let Some(file_name) = file_name_string(screenshot) else {
            continue;
        };
        fs::copy(screenshot, target_dir.join(&file_name))?;

        let n = i + 1;
        let active = if i == 0 { "active" } else { "" };
        indicators.push_str(&format!(
            r##"<li data-target="#carouselExampleIndicators" data-slide-to="{n}" class="{active}"></li>"##
        ));
        items.push_str(&format!(
            "<div class=\"carousel-item {active}\">\n<img class=\"d-block w-100\" src=\"{bundle_id}/{file_name}\" alt=\"Picture {n} of {} Activity\">\n</div>\n",
            escape(activity_name)
        ));
    }

    Ok(CAROUSEL_TEMPLATE
        .replace("{indicators}", &indicators)
        .replace("{items}", &items))
}

/// Flatpak availability card.
pub fn flatpak_html(activity_name: &str, flatpak_id: &str) -> String {
    FLATPAK_TEMPLATE
        .replace("{activity_name}", &escape(activity_name))
        .replace("{bundle_id}", flatpak_id)
}

/// One registered flatpak.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlatpakEntry {
    #[serde(rename = "bundle-id")]
    pub bundle_id: String,
}

/// Map from repository URL (without `.git`) to its flatpak registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FlatpakRegistry {
    entries: HashMap<String, FlatpakEntry>,
}

impl FlatpakRegistry {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn lookup(&self, repository_url: &str) -> Option<&FlatpakEntry> {
        self.entries.get(repository_url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

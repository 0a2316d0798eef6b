// src/services/render.rs

//! Page rendering.
//!
//! Templates are plain HTML with `{{ key }}` placeholders. Placeholders with
//! no matching parameter render as empty text.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Named values substituted into a template.
pub type PageParams = BTreeMap<String, String>;

/// Template used for per-bundle detail pages.
pub const DETAIL_TEMPLATE: &str = "app.html";

/// Renders named templates with parameters.
pub trait PageRenderer: Send + Sync {
    /// Render `template` or fail if it cannot be found or is malformed.
    fn render(&self, template: &str, params: &PageParams) -> Result<String>;

    /// Whether `template` is available.
    fn has_template(&self, template: &str) -> bool;
}

/// Built-in detail page, used when no template directory provides one.
const DEFAULT_DETAIL_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<link rel="stylesheet" href="/css/main.css">
</head>
<body>
<div class="container">
<h1><img src="{{ icon_path }}" width="64" height="64" alt=""> {{ title }}</h1>
<p class="lead">{{ summary }}</p>
<p>Version {{ version }} &middot; <a href="{{ bundle_path }}">Download</a> &middot; <a href="{{ git_url }}">Source</a></p>
<p>{{ licenses }}</p>
<div>{{ tag_list_html_formatted }}</div>
{{ carousel }}
<p>{{ description }}</p>
{{ new_feature_html_div }}
<div>{{ author_list_html_formatted }}</div>
{{ flatpak_html_div }}
{{ changelog_html_div }}
</div>
</body>
</html>
"#;

/// Renderer reading templates from `<static_dir>/templates`.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    templates_dir: Option<PathBuf>,
}

impl TemplateRenderer {
    pub fn new(static_dir: Option<&Path>) -> Self {
        Self {
            templates_dir: static_dir.map(|d| d.join("templates")),
        }
    }

    fn load(&self, template: &str) -> Result<Option<String>> {
        let Some(dir) = &self.templates_dir else {
            return Ok(None);
        };
        match fs::read_to_string(dir.join(template)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::render(template, e)),
        }
    }
}

impl PageRenderer for TemplateRenderer {
    fn render(&self, template: &str, params: &PageParams) -> Result<String> {
        let source = match self.load(template)? {
            Some(text) => text,
            None if template == DETAIL_TEMPLATE => DEFAULT_DETAIL_PAGE.to_string(),
            None => return Err(AppError::render(template, "template not found")),
        };
        substitute(template, &source, params)
    }

    fn has_template(&self, template: &str) -> bool {
        template == DETAIL_TEMPLATE
            || self
                .templates_dir
                .as_ref()
                .is_some_and(|d| d.join(template).is_file())
    }
}

/// Replace every `{{ key }}` in `source`.
fn substitute(template: &str, source: &str, params: &PageParams) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| AppError::render(template, "unclosed placeholder"))?;
        let key = after[..end].trim();
        if let Some(value) = params.get(key) {
            out.push_str(value);
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

// src/pipeline/sitemap.rs

//! `sitemap.xml` generation.

use chrono::{Local, NaiveDate};

use crate::bundle::Bundle;
use crate::error::Result;
use crate::storage::LocalStorage;

/// File name of the sitemap inside the output directory.
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Render a sitemap with one detail-page entry per bundle id.
pub fn render_sitemap<'a>(
    bundle_ids: impl IntoIterator<Item = &'a str>,
    domain: &str,
    lastmod: NaiveDate,
) -> String {
    let domain = domain.trim_end_matches('/');
    let lastmod = lastmod.format("%Y-%m-%d");
    let content: String = bundle_ids
        .into_iter()
        .map(|id| {
            format!(
                "<url>\n  <loc>{domain}/app/{id}.html</loc>\n  <lastmod>{lastmod}</lastmod>\n  <changefreq>weekly</changefreq>\n  <priority>0.8</priority>\n</url>\n"
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{content}\n</urlset>\n"
    )
}

/// Write `sitemap.xml` for `bundles` into the output tree, dated today.
pub async fn generate_sitemap(
    bundles: &[Bundle],
    domain: &str,
    storage: &LocalStorage,
) -> Result<()> {
    let xml = render_sitemap(
        bundles.iter().map(Bundle::bundle_id),
        domain,
        Local::now().date_naive(),
    );
    storage.write_text(SITEMAP_FILE, &xml).await?;
    log::info!(
        "{} written with {} entries",
        storage.path(SITEMAP_FILE).display(),
        bundles.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sitemap() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let xml = render_sitemap(["org.laptop.Pippy"], "https://a.org/", date);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\
<url>\n  <loc>https://a.org/app/org.laptop.Pippy.html</loc>\n  <lastmod>2024-03-09</lastmod>\n  <changefreq>weekly</changefreq>\n  <priority>0.8</priority>\n</url>\n\
\n</urlset>\n"
        );
    }

    #[test]
    fn test_empty_sitemap() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let xml = render_sitemap(std::iter::empty(), "https://a.org", date);
        assert!(xml.ends_with("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\n</urlset>\n"));
    }

    #[tokio::test]
    async fn test_generate_sitemap_writes_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        generate_sitemap(&[], "https://a.org", &storage).await.unwrap();
        assert!(tmp.path().join(SITEMAP_FILE).is_file());
    }
}

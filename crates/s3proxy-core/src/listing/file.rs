//! Listing templates loaded from disk at startup.

use std::path::Path;

use minijinja::{AutoEscape, Environment, context};

use super::ListingPage;
use super::render::{ListingError, ListingTemplate};
use crate::config::ConfigError;

const TEMPLATE_NAME: &str = "listing";

/// A Jinja listing template read from a file.
///
/// The page is exposed as `page`, with the same fields as the JSON listing
/// (`page.items`, `page.count`, `page.more`, `page.next_token`). Output is
/// always HTML-escaped.
///
/// # Examples
///
/// ```
/// use s3proxy_core::listing::{FileListingTemplate, ListingPage, ListingTemplate};
///
/// let template = FileListingTemplate::from_source("{{ page.count }} items".to_owned()).unwrap();
/// let mut out = Vec::new();
/// template.render(&ListingPage::default(), &mut out).unwrap();
/// assert_eq!(out, b"0 items");
/// ```
#[derive(Debug)]
pub struct FileListingTemplate {
    env: Environment<'static>,
}

impl FileListingTemplate {
    /// Read and compile the template at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadTemplate {
            path: path.to_owned(),
            source,
        })?;
        Self::from_source(source).map_err(|source| ConfigError::ParseTemplate {
            path: path.to_owned(),
            source,
        })
    }

    /// Compile a template from its source text.
    pub fn from_source(source: String) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template_owned(TEMPLATE_NAME, source)?;
        Ok(Self { env })
    }
}

impl ListingTemplate for FileListingTemplate {
    fn render(&self, page: &ListingPage, out: &mut Vec<u8>) -> Result<(), ListingError> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        template.render_to_write(context! { page => page }, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingItem;

    fn page() -> ListingPage {
        ListingPage {
            next_token: "tok".to_owned(),
            count: 2,
            items: vec![
                ListingItem {
                    name: "docs".to_owned(),
                    is_dir: true,
                    key: String::new(),
                    url: "./docs/".to_owned(),
                    size: String::new(),
                    last_modified: String::new(),
                },
                ListingItem {
                    name: "a<b>.txt".to_owned(),
                    is_dir: false,
                    key: "a<b>.txt".to_owned(),
                    url: "./a%3Cb%3E.txt".to_owned(),
                    size: "3 B".to_owned(),
                    last_modified: "now".to_owned(),
                },
            ],
            more: "?max=2&next=tok".to_owned(),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("s3proxy-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_should_render_page_fields_from_file() {
        let path = temp_path("listing-ok.html");
        std::fs::write(
            &path,
            "{% for item in page.items %}[{{ item.name }}{% if item.is_dir %}/{% else %} {{ item.size }}{% endif %}]{% endfor %} \
             {{ page.count }}{% if page.more %} {{ page.more }}{% endif %}",
        )
        .expect("write template");
        let template = FileListingTemplate::load(&path);
        std::fs::remove_file(&path).ok();
        let template = template.expect("template should load");

        let mut out = Vec::new();
        template.render(&page(), &mut out).expect("render");
        let html = String::from_utf8(out).expect("utf8");
        assert!(html.starts_with("[docs/][a&lt;b&gt;.txt 3 B]"));
        assert!(html.contains(" 2 ?max=2&amp;next=tok"));
    }

    #[test]
    fn test_should_report_missing_template_file() {
        let err =
            FileListingTemplate::load(temp_path("listing-missing.html")).expect_err("should fail");
        assert!(matches!(err, ConfigError::ReadTemplate { .. }));
    }

    #[test]
    fn test_should_report_template_syntax_errors() {
        let path = temp_path("listing-broken.html");
        std::fs::write(&path, "{% for item in page.items %}{{ item.name }}").expect("write template");
        let err = FileListingTemplate::load(&path).expect_err("should fail");
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::ParseTemplate { .. }));
    }
}

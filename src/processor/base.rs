use super::{DocumentProcessor, ProcessorError};
use crate::config::OpenApiConfig;
use crate::document::{Document, Server, OPENAPI_VERSION};
use crate::topology::BaseUrl;

pub const DEFAULT_TITLE: &str = "Deployed Resources";
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_SERVER_DESCRIPTION: &str = "Default Server.";

/// Fills the mandatory root fields and, when no stage named any server,
/// advertises the server's own base URLs.
#[derive(Debug, Clone, Default)]
pub struct BaseProcessor {
    base_urls: Vec<BaseUrl>,
}

impl BaseProcessor {
    pub fn new(base_urls: Vec<BaseUrl>) -> Self {
        Self { base_urls }
    }
}

impl DocumentProcessor for BaseProcessor {
    fn name(&self) -> &'static str {
        "base"
    }

    fn process(&self, doc: &mut Document, _config: &OpenApiConfig) -> Result<(), ProcessorError> {
        if doc.openapi_version().is_none() {
            doc.set_openapi_version(OPENAPI_VERSION);
        }
        if doc.title().is_none() {
            doc.set_title(DEFAULT_TITLE);
        }
        if doc.version().is_none() {
            doc.set_version(DEFAULT_VERSION);
        }
        if doc.servers().is_empty() {
            for url in &self.base_urls {
                doc.add_server(Server::new(url.as_str()).with_description(DEFAULT_SERVER_DESCRIPTION));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> Vec<BaseUrl> {
        vec![
            BaseUrl::new("http", "host", 8080, "/ctx").unwrap(),
            BaseUrl::new("https", "host", 8181, "/ctx").unwrap(),
        ]
    }

    #[test]
    fn test_fills_defaults_and_servers() {
        let mut doc = Document::new();
        BaseProcessor::new(urls())
            .process(&mut doc, &OpenApiConfig::default())
            .unwrap();
        assert_eq!(doc.openapi_version(), Some(OPENAPI_VERSION));
        assert_eq!(doc.title(), Some(DEFAULT_TITLE));
        assert_eq!(doc.version(), Some(DEFAULT_VERSION));
        let servers: Vec<&str> = doc.servers().iter().map(|s| s.url.as_str()).collect();
        assert_eq!(servers, vec!["http://host:8080/ctx", "https://host:8181/ctx"]);
        assert_eq!(
            doc.servers()[0].description.as_deref(),
            Some(DEFAULT_SERVER_DESCRIPTION)
        );
    }

    #[test]
    fn test_existing_servers_win() {
        let mut doc = Document::new();
        doc.add_server(Server::new("https://configured"));
        doc.set_title("Mine");
        BaseProcessor::new(urls())
            .process(&mut doc, &OpenApiConfig::default())
            .unwrap();
        assert_eq!(doc.servers().len(), 1);
        assert_eq!(doc.title(), Some("Mine"));
    }
}

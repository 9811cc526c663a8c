//! In-memory OpenAPI document and its branding overrides.

use std::fmt;
use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::error::ApiDocsError;

/// An OpenAPI document, kept in the key order it was received in.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDocument {
    root: Mapping,
}

impl ApiDocument {
    /// Parses a JSON body and checks that it looks like an OpenAPI document.
    ///
    /// # Errors
    ///
    /// - `MalformedResponse` if the body is not a JSON object
    /// - `MissingField` if `openapi` or `info` is absent or empty
    /// - `NoPaths` if `paths` is absent or empty
    pub fn from_json_str(body: &str) -> Result<Self, ApiDocsError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| ApiDocsError::MalformedResponse(e.to_string()))?;

        let Value::Mapping(root) = value else {
            return Err(ApiDocsError::MalformedResponse(
                "expected a JSON object at the top level".to_string(),
            ));
        };

        let document = Self { root };
        document.validate()?;
        Ok(document)
    }

    /// Checks the fields every usable document must carry.
    pub fn validate(&self) -> Result<(), ApiDocsError> {
        for field in ["openapi", "info"] {
            if !self.root.get(field).is_some_and(is_present) {
                return Err(ApiDocsError::MissingField(field));
            }
        }
        if !self.root.get("paths").is_some_and(is_present) {
            return Err(ApiDocsError::NoPaths);
        }
        Ok(())
    }

    /// Applies branding overrides and returns the updated document.
    ///
    /// Only configured fields are touched. Keys already present keep their
    /// position; new keys are appended.
    pub fn enhance(mut self, branding: &DocBranding) -> Self {
        let info = self.section_mut("info");

        if let Some(title) = &branding.title {
            info.insert("title".into(), title.as_str().into());
        }
        if let Some(description) = &branding.description {
            info.insert("description".into(), description.trim().into());
        }
        if let Some(version) = &branding.version {
            info.insert("version".into(), version.as_str().into());
        }

        if branding.contact_name.is_some() || branding.contact_url.is_some() {
            let contact = entry_mapping(info, "contact");
            if let Some(name) = &branding.contact_name {
                contact.insert("name".into(), name.as_str().into());
            }
            if let Some(url) = &branding.contact_url {
                contact.insert("url".into(), url.as_str().into());
            }
        }

        if !branding.servers.is_empty() {
            let servers = branding.servers.iter().map(ServerEntry::to_value).collect();
            self.root.insert("servers".into(), Value::Sequence(servers));
        }

        self
    }

    /// Serializes the document as block-style YAML.
    pub fn to_yaml(&self) -> Result<String, ApiDocsError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// `info.title`, if set.
    pub fn title(&self) -> Option<&str> {
        self.info_str("title")
    }

    /// `info.version`, if set.
    pub fn version(&self) -> Option<&str> {
        self.info_str("version")
    }

    /// Number of entries under `paths`.
    pub fn path_count(&self) -> usize {
        match self.root.get("paths") {
            Some(Value::Mapping(paths)) => paths.len(),
            Some(Value::Sequence(paths)) => paths.len(),
            _ => 0,
        }
    }

    /// The raw top-level mapping.
    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    fn info_str(&self, key: &str) -> Option<&str> {
        self.root.get("info")?.get(key)?.as_str()
    }

    fn section_mut(&mut self, key: &str) -> &mut Mapping {
        entry_mapping(&mut self.root, key)
    }
}

/// Returns the mapping under `key`, replacing any non-mapping value.
fn entry_mapping<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let slot = parent.entry(key.into()).or_insert(Value::Mapping(Mapping::new()));
    if !slot.is_mapping() {
        *slot = Value::Mapping(Mapping::new());
    }
    match slot {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("slot was just set to a mapping"),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Number(_) | Value::Tagged(_) => true,
    }
}

/// Overrides applied to a fetched document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBranding {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub contact_name: Option<String>,
    pub contact_url: Option<String>,
    /// Replaces the document's `servers` list when non-empty.
    pub servers: Vec<ServerEntry>,
}

impl DocBranding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_contact(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.contact_name = Some(name.into());
        self.contact_url = Some(url.into());
        self
    }

    pub fn with_server(mut self, server: ServerEntry) -> Self {
        self.servers.push(server);
        self
    }
}

/// One entry of the `servers` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub url: String,
    pub description: Option<String>,
}

impl ServerEntry {
    pub fn new(url: impl Into<String>, description: Option<String>) -> Self {
        Self {
            url: url.into(),
            description,
        }
    }

    fn to_value(&self) -> Value {
        let mut entry = Mapping::new();
        entry.insert("url".into(), self.url.as_str().into());
        if let Some(description) = &self.description {
            entry.insert("description".into(), description.as_str().into());
        }
        Value::Mapping(entry)
    }
}

/// Parses `URL` or `URL=DESCRIPTION`, splitting on the first `=`.
impl FromStr for ServerEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, description) = match s.split_once('=') {
            Some((url, description)) => (url.trim(), Some(description.trim())),
            None => (s.trim(), None),
        };

        if url.is_empty() {
            return Err(format!("server entry '{s}' has an empty URL"));
        }

        Ok(Self::new(
            url,
            description.filter(|d| !d.is_empty()).map(str::to_string),
        ))
    }
}

impl fmt::Display for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}={}", self.url, description),
            None => write!(f, "{}", self.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r#"{
        "openapi": "3.0.1",
        "info": {"title": "OpenAPI definition", "version": "v0"},
        "servers": [{"url": "http://localhost:8080", "description": "Generated server url"}],
        "paths": {
            "/pets": {"get": {"summary": "List pets"}},
            "/pets/{id}": {"get": {"summary": "Get pet"}}
        },
        "components": {}
    }"#;

    fn keys(mapping: &Mapping) -> Vec<&str> {
        mapping.keys().filter_map(Value::as_str).collect()
    }

    #[test]
    fn test_parse_valid_document() {
        let doc = ApiDocument::from_json_str(PETSTORE).expect("valid document");
        assert_eq!(doc.title(), Some("OpenAPI definition"));
        assert_eq!(doc.version(), Some("v0"));
        assert_eq!(doc.path_count(), 2);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = ApiDocument::from_json_str("<html>oops</html>").unwrap_err();
        assert!(matches!(err, ApiDocsError::MalformedResponse(_)));

        let err = ApiDocument::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, ApiDocsError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_missing_fields() {
        let err = ApiDocument::from_json_str(r#"{"info": {"title": "x"}, "paths": {"/a": {}}}"#)
            .unwrap_err();
        assert!(matches!(err, ApiDocsError::MissingField("openapi")));

        let err = ApiDocument::from_json_str(r#"{"openapi": "3.0.1", "info": {}, "paths": {"/a": {}}}"#)
            .unwrap_err();
        assert!(matches!(err, ApiDocsError::MissingField("info")));
    }

    #[test]
    fn test_parse_empty_paths() {
        let err = ApiDocument::from_json_str(r#"{"openapi": "3.0.1", "info": {"title": "x"}, "paths": {}}"#)
            .unwrap_err();
        assert!(matches!(err, ApiDocsError::NoPaths));

        let err = ApiDocument::from_json_str(r#"{"openapi": "3.0.1", "info": {"title": "x"}}"#)
            .unwrap_err();
        assert!(matches!(err, ApiDocsError::NoPaths));
    }

    #[test]
    fn test_enhance_overrides_info_and_servers() {
        let branding = DocBranding::new()
            .with_title("Fleet API")
            .with_description("\n  Scheduler endpoints.\n  ")
            .with_version("1.0.0")
            .with_contact("Fleet Team", "https://fleet.example")
            .with_server(ServerEntry::new("https://api.fleet.example", Some("production".into())))
            .with_server(ServerEntry::new("https://dev.fleet.example", None));

        let doc = ApiDocument::from_json_str(PETSTORE)
            .expect("valid document")
            .enhance(&branding);

        assert_eq!(doc.title(), Some("Fleet API"));
        assert_eq!(doc.version(), Some("1.0.0"));

        let info = doc.as_mapping()["info"].as_mapping().expect("info mapping");
        assert_eq!(info["description"].as_str(), Some("Scheduler endpoints."));
        assert_eq!(info["contact"]["name"].as_str(), Some("Fleet Team"));
        assert_eq!(info["contact"]["url"].as_str(), Some("https://fleet.example"));

        let servers = doc.as_mapping()["servers"].as_sequence().expect("servers list");
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0]["url"].as_str(), Some("https://api.fleet.example"));
        assert_eq!(servers[0]["description"].as_str(), Some("production"));
        assert!(servers[1].get("description").is_none());
    }

    #[test]
    fn test_enhance_keeps_key_order_and_unset_fields() {
        let doc = ApiDocument::from_json_str(PETSTORE)
            .expect("valid document")
            .enhance(&DocBranding::new().with_title("Fleet API"));

        assert_eq!(
            keys(doc.as_mapping()),
            vec!["openapi", "info", "servers", "paths", "components"]
        );
        assert_eq!(doc.version(), Some("v0"));

        let servers = doc.as_mapping()["servers"].as_sequence().expect("servers list");
        assert_eq!(servers[0]["url"].as_str(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_to_yaml_preserves_order() {
        let yaml = ApiDocument::from_json_str(PETSTORE)
            .expect("valid document")
            .to_yaml()
            .expect("serializable");

        let openapi = yaml.find("openapi:").expect("openapi key");
        let info = yaml.find("info:").expect("info key");
        let paths = yaml.find("paths:").expect("paths key");
        assert!(openapi < info && info < paths);
        assert!(yaml.contains("/pets/{id}"));
    }

    #[test]
    fn test_server_entry_from_str() {
        let entry: ServerEntry = "https://api.fleet.example=production server".parse().unwrap();
        assert_eq!(entry.url, "https://api.fleet.example");
        assert_eq!(entry.description.as_deref(), Some("production server"));

        let entry: ServerEntry = "https://dev.fleet.example".parse().unwrap();
        assert_eq!(entry.description, None);
        assert_eq!(entry.to_string(), "https://dev.fleet.example");

        assert!("=orphan".parse::<ServerEntry>().is_err());
    }
}

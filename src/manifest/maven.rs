//! pom.xml parser.
//!
//! A regex scan over the POM text, not a general XML parser. Comments,
//! `<dependencyManagement>`, `<build>`, `<parent>`, `<profiles>` and the
//! people/licensing blocks are removed first so only the project's own
//! `<dependencies>` block and coordinates are read.

use lazy_static::lazy_static;
use regex::Regex;

use super::{DependencyScope, Ecosystem, ManifestError, ManifestParser, ManifestSummary, ParsedManifest};

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref IGNORED_RE: Regex = Regex::new(
        r"(?s)<dependencyManagement>.*?</dependencyManagement>|<build>.*?</build>|<parent>.*?</parent>|<profiles>.*?</profiles>|<licenses>.*?</licenses>|<developers>.*?</developers>|<contributors>.*?</contributors>|<organization>.*?</organization>"
    ).unwrap();
    static ref DEPENDENCIES_RE: Regex = Regex::new(r"(?s)<dependencies>(.*?)</dependencies>").unwrap();
    static ref DEPENDENCY_RE: Regex = Regex::new(r"(?s)<dependency>(.*?)</dependency>").unwrap();
    static ref PROPERTIES_RE: Regex = Regex::new(r"(?s)<properties>(.*?)</properties>").unwrap();
}

/// Properties that pin the Java release.
const JAVA_PROPERTIES: &[&str] = &["maven.compiler.release", "java.version", "maven.compiler.source"];

pub struct MavenManifest;

impl ManifestParser for MavenManifest {
    fn format(&self) -> &'static str {
        "pom.xml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "pom.xml"
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        if !content.contains("<project") {
            return Err(ManifestError::Malformed("no <project> element".to_string()));
        }
        let stripped = COMMENT_RE.replace_all(content, "");
        let stripped = IGNORED_RE.replace_all(&stripped, "");

        let mut summary = ManifestSummary::new(path, Ecosystem::Maven, self.format());
        if let Some(properties) = PROPERTIES_RE.captures(&stripped) {
            if let Some(java) = JAVA_PROPERTIES.iter().find_map(|p| element(&properties[1], p)) {
                summary.engines.insert("java".to_string(), java);
            }
        }

        // project coordinates live outside the nested blocks
        let header = PROPERTIES_RE.replace_all(&DEPENDENCIES_RE.replace_all(&stripped, ""), "").into_owned();
        let group = element(&header, "groupId");
        summary.name = match (group, element(&header, "artifactId")) {
            (Some(group), Some(artifact)) => Some(format!("{group}:{artifact}")),
            (None, artifact) => artifact,
            (Some(_), None) => None,
        };
        summary.version = element(&header, "version");
        summary.description = element(&header, "description").or_else(|| element(&header, "name"));

        let mut parsed = ParsedManifest::new(summary);
        for block in DEPENDENCIES_RE.captures_iter(&stripped) {
            for dep in DEPENDENCY_RE.captures_iter(&block[1]) {
                let body = &dep[1];
                let (Some(group), Some(artifact)) = (element(body, "groupId"), element(body, "artifactId")) else {
                    continue;
                };
                let version = element(body, "version").unwrap_or_default();
                let scope = match element(body, "scope").as_deref() {
                    Some("test") => DependencyScope::Dev,
                    _ => DependencyScope::Runtime,
                };
                parsed.declare(&format!("{group}:{artifact}"), &version, scope);
            }
        }
        Ok(parsed)
    }
}

/// Text of the first `<tag>...</tag>` in `xml`.
fn element(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let text = xml[start..end].trim();
    (!text.is_empty()).then(|| text.to_string())
}

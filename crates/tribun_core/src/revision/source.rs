//! Revision providers.

use super::{Revision, RevisionDefinition, RevisionId};
use crate::error::{CoreError, CoreResult};
use crate::key::ConfigurationKey;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension of revision definition files.
const EXTENSION: &str = ".json";

/// Provides the revisions of a project.
pub trait RevisionSource {
    /// Loads every revision, in no particular order.
    fn load(&self) -> CoreResult<Vec<Box<dyn Revision>>>;
}

/// Content of a revision definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevisionFile {
    /// Id of the revision, must match the file name when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionId>,
    /// Id of the revision this one follows.
    pub down_revision: Option<RevisionId>,
    /// Keys put on upgrade.
    #[serde(default)]
    pub upgrade: Vec<ConfigurationKey>,
    /// Keys deleted on downgrade.
    #[serde(default)]
    pub downgrade: Vec<ConfigurationKey>,
}

/// Splits a file name of the form `<id>_<description>.json`.
///
/// Returns `None` for names that do not follow the convention.
pub fn parse_file_name(name: &str) -> Option<(RevisionId, &str)> {
    let stem = name.strip_suffix(EXTENSION)?;
    let (id, description) = stem.split_once('_')?;
    if description.is_empty() {
        return None;
    }
    let id = RevisionId::parse(id).ok()?;
    Some((id, description))
}

/// Loads the revisions stored in `dir`.
pub fn discover(dir: impl AsRef<Path>) -> CoreResult<Vec<Box<dyn Revision>>> {
    DirectorySource::new(dir.as_ref()).load()
}

/// Revisions stored as JSON files in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Creates a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the revision definitions, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be read, and
    /// [`CoreError::RevisionLoad`] for a file that is not a valid
    /// definition or declares an id other than its file name's.
    pub fn definitions(&self) -> CoreResult<Vec<RevisionDefinition>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "skipping non UTF-8 file name"),
            }
        }
        names.sort();

        let mut definitions = Vec::new();
        for name in &names {
            let Some((id, description)) = parse_file_name(name) else {
                debug!(file = %name, "skipping file outside the naming convention");
                continue;
            };
            definitions.push(read_definition(&self.dir.join(name), id, description)?);
        }

        debug!(dir = %self.dir.display(), revisions = definitions.len(), "revisions discovered");
        Ok(definitions)
    }

    /// Writes an empty revision file and returns its path.
    ///
    /// The description is turned into the file name suffix: ASCII
    /// alphanumerics are lowercased, everything else becomes `_`.
    ///
    /// # Errors
    ///
    /// Fails if the file already exists or cannot be written.
    pub fn create(
        &self,
        description: &str,
        down_revision: Option<RevisionId>,
    ) -> CoreResult<PathBuf> {
        let id = RevisionId::generate();
        let path = self.dir.join(format!("{id}_{}{EXTENSION}", slug(description)));

        let file = RevisionFile {
            revision: Some(id.clone()),
            down_revision,
            upgrade: Vec::new(),
            downgrade: Vec::new(),
        };
        let mut json = serde_json::to_string_pretty(&file)
            .map_err(|e| CoreError::revision_load(&path, e.to_string()))?;
        json.push('\n');

        let mut out = OpenOptions::new().write(true).create_new(true).open(&path)?;
        out.write_all(json.as_bytes())?;

        info!(revision = %id, path = %path.display(), "revision created");
        Ok(path)
    }
}

fn read_definition(
    path: &Path,
    id: RevisionId,
    description: &str,
) -> CoreResult<RevisionDefinition> {
    let text = fs::read_to_string(path)?;
    let file: RevisionFile =
        serde_json::from_str(&text).map_err(|e| CoreError::revision_load(path, e.to_string()))?;

    if let Some(declared) = &file.revision {
        if *declared != id {
            return Err(CoreError::revision_load(
                path,
                format!("declares revision {declared} but the file name says {id}"),
            ));
        }
    }

    Ok(RevisionDefinition::new(id, file.down_revision)
        .with_description(description.replace('_', " "))
        .with_upgrade(file.upgrade)
        .with_downgrade(file.downgrade))
}

fn slug(description: &str) -> String {
    let slug: String = description
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "revision".to_string()
    } else {
        slug
    }
}

impl RevisionSource for DirectorySource {
    fn load(&self) -> CoreResult<Vec<Box<dyn Revision>>> {
        Ok(self
            .definitions()?
            .into_iter()
            .map(|d| Box::new(d) as Box<dyn Revision>)
            .collect())
    }
}

/// Revisions registered in code.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    revisions: Vec<RevisionDefinition>,
}

impl StaticSource {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a revision.
    #[must_use]
    pub fn with(mut self, revision: RevisionDefinition) -> Self {
        self.revisions.push(revision);
        self
    }

    /// Adds a revision.
    pub fn register(&mut self, revision: RevisionDefinition) {
        self.revisions.push(revision);
    }
}

impl From<Vec<RevisionDefinition>> for StaticSource {
    fn from(revisions: Vec<RevisionDefinition>) -> Self {
        Self { revisions }
    }
}

impl RevisionSource for StaticSource {
    fn load(&self) -> CoreResult<Vec<Box<dyn Revision>>> {
        Ok(self
            .revisions
            .iter()
            .cloned()
            .map(|d| Box::new(d) as Box<dyn Revision>)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::order;
    use tempfile::TempDir;

    fn id(s: &str) -> RevisionId {
        RevisionId::parse(s).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn file_names() {
        let (rid, description) = parse_file_name("hgsqa54a_joe_la_mouke.json").unwrap();
        assert_eq!(rid, id("hgsqa54a"));
        assert_eq!(description, "joe_la_mouke");

        assert!(parse_file_name("hgsqa54a_first.py").is_none());
        assert!(parse_file_name("hgsqa54a.json").is_none());
        assert!(parse_file_name("hgsqa54a_.json").is_none());
        assert!(parse_file_name("short_first.json").is_none());
        assert!(parse_file_name("__init__.json").is_none());
    }

    #[test]
    fn loads_matching_files_only() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "aaaa0001_first.json",
            r#"{"down_revision": null, "upgrade": [{"key": "a", "value": "1"}]}"#,
        );
        write(
            dir.path(),
            "aaaa0002_second_step.json",
            r#"{"revision": "aaaa0002", "down_revision": "aaaa0001"}"#,
        );
        write(dir.path(), "README.md", "not a revision");
        write(dir.path(), "aaaa0003_notes.txt", "{}");
        fs::create_dir(dir.path().join("aaaa0004_dir.json")).unwrap();

        let definitions = DirectorySource::new(dir.path()).definitions().unwrap();

        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].revision(), &id("aaaa0001"));
        assert!(definitions[0].down_revision().is_none());
        assert_eq!(definitions[0].upgrade(), vec![ConfigurationKey::leaf("a", "1")]);
        assert_eq!(definitions[1].description(), "second step");
        assert_eq!(definitions[1].down_revision(), Some(&id("aaaa0001")));
        assert!(definitions[1].downgrade().is_empty());
    }

    #[test]
    fn mismatched_revision_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "aaaa0001_first.json",
            r#"{"revision": "bbbb0001", "down_revision": null}"#,
        );

        let err = discover(dir.path()).unwrap_err();
        match err {
            CoreError::RevisionLoad { path, message } => {
                assert!(path.ends_with("aaaa0001_first.json"));
                assert!(message.contains("bbbb0001"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_files_rejected() {
        for content in [
            "not json",
            r#"{"down_revision": "bad id"}"#,
            r#"{"down_revision": null, "extra": 1}"#,
        ] {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "aaaa0001_first.json", content);

            assert!(
                matches!(discover(dir.path()), Err(CoreError::RevisionLoad { .. })),
                "{content} should be rejected"
            );
        }
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = discover(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn create_writes_a_loadable_skeleton() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path());

        let root = source.create("Initial keys", None).unwrap();
        let root_name = root.file_name().unwrap().to_str().unwrap().to_string();
        let (root_id, description) = parse_file_name(&root_name).unwrap();
        assert_eq!(description, "initial_keys");

        source.create("follow up!", Some(root_id.clone())).unwrap();

        let chain = order(source.load().unwrap()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.ids()[0], root_id);
    }

    #[test]
    fn slugs() {
        assert_eq!(slug("Add Cache TTL"), "add_cache_ttl");
        assert_eq!(slug("  "), "revision");
    }

    #[test]
    fn static_source() {
        let source = StaticSource::new()
            .with(RevisionDefinition::new(id("bbbb0002"), Some(id("bbbb0001"))))
            .with(RevisionDefinition::new(id("bbbb0001"), None));

        let chain = order(source.load().unwrap()).unwrap();
        assert_eq!(chain.ids(), vec![id("bbbb0001"), id("bbbb0002")]);
    }

    #[test]
    fn static_source_from_vec_and_register() {
        let mut source = StaticSource::from(vec![RevisionDefinition::new(id("cccc0001"), None)]);
        source.register(RevisionDefinition::new(id("cccc0002"), Some(id("cccc0001"))));

        let chain = order(source.load().unwrap()).unwrap();
        assert_eq!(chain.ids(), vec![id("cccc0001"), id("cccc0002")]);
    }
}

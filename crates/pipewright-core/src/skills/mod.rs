//! Skill folder discovery and catalog sync.
//!
//! A skill folder is an immediate subdirectory of the skills root holding a
//! descriptor (`skill.md` or `SKILL.md`) and an entry point (`run.py`).
//! Descriptors carry YAML frontmatter followed by free-text instructions:
//!
//! ```markdown
//! ---
//! name: invoice-ocr
//! category: finance
//! description: Extract totals from scanned invoices.
//! input_schema:
//!   type: object
//! ---
//!
//! Instructions for the skill...
//! ```
//!
//! The opening `---` may be omitted; the metadata then runs up to the first
//! `---` line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::EngineError;
use crate::models::skill::default_category;
use crate::store::{SkillStore, UpsertOutcome};

const DESCRIPTOR_FILENAMES: &[&str] = &["skill.md", "SKILL.md"];
const ENTRY_POINT: &str = "run.py";
const DELIMITER: &str = "---";

#[derive(Debug, Default, Deserialize)]
struct DescriptorFrontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

/// Parsed contents of a skill descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillDescriptor {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub input_schema: Option<Value>,
    pub instructions: String,
}

impl SkillDescriptor {
    fn from_frontmatter(fm: DescriptorFrontmatter, instructions: String) -> Self {
        Self {
            name: fm.name,
            description: fm.description,
            category: fm.category,
            input_schema: fm.input_schema,
            instructions,
        }
    }

    fn instructions_only(text: &str) -> Self {
        Self {
            instructions: text.trim().to_string(),
            ..Default::default()
        }
    }
}

/// Split `contents` at the first delimiter line after `skip` lines.
fn split_at_delimiter(contents: &str, skip: usize) -> Option<(String, String)> {
    let lines: Vec<&str> = contents.lines().collect();
    let close = lines
        .iter()
        .enumerate()
        .skip(skip)
        .find(|(_, l)| l.trim() == DELIMITER)
        .map(|(i, _)| i)?;
    Some((lines[skip..close].join("\n"), lines[close + 1..].join("\n")))
}

fn parse_frontmatter(yaml: &str) -> Result<Option<DescriptorFrontmatter>, String> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    if !value.is_mapping() {
        return Ok(None);
    }
    serde_yaml::from_value(value).map(Some).map_err(|e| e.to_string())
}

/// Parse a descriptor document.
///
/// An explicit block (`---` first line) must be valid YAML. With an
/// implicit top, text that is not a YAML mapping is kept as instructions.
pub fn parse_descriptor(contents: &str) -> Result<SkillDescriptor, String> {
    let explicit = contents
        .lines()
        .next()
        .is_some_and(|first| first.trim() == DELIMITER);

    if explicit {
        let Some((yaml, body)) = split_at_delimiter(contents, 1) else {
            let rest: Vec<&str> = contents.lines().skip(1).collect();
            return Ok(SkillDescriptor::instructions_only(&rest.join("\n")));
        };
        let body = body.trim().to_string();
        return Ok(match parse_frontmatter(&yaml)? {
            Some(fm) => SkillDescriptor::from_frontmatter(fm, body),
            None => SkillDescriptor {
                instructions: body,
                ..Default::default()
            },
        });
    }

    if let Some((yaml, body)) = split_at_delimiter(contents, 0) {
        if let Ok(Some(fm)) = parse_frontmatter(&yaml) {
            return Ok(SkillDescriptor::from_frontmatter(fm, body.trim().to_string()));
        }
    }
    Ok(SkillDescriptor::instructions_only(contents))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncFailure {
    pub directory: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SyncReport {
    pub registered: Vec<String>,
    pub updated: Vec<String>,
    pub failed: Vec<SyncFailure>,
}

/// Syncs skill folders under `root` into the skill catalog.
#[derive(Clone)]
pub struct SkillRegistry {
    root: PathBuf,
    store: SkillStore,
}

impl SkillRegistry {
    pub fn new(root: impl Into<PathBuf>, store: SkillStore) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root and upsert every skill folder found. Safe to repeat.
    pub async fn sync(&self) -> Result<SyncReport, EngineError> {
        let mut report = SyncReport::default();

        let root = self.root.clone();
        let scanned = tokio::task::spawn_blocking(move || scan_root(&root))
            .await
            .map_err(|e| EngineError::Internal(format!("Task join error: {}", e)))??;
        let Some(folders) = scanned else {
            tracing::info!("Created skills directory {}", self.root.display());
            return Ok(report);
        };

        tracing::info!("Found {} skill folders in {}", folders.len(), self.root.display());

        for folder in folders {
            match self.sync_folder(&folder).await {
                Ok((name, UpsertOutcome::Inserted)) => {
                    tracing::info!("Registered new skill: {}", name);
                    report.registered.push(name);
                }
                Ok((name, UpsertOutcome::Updated)) => {
                    tracing::info!("Updated skill: {}", name);
                    report.updated.push(name);
                }
                Err(error) => {
                    tracing::warn!("Failed to load skill {}: {}", folder.dir.display(), error);
                    report.failed.push(SyncFailure {
                        directory: folder.dir.to_string_lossy().to_string(),
                        error,
                    });
                }
            }
        }

        Ok(report)
    }

    async fn sync_folder(&self, folder: &ScannedFolder) -> Result<(String, UpsertOutcome), String> {
        let contents = folder.contents.as_deref().map_err(Clone::clone)?;
        let descriptor = parse_descriptor(contents)?;

        let folder_name = folder
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = descriptor.name.unwrap_or(folder_name);

        let mut configuration = Map::new();
        configuration.insert("folder_path".into(), json!(folder.dir.to_string_lossy()));
        configuration.insert("instructions".into(), json!(descriptor.instructions));

        let outcome = self
            .store
            .upsert_discovered(
                &name,
                descriptor.description.unwrap_or_default(),
                descriptor.category.unwrap_or_else(default_category),
                descriptor.input_schema.unwrap_or_else(|| json!({})),
                configuration,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok((name, outcome))
    }
}

/// A skill folder found on disk, with its descriptor text or the read error.
#[derive(Debug)]
struct ScannedFolder {
    dir: PathBuf,
    contents: Result<String, String>,
}

/// Blocking walk of the skills root. `None` means the root was missing and
/// has just been created. Folders come back sorted by path.
fn scan_root(root: &Path) -> Result<Option<Vec<ScannedFolder>>, EngineError> {
    if !root.exists() {
        std::fs::create_dir_all(root).map_err(|e| {
            EngineError::Internal(format!(
                "Failed to create skills directory {}: {}",
                root.display(),
                e
            ))
        })?;
        return Ok(None);
    }

    let entries = std::fs::read_dir(root)
        .map_err(|e| EngineError::Internal(format!("Failed to read {}: {}", root.display(), e)))?;
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let folders = dirs
        .into_iter()
        .filter_map(|dir| {
            let descriptor_path = skill_files(&dir)?;
            let contents = std::fs::read_to_string(&descriptor_path)
                .map_err(|e| format!("cannot read {}: {}", descriptor_path.display(), e));
            Some(ScannedFolder { dir, contents })
        })
        .collect();
    Ok(Some(folders))
}

/// The descriptor path, if `dir` holds both a descriptor and an entry point.
fn skill_files(dir: &Path) -> Option<PathBuf> {
    if !dir.join(ENTRY_POINT).is_file() {
        return None;
    }
    DESCRIPTOR_FILENAMES
        .iter()
        .map(|f| dir.join(f))
        .find(|p| p.is_file())
}

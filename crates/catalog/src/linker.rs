//! Drive listing to catalog resources.
//!
//! A listing is split into regular files and solution files. Regular files
//! become resources. Each solution is attached to the regular resource whose
//! lower-cased title equals the solution's search key, or becomes a
//! standalone resource when no such parent exists.
//!
//! Planning is pure; [`apply`] replays a plan against a [`ResourceStore`].

use crate::store::ResourceStore;
use crate::types::{LinkReport, NewResource, ResourceCategory};
use hub_core::{AppError, AppResult};
use hub_drive::RemoteFile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Keywords and extensions used to classify and match file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkerConfig {
    /// A lower-cased name containing any of these is a solution
    pub solution_keywords: Vec<String>,

    /// Removed, in order, from a solution name to find its parent
    pub strip_keywords: Vec<String>,

    /// Removed from names to form titles
    pub extensions: Vec<String>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            solution_keywords: to_strings(&["solution", "answer", "model", "حل"]),
            // "answers" is unreachable once "answer" is removed
            strip_keywords: to_strings(&["solution", "answer", "model", "answers", "حل"]),
            extensions: to_strings(&[".pdf", ".txt"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Load linker configuration from `.hub/linker.yaml`, defaults if absent.
pub fn load_linker_config(workspace: &Path) -> AppResult<LinkerConfig> {
    let path = get_linker_config_path(workspace);
    if !path.exists() {
        return Ok(LinkerConfig::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| AppError::Config(format!("Failed to read config at {:?}: {}", path, e)))?;
    let config: LinkerConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config at {:?}: {}", path, e)))?;

    tracing::debug!("Loaded linker config from {:?}", path);
    Ok(config)
}

pub fn get_linker_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".hub").join("linker.yaml")
}

/// Whether `name` looks like a solution file.
pub fn is_solution(name: &str, config: &LinkerConfig) -> bool {
    let lower = name.to_lowercase();
    config
        .solution_keywords
        .iter()
        .any(|kw| !kw.is_empty() && lower.contains(kw.as_str()))
}

fn strip_extensions(name: &str, config: &LinkerConfig) -> String {
    config
        .extensions
        .iter()
        .filter(|ext| !ext.is_empty())
        .fold(name.to_string(), |acc, ext| acc.replace(ext.as_str(), ""))
}

/// Display title: the name without any extension occurrence, trimmed.
///
/// Extension removal is case-sensitive.
pub fn clean_title(name: &str, config: &LinkerConfig) -> String {
    strip_extensions(name, config).trim().to_string()
}

/// Key used to find the parent of a solution file.
///
/// Lower-cases, removes extensions, removes the strip keywords in order,
/// collapses whitespace and trims spaces, hyphens and underscores.
pub fn search_key(name: &str, config: &LinkerConfig) -> String {
    let mut key = strip_extensions(&name.to_lowercase(), config);
    for keyword in config.strip_keywords.iter().filter(|k| !k.is_empty()) {
        key = key.replace(keyword.as_str(), "");
    }

    let collapsed = key.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == ' ' || c == '-' || c == '_')
        .to_string()
}

/// A file that becomes a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedResource {
    pub title: String,
    pub file_id: String,
    pub preview_url: String,
    pub download_url: String,
}

impl PlannedResource {
    fn from_file(file: &RemoteFile, config: &LinkerConfig) -> Self {
        Self {
            title: clean_title(&file.name, config),
            file_id: file.id.clone(),
            preview_url: file.preview_url(),
            download_url: file.download_url(),
        }
    }
}

/// A solution attached to a regular resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    /// Index into [`LinkPlan::regular`]
    pub parent: usize,
    pub solution_file_id: String,
    pub solution_url: String,
}

/// What an import will create and link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    /// Regular resources in listing order
    pub regular: Vec<PlannedResource>,

    /// Solutions with a parent, in listing order
    pub links: Vec<PlannedLink>,

    /// Solutions without a parent, created as their own resources
    pub standalone: Vec<PlannedResource>,
}

impl LinkPlan {
    pub fn created_count(&self) -> usize {
        self.regular.len() + self.standalone.len()
    }
}

/// Plan the import of `files`.
pub fn plan(files: &[RemoteFile], config: &LinkerConfig) -> LinkPlan {
    let (solutions, regular): (Vec<&RemoteFile>, Vec<&RemoteFile>) =
        files.iter().partition(|f| is_solution(&f.name, config));

    let regular: Vec<PlannedResource> = regular
        .into_iter()
        .map(|f| PlannedResource::from_file(f, config))
        .collect();

    // Later duplicates replace earlier ones
    let by_title: HashMap<String, usize> = regular
        .iter()
        .enumerate()
        .map(|(i, r)| (r.title.to_lowercase(), i))
        .collect();

    let mut plan = LinkPlan {
        regular,
        ..Default::default()
    };

    for file in solutions {
        match by_title.get(&search_key(&file.name, config)) {
            Some(&parent) => plan.links.push(PlannedLink {
                parent,
                solution_file_id: file.id.clone(),
                solution_url: file.download_url(),
            }),
            None => plan.standalone.push(PlannedResource::from_file(file, config)),
        }
    }

    plan
}

/// Target group of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub subject_id: i64,
    pub category: ResourceCategory,
    pub folder_url: String,
}

impl ImportTarget {
    fn new_resource(&self, planned: &PlannedResource) -> NewResource {
        NewResource {
            subject_id: self.subject_id,
            category: self.category,
            title: planned.title.clone(),
            preview_url: planned.preview_url.clone(),
            download_url: planned.download_url.clone(),
            source_folder_url: self.folder_url.clone(),
            file_id: planned.file_id.clone(),
            solution_url: None,
            solution_file_id: None,
        }
    }
}

/// Replace the target group with the planned resources.
pub fn apply(
    store: &dyn ResourceStore,
    target: &ImportTarget,
    plan: &LinkPlan,
) -> AppResult<LinkReport> {
    let deleted_count = store.delete_where(target.subject_id, target.category)?;

    let mut created = Vec::with_capacity(plan.regular.len());
    for planned in &plan.regular {
        created.push(store.create(&target.new_resource(planned))?);
    }

    for link in &plan.links {
        let parent = created.get_mut(link.parent).ok_or_else(|| {
            AppError::Other(format!("Link plan refers to missing resource {}", link.parent))
        })?;
        parent.solution_url = Some(link.solution_url.clone());
        parent.solution_file_id = Some(link.solution_file_id.clone());
        store.update(parent)?;
    }

    for planned in &plan.standalone {
        store.create(&target.new_resource(planned))?;
    }

    Ok(LinkReport {
        deleted_count,
        created_count: plan.created_count(),
        linked_count: plan.links.len(),
    })
}

/// Plan and apply in one step.
pub fn link(
    store: &dyn ResourceStore,
    target: &ImportTarget,
    files: &[RemoteFile],
    config: &LinkerConfig,
) -> AppResult<LinkReport> {
    apply(store, target, &plan(files, config))
}

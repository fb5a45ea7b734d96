//! File tool: listing, search, cleanup, organization and metadata

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use glob::glob;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::ToolError;
use crate::tools::tool::{parse_params, Params, Tool, ToolAction, ToolCategory, ToolMetadata, ToolOutput};

/// Patterns removed by `cleanup` when none are given
const DEFAULT_CLEANUP_PATTERNS: &[&str] = &["*.tmp", "*.temp", "*.log", "*.cache"];
/// Minimum age of a file removed by `cleanup`
const DEFAULT_MAX_AGE_DAYS: f64 = 7.0;
/// Cap on `search` results
const DEFAULT_MAX_RESULTS: usize = 100;

/// Extension groups used by `organize`
const ORGANIZE_GROUPS: &[(&str, &[&str])] = &[
    ("images", &["jpg", "jpeg", "png", "gif", "bmp", "svg"]),
    ("documents", &["pdf", "doc", "docx", "txt", "rtf"]),
    ("videos", &["mp4", "avi", "mov", "mkv", "wmv"]),
    ("audio", &["mp3", "wav", "flac", "aac", "ogg"]),
    ("archives", &["zip", "rar", "7z", "tar", "gz"]),
    ("code", &["py", "js", "html", "css", "java", "cpp", "c", "rs"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    List,
    Search,
    Cleanup,
    Organize,
    Info,
}

impl ToolAction for FileAction {
    const ALL: &'static [Self] = &[
        FileAction::List,
        FileAction::Search,
        FileAction::Cleanup,
        FileAction::Organize,
        FileAction::Info,
    ];
    const DEFAULT: Self = FileAction::List;

    fn as_str(&self) -> &'static str {
        match self {
            FileAction::List => "list",
            FileAction::Search => "search",
            FileAction::Cleanup => "cleanup",
            FileAction::Organize => "organize",
            FileAction::Info => "info",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListInput {
    path: Option<String>,
    pattern: Option<String>,
    recursive: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchInput {
    path: Option<String>,
    pattern: Option<String>,
    name_contains: Option<String>,
    content_contains: Option<String>,
    recursive: Option<bool>,
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CleanupInput {
    paths: Vec<String>,
    patterns: Vec<String>,
    max_age_days: Option<f64>,
    dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrganizeInput {
    source_dir: Option<String>,
    dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InfoInput {
    path: Option<String>,
}

/// File tool
pub struct FileTool {
    metadata: ToolMetadata,
    /// Directory relative paths are resolved against
    base_dir: PathBuf,
}

impl FileTool {
    /// Create a file tool rooted at the current directory
    pub fn new() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_base_dir(base_dir)
    }

    /// Create a file tool rooted at a specific directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            metadata: ToolMetadata::new(
                "file_tool",
                "List, search, clean up, organize and inspect files",
                ToolCategory::File,
            )
            .with_permissions(["file_access"]),
            base_dir: base_dir.into(),
        }
    }

    fn resolve_path(&self, path: Option<&str>) -> PathBuf {
        match path {
            None | Some("") | Some(".") => self.base_dir.clone(),
            Some(p) if p == "~" || p.starts_with("~/") => match dirs::home_dir() {
                Some(home) => home.join(p.trim_start_matches('~').trim_start_matches('/')),
                None => PathBuf::from(p),
            },
            Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
            Some(p) => self.base_dir.join(p),
        }
    }

    fn list(&self, input: ListInput) -> Result<ToolOutput, ToolError> {
        let raw_path = input.path.as_deref().unwrap_or(".");
        let target = self.resolve_path(input.path.as_deref());
        ensure_exists(&target, raw_path)?;
        if !target.is_dir() {
            return Err(ToolError::failed(
                format!("Path is not a directory: {}", raw_path),
                format!("Not a directory: {}", raw_path),
            ));
        }

        let pattern = input.pattern.unwrap_or_else(|| "*".to_string());
        let mut files: Vec<Value> = glob_paths(&target, &pattern, input.recursive)?
            .iter()
            .filter_map(|path| describe_entry(path))
            .collect();
        files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        tracing::debug!("[FileTool] Listed {} entries in {}", files.len(), target.display());

        Ok(ToolOutput::new(format!("Found {} items in {}", files.len(), target.display()))
            .with("count", files.len())
            .with("files", files)
            .with("path", target.display().to_string())
            .with("pattern", pattern)
            .with("recursive", input.recursive))
    }

    fn search(&self, input: SearchInput) -> Result<ToolOutput, ToolError> {
        let raw_path = input.path.as_deref().unwrap_or(".");
        let target = self.resolve_path(input.path.as_deref());
        ensure_exists(&target, raw_path)?;

        let pattern = input.pattern.unwrap_or_else(|| "*".to_string());
        let max_results = input.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let name_filter = input.name_contains.as_ref().map(|s| s.to_lowercase());
        let content_filter = input.content_contains.as_ref().map(|s| s.to_lowercase());

        let mut found = Vec::new();
        for path in glob_paths(&target, &pattern, input.recursive.unwrap_or(true))? {
            if found.len() >= max_results {
                break;
            }
            if !path.is_file() {
                continue;
            }

            let name = file_name(&path);
            if let Some(filter) = &name_filter {
                if !name.to_lowercase().contains(filter) {
                    continue;
                }
            }
            if let Some(filter) = &content_filter {
                match fs::read(&path) {
                    Ok(bytes) if String::from_utf8_lossy(&bytes).to_lowercase().contains(filter) => {}
                    _ => continue,
                }
            }

            if let Some(entry) = describe_entry(&path) {
                found.push(entry);
            }
        }

        Ok(ToolOutput::new(format!("Found {} matching files", found.len()))
            .with("count", found.len())
            .with("files", found)
            .with("search_path", target.display().to_string())
            .with("pattern", pattern)
            .with("name_filter", input.name_contains)
            .with("content_filter", input.content_contains))
    }

    fn cleanup(&self, input: CleanupInput) -> Result<ToolOutput, ToolError> {
        let paths: Vec<PathBuf> = if input.paths.is_empty() {
            vec![std::env::temp_dir()]
        } else {
            input.paths.iter().map(|p| self.resolve_path(Some(p))).collect()
        };
        let patterns: Vec<String> = if input.patterns.is_empty() {
            DEFAULT_CLEANUP_PATTERNS.iter().map(|p| p.to_string()).collect()
        } else {
            input.patterns
        };
        let max_age_days = input.max_age_days.unwrap_or(DEFAULT_MAX_AGE_DAYS);
        let max_age = Duration::try_from_secs_f64((max_age_days * 86_400.0).max(0.0))
            .map_err(|_| ToolError::invalid("max_age_days", format!("out of range: {}", max_age_days)))?;
        let now = SystemTime::now();

        let mut cleaned = Vec::new();
        let mut total_size = 0u64;

        for dir in &paths {
            if !dir.exists() {
                continue;
            }
            for pattern in &patterns {
                for path in glob_paths(dir, pattern, false)? {
                    let Ok(meta) = fs::metadata(&path) else { continue };
                    if !meta.is_file() {
                        continue;
                    }
                    let Some(age) = meta.modified().ok().and_then(|m| now.duration_since(m).ok()) else {
                        continue;
                    };
                    if age < max_age {
                        continue;
                    }
                    if !input.dry_run {
                        if let Err(e) = fs::remove_file(&path) {
                            tracing::debug!("[FileTool] Skipping {}: {}", path.display(), e);
                            continue;
                        }
                    }
                    total_size += meta.len();
                    cleaned.push(json!({
                        "path": path.display().to_string(),
                        "size": meta.len(),
                        "age_days": age.as_secs_f64() / 86_400.0,
                    }));
                }
            }
        }

        let verb = if input.dry_run { "Would clean up" } else { "Cleaned up" };
        tracing::info!("[FileTool] {} {} files", verb, cleaned.len());

        Ok(ToolOutput::new(format!(
            "{} {} files ({})",
            verb,
            cleaned.len(),
            format_size(total_size)
        ))
        .with("total_files", cleaned.len())
        .with("cleaned_files", cleaned)
        .with("total_size", total_size)
        .with(
            "paths_checked",
            paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        )
        .with("patterns", patterns)
        .with("max_age_days", max_age_days)
        .with("dry_run", input.dry_run))
    }

    fn organize(&self, input: OrganizeInput) -> Result<ToolOutput, ToolError> {
        let raw_path = input.source_dir.as_deref().unwrap_or(".");
        let source = self.resolve_path(input.source_dir.as_deref());
        if !source.is_dir() {
            return Err(ToolError::failed(
                format!("Source directory does not exist: {}", raw_path),
                format!("Invalid source directory: {}", raw_path),
            ));
        }

        let mut organized: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut failed = Vec::new();
        for entry in fs::read_dir(&source)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!("[FileTool] Unreadable entry in {}: {}", source.display(), e);
                    failed.push(json!({ "path": source.display().to_string(), "error": e.to_string() }));
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Some(group) = group_for(&path) else { continue };

            let group_dir = source.join(group);
            let dest = group_dir.join(file_name(&path));
            if dest.exists() {
                continue;
            }
            if !input.dry_run {
                if let Err(e) = fs::create_dir_all(&group_dir).and_then(|_| fs::rename(&path, &dest)) {
                    tracing::warn!("[FileTool] Could not move {}: {}", path.display(), e);
                    failed.push(json!({ "path": path.display().to_string(), "error": e.to_string() }));
                    continue;
                }
            }
            organized.entry(group).or_default().push(dest.display().to_string());
        }

        let total_moved: usize = organized.values().map(Vec::len).sum();
        let categories: Vec<&str> = organized.keys().copied().collect();

        let mut message = format!(
            "Organized {} files into {} categories",
            total_moved,
            categories.len()
        );
        if !failed.is_empty() {
            message.push_str(&format!(" ({} could not be moved)", failed.len()));
        }

        Ok(ToolOutput::new(message)
            .with("categories", categories)
            .with("organized_files", json!(organized))
            .with("total_moved", total_moved)
            .with("total_failed", failed.len())
            .with("failed", failed)
            .with("source_directory", source.display().to_string())
            .with("dry_run", input.dry_run))
    }

    fn info(&self, input: InfoInput) -> Result<ToolOutput, ToolError> {
        let Some(raw_path) = input.path.as_deref().filter(|p| !p.is_empty()) else {
            return Err(ToolError::failed("No file path provided", "Missing path parameter"));
        };
        let path = self.resolve_path(Some(raw_path));
        if !path.exists() {
            return Err(ToolError::failed(
                format!("File does not exist: {}", raw_path),
                format!("File not found: {}", raw_path),
            ));
        }

        let meta = fs::metadata(&path)?;
        let mut output = ToolOutput::new(format!("File information for: {}", raw_path))
            .with("name", file_name(&path))
            .with("path", path.display().to_string())
            .with("size", meta.len())
            .with("size_human", format_size(meta.len()))
            .with("modified", meta.modified().ok().map(iso_time))
            .with("accessed", meta.accessed().ok().map(iso_time))
            .with("created", meta.created().ok().map(iso_time))
            .with("is_file", meta.is_file())
            .with("is_dir", meta.is_dir())
            .with("is_symlink", path.is_symlink())
            .with(
                "extension",
                path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default(),
            )
            .with(
                "parent",
                path.parent().map(|p| p.display().to_string()).unwrap_or_default(),
            );
        if let Some(group) = group_for(&path) {
            output = output.with("kind", group);
        }
        Ok(output)
    }
}

impl Default for FileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileTool {
    type Action = FileAction;

    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn run(&self, action: FileAction, params: &Params) -> Result<ToolOutput, ToolError> {
        tracing::info!("[FileTool] {}", action.as_str());
        match action {
            FileAction::List => self.list(parse_params(params)?),
            FileAction::Search => self.search(parse_params(params)?),
            FileAction::Cleanup => self.cleanup(parse_params(params)?),
            FileAction::Organize => self.organize(parse_params(params)?),
            FileAction::Info => self.info(parse_params(params)?),
        }
    }
}

fn ensure_exists(path: &Path, raw: &str) -> Result<(), ToolError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::failed(
            format!("Path does not exist: {}", raw),
            format!("Path not found: {}", raw),
        ))
    }
}

fn glob_paths(dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>, ToolError> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let full = if recursive {
        format!("{}/**/{}", base, pattern)
    } else {
        format!("{}/{}", base, pattern)
    };

    let paths = glob(&full)
        .map_err(|e| ToolError::invalid("pattern", e.to_string()))?
        .filter_map(|entry| entry.ok())
        .collect();
    Ok(paths)
}

fn describe_entry(path: &Path) -> Option<Value> {
    let meta = fs::symlink_metadata(path).ok()?;
    Some(json!({
        "name": file_name(path),
        "path": path.display().to_string(),
        "size": meta.len(),
        "modified": meta.modified().ok().map(iso_time),
        "is_dir": path.is_dir(),
        "is_file": path.is_file(),
        "is_symlink": meta.file_type().is_symlink(),
    }))
}

fn group_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    ORGANIZE_GROUPS
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(group, _)| *group)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn iso_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).to_rfc3339()
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, UNITS[unit])
}

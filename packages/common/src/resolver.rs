/// View name resolution
///
/// Maps aliases used in markup (`x-shop.product`, `x-layout::default`) and
/// plain view names (`login/index`) to source paths under the project root.
use crate::error::{CommonError, CommonResult};
use crate::filesystem::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix marking a component tag
pub const ALIAS_PREFIX: &str = "x-";

/// Prefix marking a layout tag
pub const LAYOUT_PREFIX: &str = "x-layout::";

/// What an alias refers to; each kind lives in its own directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    View,
    Component,
    Layout,
}

impl ViewKind {
    /// Classify a tag name or alias by its prefix
    pub fn of(alias: &str) -> Self {
        if alias.starts_with(LAYOUT_PREFIX) {
            ViewKind::Layout
        } else if alias.starts_with(ALIAS_PREFIX) {
            ViewKind::Component
        } else {
            ViewKind::View
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ViewKind::View => "",
            ViewKind::Component => ALIAS_PREFIX,
            ViewKind::Layout => LAYOUT_PREFIX,
        }
    }
}

/// Directory layout for view sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Views directory, relative to the base path
    pub views_dir: String,

    /// Components directory, relative to the views directory
    pub components_dir: String,

    /// Layouts directory, relative to the views directory
    pub layouts_dir: String,

    /// Extension appended to every resolved name
    pub extension: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            views_dir: "app/views".to_string(),
            components_dir: "components".to_string(),
            layouts_dir: "layouts".to_string(),
            extension: ".view.html".to_string(),
        }
    }
}

/// Guesses source paths for views, components and layouts
#[derive(Debug, Clone)]
pub struct ViewResolver {
    base_path: String,
    config: ResolverConfig,
}

impl ViewResolver {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self::with_config(base_path, ResolverConfig::default())
    }

    pub fn with_config(base_path: impl AsRef<Path>, config: ResolverConfig) -> Self {
        let base_path = base_path.as_ref().to_string_lossy().replace('\\', "/");
        Self { base_path, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn resolve_view(&self, alias: &str) -> PathBuf {
        self.resolve(alias, ViewKind::View)
    }

    pub fn resolve_component(&self, alias: &str) -> PathBuf {
        self.resolve(alias, ViewKind::Component)
    }

    pub fn resolve_layout(&self, alias: &str) -> PathBuf {
        self.resolve(alias, ViewKind::Layout)
    }

    /// Path for `alias`, with the kind prefix stripped when present
    pub fn resolve(&self, alias: &str, kind: ViewKind) -> PathBuf {
        let name = alias.strip_prefix(kind.prefix()).unwrap_or(alias);
        let name = name.trim_start_matches(['/', '\\']);
        let name: String = name
            .chars()
            .map(|c| if matches!(c, '.' | '/' | '\\') { '/' } else { c })
            .collect();
        let file = format!("{}{}", name, self.config.extension);

        let mut segments = vec![self.base_path.as_str(), self.config.views_dir.as_str()];
        match kind {
            ViewKind::View => {}
            ViewKind::Component => segments.push(&self.config.components_dir),
            ViewKind::Layout => segments.push(&self.config.layouts_dir),
        }
        segments.push(&file);

        PathBuf::from(collapse_separators(&segments.join("/")))
    }

    /// Resolve and read the source for `alias`
    pub fn load(&self, alias: &str, kind: ViewKind, fs: &dyn FileSystem) -> CommonResult<(PathBuf, String)> {
        let path = self.resolve(alias, kind);
        debug!(alias, ?kind, path = %path.display(), "resolved view");

        let source = read_view(&path, fs)?;
        Ok((path, source))
    }
}

/// Read a view source, reporting any failure as a missing view
pub fn read_view(path: &Path, fs: &dyn FileSystem) -> CommonResult<String> {
    if !fs.exists(path) {
        return Err(CommonError::view_not_found(path));
    }
    fs.read_to_string(path).map_err(|err| {
        debug!(path = %path.display(), error = %err, "view exists but cannot be read");
        CommonError::view_not_found(path)
    })
}

fn collapse_separators(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

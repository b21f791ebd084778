use mortar_common::{RealFileSystem, ResolverConfig, ViewResolver};
use mortar_compiler::{CompileOptions, Compiler, DEFAULT_DIRECTIVE_PREFIX};
use mortar_evaluator::{RenderOptions, Renderer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "mortar.config.json";

/// Mortar configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Where views, components and layouts live
    pub views: ResolverConfig,

    /// Sigil in front of directive attributes (`:if`, `:foreach`)
    pub directive_prefix: String,

    /// Rewrite `@name(...)` helper tags
    pub expand_helpers: bool,

    /// Runtime limits
    pub render: RenderOptions,

    /// Destination of `mortar compile`, relative to the project root
    pub out_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            views: ResolverConfig::default(),
            directive_prefix: DEFAULT_DIRECTIVE_PREFIX.to_string(),
            expand_helpers: true,
            render: RenderOptions::default(),
            out_dir: "dist".to_string(),
        }
    }
}

impl Config {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid {}: {}", DEFAULT_CONFIG_NAME, e))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn get_views_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.views.views_dir)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            directive_prefix: self.directive_prefix.clone(),
            expand_helpers: self.expand_helpers,
        }
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::with_options(self.compile_options())
    }

    /// Renderer reading views from disk below `root`
    pub fn renderer(&self, root: impl AsRef<Path>) -> Renderer {
        let resolver = ViewResolver::with_config(root, self.views.clone());
        Renderer::with_resolver(resolver, RealFileSystem)
            .with_compiler(self.compiler())
            .with_options(self.render.clone())
    }
}

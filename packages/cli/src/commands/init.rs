use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Views directory, relative to the project root
    #[arg(long, default_value = "app/views")]
    pub views_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

const EXAMPLE_LAYOUT: &str = r#"<html>
    <head>
        <title>{{ $title ?? 'Mortar' }}</title>
        @description("A Mortar site")
    </head>
    <body>
        <slot></slot>
    </body>
</html>
"#;

const EXAMPLE_COMPONENT: &str = r#"<button type="{{ $type ?? 'button' }}">
    <slot>Click me</slot>
</button>
"#;

const EXAMPLE_VIEW: &str = r#"<x-layout::default title="Home">
    <h1>Welcome</h1>
    <x-button type="submit">Get started</x-button>
</x-layout::default>
"#;

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Mortar project...".bright_blue().bold());

    let mut config = Config::default();
    config.views.views_dir = args.views_dir.clone();
    let views_dir = config.get_views_dir(cwd);
    let extension = config.views.extension.clone();

    let components = views_dir.join(&config.views.components_dir);
    let layouts = views_dir.join(&config.views.layouts_dir);
    for dir in [&components, &layouts] {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            println!("  {} Created {}/", "✓".green(), relative(cwd, dir));
        }
    }

    let examples = [
        (layouts.join(format!("default{}", extension)), EXAMPLE_LAYOUT),
        (components.join(format!("button{}", extension)), EXAMPLE_COMPONENT),
        (views_dir.join(format!("home{}", extension)), EXAMPLE_VIEW),
    ];
    for (path, content) in &examples {
        if !path.exists() {
            fs::write(path, content)?;
            println!("  {} Created {}", "✓".green(), relative(cwd, path));
        }
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/home{}", args.views_dir, extension);
    println!("  2. Run: mortar render home");
    println!("  3. Run: mortar compile");

    Ok(())
}

fn relative(cwd: &str, path: &Path) -> String {
    path.strip_prefix(cwd).unwrap_or(path).display().to_string()
}

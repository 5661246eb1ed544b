//! `themekit` command line.
//!
//! ```text
//! themekit [--root DIR] themes:config   # write config/themes.toml
//! themekit [--root DIR] themes:list     # list themes found in theme/
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use themekit::command::{list_themes, send_config};
use themekit::{logging, service, CONFIG_DIR, THEMES_DIR};
use themekit_render::{MiniJinjaEngine, TemplateEngine};

const LIST_TEMPLATE: &str = r#"{% if themes %}{% for t in themes %}{{ t.name }}{% if t.title %} - {{ t.title }}{% endif %}{% if t.version %} ({{ t.version }}){% endif %} [{{ "enabled" if t.enabled else "disabled" }}]
{% endfor %}{% else %}no themes found in {{ path }}
{% endif %}"#;

/// Theme service management.
#[derive(Parser)]
#[command(name = "themekit")]
#[command(version)]
#[command(about = "Manage application themes")]
struct Cli {
    /// Application root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the default config to the config folder
    #[command(name = "themes:config")]
    Config,

    /// List installed themes
    #[command(name = "themes:list")]
    List,
}

fn main() -> ExitCode {
    if let Err(e) = logging::init_logging() {
        eprintln!("{}", e);
    }
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Config => {
            send_config(&cli.root.join(CONFIG_DIR))?;
            println!("create themes config ok");
        }
        Commands::List => {
            let themes_path = cli.root.join(THEMES_DIR);
            let bindings = service::load_bindings(&themes_path)?;
            let data = serde_json::json!({
                "themes": list_themes(&bindings),
                "path": themes_path.display().to_string(),
            });
            print!("{}", MiniJinjaEngine::new().render_template(LIST_TEMPLATE, &data)?);
        }
    }
    Ok(())
}

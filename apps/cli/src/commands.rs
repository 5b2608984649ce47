//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use letterpress_edit::{FieldUpdate, InsertPosition};
use letterpress_shared::{
    AppConfig, EditId, EditOptions, FieldName, ParseOptions, init_config, load_config,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Letterpress: parse and edit newsletter templates.
#[derive(Parser)]
#[command(
    name = "letterpress",
    version,
    about = "Classify newsletter HTML into locked and editable regions, and edit it safely.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse a template and print the result as JSON.
    Parse {
        /// Template HTML file.
        file: PathBuf,

        /// Disable section locking and use the broad tag allowlist.
        #[arg(long)]
        skip_locking: bool,

        /// Also write the identifier-stamped HTML to this file.
        #[arg(long)]
        html_out: Option<PathBuf>,
    },

    /// Set one field of an editable element.
    Update {
        /// Stamped HTML file (output of `parse --html-out`).
        file: PathBuf,

        /// Element id, or the field's target cell id.
        #[arg(long)]
        id: String,

        /// Field to write: text, src, alt, or href.
        #[arg(long)]
        field: FieldName,

        /// New value.
        #[arg(long)]
        value: String,

        /// Value the field had when it was read.
        #[arg(long)]
        old_value: Option<String>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete an editable element and prune ancestors it leaves empty.
    Delete {
        /// Stamped HTML file.
        file: PathBuf,

        /// Element id.
        #[arg(long)]
        id: String,

        /// Output file for the new HTML. Without it the HTML is part of the JSON summary.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Duplicate a table row.
    Insert {
        /// Stamped HTML file.
        file: PathBuf,

        /// Table-row element id.
        #[arg(long)]
        id: String,

        /// Where the copy goes: before or after.
        #[arg(long, default_value = "after")]
        position: InsertPosition,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace one hex color everywhere.
    Recolor {
        /// HTML file.
        file: PathBuf,

        /// Color to replace (`#rrggbb`).
        #[arg(long)]
        from: String,

        /// Replacement color (`#rrggbb`).
        #[arg(long)]
        to: String,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr; stdout carries command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "letterpress=info",
        1 => "letterpress=debug",
        _ => "letterpress=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse {
            file,
            skip_locking,
            html_out,
        } => cmd_parse(&file, skip_locking, html_out.as_deref()).await,
        Command::Update {
            file,
            id,
            field,
            value,
            old_value,
            out,
        } => {
            let update = FieldUpdate {
                id: EditId(id),
                field,
                new_value: value,
                old_value,
            };
            cmd_update(&file, &update, out.as_deref()).await
        }
        Command::Delete { file, id, out } => cmd_delete(&file, &EditId(id), out.as_deref()).await,
        Command::Insert {
            file,
            id,
            position,
            out,
        } => cmd_insert(&file, &EditId(id), position, out.as_deref()).await,
        Command::Recolor {
            file,
            from,
            to,
            out,
        } => cmd_recolor(&file, &from, &to, out.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_parse(file: &Path, skip_locking: bool, html_out: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let html = read_input(file).await?;

    let mut options = ParseOptions::from(&config);
    options.skip_locking |= skip_locking;

    info!(
        file = %file.display(),
        skip_locking = options.skip_locking,
        "parsing template"
    );
    let parsed = letterpress_template::parse_template(&html, &options)?;

    if let Some(path) = html_out {
        write_file(path, &parsed.html_with_edit_ids).await?;
    }
    for warning in &parsed.parse_warnings {
        eprintln!("warning: {warning}");
    }

    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn cmd_update(file: &Path, update: &FieldUpdate, out: Option<&Path>) -> Result<()> {
    let options = edit_options()?;
    let html = read_input(file).await?;

    info!(id = %update.id, field = %update.field, "updating field");
    let updated = letterpress_edit::update_element(&html, update, &options)?;
    if updated == html {
        return Err(eyre!(
            "nothing changed: no '{}' target on element '{}'",
            update.field,
            update.id
        ));
    }

    emit_html(out, &updated).await
}

async fn cmd_delete(file: &Path, id: &EditId, out: Option<&Path>) -> Result<()> {
    let options = edit_options()?;
    let html = read_input(file).await?;

    info!(%id, "deleting element");
    let result = letterpress_edit::delete_element(&html, id, &options)?;
    if !result.success {
        return Err(eyre!("could not delete '{id}': {}", result.warnings.join("; ")));
    }
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    let summary = match out {
        Some(path) => {
            write_file(path, &result.html).await?;
            serde_json::json!({
                "success": result.success,
                "deletedElement": result.deleted_element,
                "cleanedParents": result.cleaned_parents,
                "warnings": result.warnings,
            })
        }
        None => serde_json::to_value(&result)?,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cmd_insert(
    file: &Path,
    id: &EditId,
    position: InsertPosition,
    out: Option<&Path>,
) -> Result<()> {
    let options = edit_options()?;
    let html = read_input(file).await?;

    info!(%id, ?position, "duplicating row");
    let inserted = letterpress_edit::insert_element(&html, id, position, &options)?;
    if inserted == html {
        return Err(eyre!("nothing changed: '{id}' is not a stamped table row"));
    }

    emit_html(out, &inserted).await
}

async fn cmd_recolor(file: &Path, from: &str, to: &str, out: Option<&Path>) -> Result<()> {
    let html = read_input(file).await?;

    let result = letterpress_edit::replace_color(&html, from, to);
    info!(from, to, replacements = result.replacements, "recolored");
    if result.replacements == 0 {
        eprintln!("warning: no occurrences of '{from}' replaced");
    }

    emit_html(out, &result.html).await
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

fn edit_options() -> Result<EditOptions> {
    let config = load_config()?;
    Ok(EditOptions::from(&config))
}

async fn read_input(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
    info!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

async fn emit_html(out: Option<&Path>, html: &str) -> Result<()> {
    match out {
        Some(path) => write_file(path, html).await,
        None => {
            println!("{html}");
            Ok(())
        }
    }
}

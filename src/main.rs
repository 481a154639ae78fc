use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use plotselect::kind::{PlotKind, Role};
use plotselect::resolve::RoleOption;
use plotselect::{RenderOptions, Session};

#[derive(Parser, Debug)]
#[command(name = "plotselect")]
#[command(about = "Explore a CSV or spreadsheet by picking a plot type and its columns", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show column types and the first rows of a dataset
    Inspect {
        file: PathBuf,
        /// Number of preview rows
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// List the columns each role of a plot type can be bound to
    Options {
        file: PathBuf,
        /// Plot type (e.g. boxplot, line-plot, correlation-heatmap)
        #[arg(long)]
        plot: PlotKind,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a plot to PNG
    Render {
        file: PathBuf,
        #[arg(long)]
        plot: PlotKind,
        /// Column for the x axis (as listed by `options`), or "none"
        #[arg(long)]
        x: Option<String>,
        /// Column for the y axis (as listed by `options`), or "none"
        #[arg(long)]
        y: Option<String>,
        /// Column for the hue role, or "none"
        #[arg(long)]
        hue: Option<String>,
        #[arg(long, short, default_value = plotselect::export::DOWNLOAD_FILE_NAME)]
        output: PathBuf,
        /// JSON file with render options
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
}

#[derive(Serialize)]
struct RoleListing {
    role: Role,
    label: &'static str,
    optional: bool,
    options: Vec<RoleOption>,
}

#[derive(Serialize)]
struct KindListing {
    kind: &'static str,
    roles: Vec<RoleListing>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::Inspect { file, rows } => inspect(&file, rows),
        Command::Options { file, plot, json } => options(&file, plot, json),
        Command::Render {
            file,
            plot,
            x,
            y,
            hue,
            output,
            config,
            width,
            height,
        } => {
            let mut render_options = load_render_options(config.as_deref())?;
            if let Some(w) = width {
                render_options.width = w;
            }
            if let Some(h) = height {
                render_options.height = h;
            }
            render_options.validate()?;
            render(&file, plot, [x, y, hue], &output, &render_options)
        }
    }
}

fn open_session(file: &Path) -> Result<Session> {
    Session::open(file).with_context(|| format!("Failed to load '{}'", file.display()))
}

fn load_render_options(path: Option<&Path>) -> Result<RenderOptions> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config '{}'", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config '{}'", path.display()))
        }
        None => Ok(RenderOptions::default()),
    }
}

fn inspect(file: &Path, rows: usize) -> Result<()> {
    let session = open_session(file)?;
    let table = session.table();

    println!("{} rows, {} columns", table.n_rows(), table.n_columns());
    for column in table.columns() {
        println!("  {:<24} {}", column.name(), column.tag());
    }

    println!();
    println!("{}", table.column_names().join("\t"));
    for row in table.head(rows) {
        println!("{}", row.join("\t"));
    }
    Ok(())
}

fn options(file: &Path, kind: PlotKind, json: bool) -> Result<()> {
    let mut session = open_session(file)?;
    session.select_kind(Some(kind));

    let mut roles = Vec::new();
    for (role, spec) in kind.roles() {
        roles.push(RoleListing {
            role,
            label: role.ui_label(kind),
            optional: spec.optional,
            options: session.options(role)?,
        });
    }

    if json {
        let listing = KindListing {
            kind: kind.slug(),
            roles,
        };
        let text = serde_json::to_string_pretty(&listing).context("Failed to serialize options")?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", kind);
    if roles.is_empty() {
        println!("  (no column selection needed)");
    }
    for listing in roles {
        let names: Vec<String> = listing.options.iter().map(|o| o.to_string()).collect();
        if names.is_empty() {
            println!("  {}: (no eligible column)", listing.label);
        } else {
            println!("  {}: {}", listing.label, names.join(", "));
        }
    }
    Ok(())
}

fn render(
    file: &Path,
    kind: PlotKind,
    selections: [Option<String>; 3],
    output: &Path,
    render_options: &RenderOptions,
) -> Result<()> {
    let mut session = open_session(file)?;
    session.select_kind(Some(kind));

    // Flags follow the labels `options` prints, which swap x and y for violins.
    for (label, selection) in ["x", "y", "hue"].into_iter().zip(selections) {
        let Some(selection) = selection else { continue };
        let role = Role::from_ui_label(label, kind)
            .with_context(|| format!("Unknown role flag '--{}'", label))?;
        let option = RoleOption::from_user(&selection, session.table());
        session
            .bind(role, option)
            .with_context(|| format!("Cannot bind {} to '{}'", label, selection))?;
    }
    session.fill_defaults()?;
    session.render(render_options).context("Failed to render plot")?;

    let download = session
        .download()
        .context("Rendering produced no image")?;
    fs::write(output, &download.bytes)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    info!(path = %output.display(), bytes = download.bytes.len(), "plot written");
    println!("Wrote {}", output.display());
    Ok(())
}

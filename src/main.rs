use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use laporan::export::{DirectorySink, ExportPipeline, HtmlFilePrinter};
use laporan::{EditorConfig, ExportConfig, FormEditor, ItemField, ReportField, ReportModel};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "laporan")]
#[command(version, about = "Daily collection report composer", long_about = None)]
struct Cli {
    /// Report model file (JSON)
    #[arg(short, long, global = true, default_value = "laporan.json")]
    model: PathBuf,

    /// JSON config file with optional `editor` and `export` sections
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new report with the default heading and today's period
    New {
        /// Overwrite an existing model file
        #[arg(long)]
        force: bool,
    },

    /// Append a line item and print its id
    AddItem {
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        quantity: Option<String>,
    },

    /// Set a report field (title, company, address, period, employee,
    /// total, deposits, recommendations)
    Set { field: String, value: String },

    /// Set an item field (name, quantity)
    SetItem { id: u64, field: String, value: String },

    /// Remove a line item
    RemoveItem { id: u64 },

    /// Attach a photo (PNG, JPEG or WebP) to a line item
    Attach { id: u64, image: PathBuf },

    /// Remove the photo from a line item
    ClearImage { id: u64 },

    /// Render the report and save it as a PNG
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Write the print document for the report
    Print {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HostConfig {
    editor: EditorConfig,
    export: ExportConfig,
}

fn load_config(path: Option<&Path>) -> Result<HostConfig> {
    let Some(path) = path else {
        return Ok(HostConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config: HostConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    config.export.validate()?;
    Ok(config)
}

fn load_model(path: &Path) -> Result<ReportModel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading model {} (run `laporan new` first)", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing model {}", path.display()))
}

fn save_model(path: &Path, model: &ReportModel) -> Result<()> {
    let text = serde_json::to_string_pretty(model)?;
    std::fs::write(path, text).with_context(|| format!("writing model {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let editor = FormEditor::new(config.editor);
    let path = cli.model.as_path();

    match cli.command {
        Commands::New { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            save_model(path, &ReportModel::default())?;
            println!("created {}", path.display());
        }

        Commands::AddItem { name, quantity } => {
            let model = load_model(path)?;
            let mut next = editor.add_item(&model);
            let id = next
                .items
                .last()
                .map(|item| item.id)
                .context("new item missing from model")?;
            if let Some(name) = name {
                next = editor.update_item(&next, id, ItemField::Name, &name)?;
            }
            if let Some(quantity) = quantity {
                next = editor.update_item(&next, id, ItemField::Quantity, &quantity)?;
            }
            save_model(path, &next)?;
            println!("{}", id);
        }

        Commands::Set { field, value } => {
            let model = load_model(path)?;
            let field: ReportField = field.parse()?;
            save_model(path, &editor.update_field(&model, field, &value)?)?;
        }

        Commands::SetItem { id, field, value } => {
            let model = load_model(path)?;
            let field: ItemField = field.parse()?;
            save_model(path, &editor.update_item(&model, id, field, &value)?)?;
        }

        Commands::RemoveItem { id } => {
            let model = load_model(path)?;
            save_model(path, &editor.remove_item(&model, id))?;
        }

        Commands::Attach { id, image } => {
            let model = load_model(path)?;
            let bytes = std::fs::read(&image).with_context(|| format!("reading image {}", image.display()))?;
            let next = editor.attach_image(&model, id, &bytes).await?;
            save_model(path, &next)?;
        }

        Commands::ClearImage { id } => {
            let model = load_model(path)?;
            save_model(path, &editor.clear_image(&model, id))?;
        }

        Commands::Export { out } => {
            let model = load_model(path)?;
            let pipeline = ExportPipeline::new(config.export, Arc::new(DirectorySink::new(out)));
            let outcome = pipeline.export_png(&model).await?;
            println!(
                "{} ({}x{}, sha256 {})",
                outcome.location.display(),
                outcome.width,
                outcome.height,
                outcome.sha256
            );
        }

        Commands::Print { out } => {
            let model = load_model(path)?;
            let pipeline = ExportPipeline::new(config.export, Arc::new(DirectorySink::new(&out)))
                .with_printer(Arc::new(HtmlFilePrinter::new(&out)));
            pipeline.print(&model)?;
        }
    }

    Ok(())
}

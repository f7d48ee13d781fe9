//! Render command - Render a template against JSON data

use clap::Args;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use super::{compile_file, parse_partial, register_partials, CliResult};
use crate::config::TesseraConfig;

#[derive(Args)]
pub struct RenderArgs {
    /// Template file to render
    pub template: PathBuf,

    /// JSON file holding the data to render against
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Register a partial file as NAME=PATH (repeatable)
    #[arg(short, long = "partial", value_name = "NAME=PATH", value_parser = parse_partial)]
    pub partials: Vec<(String, PathBuf)>,

    /// Print the rendered node tree as JSON instead of HTML
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RenderArgs, config: &TesseraConfig) {
    match render(&args, config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            std::process::exit(1);
        }
    }
}

fn render(args: &RenderArgs, config: &TesseraConfig) -> CliResult<String> {
    // Command line partials win over configured ones with the same name
    let cli_partials = args
        .partials
        .iter()
        .map(|(name, path)| (name.as_str(), path.clone()));
    register_partials(config.partial_paths().chain(cli_partials))?;

    let data = match &args.data {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
        }
        None => Value::Object(Default::default()),
    };

    let view = compile_file(&args.template)?.view;
    let fragment = view.render_value(data)?;
    tracing::debug!(template = %args.template.display(), nodes = fragment.len(), "rendered");

    if args.json {
        Ok(serde_json::to_string_pretty(&fragment)?)
    } else {
        Ok(fragment.to_html())
    }
}

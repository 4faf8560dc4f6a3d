//! Print the structure of an XPS package
//!
//! Shows the outline, document properties and hyperlinks of a package.
//!
//! Usage:
//!   cargo run --release --bin xps_structure -- file.xps
//!   cargo run --release --bin xps_structure -- file.xps --outline --json
//!   cargo run --release --bin xps_structure -- file.xps --config settings.json
//!
//! Set RUST_LOG=debug to see discovery and warning output.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;
use xps_structure::document::StructureDocument;
use xps_structure::links::LinkModel;
use xps_structure::outline::Outline;
use xps_structure::{PropertyDict, Result, StructureConfig};

struct CliConfig {
    path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    json: bool,
    outline: bool,
    properties: bool,
    links: bool,
}

impl CliConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut cli = Self {
            path: None,
            config_path: None,
            json: false,
            outline: false,
            properties: false,
            links: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--json" => cli.json = true,
                "--outline" => cli.outline = true,
                "--props" | "--properties" => cli.properties = true,
                "--links" => cli.links = true,
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        cli.config_path = Some(PathBuf::from(&args[i]));
                    }
                },
                other if !other.starts_with("--") => cli.path = Some(PathBuf::from(other)),
                other => eprintln!("Ignoring unknown option {}", other),
            }
            i += 1;
        }

        // No section selected means all of them.
        if !(cli.outline || cli.properties || cli.links) {
            cli.outline = true;
            cli.properties = true;
            cli.links = true;
        }
        cli
    }
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<&'a PropertyDict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outline: Option<Vec<OutlineLine<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<&'a LinkModel>,
}

/// One outline entry in depth-first order; `depth` carries the nesting.
#[derive(Serialize)]
struct OutlineLine<'a> {
    depth: usize,
    title: &'a str,
    link: Option<String>,
}

fn outline_lines(outline: &Outline) -> Vec<OutlineLine<'_>> {
    outline
        .iter()
        .map(|entry| OutlineLine {
            depth: entry.depth,
            title: &entry.node.title,
            link: entry.node.destination.as_ref().and_then(|dest| dest.to_flat()),
        })
        .collect()
}

fn print_outline(outline: &Outline) {
    println!("Outline ({} entries)", outline.len());
    for entry in outline.iter() {
        let target = entry
            .node
            .destination
            .as_ref()
            .and_then(|dest| dest.to_flat())
            .unwrap_or_default();
        println!("  {}{}  {}", "  ".repeat(entry.depth), entry.node.title, target);
    }
}

fn print_properties(properties: &PropertyDict) {
    println!("Properties");
    if properties.is_empty() {
        println!("  (none)");
    }
    for (key, value) in properties.iter() {
        println!("  {:<13} {}", key, value);
    }
}

fn print_links(links: &LinkModel) {
    println!("Links ({})", links.links().len());
    for link in links.links() {
        let r = link.rect;
        println!(
            "  [{:.1} {:.1} {:.1} {:.1}] {}",
            r.x0,
            r.y0,
            r.x1,
            r.y1,
            link.flat_target().unwrap_or_else(|| "(unresolved)".to_string())
        );
    }
}

fn load_config(cli: &CliConfig) -> Result<StructureConfig> {
    match &cli.config_path {
        Some(path) => StructureConfig::from_json_str(&fs::read_to_string(path)?),
        None => Ok(StructureConfig::default()),
    }
}

fn run(cli: &CliConfig, path: &PathBuf) -> Result<()> {
    let config = load_config(cli)?;
    let mut doc = StructureDocument::open_path_with_config(path, config)?;

    let properties = if cli.properties { Some(doc.properties()?.clone()) } else { None };
    let outline = if cli.outline { Some(doc.outline()?.clone()) } else { None };
    let links = if cli.links { Some(doc.link_model()?.clone()) } else { None };
    doc.close();

    if cli.json {
        let report = Report {
            properties: properties.as_ref(),
            outline: outline.as_ref().map(outline_lines),
            links: links.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", path.display());
    if let Some(properties) = &properties {
        print_properties(properties);
    }
    if let Some(outline) = &outline {
        print_outline(outline);
    }
    if let Some(links) = &links {
        print_links(links);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = CliConfig::from_args();
    let path = match &cli.path {
        Some(path) => path.clone(),
        None => {
            eprintln!("Usage: xps_structure <file.xps> [--outline] [--props] [--links] [--json] [--config FILE]");
            return ExitCode::from(2);
        },
    };

    match run(&cli, &path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}: {}", path.display(), e);
            ExitCode::FAILURE
        },
    }
}

//! CLI binary for building, validating, and dumping trigger menu graphs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use menu_graph::{BuildReport, MenuGraph, MenuSpec, Node, Severity};

#[derive(Parser)]
#[command(name = "menu", version, about = "Decision-graph builder for multi-stage trigger menus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a menu and print its chains
    Build {
        /// Path to the menu .json file
        menu: PathBuf,

        /// Fail on any property write a unit rejects
        #[arg(long)]
        strict: bool,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a menu file
    Validate {
        /// Path to the menu .json file
        menu: PathBuf,
    },

    /// Show information about a menu
    Info {
        /// Path to the menu .json file
        menu: PathBuf,
    },

    /// Dump the data-flow graph in Graphviz format
    Dot {
        /// Path to the menu .json file
        menu: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build { menu, strict, json } => {
            cmd_build(&menu, strict, json)?;
        }
        Commands::Validate { menu } => {
            cmd_validate(&menu)?;
        }
        Commands::Info { menu } => {
            cmd_info(&menu)?;
        }
        Commands::Dot { menu, output } => {
            cmd_dot(&menu, output.as_deref())?;
        }
    }

    Ok(())
}

fn load_menu(path: &Path, strict: bool) -> anyhow::Result<MenuSpec> {
    let mut spec = MenuSpec::load(path)
        .with_context(|| format!("failed to load menu {}", path.display()))?;
    spec.config.strict_properties |= strict;
    tracing::debug!(path = %path.display(), chains = spec.chains.len(), "menu loaded");
    Ok(spec)
}

fn build_menu(path: &Path, strict: bool) -> anyhow::Result<(MenuGraph, BuildReport)> {
    let spec = load_menu(path, strict)?;
    let built = spec.build()?;
    Ok(built)
}

fn cmd_build(path: &Path, strict: bool, json: bool) -> anyhow::Result<()> {
    let (graph, report) = build_menu(path, strict)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Built {} chains: {} nodes, {} legs, {} stages",
        report.chains,
        report.nodes,
        graph.legs().len(),
        graph.stages().len()
    );
    for chain in graph.chains() {
        println!("\n{} (seed {})", chain.name(), chain.seed());
        for step in chain.steps() {
            for binding in &step.bindings {
                let stage = graph.stage(binding.stage);
                println!(
                    "  {} gated by {} -> {}",
                    stage.name(),
                    graph.node(binding.filter).name(),
                    stage.outputs().join(", ")
                );
            }
        }
    }
    if !report.missing_properties.is_empty() {
        println!("\nRejected property writes:");
        for missing in &report.missing_properties {
            println!("  {missing}");
        }
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    let spec = load_menu(path, false)?;
    let report = match spec.build() {
        Ok((_, report)) => report,
        Err(err) => {
            println!("[ERROR] build: {err}");
            std::process::exit(1);
        }
    };

    if report.diagnostics.is_empty() && report.missing_properties.is_empty() {
        println!("Menu is valid");
        return Ok(());
    }

    for missing in &report.missing_properties {
        println!("[WARN] missing_property: {missing}");
    }
    for diag in &report.diagnostics {
        let severity = match diag.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
    }
    Ok(())
}

fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let (graph, report) = build_menu(path, false)?;

    println!("Chains: {}", report.chains);
    println!("Nodes: {}", report.nodes);
    println!("Externals: {}", report.externals);
    println!(
        "Legs: {} built, {} reused",
        report.legs_built, report.legs_reused
    );
    println!(
        "Stages: {} built, {} reused",
        report.stages_built, report.stages_reused
    );
    println!(
        "Filters: {} built, {} reused",
        report.filters_built, report.filters_reused
    );

    let mut by_role: BTreeMap<String, usize> = BTreeMap::new();
    for (_, node) in graph.nodes() {
        *by_role.entry(node.role().to_string()).or_default() += 1;
    }
    println!("\nNodes by role:");
    for (role, count) in &by_role {
        println!("  {role}: {count}");
    }

    println!("\nChains:");
    for chain in graph.chains() {
        println!(
            "  {} seed={} groups=[{}] steps={}",
            chain.name(),
            chain.seed(),
            chain.group_seed().join(", "),
            chain.steps().len()
        );
    }

    Ok(())
}

fn cmd_dot(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let (graph, _) = build_menu(path, false)?;
    let dot = menu_graph::to_dot(&graph);
    match output {
        Some(out) => {
            std::fs::write(out, dot).with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        None => print!("{dot}"),
    }
    Ok(())
}

//! YANG Reactor CLI
//!
//! Builds the schema context of a directory of YANG sources and inspects it.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yang_reactor::{BuildSession, DirectoryRepository, ReactorConfig, SchemaContext, SchemaNode};

#[derive(Parser)]
#[command(name = "yang-reactor")]
#[command(about = "Link YANG modules and inspect the effective schema")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Source directory (overrides repository.path)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List modules with namespace, submodules and imports
    Modules,

    /// Print the data tree of a module
    Tree {
        /// Module name
        module: String,
        /// Exact revision (defaults to the latest)
        #[arg(short, long)]
        revision: Option<String>,
    },

    /// Build everything and print the context fingerprint
    Check,

    /// Print the module graph in DOT format
    Graph,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn build(config: &ReactorConfig, dir: Option<PathBuf>) -> anyhow::Result<SchemaContext> {
    let root = dir.unwrap_or_else(|| config.repository_path());
    let repository = DirectoryRepository::open(&root, &config.repository)
        .with_context(|| format!("Failed to index {}", root.display()))?;

    let mut session = BuildSession::with_config(config);
    session.add_repository(&repository)?;
    Ok(session.build_effective()?)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ReactorConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let context = build(&config, cli.dir)?;

    match cli.command {
        Commands::Modules => {
            for module in context.modules() {
                println!("{}  {}", module.id(), module.namespace());
                for sub in module.submodules() {
                    println!("    include {}", sub);
                }
                for import in module.imports() {
                    println!("    import  {}", import);
                }
            }
        }

        Commands::Tree { module, revision } => {
            let revision = revision.as_deref().map(str::parse).transpose()?;
            let module = context
                .module(&module, revision)
                .with_context(|| format!("Module '{}' not found", module))?;
            println!("module: {}", module.id());
            for node in module.data_children() {
                print_tree(&context, node, 1);
            }
        }

        Commands::Check => {
            let nodes: usize = context.modules().iter().map(|m| m.node_count()).sum();
            println!("modules:     {}", context.modules().len());
            println!("nodes:       {}", nodes);
            let fingerprint = context.fingerprint().context("Failed to serialize schema context")?;
            println!("fingerprint: {}", fingerprint);
        }

        Commands::Graph => {
            print!("{}", context.to_dot());
        }
    }

    Ok(())
}

fn print_tree(context: &SchemaContext, node: &SchemaNode, depth: usize) {
    let mut markers = String::new();
    if node.is_augmenting() {
        markers.push_str(" +aug");
    }
    if node.is_added_by_uses() {
        markers.push_str(" +uses");
    }
    let type_name = context
        .effective_type(node)
        .map(|t| format!("  <{}>", t.name))
        .unwrap_or_default();

    println!(
        "{}{} {}{}{}",
        "  ".repeat(depth),
        node.keyword(),
        node.argument().unwrap_or_default(),
        type_name,
        markers
    );
    for child in context.schema_children(node) {
        print_tree(context, child, depth + 1);
    }
}

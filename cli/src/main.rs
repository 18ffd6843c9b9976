//! Timegraph CLI: ingest a forensic timeline and write entities or a graph
//!
//! Runs the pipeline over one timeline file, hands the entities to the
//! selected sink and, for graph outputs, links the nodes.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use timegraph::{Config, Neo4jConfig, OutputTarget, Pipeline, Sink};
use tracing::info;

#[derive(Parser)]
#[command(name = "timegraph", version, about = "Forensic timeline to investigative graph")]
struct Cli {
    /// Timeline file (plaso json_line output)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Load settings from a YAML file; flags given alongside override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Output directory for csv, json and xml
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Neo4j HTTP URL
    #[arg(long, default_value = "http://localhost:7474", env = "TIMEGRAPH_NEO4J_URL")]
    neo4j_url: String,

    #[arg(long, default_value = "neo4j", env = "TIMEGRAPH_NEO4J_USER")]
    neo4j_user: String,

    #[arg(long, default_value = "", env = "TIMEGRAPH_NEO4J_PASSWORD", hide_env_values = true)]
    neo4j_password: String,

    #[arg(long, default_value = "neo4j", env = "TIMEGRAPH_NEO4J_DATABASE")]
    neo4j_database: String,

    /// Lines per extraction batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// More output per occurrence (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
    Xml,
    Neo4j,
    Memory,
}

impl Cli {
    fn target(&self, format: OutputFormat) -> OutputTarget {
        let dir = self.output.clone();
        match format {
            OutputFormat::Csv => OutputTarget::Csv { dir },
            OutputFormat::Json => OutputTarget::Json { dir },
            OutputFormat::Xml => OutputTarget::Xml { dir },
            OutputFormat::Neo4j => OutputTarget::Neo4j(Neo4jConfig {
                url: self.neo4j_url.clone(),
                username: self.neo4j_user.clone(),
                password: self.neo4j_password.clone(),
                database: self.neo4j_database.clone(),
            }),
            OutputFormat::Memory => OutputTarget::Memory,
        }
    }

    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(format) = self.format {
            config.output = self.target(format);
        }
        if let Some(batch_size) = self.batch_size {
            config.pipeline.batch_size = batch_size;
        }
        if self.verbose > 0 {
            config.verbosity = self.verbose;
        }
        match self.input {
            Some(input) => config.input = input,
            None if self.config.is_none() => anyhow::bail!("no input: pass --input or --config"),
            None => {}
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&config.pipeline);
    let (entities, stats) = pipeline.run(&config.input).await?;
    info!(
        "{} lines in {} batches, {} undecodable, {} entities",
        stats.lines,
        stats.batches,
        stats.decode_failures,
        stats.counts.total()
    );

    let mut sink = Sink::open(&config.output)?;
    sink.emit(&entities).await?;
    if let Some(report) = sink.finish().await? {
        for pass in &report.passes {
            info!(
                "{}: +{} -{} edges, {} nodes",
                pass.pass, pass.edges_created, pass.edges_deleted, pass.nodes_synthesized
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_target(false)
        .init();

    if let Err(e) = run(config).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

use std::collections::BTreeMap;
use std::fs::write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use conflate::{dedupe, ingest, snapshot, Config, Source};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Conflate normalized batch files into one deduplicated catalog.
    Run {
        /// JSONL batch files, highest priority first.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// YAML file overriding the default thresholds.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Catalog destination; the statistics block lands next to it.
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,
        /// Also write a compact snapshot next to the catalog.
        #[arg(long)]
        snapshot: bool,
    },
    /// Summarize a snapshot written by a previous run.
    Inspect { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            inputs,
            config,
            output,
            snapshot: keep_snapshot,
        } => {
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };

            let batches = ingest::load_batches(&inputs)?;
            let report = dedupe::run(batches, &config)?;

            let md = report.stats.render()?;
            print!("{md}");
            write(output.with_extension("md"), &md)?;

            let mut json = serde_json::to_string_pretty(&report.places)?;
            json.push('\n');
            write(&output, json)?;
            eprintln!(
                "Wrote {} places to {}",
                report.stats.unique,
                output.display()
            );

            if keep_snapshot {
                let path = output.with_extension("bin.zst");
                snapshot::write(&path, &report.places)?;
                eprintln!("Wrote snapshot to {}", path.display());
            }
        }
        Command::Inspect { path } => {
            let places = snapshot::read(&path)?;

            let mut by_source: BTreeMap<Source, usize> = BTreeMap::new();
            let mut multi = 0;
            for place in &places {
                *by_source.entry(place.source).or_insert(0) += 1;
                if place.provenance.len() > 1 {
                    multi += 1;
                }
            }

            println!("# {}\n", path.display());
            println!("- {} places", places.len());
            for (source, n) in by_source {
                println!("- {n} kept from {source}");
            }
            println!("- {multi} backed by more than one source");
        }
    }

    Ok(())
}

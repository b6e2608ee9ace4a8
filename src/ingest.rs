use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use rayon::prelude::*;

use crate::model::{Place, SourceBatch};
use crate::utils::progress_bar;

/// Load every batch file, assigning priority by position: records from
/// the first path win merges against everything after it.
pub fn load_batches(paths: &[PathBuf]) -> Result<Vec<SourceBatch>> {
    let mut batches = Vec::with_capacity(paths.len());
    for (priority, path) in paths.iter().enumerate() {
        eprintln!("Loading {}...", path.display());
        batches.push(load_batch(path, priority as u32)?);
    }
    Ok(batches)
}

/// One JSON record per line, all tagged with the same source.
pub fn load_batch(path: &Path, priority: u32) -> Result<SourceBatch> {
    let contents =
        read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse(&path.display().to_string(), &contents, priority)
}

fn parse(origin: &str, contents: &str, priority: u32) -> Result<SourceBatch> {
    let lines: Vec<(usize, &str)> = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let mut records: Vec<Place> = Vec::with_capacity(lines.len());
    let pb = progress_bar(lines.len() as u64);
    for chunk in &lines.into_iter().chunks(65535) {
        let chunk: Vec<_> = chunk.collect();
        let parsed: Vec<Result<Place>> = chunk
            .par_iter()
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("{origin}:{}: bad record", n + 1))
            })
            .collect();
        for record in parsed {
            records.push(record?);
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    let Some(source) = records.first().map(|x| x.source) else {
        bail!("{origin}: no records");
    };
    if let Some(stray) = records.iter().find(|x| x.source != source) {
        bail!(
            "{origin}: records from both {source} and {} in one batch",
            stray.source
        );
    }

    Ok(SourceBatch::new(source, priority, records))
}

use anyhow::{bail, Context};
use clap::Parser;
use generator::profile::generate;
use isrcore::data_ref::{DatasetType, DirectoryDataRef};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use workflow::config::WorkflowConfig;
use workflow::runner::{Runner, WorkflowResult};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "ISR workflow driver for synthetic and on-disk sensors")]
struct Args {
    /// Generate a synthetic sensor in memory and run ISR on it
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Process the sensor stored in this directory, generating it first if absent
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Override the generator seed
    #[arg(long)]
    seed: Option<u64>,
    /// Write the run summaries as JSON
    #[arg(long)]
    report: Option<PathBuf>,
    /// Append a one-line summary of each run to this file
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    if let Some(seed) = args.seed {
        workflow_config.sensor.seed = seed;
    }
    if !args.offline && args.data_dir.is_none() {
        bail!("nothing to do: pass --offline and/or --data-dir");
    }

    let runner = Runner::new(workflow_config.clone());
    let data_id = workflow_config.sensor.data_id();
    let mut results = Vec::new();

    if args.offline {
        let datasets = generate(&workflow_config.sensor).context("generating synthetic sensor")?;
        let mut data_ref = datasets.into_memory(data_id.clone());
        let result = runner.execute(&mut data_ref)?;
        print_summary("Offline", &result);
        if let Some(path) = &args.log {
            append_log(path, &result)?;
        }
        results.push(result);
    }

    if let Some(dir) = &args.data_dir {
        let mut data_ref = DirectoryDataRef::new(dir, data_id);
        if !data_ref.path_for(DatasetType::Raw).exists() {
            log::info!("no raw frame in {}, generating one", dir.display());
            generate(&workflow_config.sensor)
                .context("generating synthetic sensor")?
                .write_to(&mut data_ref)?;
        }
        let result = runner.execute(&mut data_ref)?;
        print_summary("Directory", &result);
        if let Some(path) = &args.log {
            append_log(path, &result)?;
        }
        results.push(result);
    }

    if let Some(path) = &args.report {
        let file = File::create(path)
            .with_context(|| format!("creating report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &results)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(())
}

fn print_summary(label: &str, result: &WorkflowResult) {
    println!(
        "{label} run {} -> {}x{}, median {:.2}, saturated {}, bad {}, interpolated {}, suspect {}",
        result.data_id,
        result.width,
        result.height,
        result.median,
        result.saturated_pixels,
        result.bad_pixels,
        result.interpolated_pixels,
        result.suspect_pixels
    );
}

fn append_log(path: &Path, result: &WorkflowResult) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(
        file,
        "data_id={} median={:.3} saturated={} interpolated={} nans={} seconds={:.4}",
        result.data_id,
        result.median,
        result.saturated_pixels,
        result.interpolated_pixels,
        result.num_nans,
        result.isr_seconds
    )?;
    Ok(())
}

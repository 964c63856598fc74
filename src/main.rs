use anyhow::{Context, Result};
use clap::Parser;
use anomalog::cli::{AnalyzeArgs, Cli, Command, DistanceArgs, LoadArgs, OutputFormat};
use anomalog::distance::measure_distances;
use anomalog::loader::load_logs;
use anomalog::output::{
    distances_to_csv, format_distances, scores_to_csv, AnalysisResult, JsonResultStore,
    ResultStore,
};
use anomalog::pipeline::ManualTrainTestPipeline;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` enables everything down to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn store(dir: Option<&std::path::Path>, id: u64, result: &AnalysisResult) -> Result<()> {
    if let Some(dir) = dir {
        let path = JsonResultStore::new(dir)
            .save(id, result)
            .with_context(|| format!("Failed to store result {}", id))?;
        eprintln!("Stored result in {}", path.display());
    }
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = args.to_config().context("Invalid analysis configuration")?;
    let analysis_id = config.analysis_id;

    let mut pipeline = ManualTrainTestPipeline::new(config)?;
    pipeline.run().context("Analysis failed")?;
    let report = pipeline.load_report();
    let table = pipeline
        .into_results()
        .context("Analysis finished without results")?;

    match args.format {
        OutputFormat::Text => {
            println!("Loaded {}", report.format());
            print!("{}", table.format(args.top));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        OutputFormat::Csv => print!("{}", scores_to_csv(&table)),
    }

    store(
        args.output_dir.as_deref(),
        analysis_id,
        &AnalysisResult::Scores(table),
    )
}

fn run_distance(args: DistanceArgs) -> Result<()> {
    let request = args.to_request();
    let table = load_logs(&args.input, Default::default())
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let rows = measure_distances(&table, &request).context("Distance measurement failed")?;

    match args.format {
        OutputFormat::Text => print!("{}", format_distances(&rows)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Csv => print!("{}", distances_to_csv(&rows)),
    }

    store(
        args.output_dir.as_deref(),
        args.analysis_id,
        &AnalysisResult::Distances { rows },
    )
}

fn run_load(args: LoadArgs) -> Result<()> {
    let table = load_logs(&args.input, args.log_format)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table.report)?),
        OutputFormat::Text | OutputFormat::Csv => {
            println!("{}", table.report.format());
            println!("runs: {}", table.runs().join(", "));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Distance(args) => run_distance(args),
        Command::Load(args) => run_load(args),
    }
}

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use url::Url;

use svivaaqm_collector::config::{
    DEFAULT_BASE_URL, DEFAULT_FIRST_REGION, DEFAULT_LAST_REGION, DEFAULT_SOURCE_NAME,
    DEFAULT_STATION_CONCURRENCY, DEFAULT_TIMEOUT_SECS, DEFAULT_URL_TEMPLATE,
};
use svivaaqm_collector::pipeline::region;
use svivaaqm_collector::{CollectorConfig, FetchConfig, HttpFetcher, SourceDescriptor};

#[derive(Parser)]
#[command(name = "svivaaqm", about = "Air-quality collector for the svivaaqm.net monitoring network")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Region page URL template; `<id>` is replaced by the region id
    #[arg(long, global = true, env = "SVIVAAQM_URL_TEMPLATE", default_value = DEFAULT_URL_TEMPLATE)]
    url_template: String,
    /// Site root that station links are resolved against
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: Url,
    #[arg(long, global = true, default_value = DEFAULT_SOURCE_NAME)]
    source_name: String,
    /// Max in-flight requests per station batch
    #[arg(short = 'c', long, global = true, default_value_t = DEFAULT_STATION_CONCURRENCY,
          value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    concurrency: usize,
    /// Per-request timeout
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// Extra attempts on 429/5xx/transport errors
    #[arg(long, global = true, default_value_t = 0)]
    retries: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect every region in the range into one document
    Collect {
        #[arg(long, default_value_t = DEFAULT_FIRST_REGION)]
        start: u32,
        #[arg(long, default_value_t = DEFAULT_LAST_REGION)]
        end: u32,
        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Collect a single region and print its measurements
    Region {
        id: u32,
        #[arg(long)]
        pretty: bool,
    },
    /// List the stations discovered on a region page
    Discover { id: u32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let (mut config, fetch_config) = build_config(cli.source)?;
    let fetcher = HttpFetcher::new(&fetch_config).context("Failed to build HTTP client")?;

    let code = match cli.command {
        Commands::Collect {
            start,
            end,
            output,
            pretty,
        } => {
            anyhow::ensure!(start <= end, "empty region range {start}..={end}");
            config.regions = start..=end;

            let pb = ProgressBar::new(config.regions.clone().count() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} regions")?
                    .progress_chars("=> "),
            );

            let result = svivaaqm_collector::collect(&fetcher, &config, &pb).await;
            pb.finish_and_clear();

            match result {
                Ok(doc) => {
                    match output {
                        Some(path) => {
                            let file = File::create(&path)
                                .with_context(|| format!("Failed to create {}", path.display()))?;
                            write_json(BufWriter::new(file), &doc, pretty)?;
                            eprintln!(
                                "Wrote {} measurements to {}",
                                doc.measurements.len(),
                                path.display()
                            );
                        }
                        None => write_json(io::stdout().lock(), &doc, pretty)?,
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    write_json(io::stdout().lock(), &e.report(), pretty)?;
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Region { id, pretty } => {
            let report = region::collect(&fetcher, &config, id).await?;
            eprintln!(
                "{} ({} stations, {} measurements)",
                if report.name.is_empty() { "-" } else { report.name.as_str() },
                report.stations,
                report.measurements.len()
            );
            write_json(io::stdout().lock(), &report.measurements, pretty)?;
            ExitCode::SUCCESS
        }
        Commands::Discover { id } => {
            let found = region::discover(&fetcher, &config, id).await?;
            println!("Region {}: {}", found.id, found.label());
            println!("{}", "-".repeat(60));
            for station in &found.stations {
                println!("{:>4}  {}", station.id, station.data_url);
                println!("      {}", station.interval_url);
            }
            println!("\n{} stations", found.stations.len());
            ExitCode::SUCCESS
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {}", format_duration(elapsed));
    }

    Ok(code)
}

fn build_config(args: SourceArgs) -> anyhow::Result<(CollectorConfig, FetchConfig)> {
    let collector = CollectorConfig {
        source: SourceDescriptor::new(args.source_name, args.url_template)?,
        base_url: args.base_url,
        station_concurrency: args.concurrency,
        ..CollectorConfig::default()
    };
    let fetch = FetchConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        retries: args.retries,
    };
    Ok((collector, fetch))
}

fn write_json<W: Write, T: Serialize>(mut out: W, value: &T, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

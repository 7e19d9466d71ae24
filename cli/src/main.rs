use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use mediathek::info_dict::any_info_dict;
use mediathek::{CoreClient, ExtractLevel, Extractable, ExtractionContext, ExtractionError};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg()]
    url: String,

    /// Preferred languages of the responses, most wanted first (e.g. de-DE)
    #[arg(long)]
    locale: Vec<String>,

    /// Also extract the clip pages that playlists only link to
    #[arg(long)]
    resolve_references: bool,

    /// Only extract the metadata, without looking up the formats
    #[arg(long)]
    no_playback: bool,

    /// More logs, repeat for even more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

async fn run(args: Args) -> Result<()> {
    let context = if args.locale.is_empty() {
        ExtractionContext::new()?
    } else {
        ExtractionContext::new_with_locale(args.locale)?
    };
    let client = CoreClient::with_context(context);

    let url = Url::parse(&args.url)?;
    let wanted = Extractable {
        metadata: ExtractLevel::Extended,
        playback: if args.no_playback {
            ExtractLevel::None
        } else {
            ExtractLevel::Extended
        },
    };

    debug!("extracting {url}");
    let extraction = if args.resolve_references {
        client.extract_url_resolved(&url, &wanted).await?
    } else {
        client.extract_url(&url, &wanted).await?
    }
    .ok_or_else(|| anyhow!("no extractor for {url}"))?;

    println!("{}", serde_json::to_string_pretty(&any_info_dict(&extraction))?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ExtractionError>() {
                Some(expected) if expected.is_expected() => eprintln!("ERROR: {expected}"),
                _ => eprintln!("ERROR: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

mod config;

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use config::{Config, DEFAULT_CONFIG};
use kasumi::{
    download::ExternalDownloader,
    key::RemoteKeyProvider,
    manifest::ManifestFetcher,
    pipeline::{Pipeline, PipelineOptions},
    select::{AudioPreference, Quality},
    title::{Selection, TitleQuery},
    HttpClient, PlatformAdapter,
};
use kasumi_cbc::CbcAdapter;
use kasumi_crackle::CrackleAdapter;
use kasumi_uktvplay::UktvPlayAdapter;

const KEY_PROVIDER_HELP: &str = "Protected titles need a key service. Configure one in the \
[remote_cdm] section of the configuration file. Without it only unencrypted titles \
can be downloaded.";

#[derive(Parser, Debug, Clone)]
#[clap(version, about, after_help = KEY_PROVIDER_HELP)]
struct KasumiArgs {
    /// Requested video height, e.g. 1080 or 1080p. Defaults to the highest available.
    #[clap(short, long)]
    quality: Option<Quality>,

    /// Download one episode, e.g. S01E02
    #[clap(short, long)]
    episode: Option<Selection>,

    /// Download one season, e.g. 1 or S01
    #[clap(short, long, value_parser = parse_season)]
    season: Option<u32>,

    /// Download every episode
    #[clap(long)]
    complete: bool,

    /// Download movies
    #[clap(long)]
    movie: bool,

    /// List available titles without downloading
    #[clap(long)]
    titles: bool,

    /// Configuration file
    #[clap(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Output directory. Overrides the configuration file.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,

    /// Show, movie or episode URL. Without a selection the URL is treated as a single episode.
    url: String,
}

fn parse_season(s: &str) -> Result<u32, String> {
    match s.parse::<Selection>() {
        Ok(Selection::Season(season)) => Ok(season),
        _ => Err(format!("invalid season: {s}")),
    }
}

impl KasumiArgs {
    fn query(&self) -> (TitleQuery, Selection) {
        if self.titles {
            let query = if self.movie {
                TitleQuery::Movies
            } else {
                TitleQuery::Series
            };
            return (query, Selection::List);
        }
        if self.movie {
            return (TitleQuery::Movies, Selection::Movies);
        }
        if let Some(episode) = &self.episode {
            return (TitleQuery::Series, episode.clone());
        }
        if let Some(season) = self.season {
            return (TitleQuery::Series, Selection::Season(season));
        }
        if self.complete {
            return (TitleQuery::Series, Selection::Complete);
        }
        (TitleQuery::Single, Selection::Complete)
    }
}

fn adapters(config: &Config) -> anyhow::Result<Vec<Box<dyn PlatformAdapter>>> {
    Ok(vec![
        Box::new(CbcAdapter::new(config.cbc.clone())?),
        Box::new(CrackleAdapter::new(config.crackle.clone())?),
        Box::new(UktvPlayAdapter::new(config.uktvplay.clone())?),
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = KasumiArgs::parse();

    let level = if args.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(&args.config)?;

    let Some(adapter) = adapters(&config)?
        .into_iter()
        .find(|adapter| adapter.matches(&args.url))
    else {
        bail!("No platform can handle {}", args.url);
    };
    log::debug!("Using {} for {}", adapter.name(), args.url);

    let (query, selection) = args.query();
    let downloader = if selection == Selection::List {
        ExternalDownloader::new(&config.downloader.program, config.downloader.args.clone())
    } else {
        ExternalDownloader::find(&config.downloader.program, config.downloader.args.clone())?
    };

    let audio = config.audio.track.parse().unwrap_or(AudioPreference::Best);
    let options = PipelineOptions {
        quality: args.quality,
        audio,
        output_dir: args
            .output
            .clone()
            .or(config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("downloads")),
    };

    let client = HttpClient::browser()?;
    let mut pipeline = Pipeline::new(
        adapter,
        ManifestFetcher::new(client.clone()),
        Box::new(downloader),
        options,
    )?;
    match &config.remote_cdm {
        Some(remote) => {
            let provider = RemoteKeyProvider::new(
                client,
                remote.endpoint.clone(),
                remote.headers.as_slice(),
            );
            pipeline = pipeline.with_key_provider(Box::new(provider));
        }
        None => log::warn!("No [remote_cdm] configured, protected titles will fail"),
    }

    let report = pipeline.run(&args.url, query, &selection).await?;
    if !report.is_success() {
        bail!("{} title(s) failed", report.failed.len());
    }

    Ok(())
}

mod cli;

use std::process::ExitCode;

use clap::Parser;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use unicode_truncate::UnicodeTruncateStr;

use magplay::cinemeta::{CinemetaClient, MediaItem};
use magplay::config::Config;
use magplay::debrid::DebridClient;
use magplay::descriptor::StreamDescriptor;
use magplay::resolver::{Resolver, Route};
use magplay::torrentio::TorrentioClient;
use magplay::{doctor, http, player};

use cli::{Cli, Command, TitleArgs};

const TITLE_WIDTH: usize = 72;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match http::build_client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config, client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, magplay::config::ConfigError> {
    match &cli.config {
        Some(path) => Ok(Config::load_from(path)?
            .with_env_token(std::env::var(magplay::config::TOKEN_ENV).ok())),
        None => Config::load(),
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn run(command: Command, config: &Config, client: Client) -> Result<(), BoxError> {
    let cinemeta = CinemetaClient::with_base_url(client.clone(), &config.endpoints.cinemeta);
    let torrentio = TorrentioClient::with_base_url(client.clone(), &config.endpoints.torrentio);

    match command {
        Command::Popular => {
            let (movies, shows) = cinemeta.popular().await?;
            println!("Movies");
            print_items(&movies);
            println!("\nSeries");
            print_items(&shows);
        }
        Command::Search { query } => {
            let results = cinemeta.search(&query.join(" ")).await?;
            if results.is_empty() {
                println!("No results");
            }
            print_items(&results);
        }
        Command::Episodes { id } => {
            for (season, episodes) in cinemeta.series_episodes(&id).await? {
                let list: Vec<String> = episodes.iter().map(u32::to_string).collect();
                println!("Season {:>2}: {}", season, list.join(" "));
            }
        }
        Command::Streams(title) => {
            let streams = fetch_streams(&torrentio, &title).await?;
            if streams.is_empty() {
                println!("No streams found");
            }
            for (idx, stream) in streams.iter().enumerate() {
                print_stream(idx, stream);
            }
        }
        Command::Play { title, pick, print } => {
            let streams = fetch_streams(&torrentio, &title).await?;
            let stream = streams
                .get(pick)
                .ok_or_else(|| format!("no stream at index {} ({} available)", pick, streams.len()))?;

            let debrid = DebridClient::with_base_url(
                client.clone(),
                config.debrid.token(),
                &config.debrid.base_url,
            );
            if debrid.is_none() {
                eprintln!("No Real-Debrid token: magnet links will open directly in the player");
            }
            let resolver = Resolver::new(debrid).with_timeout(config.debrid.resolve_timeout());

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("interrupt received");
                    ctrl_c.cancel();
                }
            });

            if resolver.unlock_enabled() {
                eprintln!("Unlocking {} ...", stream.label());
            }
            let playable = resolver.resolve(stream, &cancel).await?;

            match &playable.route {
                Route::Fallback(failure) if failure.is_cancelled() && cancel.is_cancelled() => {
                    return Err("cancelled".into());
                }
                Route::Fallback(failure) => {
                    warn!(error = %failure, "playing without unlock");
                    eprintln!("Unlock failed ({}), using original link", failure);
                }
                route => info!(?route, "stream resolved"),
            }

            if print {
                println!("{}", playable.url);
            } else {
                player::play(&config.player, &playable.url).await?;
            }
        }
        Command::Doctor => {
            let results = doctor::run_checks(config, &client).await;
            doctor::print_results(&results);
            let (errors, _) = doctor::summarize(&results);
            if errors > 0 {
                return Err(format!("{} check(s) failed", errors).into());
            }
        }
    }

    Ok(())
}

async fn fetch_streams(
    torrentio: &TorrentioClient,
    title: &TitleArgs,
) -> Result<Vec<StreamDescriptor>, BoxError> {
    let item = MediaItem {
        id: title.id.clone(),
        name: String::new(),
        media_type: title.kind.as_str().to_string(),
        year: None,
        poster: None,
    };
    Ok(torrentio.streams(&item, title.season, title.episode).await?)
}

fn print_items(items: &[MediaItem]) {
    for item in items {
        let display = item.display_title();
        let (title, _) = display.unicode_truncate(TITLE_WIDTH);
        println!("  {:<12} {:<7} {}", item.id, item.media_type, title);
    }
}

fn print_stream(idx: usize, stream: &StreamDescriptor) {
    let summary = stream.title.lines().next().unwrap_or_default();
    let (summary, _) = summary.unicode_truncate(TITLE_WIDTH);
    let quality = stream.name.lines().nth(1).unwrap_or_default();
    println!("  [{:>2}] {:<10} {}", idx, quality, summary);
}

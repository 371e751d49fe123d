use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rocket::routes;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

mod config;
use config::GateConfig;

mod gate;
use gate::Gatekeeper;

mod github;
use github::GitHubClient;

mod utils;

mod webhooks;
use webhooks::{
    github::events::PullRequestEvent, github_webhook, EventSender, GitHubSecret,
};

#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Configuration file for release-ready. When omitted, the GitHub Actions inputs
    /// (`INPUT_GITHUB_TOKEN`, `INPUT_LABEL`, ...) are read from the environment.
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a single pull_request event payload
    Check {
        /// JSON payload of the event
        #[clap(short, long, env = "GITHUB_EVENT_PATH", parse(from_os_str))]
        event: PathBuf,
    },
    /// Listen for GitHub webhook deliveries
    Serve,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();
    let config = match &opts.config {
        Some(path) => GateConfig::from_file(path)?,
        None => GateConfig::from_env().context("couldn't read action inputs")?,
    };

    let client = GitHubClient::new(&config.github_token, config.github_api_url.clone())
        .context("failed to create GitHub client")?;
    let gatekeeper = Gatekeeper::new(config, client);

    match opts.command {
        Command::Check { event } => check(gatekeeper, &event).await,
        Command::Serve => serve(gatekeeper).await,
    }
}

async fn check(gatekeeper: Gatekeeper<GitHubClient>, event_path: &Path) -> anyhow::Result<()> {
    let event_file = File::open(event_path)
        .with_context(|| format!("couldn't open {}", event_path.display()))?;
    let event: PullRequestEvent = serde_json::from_reader(BufReader::new(event_file))
        .context("couldn't parse pull_request event")?;

    let verdict = gatekeeper
        .process(&event)
        .await
        .context("couldn't report the verdict on the pull request")?;
    info!("done: {:?}", verdict);

    Ok(())
}

async fn serve(gatekeeper: Gatekeeper<GitHubClient>) -> anyhow::Result<()> {
    let github_secret = gatekeeper
        .config()
        .github_secret
        .clone()
        .context("github_secret is required to receive webhooks")?;

    let (sender, receiver) = unbounded_channel();
    tokio::spawn(async move { gatekeeper.run(receiver).await });

    let rocket = rocket::build()
        .mount("/", routes![github_webhook])
        .manage(EventSender(sender))
        .manage(GitHubSecret(github_secret));
    rocket
        .launch()
        .await
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!(err))
}

use clap::Parser;
use majsoul_bridge::{
    Config, Result,
    autoplay::AutoplayExecutor,
    browser::{CdpPage, connect_browser, find_game_page},
    capture::{CaptureDispatcher, HttpSink},
    config::ConfigOverrides,
    server,
    session::SessionManager,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "majsoul-bridge",
    about = "Game-session interception and autoplay dispatch over the Chrome DevTools Protocol"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL for captured events
    #[arg(long)]
    backend_url: Option<String>,

    /// Remote-debugging port of the browser hosting the game
    #[arg(long)]
    cdp_port: Option<u16>,

    /// Port for the inbound command endpoint
    #[arg(long)]
    listen_port: Option<u16>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_ref())?.with_overrides(ConfigOverrides {
        backend_url: cli.backend_url,
        cdp_port: cli.cdp_port,
        listen_port: cli.listen_port,
    });
    config.validate()?;

    let browser = connect_browser(config.browser.cdp_port).await?;
    let page = find_game_page(&browser, &config.browser.page_url_hint).await?;
    tracing::info!(
        "observing page {}",
        page.url().await.unwrap_or_default().unwrap_or_default()
    );

    let sink = Arc::new(HttpSink::new(
        config.ingest_endpoint()?,
        config.capture.source_tag.clone(),
    ));
    let capture = Arc::new(CaptureDispatcher::new(
        sink.clone(),
        config.capture.definition_resource.clone(),
    ));

    let game_page = Arc::new(CdpPage::new(page));
    let manager = SessionManager::new(game_page, capture, sink);
    manager.attach().await?;

    let executor = Arc::new(AutoplayExecutor::spawn(manager.clone()));

    tokio::select! {
        result = server::serve(config.server.listen_port, executor, manager.clone()) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            manager.detach().await;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("debug").add_directive("chromiumoxide=info".parse().unwrap())
    } else {
        EnvFilter::from_default_env()
            .add_directive("info".parse().unwrap())
            .add_directive("chromiumoxide=off".parse().unwrap())
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

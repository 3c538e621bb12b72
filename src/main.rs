use crate::{
    cli::{Cli, SubCommand},
    config::{Config, ConfigPath},
    notice::NoticeBoard,
    panel::Panel,
    presets::PresetManager,
    state::StateStore,
    sync::Synchronizer,
    utils::log::{LogManager, get_default_filter},
};
use capdeck_api::{ApiClient, CachingTransport, HttpTransport, Transport};
use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{
    Layer, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

#[cfg(feature = "console")]
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod constants;
mod debounce;
mod file_watcher;
mod notice;
mod panel;
mod platform;
mod playback;
mod presets;
mod state;
mod sync;
mod utils;
mod views;

#[cfg(feature = "tracy-allocations")]
#[global_allocator]
static GLOBAL: tracy_client::ProfiledAllocator<std::alloc::System> =
    tracy_client::ProfiledAllocator::new(std::alloc::System, 100);

#[cfg(not(feature = "tracy-allocations"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub fn main() -> miette::Result<()> {
    #[cfg(feature = "tracy")]
    tracy_client::Client::start();

    let cli = Cli::parse();
    let config_path = ConfigPath::new(cli.config_dir.clone())?;

    if let Some(SubCommand::Validate) = cli.subcommand {
        Config::validate(&config_path)?;
        println!("{} is valid", config_path.file.display());
        return Ok(());
    }

    let stderr_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .with_filter(get_default_filter());

    let (file_layer, handle) = reload::Layer::new(None);
    let file_layer = file_layer.with_filter(get_default_filter());

    let registry = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer);

    #[cfg(feature = "console")]
    let registry = registry.with(
        console_subscriber::spawn()
            .with_filter(EnvFilter::new("trace,tokio=trace,runtime=trace")),
    );

    registry.init();

    let config = Config::init(&config_path);
    let logfile_path = LogManager::init().setup_logging(&handle);

    info!("starting version {}", env!("CARGO_PKG_VERSION"));
    info!("saving logs to {:?}", logfile_path);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    let result = runtime.block_on(connect(cli, config, config_path));
    // stdin may still be blocked on a read
    runtime.shutdown_background();
    result
}

async fn connect(
    cli: Cli,
    config: Config,
    config_path: ConfigPath,
) -> miette::Result<()> {
    let base_url = cli.url.clone().unwrap_or_else(|| config.base_url.clone());
    let transport = HttpTransport::new(&base_url, config.request_timeout())
        .into_diagnostic()
        .wrap_err("invalid appliance address")?;
    debug!("talking to {}", transport.base());

    if config.offline_cache {
        let transport = CachingTransport::new(transport);
        let stored = transport.precache().await;
        debug!("precached {stored} pages");
        let client = ApiClient::new(transport);
        run(client, cli, base_url, config, config_path).await
    } else {
        run(ApiClient::new(transport), cli, base_url, config, config_path).await
    }
}

async fn run<T: Transport>(
    client: ApiClient<T>,
    cli: Cli,
    base_url: String,
    config: Config,
    config_path: ConfigPath,
) -> miette::Result<()> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(platform::default_user_agent);
    let notices = NoticeBoard::new(config.desktop_notifications);
    let sync = Synchronizer::new(client, StateStore::new(), notices, &user_agent);

    match cli.subcommand.unwrap_or(SubCommand::Panel) {
        SubCommand::Panel => {
            let shutdown = CancellationToken::new();
            let token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted");
                    token.cancel();
                }
            });

            Panel::new(sync, base_url, config, config_path)
                .run(tokio::io::stdin(), shutdown)
                .await
        }
        SubCommand::Status { json } => {
            commands::status(&sync, json, &base_url).await
        }
        SubCommand::Stream { action } => commands::stream(&sync, action).await,
        SubCommand::Preset(command) => {
            let presets = PresetManager::new(sync.clone());
            commands::preset(&presets, sync.notices(), command).await
        }
        SubCommand::Recording(command) => {
            commands::recording(&sync, command).await
        }
        SubCommand::Audio(command) => commands::audio(&sync, command).await,
        SubCommand::Devices { refresh } => {
            commands::devices(&sync, refresh).await
        }
        // handled before startup
        SubCommand::Validate => Ok(()),
    }
}

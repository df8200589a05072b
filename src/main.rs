use clap::{Parser, Subcommand};
use faultline::config::MeshConfig;
use faultline::events::EventService;
use faultline::gateway::GatewayApp;
use faultline::notify::HttpNotifier;
use faultline::registry::RegistryApp;
use faultline::resilience::{LoadMonitor, LoadSample};
use faultline::server::serve;
use faultline::store::MemoryStore;
use faultline::users::UserService;
use faultline::ServiceKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// faultline — cooperating demo services with circuit breaking, admission
/// control, and least-loaded routing
#[derive(Parser)]
#[command(name = "faultline", version, about)]
struct Cli {
    /// Path to configuration file (.hcl)
    #[arg(short, long, default_value = "faultline.hcl")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway
    Gateway,
    /// Run the event service
    Events,
    /// Run the user service
    Users,
    /// Run the discovery registry
    Registry,
    /// Run all four services in one process (demo mode)
    All,
    /// Validate a configuration file without starting anything
    Validate,
}

#[tokio::main]
async fn main() -> faultline::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        tracing::info!(config = cli.config, "loading configuration");
        MeshConfig::from_file(&cli.config).await?
    } else {
        tracing::warn!(config = cli.config, "config file not found, using defaults");
        MeshConfig::default()
    };
    config.validate()?;

    match cli.command {
        Commands::Validate => {
            print_summary(&config);
            return Ok(());
        }
        Commands::Gateway => {
            start_gateway(&config).await?;
        }
        Commands::Events => {
            start_events(&config).await?;
        }
        Commands::Users => {
            start_users(&config).await?;
        }
        Commands::Registry => {
            start_registry(&config).await?;
        }
        Commands::All => {
            start_registry(&config).await?;
            start_users(&config).await?;
            start_events(&config).await?;
            start_gateway(&config).await?;
        }
    }

    tracing::info!("ready — press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}

async fn start_gateway(config: &MeshConfig) -> faultline::Result<()> {
    tracing::info!(service = %ServiceKind::Gateway, "starting");
    let addr = parse_listen(&config.gateway.listen)?;
    let app = GatewayApp::from_config(&config.resilience, &config.gateway).await?;
    tracing::info!(
        event_targets = app.event_pool().len(),
        user_targets = app.user_pool().len(),
        "gateway pools built"
    );
    serve(addr, Arc::new(app)).await?;
    Ok(())
}

async fn start_events(config: &MeshConfig) -> faultline::Result<()> {
    tracing::info!(service = %ServiceKind::Events, "starting");
    let addr = parse_listen(&config.events.listen)?;
    let notifier = Arc::new(HttpNotifier::new(
        config.events.user_service.clone(),
        config.resilience.call_timeout(),
    )?);
    let app = Arc::new(EventService::new(
        &config.resilience,
        Arc::new(MemoryStore::new()),
        notifier,
    ));

    spawn_monitor("events", app.load_sample(), config);
    serve(addr, app).await?;
    Ok(())
}

async fn start_users(config: &MeshConfig) -> faultline::Result<()> {
    tracing::info!(service = %ServiceKind::Users, "starting");
    let addr = parse_listen(&config.users.listen)?;
    let app = Arc::new(UserService::new(&config.resilience));

    spawn_monitor("users", app.load_sample(), config);
    serve(addr, app).await?;
    Ok(())
}

async fn start_registry(config: &MeshConfig) -> faultline::Result<()> {
    tracing::info!(service = %ServiceKind::Registry, "starting");
    let addr = parse_listen(&config.registry.listen)?;
    serve(addr, Arc::new(RegistryApp::new())).await?;
    Ok(())
}

fn spawn_monitor(service: &str, sample: Arc<LoadSample>, config: &MeshConfig) {
    let monitor = Arc::new(LoadMonitor::new(
        service,
        sample,
        config.resilience.critical_load,
        config.resilience.monitor_interval(),
    ));
    monitor.spawn();
}

fn parse_listen(listen: &str) -> faultline::Result<SocketAddr> {
    listen
        .parse()
        .map_err(|e| faultline::Error::Config(format!("invalid listen address '{}': {}", listen, e)))
}

fn print_summary(config: &MeshConfig) {
    println!("✓ Configuration is valid");
    println!();
    println!("  Resilience:");
    println!(
        "    breaker: {} failures / {:.1}s window",
        config.resilience.failure_threshold, config.resilience.failure_window_secs
    );
    println!("    call timeout:   {}s", config.resilience.call_timeout_secs);
    println!("    max concurrent: {}", config.resilience.max_concurrent);
    println!("    cache capacity: {}", config.resilience.cache_capacity);
    println!(
        "    critical load:  {:.1} req/s every {}s",
        config.resilience.critical_load, config.resilience.monitor_interval_secs
    );
    println!("  Gateway:  {}", config.gateway.listen);
    for backend in &config.gateway.event_backends {
        println!("    event backend: {}", backend);
    }
    for backend in &config.gateway.user_backends {
        println!("    user backend:  {}", backend);
    }
    if let Some(registry) = &config.gateway.registry_url {
        println!("    registry:      {}", registry);
    }
    println!("  Events:   {}", config.events.listen);
    println!("    user service: {}", config.events.user_service);
    println!("  Users:    {}", config.users.listen);
    println!("  Registry: {}", config.registry.listen);
}

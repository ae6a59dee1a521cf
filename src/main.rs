//! Synheart Focus Agent CLI
//!
//! Focus drift detection for the browser.

use clap::{Parser, Subcommand};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use synheart_focus_agent::{
    config::Config,
    core::{extract_hostname, DomainLists, FocusMode},
    intervention::SharedSink,
    runtime::Agent,
    storage::{create_shared_store, PersistedState, SharedStore},
    PRIVACY_DECLARATION, VERSION,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SYNHEART_FOCUS_LOG";
const DEFAULT_LOG_FILTER: &str = "synheart_focus_agent=info";

#[derive(Parser)]
#[command(name = "synheart-focus")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Focus drift detection for the browser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and the local extension server
    Start {
        /// Port for the extension server (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Focus mode to start in (deep-work, study, casual)
        #[arg(long)]
        mode: Option<FocusMode>,
    },

    /// Show settings and today's statistics
    Status,

    /// Enable drift detection
    Enable,

    /// Disable drift detection
    Disable,

    /// Set the focus mode
    Mode {
        /// deep-work, study or casual
        mode: FocusMode,
    },

    /// Manage custom domain lists
    Domains {
        #[command(subcommand)]
        action: DomainsAction,
    },

    /// Show how a URL is classified
    Classify {
        url: String,
    },

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config,
}

#[derive(Subcommand)]
enum DomainsAction {
    /// List custom domains
    List,

    /// Add a domain to a custom list
    Add {
        host: String,

        /// Treat the domain as productive
        #[arg(long, conflicts_with = "distraction")]
        productive: bool,

        /// Treat the domain as a distraction
        #[arg(long)]
        distraction: bool,
    },

    /// Remove a domain from both custom lists
    Remove {
        host: String,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port, mode } => {
            cmd_start(port, mode);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Enable => {
            cmd_set_enabled(true);
        }
        Commands::Disable => {
            cmd_set_enabled(false);
        }
        Commands::Mode { mode } => {
            cmd_mode(mode);
        }
        Commands::Domains { action } => {
            cmd_domains(action);
        }
        Commands::Classify { url } => {
            cmd_classify(&url);
        }
        Commands::Privacy => {
            cmd_privacy();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}; using default configuration");
            Config::default()
        }
    }
}

fn open_store(config: &Config) -> SharedStore {
    create_shared_store(config.state_path())
}

fn load_state(store: &SharedStore) -> PersistedState {
    match store.load() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error reading state: {e}");
            std::process::exit(1);
        }
    }
}

/// Load, modify and save the durable state. A running agent picks the change up.
fn update_state(f: impl FnOnce(&mut PersistedState)) -> PersistedState {
    let config = load_config();
    let store = open_store(&config);
    let mut state = load_state(&store);
    f(&mut state);
    if let Err(e) = store.save(&state) {
        eprintln!("Error saving state: {e}");
        std::process::exit(1);
    }
    state
}

fn cmd_start(port: Option<u16>, mode: Option<FocusMode>) {
    println!("Synheart Focus Agent v{VERSION}");
    println!();

    let mut config = load_config();
    if let Some(port) = port {
        config.server_port = port;
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    if let Some(mode) = mode {
        update_state(|state| state.focus_mode = mode);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_agent(config)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_agent(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config);
    let agent = Arc::new(Agent::from_config(&config, store, overlay_sinks(&config))?);

    let metrics = agent.metrics().await;
    println!("Starting engine...");
    println!("  Enabled: {}", metrics.enabled);
    println!("  Mode: {}", metrics.mode);
    println!("  Scoring interval: {}s", config.scoring_interval.as_secs());
    println!("  State file: {:?}", config.state_path());
    println!("Instance ID: {}", agent.instance_id());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc_handler(shutdown_tx);

    let handles = agent.spawn_loops(
        config.scoring_interval,
        config.decay_interval,
        shutdown_rx.clone(),
    );

    #[cfg(feature = "server")]
    let server_tx = {
        use synheart_focus_agent::server::{run, ServerConfig};
        let (addr, tx) = run(ServerConfig::new(config.server_port), agent.clone()).await?;
        println!("  Listening on http://{addr}");
        tx
    };

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut shutdown = shutdown_rx;
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }

    println!();
    println!("Shutting down...");

    #[cfg(feature = "server")]
    let _ = server_tx.send(());

    for handle in handles {
        let _ = handle.await;
    }

    // Final stats
    println!();
    println!("{}", agent.metrics().await.stats.summary());
    Ok(())
}

#[cfg(feature = "gateway")]
fn overlay_sinks(config: &Config) -> Vec<SharedSink> {
    use synheart_focus_agent::intervention::OverlaySink;

    let Some(url) = &config.overlay_url else {
        return Vec::new();
    };
    match OverlaySink::new(url.clone()) {
        Ok(sink) => {
            println!("  Overlay endpoint: {url}");
            vec![Arc::new(sink)]
        }
        Err(e) => {
            eprintln!("Warning: Overlay forwarding disabled: {e}");
            Vec::new()
        }
    }
}

#[cfg(not(feature = "gateway"))]
fn overlay_sinks(config: &Config) -> Vec<SharedSink> {
    if config.overlay_url.is_some() {
        eprintln!("Warning: overlay_url ignored (gateway feature not enabled at compile time)");
    }
    Vec::new()
}

fn cmd_status() {
    let config = load_config();
    let store = open_store(&config);
    let mut state = load_state(&store);
    state.stats.roll_over(chrono::Utc::now());
    let thresholds = config.modes.get(state.focus_mode);

    println!("Synheart Focus Agent Status");
    println!("===========================");
    println!();

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    let running = TcpStream::connect_timeout(&addr, Duration::from_millis(300)).is_ok();
    println!(
        "Agent: {}",
        if running {
            format!("running on port {} ✓", config.server_port)
        } else {
            "not running ✗".to_string()
        }
    );
    println!();

    println!("Settings:");
    println!("  Enabled: {}", state.enabled);
    println!("  Mode: {}", state.focus_mode);
    println!("  Idle threshold: {}s", thresholds.idle_secs);
    println!("  Tab switches per minute: {}", thresholds.tab_switch_per_min);
    println!("  Signals to drift: {}", thresholds.drift_signals);
    println!(
        "  Custom domains: {} productive, {} distraction",
        state.custom_productive.len(),
        state.custom_distraction.len()
    );
    println!();
    println!("{}", state.stats.summary());
}

fn cmd_set_enabled(enabled: bool) {
    update_state(|state| state.enabled = enabled);
    if enabled {
        println!("Drift detection enabled.");
    } else {
        println!("Drift detection disabled. Use 'synheart-focus enable' to resume.");
    }
}

fn cmd_mode(mode: FocusMode) {
    update_state(|state| state.focus_mode = mode);
    println!("Focus mode set to {mode}.");
}

fn cmd_domains(action: DomainsAction) {
    match action {
        DomainsAction::List => {
            let config = load_config();
            let state = load_state(&open_store(&config));
            println!("Productive:");
            for host in &state.custom_productive {
                println!("  {host}");
            }
            println!("Distraction:");
            for host in &state.custom_distraction {
                println!("  {host}");
            }
        }
        DomainsAction::Add {
            host,
            productive,
            distraction,
        } => {
            if productive == distraction {
                eprintln!("Error: pass exactly one of --productive or --distraction");
                std::process::exit(1);
            }
            let mut added = false;
            update_state(|state| {
                added = edit_lists(state, |lists| {
                    if productive {
                        lists.add_productive(&host)
                    } else {
                        lists.add_distraction(&host)
                    }
                });
            });
            if !added {
                eprintln!("Error: '{host}' is not a valid domain");
                std::process::exit(1);
            }
            let list = if productive { "productive" } else { "distraction" };
            println!("Added {host} to the {list} list.");
        }
        DomainsAction::Remove { host } => {
            let mut removed = false;
            update_state(|state| removed = edit_lists(state, |lists| lists.remove(&host)));
            if removed {
                println!("Removed {host}.");
            } else {
                println!("{host} is not in either custom list.");
            }
        }
    }
}

fn edit_lists(state: &mut PersistedState, f: impl FnOnce(&mut DomainLists) -> bool) -> bool {
    let mut lists = DomainLists::from_custom(
        state.custom_productive.drain(..),
        state.custom_distraction.drain(..),
    );
    let changed = f(&mut lists);
    state.custom_productive = lists.custom_productive.into_iter().collect();
    state.custom_distraction = lists.custom_distraction.into_iter().collect();
    changed
}

fn cmd_classify(url: &str) {
    let config = load_config();
    let state = load_state(&open_store(&config));
    let lists = DomainLists::from_custom(state.custom_productive, state.custom_distraction);

    match extract_hostname(url) {
        Some(host) => println!("{host}: {:?}", lists.classify_host(&host)),
        None => println!("{url}: {:?} (no hostname)", lists.classify(url)),
    }
}

fn cmd_privacy() {
    println!("{PRIVACY_DECLARATION}");
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(shutdown: watch::Sender<bool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown.send(true);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}

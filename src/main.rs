//! Medalboard CLI
//!
//! - Serve the dashboard API
//! - Replay the medal race in the terminal
//! - Print the bar, Sankey and final table models

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use medalboard::aggregate::SankeyGraph;
use medalboard::api::{serve, AppState};
use medalboard::config::{generate_default_config, Config, LoggingConfig};
use medalboard::dashboard::Dashboard;
use medalboard::replay::{ChannelSink, ReplayFrame, ReplayState, Standing};
use medalboard::websocket::{ConnectionHub, HubConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "medalboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Olympic medal dashboard engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the user config dir, then ./medalboard.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Athletes CSV, overrides the config
    #[arg(long, global = true)]
    pub athletes: Option<PathBuf>,

    /// Medallists CSV, overrides the config
    #[arg(long, global = true)]
    pub medallists: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API and WebSocket server
    Serve {
        /// Do not start the replay until a client asks for it
        #[arg(long)]
        no_autostart: bool,
    },

    /// Play the medal race in the terminal
    Replay {
        /// Milliseconds between dates (default: config value)
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Print the grouped bar chart model
    Bar,

    /// Print the Sankey graph for a country
    Sankey {
        /// Country name as it appears in the athletes CSV
        country: String,
    },

    /// Print the final medal table
    Totals,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(path) = cli.athletes.clone() {
        config.data.athletes_path = path;
    }
    if let Some(path) = cli.medallists.clone() {
        config.data.medallists_path = path;
    }

    init_logging(&config.logging);

    let json = match cli.format.as_str() {
        "json" => true,
        "table" => false,
        other => bail!("Unknown output format: {} (expected table or json)", other),
    };

    match cli.command {
        Commands::Serve { no_autostart } => {
            let autostart = config.replay.autostart && !no_autostart;
            run_server(config, autostart).await
        }
        Commands::Replay { interval_ms } => {
            if let Some(ms) = interval_ms {
                config.replay.interval_ms = ms;
                config.validate()?;
            }
            run_replay(&config, json).await
        }
        Commands::Bar => {
            let dashboard = load_offline(&config)?;
            let model = dashboard.bar_chart();
            if json {
                println!("{}", serde_json::to_string_pretty(model)?);
            } else {
                println!("y-axis max: {:.1}", model.y_domain_max());
                for group in &model.groups {
                    println!("\n{} ({})", group.country, group.total);
                    for bar in &group.bars {
                        println!("  {:<30} {:>6}", bar.category, bar.count);
                    }
                }
            }
            Ok(())
        }
        Commands::Sankey { country } => {
            let dashboard = load_offline(&config)?;
            let graph = SankeyGraph::for_country(dashboard.athletes(), &country)
                .with_context(|| format!("No data for country: {}", country))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                for link in &graph.links {
                    println!(
                        "{} → {}: {}",
                        graph.nodes[link.source].name, graph.nodes[link.target].name, link.value
                    );
                }
                println!("total: {}", graph.total_flow());
            }
            Ok(())
        }
        Commands::Totals => {
            let dashboard = load_offline(&config)?;
            let table = dashboard.replay().sequencer().final_table();
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("medalboard={},tower_http=info", config.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("writing config to {}", path.display()))?;
            eprintln!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Dashboard for one-shot commands; nothing is ever rendered into the sink
fn load_offline(config: &Config) -> anyhow::Result<Dashboard> {
    let (sink, _frames) = ChannelSink::new();
    let dashboard = Dashboard::load(config, Arc::new(sink))?;
    Ok(dashboard)
}

async fn run_server(config: Config, autostart: bool) -> anyhow::Result<()> {
    tracing::info!("Starting Medalboard v{}", env!("CARGO_PKG_VERSION"));

    let hub = Arc::new(ConnectionHub::new(HubConfig {
        max_connections: config.api.max_connections,
    }));
    let dashboard = Arc::new(Dashboard::load(&config, hub.clone())?);

    if autostart {
        let run = dashboard.replay().start().await;
        tracing::info!(run, "Replay started");
    }

    let state = AppState::new(dashboard, hub, config.api.clone());
    serve(state, &config.api).await?;
    Ok(())
}

async fn run_replay(config: &Config, json: bool) -> anyhow::Result<()> {
    let (sink, mut frames) = ChannelSink::new();
    let dashboard = Dashboard::load(config, Arc::new(sink))?;
    let player = dashboard.replay();

    player.start().await;
    while let Some(frame) = frames.recv().await {
        if json {
            println!("{}", serde_json::to_string(&frame)?);
            if matches!(frame, ReplayFrame::Finished { .. }) {
                break;
            }
            continue;
        }

        match frame {
            ReplayFrame::Reset { dates, .. } => {
                println!("Medal race over {} dates", dates);
            }
            ReplayFrame::Tick { snapshot, .. } => {
                println!("\n[{}] {}", snapshot.index + 1, snapshot.date);
                print_table(&snapshot.standings);
            }
            ReplayFrame::Finished { table, .. } => {
                println!("\nFinal table");
                print_table(&table);
                break;
            }
        }
    }

    let status = player.wait().await?;
    if status.state == ReplayState::Failed {
        bail!("Replay run {} failed", status.run);
    }
    Ok(())
}

fn print_table(standings: &[Standing]) {
    for (position, standing) in standings.iter().enumerate() {
        println!("{:>3}. {:<32} {:>5}", position + 1, standing.country, standing.total);
    }
}

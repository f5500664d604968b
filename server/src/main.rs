use clap::Parser;
use log::{error, info};
use server::config::load_game_config;
use server::network::Server;
use server::records::{JsonFileRecordSink, MemoryRecordSink, RecordSink};
use server::world::{World, WorldSettings};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the JSON game configuration
    #[clap(short, long)]
    config_file: PathBuf,
    /// Tick period in milliseconds; without it the server waits for manual ticks
    #[clap(short, long)]
    tick_period: Option<u64>,
    /// File the world is saved to and restored from
    #[clap(short, long)]
    state_file: Option<PathBuf>,
    /// Period between automatic saves in milliseconds
    #[clap(short = 'p', long)]
    save_state_period: Option<u64>,
    /// Spawn dogs at random road points instead of the first road start
    #[clap(long)]
    randomize_spawn_points: bool,
    /// JSON file keeping retired player records; in memory when omitted
    #[clap(long)]
    records_file: Option<PathBuf>,
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = load_game_config(&args.config_file)?;

    let records: Box<dyn RecordSink> = match &args.records_file {
        Some(path) => Box::new(JsonFileRecordSink::open(path)?),
        None => Box::new(MemoryRecordSink::new()),
    };

    let settings = WorldSettings {
        tick_period: args.tick_period.map(Duration::from_millis),
        save_period: args.save_state_period.map(Duration::from_millis),
        state_file: args.state_file.clone(),
        randomize_spawn_points: args.randomize_spawn_points,
    };

    let mut world = World::new(config, settings, records);
    if let Err(e) = world.load_state() {
        error!("Failed to restore world state: {}", e);
        return Err(e.into());
    }

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, world).await?;
    server.run().await?;

    info!("Server stopped");
    Ok(())
}

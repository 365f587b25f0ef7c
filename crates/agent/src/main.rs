use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use support::clock::WallClock;
use tracing::info;
use trogdor_agent::Agent;

/// The agent process for the Trogdor fault injection system.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// The configuration file to use.
    #[arg(long)]
    config: String,

    /// The name of this node.
    #[arg(long)]
    name: String,

    /// Run the process in the foreground.
    #[arg(long)]
    foreground: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if !args.foreground {
        support::process::daemonize().context("unable to daemonize")?;
    }
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let platform = Arc::new(platform::create_platform(&args.config)?);
    let node = platform.topology.get_node(&args.name).ok_or_else(|| {
        anyhow!(
            "no configuration found for node '{}'; configured node names: {}",
            args.name,
            platform.topology.node_names().join(", ")
        )
    })?;
    let port = node
        .trogdor_agent_port
        .ok_or_else(|| anyhow!("no trogdor_agent_port specified for node '{}'", args.name))?;
    platform::signals::spawn_signal_task();
    info!(
        "launching trogdor agent {} with port {}",
        std::process::id(),
        port
    );
    let agent = Agent::new(Arc::new(WallClock), platform, port);
    let handle = agent.start().await?;
    handle.wait_for_exit().await;
    Ok(())
}

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mace_budget::usage::{get_costs_by_provider, get_nova_cost_breakdown, record_usage, UsageParams};
use mace_budget::{apply_cost_optimization, create_cost_optimization_audit_entry};
use mace_models::usage::UsageRecord;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mace", about = "Agent memory and cost control for market analysis")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/mace.toml")]
    config: String,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which agents an analysis would admit under the cost ceiling
    Plan {
        /// Comma-separated agent ids (defaults to the enabled agents)
        #[arg(long, value_delimiter = ',')]
        agents: Option<Vec<String>>,
    },
    /// Print each agent's recent signals for a market
    Memory {
        #[arg(long)]
        market: String,

        /// Comma-separated agent ids (defaults to the enabled agents)
        #[arg(long, value_delimiter = ',')]
        agents: Option<Vec<String>>,

        /// Signals per agent (at most 5)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summarize LLM spend from a JSON array of usage records or usage params
    Costs {
        #[arg(short, long)]
        input: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UsageInput {
    Record(UsageRecord),
    Params(UsageParams),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = mace::load_config(&cli.config)?;

    let output = match cli.command {
        Command::Plan { agents } => {
            let agents = agents.unwrap_or_else(|| config.agents.enabled.clone());
            let allocation = apply_cost_optimization(&agents, &config.cost);
            serde_json::to_value(create_cost_optimization_audit_entry(&allocation))?
        }
        Command::Memory {
            market,
            agents,
            limit,
        } => {
            let agents = agents.unwrap_or_else(|| config.agents.enabled.clone());
            let service =
                mace::build_memory_service(&config).context("Failed to build memory service")?;
            let limit = limit.unwrap_or(service.default_limit());
            let memories: BTreeMap<_, _> = service
                .get_all_agent_memories(&market, &agents, limit)
                .await
                .into_iter()
                .collect();
            serde_json::json!({
                "market_id": market,
                "memories": memories,
                "retrievals": service.log().snapshot(),
            })
        }
        Command::Costs { input } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read input: {input}"))?;
            let entries: Vec<UsageInput> =
                serde_json::from_str(&raw).context("Failed to parse usage JSON")?;
            let records = entries
                .into_iter()
                .map(|entry| match entry {
                    UsageInput::Record(record) => Ok(record),
                    UsageInput::Params(params) => record_usage(params),
                })
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to price usage")?;

            let total_cost: rust_decimal::Decimal = records.iter().map(|r| r.total_cost).sum();
            serde_json::json!({
                "invocations": records.len(),
                "total_cost": total_cost,
                "by_provider": get_costs_by_provider(&records),
                "nova": get_nova_cost_breakdown(&records),
            })
        }
    };

    // Output as JSON to stdout
    let output = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{output}");

    Ok(())
}

//! Chainform Simulator
//!
//! Scatter free agents, elect a seed and run until the chain settles.
//!
//! ```text
//! chainform-sim [AGENTS] [--config PATH] [--shape NAME] [--insertion] [--json]
//! ```

use std::env;
use std::fs;

use chainform_formation::ShapePreset;
use chainform_sim::{DVec2, Environment, RecruitmentMode, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainform_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = SimulationConfig::default();
    let mut agents: Option<usize> = None;
    let mut shape: Option<ShapePreset> = None;
    let mut insertion = false;
    let mut json = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                config = SimulationConfig::from_json(&fs::read_to_string(path)?)?;
            }
            "--shape" => {
                let name = args.next().ok_or("--shape needs a name")?;
                shape = Some(name.parse()?);
            }
            "--insertion" => insertion = true,
            "--json" => json = true,
            other => agents = Some(other.parse().map_err(|_| format!("unexpected argument '{other}'"))?),
        }
    }

    // Flags win over the config file
    if let Some(count) = agents {
        config = config.with_free_agents(count);
    }
    if let Some(shape) = shape {
        config = config.with_shape(shape);
    }
    if insertion {
        config = config.with_recruitment(RecruitmentMode::Insertion);
    }

    if !json {
        println!("Chainform Simulator");
        println!("===================");
        println!();
        println!(
            "Forming a {} from {} agents ({:?} recruitment)...",
            config.formation.shape, config.free_agents, config.recruitment
        );
    }

    let mut env = Environment::new(config)?;
    env.populate();
    let seed = env.form_up(DVec2::ZERO)?;
    let report = env.run()?;

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!();
    println!("Run complete:");
    println!("  Status: {:?}", report.status);
    println!("  Ticks: {}", report.ticks);
    println!("  Seed: {}", seed);
    println!("  Chain length: {}", report.chain_length);
    println!("  Free agents left: {}", report.free_agents);
    println!("  Formation version: {}", report.version);
    println!("  Messages: {} forwarded, {} dropped", report.messages_forwarded, report.packets_dropped);
    println!("  Events: {}", env.events().len());
    println!();
    for agent in report.agents.iter().filter(|a| a.attached) {
        println!(
            "  {:>4}  ({:+.3}, {:+.3})  error {:.4}  travelled {:.3}  settled {}",
            agent.id,
            agent.position.x,
            agent.position.y,
            agent.error,
            agent.distance_travelled,
            agent.converged_at.map_or_else(|| "-".to_string(), |t| t.to_string()),
        );
    }

    Ok(())
}

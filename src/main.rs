// Lineup optimizer entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr; stdout carries the lineup tables)
// 2. Load config (path from argv, or config/optimizer.toml seeded from defaults/)
// 3. Load the slate CSVs
// 4. Build settings from the [request] section
// 5. Run the optimizer
// 6. Print the report

use lineup_optimizer::config;
use lineup_optimizer::optimizer::{self, OptimizationReport};
use lineup_optimizer::slate;

use anyhow::Context;
use std::path::Path;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Lineup optimizer starting up");

    // 2. Load config
    let config = match std::env::args().nth(1) {
        Some(path) => config::load_config_from_path(Path::new(&path))
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => config::load_config(Path::new(".")).context("failed to load configuration")?,
    };
    info!(
        "Config loaded: contest={}, strategy={}, {} lineups requested",
        config.request.contest, config.request.strategy, config.request.num_lineups
    );

    // 3. Load the slate CSVs
    let (players, opponents) =
        slate::load_slate(&config.data).context("failed to load slate data")?;
    info!(
        "Loaded {} scored players across {} scheduled teams",
        players.len(),
        opponents.len()
    );

    // 4. Build settings from the [request] section
    let settings = config
        .request
        .to_settings()
        .context("failed to build optimization settings")?;

    // 5. Run the optimizer
    let report = optimizer::optimize(
        &players,
        &opponents,
        &settings,
        &config.heuristics,
        &config.solver,
    )
    .context("optimization request was malformed")?;

    // 6. Print the report
    print_report(&report);
    info!("Lineup optimizer finished");
    Ok(())
}

fn print_report(report: &OptimizationReport) {
    if report.lineups.is_empty() {
        println!("No lineups could be generated.");
        if let Some(reason) = &report.reason {
            println!("Reason: {reason}");
        }
        println!("\nPrepared pool by position ({} players total):", report.pool_size);
        for (position, count) in &report.position_counts {
            println!("  {:<4} {}", position.display_str(), count);
        }
        if report.drops.total() > 0 {
            println!(
                "\nDropped during preparation: {} (quality {}, projection {}, salary {}, \
                 team total {}, chalk {})",
                report.drops.total(),
                report.drops.no_quality,
                report.drops.no_projection,
                report.drops.bad_salary,
                report.drops.low_team_total,
                report.drops.chalk
            );
        }
        return;
    }

    for lineup in &report.lineups {
        let label = match lineup.lineup_number {
            -1 => "Baseline: best quality score".to_string(),
            -2 => "Baseline: best projection".to_string(),
            n => format!("Lineup {n}"),
        };
        println!("\n=== {label} ===");
        println!(
            "{:<5} {:<24} {:<5} {:>7} {:>7} {:>6} {:>6}",
            "Slot", "Player", "Team", "Salary", "Score", "Proj", "Own%"
        );
        for slot in &lineup.players {
            let position = if slot.is_captain {
                "CPT".to_string()
            } else {
                slot.position.display_str().to_string()
            };
            println!(
                "{:<5} {:<24} {:<5} {:>7} {:>7.2} {:>6.1} {:>5.1}%",
                position,
                slot.name,
                slot.team,
                slot.effective_salary(),
                slot.effective_quality(),
                slot.effective_points(),
                slot.ownership * 100.0
            );
        }
        println!(
            "Total: salary {} | score {:.2} | projection {:.1} | avg ownership {:.1}%",
            lineup.total_salary,
            lineup.projected_score,
            lineup.projected_points,
            lineup.avg_ownership * 100.0
        );
    }

    if !report.relaxed_ranks.is_empty() {
        println!(
            "\nNote: elite appearance windows at ranks {:?} were lifted to solve the portfolio.",
            report.relaxed_ranks
        );
    }
    if report.used_fallback {
        println!("Note: the joint portfolio model was unsolvable; lineups were generated one at a time.");
    }
    if let Some(reason) = &report.reason {
        println!("\nWarning: {reason}");
    }
}

/// Initialize tracing to stderr so the lineup tables on stdout stay clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lineup_optimizer=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use glate_core::config::MAX_INTERVAL_SECS;
use glate_core::decay::{remaining_amount, time_until_clearance};
use glate_core::status::{format_elapsed, project};
use glate_core::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "glate")]
#[command(about = "Supplement stack advisor with metabolic decay tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Substance definitions JSON file (overrides config)
    #[arg(long, global = true)]
    substances: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a substance can be taken alongside active doses
    Check {
        /// Substance to take now
        #[arg(long)]
        proposed: String,

        /// Active dose as SUBSTANCE:MG[:MINUTES_AGO] (repeatable)
        #[arg(long = "dose", value_parser = parse_dose)]
        doses: Vec<DoseArg>,
    },

    /// Compute remaining amount after a given time
    Decay {
        #[arg(long)]
        amount: f64,

        /// Half-life in hours
        #[arg(long)]
        half_life: f64,

        #[arg(long, default_value_t = 0)]
        elapsed_minutes: i64,

        /// Also report time until the amount drops to this level
        #[arg(long)]
        target: Option<f64>,
    },

    /// List known substances
    Substances,

    /// Track a user's doses and run the background monitor
    Session {
        #[arg(long)]
        user: String,

        /// Dose as SUBSTANCE:MG[:MINUTES_AGO] (repeatable)
        #[arg(long = "dose", value_parser = parse_dose)]
        doses: Vec<DoseArg>,

        /// Scan interval (defaults to monitor.interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many scans instead of waiting for Ctrl+C
        #[arg(long)]
        ticks: Option<u32>,
    },
}

#[derive(Clone, Debug)]
struct DoseArg {
    substance_id: String,
    amount_mg: f64,
    ago: Duration,
}

impl DoseArg {
    fn into_dose(self, now: chrono::DateTime<Utc>) -> Result<ActiveDose> {
        let ingested_at = now.checked_sub_signed(self.ago).ok_or_else(|| {
            Error::Other(format!(
                "dose of '{}' is too far from the current time",
                self.substance_id
            ))
        })?;
        Ok(ActiveDose::new(self.substance_id, self.amount_mg, ingested_at))
    }
}

fn parse_dose(s: &str) -> std::result::Result<DoseArg, String> {
    let mut parts = s.split(':');
    let substance_id = parts.next().unwrap_or_default().trim();
    if substance_id.is_empty() {
        return Err(format!("missing substance in '{}'", s));
    }

    let amount_mg = parts
        .next()
        .ok_or_else(|| format!("missing amount in '{}' (expected SUBSTANCE:MG[:MINUTES_AGO])", s))?
        .parse::<f64>()
        .map_err(|e| format!("invalid amount in '{}': {}", s, e))?;
    if !(amount_mg > 0.0) {
        return Err(format!("amount must be positive in '{}'", s));
    }

    let minutes_ago = match parts.next() {
        Some(m) => m
            .parse::<i64>()
            .map_err(|e| format!("invalid minutes in '{}': {}", s, e))?,
        None => 0,
    };
    let ago = Duration::try_minutes(minutes_ago)
        .ok_or_else(|| format!("minutes out of range in '{}'", s))?;

    if parts.next().is_some() {
        return Err(format!("too many fields in '{}'", s));
    }

    Ok(DoseArg {
        substance_id: substance_id.to_string(),
        amount_mg,
        ago,
    })
}

fn main() -> Result<()> {
    glate_core::logging::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(path) = cli.substances {
        config.catalog.path = Some(path);
    }

    let catalog = config.load_catalog()?;
    tracing::debug!("Using catalog with {} substances", catalog.substances.len());

    match cli.command {
        Commands::Check { proposed, doses } => cmd_check(catalog, &config, &proposed, doses),
        Commands::Decay {
            amount,
            half_life,
            elapsed_minutes,
            target,
        } => cmd_decay(amount, half_life, elapsed_minutes, target),
        Commands::Substances => cmd_substances(&catalog),
        Commands::Session {
            user,
            doses,
            interval_secs,
            ticks,
        } => cmd_session(catalog, &config, &user, doses, interval_secs, ticks),
    }
}

fn cmd_check(catalog: Arc<Catalog>, config: &Config, proposed: &str, doses: Vec<DoseArg>) -> Result<()> {
    let advisor = Advisor::with_policy(catalog, config.policy.advisor);
    let now = Utc::now();
    let stack = doses
        .into_iter()
        .map(|d| d.into_dose(now))
        .collect::<Result<Vec<_>>>()?;

    let conflicts = advisor.check_safety_at(&stack, proposed, now)?;
    let report = SafetyReport::from(conflicts);

    if report.safe {
        println!("SAFE. No interactions detected.");
        return Ok(());
    }

    println!("BLOCKED! Conflicts detected:");
    for c in &report.conflicts {
        println!("   [{}] {} -> {}", c.kind, c.substance_a, c.substance_b);
        println!("   Reason: {}", c.reason);
        println!("   Please wait {} before taking.", format_elapsed(c.wait_time));
    }

    Ok(())
}

fn cmd_decay(amount: f64, half_life: f64, elapsed_minutes: i64, target: Option<f64>) -> Result<()> {
    if !(half_life > 0.0) {
        return Err(Error::Other("half-life must be positive".into()));
    }

    let elapsed = Duration::try_minutes(elapsed_minutes)
        .ok_or_else(|| Error::Other(format!("elapsed minutes {} out of range", elapsed_minutes)))?;
    let remaining = remaining_amount(amount, half_life, elapsed);
    println!(
        "Remaining: {:.2}mg of {:.2}mg after {}",
        remaining,
        amount,
        format_elapsed(elapsed)
    );

    if let Some(target) = target {
        if !(target > 0.0) {
            return Err(Error::Other("target must be positive".into()));
        }
        let wait = time_until_clearance(remaining, target, half_life);
        println!("Time until {:.2}mg: {}", target, format_elapsed(wait));
    }

    Ok(())
}

fn cmd_substances(catalog: &Catalog) -> Result<()> {
    for def in catalog.sorted() {
        println!(
            "{:<22} {:<24} {:<10} t½={}h  rules={}",
            def.id,
            def.name,
            format!("{:?}", def.category),
            def.half_life_hours,
            def.interactions.len()
        );
    }
    Ok(())
}

fn cmd_session(
    catalog: Arc<Catalog>,
    config: &Config,
    user: &str,
    doses: Vec<DoseArg>,
    interval_secs: Option<u64>,
    ticks: Option<u32>,
) -> Result<()> {
    let ledger: Arc<dyn DoseLedger> = Arc::new(InMemoryLedger::new());
    let lookup: Arc<dyn DefinitionLookup> = catalog;

    let now = Utc::now();
    for dose in doses {
        ledger.append(user, dose.into_dose(now)?);
    }

    println!("Status for {}:", user);
    for row in project(ledger.as_ref(), lookup.as_ref(), user, now) {
        println!(
            "   • {:<24} | Original: {:.0}mg | Current: {:.1}mg | Elapsed: {}",
            row.substance, row.original_mg, row.current_mg, row.time_elapsed
        );
    }

    let interval = match interval_secs {
        Some(secs) if secs == 0 || secs > MAX_INTERVAL_SECS => {
            return Err(Error::Config(format!(
                "--interval-secs must be between 1 and {}",
                MAX_INTERVAL_SECS
            )))
        }
        Some(secs) => std::time::Duration::from_secs(secs),
        None => config.monitor.interval(),
    };

    let budget = match ticks {
        Some(n) => Some(
            interval
                .checked_mul(n)
                .and_then(|d| d.checked_add(interval / 2))
                .ok_or_else(|| Error::Config(format!("{} ticks of {:?} is too long", n, interval)))?,
        ),
        None => None,
    };

    let monitor = Arc::new(Monitor::with_policy(
        ledger,
        lookup,
        config.monitor.clone(),
        config.policy.monitor,
    ));

    let runtime = tokio::runtime::Runtime::new()?;
    let metrics = runtime.block_on(async move {
        let handle = monitor.start(interval)?;

        match budget {
            Some(budget) => tokio::time::sleep(budget).await,
            None => {
                println!("Monitoring every {:?}. Press Ctrl+C to stop.", interval);
                tokio::signal::ctrl_c().await?;
            }
        }

        handle.stop().await
    })?;

    println!("Monitor stopped: {}", metrics.summary());
    Ok(())
}

//! Command-line interface for the Siren escalation engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use siren_core::alert::{Alert, AlertId, DeliveryResult};
use siren_core::bus::{EventBus, SirenEvent};
use siren_core::config::env_vars;
use siren_core::policy::{EscalationPolicy, NotifyMethod, PolicyId};
use siren_core::simulate::simulate_policy;
use siren_core::tenant::TenantRef;
use siren_engine::{EngineConfig, EscalationEngine};
use siren_notify::{registry_from_configs, ChannelRegistry, ConsoleChannel};
use siren_storage::{RedbAlertStore, RedbEventLog, RedbPolicyStore, RedbTenantDirectory};

/// Siren - multi-tenant alert escalation engine.
#[derive(Parser, Debug)]
#[command(name = "siren")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Directory holding the alert, policy, and event databases.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the escalation engine until interrupted.
    Run {
        /// Seconds between escalation scans.
        #[arg(long)]
        tick_interval_secs: Option<u64>,
        /// JSON file with notification channel configurations.
        #[arg(long)]
        channels: Option<PathBuf>,
    },
    /// Print the escalation timeline of a policy file without touching state.
    Simulate {
        /// Path to the policy JSON file.
        #[arg(long, required = true)]
        policy: PathBuf,
        /// Emit the timeline as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Escalation policy management.
    Policy {
        #[command(subcommand)]
        policy_cmd: PolicyCommand,
    },
    /// Tenant registration.
    Tenant {
        #[command(subcommand)]
        tenant_cmd: TenantCommand,
    },
    /// Alert intake and acknowledgment.
    Alert {
        #[command(subcommand)]
        alert_cmd: AlertCommand,
    },
    /// Show the escalation history of a tenant.
    Events {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Restrict to a single alert id.
        #[arg(long)]
        alert: Option<String>,
        /// Maximum number of events to print.
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Store a policy from a JSON file.
    Add {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Path to the policy JSON file.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// List a tenant's policies.
    List {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
    },
    /// Show one policy as JSON.
    Show {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Policy id.
        #[arg(required = true)]
        id: String,
    },
    /// Delete a policy.
    Delete {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Policy id.
        #[arg(required = true)]
        id: String,
    },
    /// Validate a policy file without storing it.
    Validate {
        /// Path to the policy JSON file.
        #[arg(required = true)]
        file: PathBuf,
    },
}

/// Tenant subcommands.
#[derive(Subcommand, Debug)]
enum TenantCommand {
    /// Register a tenant.
    Add {
        /// Tenant key (e.g. "acme").
        #[arg(required = true)]
        key: String,
    },
    /// List registered tenants.
    List,
}

/// Alert subcommands.
#[derive(Subcommand, Debug)]
enum AlertCommand {
    /// Open a new alert.
    Open {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Alert title.
        #[arg(required = true)]
        title: String,
        /// Escalation policy id to bind.
        #[arg(long)]
        policy: Option<String>,
    },
    /// Acknowledge an open alert, stopping further escalation.
    Ack {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Alert id.
        #[arg(required = true)]
        id: String,
        /// Who is acknowledging.
        #[arg(long, default_value = "cli")]
        by: String,
    },
    /// List a tenant's alerts.
    List {
        /// Tenant key.
        #[arg(long, required = true)]
        tenant: String,
        /// Only alerts the engine would still scan.
        #[arg(long)]
        escalatable: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Build the env filter for log level control
    let default_directive = if args.verbose { "siren=debug" } else { "siren=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(default_directive)
            .add_directive(tracing::Level::WARN.into())
    });

    if env_vars::log_json() {
        // JSON format for production/container environments
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        // Human-readable format for development
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }

    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(env_vars::data_dir()));

    match args.command {
        Command::Run {
            tick_interval_secs,
            channels,
        } => run_engine(&data_dir, tick_interval_secs, channels).await,
        Command::Simulate { policy, json } => run_simulate(&policy, json),
        Command::Policy { policy_cmd } => run_policy_cmd(&data_dir, policy_cmd),
        Command::Tenant { tenant_cmd } => run_tenant_cmd(&data_dir, tenant_cmd),
        Command::Alert { alert_cmd } => run_alert_cmd(&data_dir, alert_cmd),
        Command::Events {
            tenant,
            alert,
            limit,
        } => run_events(&data_dir, &tenant, alert.as_deref(), limit),
    }
}

/// Run the escalation engine until Ctrl-C.
async fn run_engine(
    data_dir: &Path,
    tick_interval_secs: Option<u64>,
    channels: Option<PathBuf>,
) -> Result<()> {
    let config = match tick_interval_secs {
        Some(0) => anyhow::bail!("Tick interval must be at least 1 second"),
        Some(secs) => EngineConfig {
            tick_interval: Duration::from_secs(secs),
        },
        None => EngineConfig::from_env(),
    };

    let tenants = Arc::new(RedbTenantDirectory::open(data_dir)?);
    let alerts = Arc::new(RedbAlertStore::open(data_dir)?);
    let policies = Arc::new(RedbPolicyStore::open(data_dir)?);
    let events = Arc::new(RedbEventLog::open(data_dir)?);

    let registry = match channels {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            let configs: Vec<serde_json::Value> = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            registry_from_configs(&configs).await?
        }
        None => default_registry().await,
    };

    let engine = EscalationEngine::new(config, tenants, alerts, policies, events, Arc::new(registry));
    engine.start()?;

    println!("Siren escalation engine");
    println!("=======================");
    println!();
    println!("Data directory: {}", data_dir.display());
    println!("Tick interval:  {}s", engine.tick_interval().as_secs());
    println!();
    println!("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    println!();
    println!("Shutting down...");
    engine.stop().await?;

    let stats = engine.stats();
    println!("Ticks completed:   {}", stats.ticks_completed);
    println!("Alerts scanned:    {}", stats.alerts_scanned);
    println!("Escalations:       {}", stats.escalations_total);
    println!("Delivery failures: {}", stats.delivery_failures);
    Ok(())
}

/// Console channel for every method, so `run` works out of the box.
async fn default_registry() -> ChannelRegistry {
    let registry = ChannelRegistry::new();
    for method in NotifyMethod::all() {
        let channel = ConsoleChannel::new(format!("console_{}", method), method);
        registry.register(Arc::new(channel)).await;
    }
    registry
}

/// Print the projected escalation timeline of a policy file.
fn run_simulate(path: &Path, json: bool) -> Result<()> {
    let policy = read_policy_file(path)?;
    policy
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid policy: {}", e))?;
    let report = simulate_policy(&policy);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Escalation timeline: {}", report.policy_name);
    println!("=======================================");
    println!();
    if report.timeline.is_empty() {
        println!("  (no tiers; this policy never escalates)");
        return Ok(());
    }
    for entry in &report.timeline {
        let methods: Vec<&str> = entry.notify_via.iter().map(|m| m.as_str()).collect();
        let targets: Vec<&str> = entry.targets.iter().map(|t| t.as_str()).collect();
        println!(
            "  t+{:>4}m  tier {}  via {}  -> {}",
            entry.fires_after_minutes,
            entry.tier_number,
            methods.join(","),
            targets.join(", ")
        );
    }
    if report.repeat_count > 0 {
        println!();
        println!(
            "  then the cycle repeats from tier {} ({} repeat(s) configured)",
            report.timeline[0].tier_number, report.repeat_count
        );
    }
    Ok(())
}

fn run_policy_cmd(data_dir: &Path, cmd: PolicyCommand) -> Result<()> {
    match cmd {
        PolicyCommand::Add { tenant, file } => {
            let policy = read_policy_file(&file)?;
            policy
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid policy: {}", e))?;
            let store = RedbPolicyStore::open(data_dir)?;
            store.put(&TenantRef::from(tenant), &policy)?;
            println!("Stored policy '{}' ({})", policy.name, policy.id);
            Ok(())
        }
        PolicyCommand::List { tenant } => {
            let store = RedbPolicyStore::open(data_dir)?;
            let policies = store.list(&TenantRef::from(tenant))?;
            if policies.is_empty() {
                println!("No policies.");
                return Ok(());
            }
            for policy in policies {
                println!(
                    "{}  {}  ({} tier(s), repeat {})",
                    policy.id,
                    policy.name,
                    policy.tiers.len(),
                    policy.repeat_count
                );
            }
            Ok(())
        }
        PolicyCommand::Show { tenant, id } => {
            let policy_id = PolicyId::from_string(&id)?;
            let store = RedbPolicyStore::open(data_dir)?;
            match store.get(&TenantRef::from(tenant), &policy_id)? {
                Some(policy) => {
                    println!("{}", serde_json::to_string_pretty(&policy)?);
                    Ok(())
                }
                None => anyhow::bail!("Policy not found: {}", id),
            }
        }
        PolicyCommand::Delete { tenant, id } => {
            let policy_id = PolicyId::from_string(&id)?;
            let store = RedbPolicyStore::open(data_dir)?;
            if store.delete(&TenantRef::from(tenant), &policy_id)? {
                println!("Deleted policy {}", id);
            } else {
                println!("Policy not found: {}", id);
            }
            Ok(())
        }
        PolicyCommand::Validate { file } => {
            let policy = read_policy_file(&file)?;
            policy
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid policy: {}", e))?;
            println!("Policy '{}' is valid ({} tier(s))", policy.name, policy.tiers.len());
            Ok(())
        }
    }
}

fn run_tenant_cmd(data_dir: &Path, cmd: TenantCommand) -> Result<()> {
    let directory = RedbTenantDirectory::open(data_dir)?;
    match cmd {
        TenantCommand::Add { key } => {
            if directory.register(&key)? {
                println!("Registered tenant '{}'", key);
            } else {
                println!("Tenant '{}' is already registered", key);
            }
        }
        TenantCommand::List => {
            let tenants = directory.list()?;
            if tenants.is_empty() {
                println!("No tenants registered.");
            }
            for tenant in tenants {
                println!("{}", tenant);
            }
        }
    }
    Ok(())
}

fn run_alert_cmd(data_dir: &Path, cmd: AlertCommand) -> Result<()> {
    match cmd {
        AlertCommand::Open {
            tenant,
            title,
            policy,
        } => {
            let directory = RedbTenantDirectory::open(data_dir)?;
            let tenant = TenantRef::from(tenant);
            if !directory.contains(tenant.as_str())? {
                anyhow::bail!(
                    "Unknown tenant '{}' (register it with `siren tenant add`)",
                    tenant
                );
            }

            let policy_id = match policy {
                Some(raw) => {
                    let id = PolicyId::from_string(&raw)?;
                    let policies = RedbPolicyStore::open(data_dir)?;
                    if policies.get(&tenant, &id)?.is_none() {
                        anyhow::bail!("Policy not found for tenant '{}': {}", tenant, raw);
                    }
                    Some(id)
                }
                None => None,
            };

            let store = RedbAlertStore::open(data_dir)?;
            let alert = Alert::open(tenant, title, policy_id);
            store.insert(&alert)?;
            println!("Opened alert {}", alert.id);
            if policy_id.is_none() {
                println!("Note: no policy bound; this alert will never escalate.");
            }
        }
        AlertCommand::Ack { tenant, id, by } => {
            let store = RedbAlertStore::open(data_dir)?;
            let tenant = TenantRef::from(tenant);
            let alert_id = AlertId::from_string(&id)?;
            let alert = store.acknowledge(&tenant, &alert_id, &by)?;

            // Advisory signal. A co-resident engine sees it immediately;
            // an engine in another process picks the status up on its
            // next scan, which is the authoritative check either way.
            let bus = EventBus::default();
            bus.publish(SirenEvent::acknowledged(tenant, alert_id, by));

            println!(
                "Acknowledged '{}' (was at tier {})",
                alert.title, alert.current_tier
            );
        }
        AlertCommand::List { tenant, escalatable } => {
            let store = RedbAlertStore::open(data_dir)?;
            let tenant = TenantRef::from(tenant);
            let alerts = if escalatable {
                store.list_escalatable(&tenant)?
            } else {
                store.list(&tenant)?
            };
            if alerts.is_empty() {
                println!("No alerts.");
                return Ok(());
            }
            for alert in alerts {
                println!(
                    "{}  [{}]  tier {}  {}  {}",
                    alert.id,
                    alert.status,
                    alert.current_tier,
                    alert.created_at.format("%Y-%m-%d %H:%M"),
                    alert.title
                );
            }
        }
    }
    Ok(())
}

fn run_events(data_dir: &Path, tenant: &str, alert: Option<&str>, limit: usize) -> Result<()> {
    let log = RedbEventLog::open(data_dir)?;
    let tenant = TenantRef::from(tenant);
    let events = match alert {
        Some(raw) => {
            let alert_id = AlertId::from_string(raw)?;
            let mut events = log.list_for_alert(&tenant, &alert_id)?;
            events.truncate(limit);
            events
        }
        None => log.list_recent(&tenant, limit)?,
    };

    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }
    for event in events {
        let delivery = match &event.delivery {
            Some(DeliveryResult::Delivered) => "delivered".to_string(),
            Some(DeliveryResult::Failed { reason }) => format!("failed: {}", reason),
            None => "-".to_string(),
        };
        println!(
            "{}  alert {}  tier {}  via {}  [{}]",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.alert_id,
            event.tier,
            event.method,
            delivery
        );
    }
    Ok(())
}

fn read_policy_file(path: &Path) -> Result<EscalationPolicy> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let policy: EscalationPolicy = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    Ok(policy)
}

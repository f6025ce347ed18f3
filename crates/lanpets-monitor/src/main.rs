//! Wires every collector crate into one supervised process: loads
//! `lanpets.toml`, opens the store, builds a worker for each configured
//! collector, and hands them to [`lanpets_runtime::Supervisor`] until
//! `SIGINT` or a fatal store error brings everything down.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::MonitorConfig;
use lanpets_mdns::MdnsBrowser;
use lanpets_nmap::NmapBridge;
use lanpets_petai::PetAi;
use lanpets_pinger::Pinger;
use lanpets_runtime::{Supervisor, Worker};
use lanpets_snmp::SnmpPoller;
use lanpets_store::Store;
use lanpets_tplink::TpLinkScraper;

#[derive(Debug, Parser)]
#[command(name = "monitor", about = "LAN pets monitoring daemon")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "LANPETS_CONFIG", default_value = "lanpets.toml")]
    config: PathBuf,

    /// Raise the default log level to debug.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = MonitorConfig::load(&cli.config).unwrap_or_else(|error| {
        tracing::error!(error = %error, "failed to load configuration");
        std::process::exit(1);
    });

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("create data directory");
        }
    }

    let store = Store::new(config.db_path.clone());
    store.ensure_schema().expect("initialize sqlite schema");

    let hard_coded = config.hard_coded_interfaces();
    let mut workers: Vec<(Arc<dyn Worker>, Duration)> = Vec::new();

    let pinger = Pinger::new(store.clone(), hard_coded.clone(), config.pinger.clone()).expect("create icmp client");
    workers.push((Arc::new(pinger), Duration::from_secs(config.pinger.update_period_sec)));

    workers.push((
        Arc::new(MdnsBrowser::new(store.clone(), config.mdns.clone())),
        Duration::from_secs(config.mdns.time_between_updates_sec),
    ));

    workers.push((
        Arc::new(PetAi::new(store.clone(), hard_coded.clone(), config.pet_ai.clone())),
        Duration::from_secs(config.pet_ai.update_period_sec),
    ));

    match config.tplink.clone() {
        Some(tplink) => {
            let period = Duration::from_secs(tplink.update_period_sec as u64);
            workers.push((Arc::new(TpLinkScraper::new(store.clone(), hard_coded.clone(), tplink)), period));
        }
        None => tracing::info!("tplink collector disabled: no [tplink] section in config"),
    }

    match config.nmap.clone() {
        Some(nmap) => {
            let period = Duration::from_secs(nmap.time_between_scans_sec);
            workers.push((Arc::new(NmapBridge::new(store.clone(), nmap)), period));
        }
        None => tracing::info!("nmap collector disabled: no [nmap] section in config"),
    }

    match config.snmp.clone() {
        Some(snmp) => {
            let period = Duration::from_secs(snmp.time_between_scans_sec);
            workers.push((Arc::new(SnmpPoller::new(store.clone(), hard_coded.clone(), snmp)), period));
        }
        None => tracing::info!("snmp collector disabled: no [snmp] section in config"),
    }

    tracing::info!(workers = workers.len(), db_path = %config.db_path.display(), "starting supervisor");
    let supervisor = Supervisor::new();
    supervisor.run(workers).await;
    tracing::info!("all collectors stopped, exiting");
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

//! egressmgrd - egress NAT manager daemon
//!
//! Keeps the pod egress translation rule installed for each enabled address
//! family and sweeps superseded rule variants left behind by upgrades.

use std::process::ExitCode;
use std::time::Duration;

use router_common::{defaults, AddressFamily, IptablesCmd, RouteMgr, RouteMgrResult};
use router_egressmgrd::{EgressConfig, EgressMgr};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting egressmgrd (Rust) ---");

    let configs = match configs_from_env() {
        Ok(configs) => configs,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut managers: Vec<EgressMgr<IptablesCmd>> = configs
        .iter()
        .map(|config| EgressMgr::new(config, IptablesCmd::new(config.family)))
        .collect();

    let cleanup_on_exit = std::env::var_os("CLEANUP_ON_EXIT").is_some();
    let mut tick = tokio::time::interval(Duration::from_millis(defaults::TICK_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                for mgr in &mut managers {
                    let family = mgr.family();
                    if let Err(e) = mgr.reconcile().await {
                        warn!(%family, "Egress reconciliation failed, retrying next tick: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    if cleanup_on_exit {
        for mgr in &managers {
            if let Err(e) = mgr.delete_egress_rule().await {
                warn!("Egress rule cleanup failed: {}", e);
            }
        }
    }

    ExitCode::SUCCESS
}

/// Builds one configuration snapshot per enabled address family from the
/// environment the surrounding controller hands down.
fn configs_from_env() -> RouteMgrResult<Vec<EgressConfig>> {
    let v4_addr = std::env::var("EGRESS_SOURCE_ADDR").ok();
    let mut configs = vec![EgressConfig::new(AddressFamily::Ipv4, v4_addr.as_deref())?];

    if std::env::var_os("ENABLE_IPV6").is_some() {
        let v6_addr = std::env::var("EGRESS_SOURCE_ADDR6").ok();
        configs.push(EgressConfig::new(AddressFamily::Ipv6, v6_addr.as_deref())?);
    }

    Ok(configs)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

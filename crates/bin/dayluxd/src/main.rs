//! # dayluxd: daylight lighting daemon
//!
//! Composition root that wires the adapters into the lighting controller.
//!
//! ## Responsibilities
//! - Load configuration (`daylux.toml`, environment overrides)
//! - Install the tracing subscriber
//! - Read the policy document
//! - Construct the lookup, probe and bulb adapters
//! - Deploy the policy and start the control loops
//! - Reload the policy on SIGHUP, stop gracefully on SIGTERM, SIGINT or SIGUSR1
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;
mod logging;
mod policy_file;
mod signals;

use anyhow::Context;

use daylux_adapter_http_reqwest::{GeoIpClient, SunriseSunsetClient};
use daylux_adapter_ping::PingProbe;
use daylux_adapter_virtual::VirtualBulbs;
use daylux_app::Controller;
use daylux_app::ports::{BulbTransport, GeoLookup, ReachabilityProbe, SolarLookup};

use crate::config::Config;
use crate::signals::{Request, Signals};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    logging::init(&config.logging)?;
    let mut signals = Signals::install();

    let policy = policy_file::load(&config.policy.path)?;

    // Adapters
    let client = daylux_adapter_http_reqwest::build_client(&config.lookup)
        .context("failed to build HTTP client")?;
    let solar = SunriseSunsetClient::new(client.clone(), &config.lookup.solar_base_url);
    let geo = GeoIpClient::new(client, config.lookup.geo_url.clone());
    let probe = PingProbe::new(&config.probe);
    let bulbs = VirtualBulbs::new(config.virtual_bulbs.bulbs.iter().copied());

    // Controller
    let controller = Controller::new(bulbs, solar, geo, probe, config.controller_settings());
    // the first deploy may wait on slow lookups
    let startup = deploy(&controller, policy);
    tokio::pin!(startup);
    loop {
        tokio::select! {
            () = &mut startup => break,
            request = signals.next() => match request {
                Request::Shutdown => {
                    tracing::info!("shutdown requested during startup");
                    return Ok(());
                }
                Request::Reload => {
                    tracing::info!("policy file is already being deployed, ignoring reload");
                }
            },
        }
    }
    controller.start().await;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        policy = %config.policy.path.display(),
        bulbs = config.virtual_bulbs.bulbs.len(),
        "dayluxd running"
    );

    loop {
        match signals.next().await {
            Request::Shutdown => break,
            Request::Reload => match policy_file::load(&config.policy.path) {
                Ok(policy) => deploy(&controller, policy).await,
                Err(err) => {
                    let err = anyhow::Error::from(err);
                    tracing::warn!(error = %format!("{err:#}"), "policy reload failed, keeping the running policy");
                }
            },
        }
    }

    controller.stop().await;
    Ok(())
}

async fn deploy<T, S, G, P>(
    controller: &Controller<T, S, G, P>,
    policy: daylux_domain::policy::RawPolicy,
) where
    T: BulbTransport + 'static,
    S: SolarLookup + 'static,
    G: GeoLookup + 'static,
    P: ReachabilityProbe + 'static,
{
    match controller.deploy_policy(policy).await {
        Ok(compiled) => tracing::info!(
            date = %compiled.date,
            rules = compiled.rule_count(),
            "policy deployed"
        ),
        Err(err) => {
            let err = anyhow::Error::from(err);
            tracing::error!(error = %format!("{err:#}"), "failed to deploy policy");
        }
    }
}

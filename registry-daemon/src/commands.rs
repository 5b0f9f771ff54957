//! `run` and `distribute` (spec §6 "Operator CLI surface"), grounded on
//! the teacher's omnibus `main` for the config/logging plumbing and on
//! `aleph_nodestatus.commands`'s `main`/`distribute` for the command
//! shapes themselves (continuous snapshot publish vs. a one-shot
//! integration pass with an `act`/`testnet` mode discriminator).

use anyhow::{bail, Result};
use node_ingest::{BalanceIngester, MessageIngester, ReplayBalanceIngester, ReplayMessageIngester};
use registry_cache::{chain_event_key, DurableCache};
use registry_common::event::Event;
use registry_common::{Address, RegistryConfig};
use registry_publish::{
    DistributionPost, DistributionStatus, LoggingPublisher, NoopTransferBatcher, Publisher, PublishedSnapshot, TransferBatcher,
};
use registry_state::RegistryState;
use reward_integrator::RewardIntegrator;
use tracing::info;

use crate::eventlog;
use crate::settings::DaemonSettings;

const INGEST_CURSOR_PREFIX: &str = "ingest_cursor";
const INGEST_CURSOR_KEY: &str = "height";

/// Continuous snapshot publish (spec §2 step 4, §6). Mirrors `status.py`'s
/// main loop: each pass asks every ingester for history newer than the
/// state machine's own watermark, merges what comes back, applies it, and
/// publishes a snapshot on every state-changing event. The durable cache
/// records the last height actually published so a restart resumes instead
/// of re-publishing from height zero.
///
/// The balance/message ingesters here are out of scope for the core (spec
/// §1) — `ReplayBalanceIngester`/`ReplayMessageIngester` stand in for a
/// live chain follower, seeded from the archived event log, and naturally
/// exhaust after one pass instead of polling forever.
pub async fn run(config: &RegistryConfig, settings: &DaemonSettings) -> Result<()> {
    let cache = DurableCache::open(&settings.cache_path)?;
    let resume_from = cache
        .get_last_available_key(INGEST_CURSOR_PREFIX)?
        .and_then(|k| k.split('_').next().and_then(|s| s.parse::<u64>().ok()))
        .unwrap_or(0);

    let (balance_updates, messages) = eventlog::load_split(&settings.event_log_path)?;
    let mut balance_ingester = ReplayBalanceIngester::new(settings.chain.clone(), balance_updates);
    let mut message_ingester = ReplayMessageIngester::new(messages);

    let publisher = LoggingPublisher;
    let mut state = RegistryState::new(config.clone());
    let mut since = resume_from;
    let mut published = 0u64;

    loop {
        let balances = balance_ingester.poll(since).await?;
        let lifecycle = message_ingester.poll(since).await?;
        if balances.is_empty() && lifecycle.is_empty() {
            break;
        }

        let mut events: Vec<Event> = balances.into_iter().map(Event::Balance).collect();
        events.extend(lifecycle);
        events.sort_by_key(Event::height);

        for event in events {
            let height = event.height();
            since = since.max(height);
            let Some(snapshot) = state.apply(&event) else {
                continue;
            };
            let published_snapshot = PublishedSnapshot::from_snapshot(&snapshot, config.decimals);
            publisher.publish_snapshot(&published_snapshot, &settings.channel).await?;
            cache.store_entry(INGEST_CURSOR_PREFIX, &chain_event_key(height, 0, 0), INGEST_CURSOR_KEY.as_bytes())?;
            published += 1;
        }
    }

    info!(published, resume_from, last_checked_height = state.last_checked_height, "run complete");
    Ok(())
}

/// One-shot reward integration over `[start_height, end_height]` (spec §2
/// step 5, §6). `act` and `testnet` are mutually exclusive; neither means
/// `calculation`, `testnet` means `simulation` routed to the testnet
/// channel, `act` means `distribution` with real batches prepared (never
/// signed or broadcast — spec §1 Non-goals).
pub async fn distribute(
    config: &RegistryConfig,
    settings: &DaemonSettings,
    act: bool,
    testnet: bool,
    start_height: Option<u64>,
    end_height: Option<u64>,
    reward_sender: Option<Address>,
) -> Result<()> {
    if act && testnet {
        bail!("--act and --testnet are mutually exclusive");
    }

    let events = eventlog::load_merged(&settings.event_log_path).await?;
    let end_height = end_height.unwrap_or_else(|| events.iter().map(Event::height).max().unwrap_or(config.reward_start_height));
    let start_height = start_height.unwrap_or(config.reward_start_height);

    let integrator = RewardIntegrator::new(config.clone());
    let distribution = integrator.integrate(events, start_height, end_height);

    let status = if testnet {
        DistributionStatus::Simulation
    } else if act {
        DistributionStatus::Distribution
    } else {
        DistributionStatus::Calculation
    };
    let channel = if testnet { &settings.testnet_channel } else { &settings.channel };

    let targets = if act {
        let sender = reward_sender
            .or_else(|| settings.reward_sender.clone())
            .ok_or_else(|| anyhow::anyhow!("--reward-sender is required with --act"))?;
        let batcher = NoopTransferBatcher;
        batcher.batch(&sender, &settings.chain, &distribution.rewards, config.batch_size).await?
    } else {
        Vec::new()
    };

    let post = DistributionPost {
        incentive: "corechannel".to_string(),
        status,
        start_height: distribution.start_height,
        end_height: distribution.end_height,
        rewards: distribution.rewards,
        targets,
    };

    let publisher = LoggingPublisher;
    publisher.publish_distribution(&post, channel).await?;

    info!(
        start_height = post.start_height,
        end_height = post.end_height,
        recipients = post.rewards.len(),
        status = ?post.status,
        "distribute complete"
    );
    Ok(())
}

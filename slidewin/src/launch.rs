//! Per-rank entry point and the in-process launcher.
//!
//! ```rust,ignore
//! let report = slidewin::launch::run_local(&SlidewinConfig::default(), 2)?;
//! assert_eq!(report.received(1).unwrap(), slidewin::dataset(512).as_slice());
//! ```

use crate::config::SlidewinConfig;
use crate::error::{Result, SlidewinError};
use crate::local::LocalWorld;
use crate::meter::{Clock, MonotonicClock, ThroughputMeter, ThroughputReport};
use crate::role::{Role, RoleOutcome};
use crate::sender::ServeSummary;
use crate::transport::{Rank, Transport};
use std::thread;

#[derive(Debug, Clone)]
pub struct RankReport {
    pub rank: Rank,
    pub outcome: RoleOutcome,
    /// Only the sender measures
    pub throughput: Option<ThroughputReport>,
}

/// Run one participant to completion, including the collective shutdown.
pub fn run_rank<T: Transport>(config: &SlidewinConfig, transport: &mut T) -> Result<RankReport> {
    run_rank_with_clock(config, transport, MonotonicClock::new())
}

/// [`run_rank`] with an explicit clock for the sender's meter.
pub fn run_rank_with_clock<T: Transport, C: Clock>(
    config: &SlidewinConfig,
    transport: &mut T,
    clock: C,
) -> Result<RankReport> {
    let params = config.protocol_params()?;
    let topology = config.topology(transport.size())?;
    // Every rank rejects the frame size, not just the one that would send it.
    let limit = transport.max_message_len();
    if params.frame_len() > limit {
        return Err(SlidewinError::config(format!(
            "frame of {} elements exceeds the transport limit of {}",
            params.frame_len(),
            limit
        )));
    }
    let rank = transport.rank();
    let role = Role::for_rank(rank, &topology, params, config)?;

    if role.is_sender() {
        let meter = ThroughputMeter::new(clock, params.items());
        let start = meter.start();
        let outcome = role.run(transport)?;
        transport.finalize()?;
        let report = meter.stop(start);
        trace_info!(
            elapsed_secs = report.elapsed_secs(),
            bits_per_sec = report.bits_per_sec(),
            "transfer measured"
        );
        Ok(RankReport {
            rank,
            outcome,
            throughput: Some(report),
        })
    } else {
        let outcome = role.run(transport)?;
        transport.finalize()?;
        Ok(RankReport {
            rank,
            outcome,
            throughput: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LaunchReport {
    /// Indexed by rank
    pub ranks: Vec<RankReport>,
}

impl LaunchReport {
    pub fn throughput(&self) -> Option<&ThroughputReport> {
        self.ranks.iter().find_map(|r| r.throughput.as_ref())
    }

    pub fn summary(&self) -> Option<&ServeSummary> {
        self.ranks.iter().find_map(|r| r.outcome.summary())
    }

    pub fn received(&self, rank: Rank) -> Option<&[i32]> {
        self.ranks.get(rank).and_then(|r| r.outcome.buffer())
    }
}

/// Run `participants` ranks as threads over a [`LocalWorld`].
///
/// The first failing rank's error is returned. Its endpoint is dropped on
/// the way out: receives waiting on that rank fail, and the shutdown barrier
/// fails for everyone else, so the remaining ranks unwind instead of hanging.
pub fn run_local(config: &SlidewinConfig, participants: usize) -> Result<LaunchReport> {
    config.topology(participants)?;
    let world = LocalWorld::new(participants)?;

    let results: Vec<Result<RankReport>> = thread::scope(|scope| {
        let handles: Vec<_> = world
            .into_iter()
            .map(|mut transport| scope.spawn(move || run_rank(config, &mut transport)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(SlidewinError::protocol("participant thread panicked")))
            })
            .collect()
    });

    let mut ranks = Vec::with_capacity(participants);
    let mut root_cause: Option<SlidewinError> = None;
    for result in results {
        match result {
            Ok(report) => ranks.push(report),
            Err(e) => {
                // A failing rank makes its peers fail with Disconnected; keep the cause.
                let replace = match &root_cause {
                    None => true,
                    Some(SlidewinError::Disconnected) => !matches!(e, SlidewinError::Disconnected),
                    Some(_) => false,
                };
                if replace {
                    root_cause = Some(e);
                }
            }
        }
    }
    match root_cause {
        Some(e) => Err(e),
        None => Ok(LaunchReport { ranks }),
    }
}

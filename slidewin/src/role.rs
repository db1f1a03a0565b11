//! Role selection: decided once from the topology, then run to completion.

use crate::config::{SlidewinConfig, Topology};
use crate::error::Result;
use crate::params::{dataset, ProtocolParams};
use crate::receiver::Receiver;
use crate::sender::{ServeSummary, Sender};
use crate::transport::{check_rank, Rank, Transport};

pub enum Role {
    Sender(Sender),
    Receiver(Receiver),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    Served(ServeSummary),
    /// The receiver's filled buffer
    Received(Vec<i32>),
}

impl Role {
    /// Pick the role for `rank`. The sender serves the canonical dataset.
    pub fn for_rank(
        rank: Rank,
        topology: &Topology,
        params: ProtocolParams,
        config: &SlidewinConfig,
    ) -> Result<Self> {
        check_rank(rank, topology.size())?;
        if topology.is_sender(rank) {
            let sender = Sender::new(params, dataset(params.items()))?
                .with_disconnect_limit(config.disconnect_limit(topology))?;
            Ok(Role::Sender(sender))
        } else {
            Ok(Role::Receiver(Receiver::new(params, topology.sender())))
        }
    }

    pub fn is_sender(&self) -> bool {
        matches!(self, Role::Sender(_))
    }

    pub fn run<T: Transport>(&self, transport: &mut T) -> Result<RoleOutcome> {
        match self {
            Role::Sender(sender) => sender.serve(transport).map(RoleOutcome::Served),
            Role::Receiver(receiver) => receiver.run(transport).map(RoleOutcome::Received),
        }
    }
}

impl RoleOutcome {
    pub fn summary(&self) -> Option<&ServeSummary> {
        match self {
            RoleOutcome::Served(summary) => Some(summary),
            RoleOutcome::Received(_) => None,
        }
    }

    pub fn buffer(&self) -> Option<&[i32]> {
        match self {
            RoleOutcome::Received(buffer) => Some(buffer),
            RoleOutcome::Served(_) => None,
        }
    }
}

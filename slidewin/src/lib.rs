//! # slidewin
//!
//! Unacknowledged sliding-window frame transfer between one sender and its
//! receivers over a ranked message-passing transport.
//!
//! ## Protocol
//!
//! - Receiver sends `CONNECT` (1001) to the sender
//! - Sender streams `N / F` frames of `F` integers, in order, no ACKs
//! - Receiver sends `DISCONNECT` (1000) once its buffer is full
//! - Sender measures the whole exchange and reports bits per second
//!
//! ## Transport Trait
//!
//! Roles only see the [`Transport`] trait, so the same code runs over the
//! in-process [`LocalWorld`] and the multi-process [`UdpTransport`]:
//!
//! ```rust,ignore
//! use slidewin::{launch, SlidewinConfig};
//!
//! let report = launch::run_local(&SlidewinConfig::default(), 2)?;
//! println!("{}", report.throughput().unwrap());
//! ```

// Tracing macros - no-op when feature disabled
#[cfg(feature = "tracing")]
macro_rules! trace_debug { ($($arg:tt)*) => { tracing::debug!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug { ($($arg:tt)*) => {} }

#[cfg(feature = "tracing")]
macro_rules! trace_info { ($($arg:tt)*) => { tracing::info!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_info { ($($arg:tt)*) => {} }

#[cfg(feature = "tracing")]
macro_rules! trace_warn { ($($arg:tt)*) => { tracing::warn!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn { ($($arg:tt)*) => {} }

pub mod config;
pub mod error;
pub mod launch;
mod local;
pub mod meter;
mod params;
mod receiver;
mod role;
mod sender;
mod transport;
mod udp;

pub use config::{SlidewinConfig, Topology};
pub use error::{Result, SlidewinError};
pub use local::{LocalTransport, LocalWorld};
pub use meter::{Clock, ManualClock, MeterStart, MonotonicClock, ThroughputMeter, ThroughputReport};
pub use params::{dataset, ProtocolParams};
pub use receiver::Receiver;
pub use role::{Role, RoleOutcome};
pub use sender::{ServeSummary, Sender};
pub use slidewin_shared::ControlSignal;
pub use transport::{Rank, Source, Status, Tag, Transport};
pub use udp::{UdpTransport, DEFAULT_STARTUP_TIMEOUT, MAX_MESSAGE_ELEMENTS};

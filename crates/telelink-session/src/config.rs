use std::time::Duration;

use crate::power::PowerOff;
use crate::recorder::{Durability, WritePolicy};

/// Packets sent per controlled-range run when no count is given.
pub const DEFAULT_CONTROLLED_PACKETS: u64 = 250;

/// Transmit loop budget.
pub const DEFAULT_SEND_DURATION: Duration = Duration::from_secs(90);

/// Receive loop budget.
pub const DEFAULT_RECEIVE_DURATION: Duration = Duration::from_secs(120);

/// Pause between two transmitted packets.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Pause between two packets of a controlled-range run.
pub const DEFAULT_CONTROLLED_INTERVAL: Duration = Duration::from_secs(3);

/// Parameters of one transmit or receive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wait before the transport is opened.
    pub start_delay: Duration,
    /// Wall-clock budget of the loop, measured from loop start.
    pub duration: Duration,
    /// Transmit side: pause between packets. Ignored when receiving.
    pub interval: Duration,
    /// Transmit side: stop after this many packets.
    pub max_packets: Option<u64>,
    /// Receive side: add `rssi,snr` columns to the data table.
    pub signal_columns: bool,
    pub durability: Durability,
    pub write_policy: WritePolicy,
    /// Invoked at the very end of the shutdown path.
    pub power_off: Option<PowerOff>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::ZERO,
            duration: DEFAULT_RECEIVE_DURATION,
            interval: DEFAULT_INTERVAL,
            max_packets: None,
            signal_columns: false,
            durability: Durability::Buffered,
            write_policy: WritePolicy::Log,
            power_off: None,
        }
    }
}

impl SessionConfig {
    /// Defaults of the transmit endpoint.
    pub fn sender() -> Self {
        Self {
            duration: DEFAULT_SEND_DURATION,
            ..Self::default()
        }
    }

    /// Defaults of the receive endpoint.
    pub fn receiver() -> Self {
        Self::default()
    }

    /// Always-on profile: every append is synced and write failures never
    /// interrupt collection.
    pub fn unattended(mut self) -> Self {
        self.durability = Durability::Synced;
        self.write_policy = WritePolicy::Drop;
        self
    }

    pub fn with_power_off(mut self, power_off: PowerOff) -> Self {
        self.power_off = Some(power_off);
        self
    }
}

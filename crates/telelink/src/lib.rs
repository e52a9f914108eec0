//! Encrypted, checksummed telemetry over serial radio links.
//!
//! telelink moves small sensor readings between two endpoints over a
//! transparent serial link. Each reading is encrypted, followed by a CRC-8
//! byte, and validated in stages on the receive side.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port access
//! - [`frame`]: checksum, cipher, packet codec and fixed-size framing
//! - [`session`]: run numbering, recording and the transmit/receive loops

/// Re-export transport types.
pub mod transport {
    pub use telelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use telelink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use telelink_session::*;
}

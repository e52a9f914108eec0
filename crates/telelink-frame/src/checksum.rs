//! 8-bit frame integrity code.
//!
//! CRC-8 with generator `0x07`, initial register `0`, MSB first, no
//! reflection and no final XOR (the SMBus parameter set).

use crc::{Crc, CRC_8_SMBUS};

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Compute the checksum of `data`. The empty sequence yields `0`.
pub fn checksum(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

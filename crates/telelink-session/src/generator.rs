use std::ops::RangeInclusive;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telelink_frame::{Reading, FIELD_COUNT};

/// Value ranges of temperature, pressure, humidity, density and
/// concentration.
pub const FIELD_RANGES: [RangeInclusive<i64>; FIELD_COUNT] =
    [20..=30, 980..=1020, 30..=80, 1..=5, 50..=150];

/// Synthetic sensor readings for bench and range tests.
#[derive(Debug, Clone)]
pub struct SampleGenerator<R = StdRng> {
    rng: R,
}

impl SampleGenerator<StdRng> {
    /// Generator seeded from the OS.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl Default for SampleGenerator<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Reading with the given id and random field values.
    pub fn reading_with_id(&mut self, packet_id: u64) -> Reading {
        let mut fields = [0i64; FIELD_COUNT];
        for (slot, range) in fields.iter_mut().zip(FIELD_RANGES.iter()) {
            *slot = self.rng.gen_range(range.clone());
        }
        Reading::new(packet_id, fields)
    }

    /// Reading identified by the current Unix time in seconds.
    ///
    /// Two readings produced within the same second share an id.
    pub fn next_reading(&mut self) -> Reading {
        let packet_id = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        self.reading_with_id(packet_id)
    }
}

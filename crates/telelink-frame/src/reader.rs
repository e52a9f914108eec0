use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use telelink_transport::SerialLink;
use tracing::trace;

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};

/// Link-quality figures reported alongside a received frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalQuality {
    /// Received signal strength, dBm.
    pub rssi: i16,
    /// Signal-to-noise ratio, dB.
    pub snr: f32,
}

/// Recovers one candidate frame per call from a continuous byte stream.
///
/// The validation pipeline only sees the bytes a source hands it, so a
/// length-prefixed or delimiter-based framer can replace [`FixedFramer`]
/// without touching the decoder.
pub trait FrameSource {
    /// Block for at most one read window and return the bytes collected,
    /// which may be empty or shorter than a frame.
    fn read_frame(&mut self) -> Result<Bytes>;

    /// Link quality of the last frame, when the link reports it.
    fn signal_quality(&self) -> Option<SignalQuality> {
        None
    }
}

/// Narrows the blocking time of the next read on `T` to what is left of
/// the current window.
pub type ReadLimit<T> = fn(&mut T, Duration) -> std::io::Result<()>;

/// Reads fixed-size windows from any `Read` stream.
///
/// No resynchronization: if bytes are lost or inserted upstream, every
/// subsequent window stays misaligned until the stream realigns by itself.
///
/// Without a [`ReadLimit`] a window can overrun `read_timeout` by the
/// blocking time of its last read.
pub struct FixedFramer<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    limit: Option<ReadLimit<T>>,
}

impl<T: Read> FixedFramer<T> {
    /// Create a framer with default configuration (33-byte windows).
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.frame_len),
            config,
            limit: None,
        }
    }

    /// Create a framer that calls `limit` before every read so the whole
    /// window stays within `read_timeout`.
    pub fn with_read_limit(inner: T, config: FrameConfig, limit: ReadLimit<T>) -> Self {
        Self {
            limit: Some(limit),
            ..Self::with_config(inner, config)
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the framer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn fill_window(&mut self, deadline: Instant) -> Result<()> {
        let want = self.config.frame_len;
        let mut chunk = vec![0u8; want];
        while self.buf.len() < want {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if let Some(limit) = self.limit {
                limit(&mut self.inner, deadline - now)?;
            }
            let remaining = want - self.buf.len();
            match self.inner.read(&mut chunk[..remaining]) {
                Ok(0) => break,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    break
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }
}

impl<T: Read> FrameSource for FixedFramer<T> {
    fn read_frame(&mut self) -> Result<Bytes> {
        self.buf.clear();
        let deadline = Instant::now() + self.config.read_timeout;
        self.fill_window(deadline)?;
        trace!(len = self.buf.len(), "read window closed");
        Ok(self.buf.split().freeze())
    }
}

impl FixedFramer<SerialLink> {
    /// Create a framer over a serial link whose reads never outlast the
    /// current window.
    pub fn with_config_serial(mut inner: SerialLink, config: FrameConfig) -> Result<Self> {
        limit_serial(&mut inner, config.read_timeout)?;
        Ok(Self::with_read_limit(inner, config, limit_serial))
    }
}

fn limit_serial(link: &mut SerialLink, remaining: Duration) -> std::io::Result<()> {
    link.set_read_timeout(remaining.max(Duration::from_millis(1)))
        .map_err(|err| match err {
            telelink_transport::TransportError::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::Codec;
    use crate::sample::Reading;

    fn wire(id: u64) -> Vec<u8> {
        Codec::default()
            .encode(&Reading::new(id, [25, 1000, 50, 2, 100]))
            .to_wire()
            .to_vec()
    }

    #[test]
    fn reads_one_window_per_call() {
        let mut stream = wire(1);
        stream.extend(wire(2));

        let mut framer = FixedFramer::new(Cursor::new(stream));
        let codec = Codec::default();

        let f1 = framer.read_frame().unwrap();
        let f2 = framer.read_frame().unwrap();
        assert_eq!(f1.len(), 33);
        assert_eq!(codec.decode(&f1).unwrap().sample.reading.packet_id, 1);
        assert_eq!(codec.decode(&f2).unwrap().sample.reading.packet_id, 2);
        assert!(framer.read_frame().unwrap().is_empty());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(4),
            pos: 0,
        };
        let mut framer = FixedFramer::new(byte_reader);

        let frame = framer.read_frame().unwrap();
        assert_eq!(frame.len(), 33);
        assert_eq!(
            Codec::default().decode(&frame).unwrap().sample.reading.packet_id,
            4
        );
    }

    #[test]
    fn truncated_stream_yields_short_window() {
        let mut framer = FixedFramer::new(Cursor::new(wire(1)[..12].to_vec()));
        assert_eq!(framer.read_frame().unwrap().len(), 12);
    }

    #[test]
    fn timeout_closes_window_with_partial_bytes() {
        let reader = TimeoutAfter {
            bytes: wire(9)[..20].to_vec(),
            pos: 0,
        };
        let mut framer = FixedFramer::new(reader);
        let frame = framer.read_frame().unwrap();
        assert_eq!(frame.len(), 20);
    }

    #[test]
    fn slipped_stream_stays_misaligned() {
        // One stray byte ahead of two frames shifts every later window.
        let mut stream = vec![0xAA];
        stream.extend(wire(1));
        stream.extend(wire(2));
        let mut framer = FixedFramer::new(Cursor::new(stream));
        let codec = Codec::default();

        assert!(codec.decode(&framer.read_frame().unwrap()).is_err());
        assert!(codec.decode(&framer.read_frame().unwrap()).is_err());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(8),
            pos: 0,
        };
        let mut framer = FixedFramer::new(reader);
        let frame = framer.read_frame().unwrap();
        assert_eq!(frame.len(), 33);
    }

    #[test]
    fn other_io_error_propagates() {
        let mut framer = FixedFramer::new(BrokenReader);
        let err = framer.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn custom_window_length() {
        let cfg = FrameConfig {
            frame_len: 17,
            ..FrameConfig::default()
        };
        let mut framer = FixedFramer::with_config(Cursor::new(vec![7u8; 40]), cfg);
        assert_eq!(framer.read_frame().unwrap().len(), 17);
        assert_eq!(framer.read_frame().unwrap().len(), 17);
        assert_eq!(framer.read_frame().unwrap().len(), 6);
    }

    #[test]
    fn read_limit_keeps_window_within_timeout() {
        let cfg = FrameConfig {
            read_timeout: Duration::from_millis(100),
            ..FrameConfig::default()
        };
        let reader = SlowLink {
            period: Duration::from_millis(90),
            timeout: cfg.read_timeout,
            limits: Vec::new(),
        };
        let mut framer = FixedFramer::with_read_limit(reader, cfg, SlowLink::limit);

        let start = Instant::now();
        let frame = framer.read_frame().unwrap();
        let elapsed = start.elapsed();

        assert_eq!(frame.len(), 1);
        assert!(elapsed < Duration::from_millis(150), "window took {elapsed:?}");
        let limits = &framer.get_ref().limits;
        assert_eq!(limits.len(), 2);
        assert!(limits[0] <= Duration::from_millis(100));
        assert!(limits[1] < limits[0]);
    }

    #[test]
    fn read_limit_errors_propagate() {
        fn refuse(_: &mut Cursor<Vec<u8>>, _: Duration) -> std::io::Result<()> {
            Err(std::io::Error::from(ErrorKind::PermissionDenied))
        }
        let mut framer =
            FixedFramer::with_read_limit(Cursor::new(wire(1)), FrameConfig::default(), refuse);
        let err = framer.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::PermissionDenied));
    }

    #[test]
    fn default_source_reports_no_signal_quality() {
        let framer = FixedFramer::new(Cursor::new(Vec::<u8>::new()));
        assert!(framer.signal_quality().is_none());
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut framer = FixedFramer::new(Cursor::new(Vec::<u8>::new()));
        let _ = framer.get_ref();
        let _ = framer.get_mut();
        assert_eq!(framer.config().frame_len, 33);
        let _inner = framer.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    /// Hands out its bytes, then times out like an idle serial port.
    struct TimeoutAfter {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for TimeoutAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len()).min(7);
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }

    /// Yields one byte per `period`, or times out when the read timeout is
    /// shorter, like a serial port on a slow trickle.
    struct SlowLink {
        period: Duration,
        timeout: Duration,
        limits: Vec<Duration>,
    }

    impl SlowLink {
        fn limit(&mut self, remaining: Duration) -> std::io::Result<()> {
            self.limits.push(remaining);
            self.timeout = remaining;
            Ok(())
        }
    }

    impl Read for SlowLink {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.timeout < self.period {
                std::thread::sleep(self.timeout);
                return Err(std::io::Error::from(ErrorKind::TimedOut));
            }
            std::thread::sleep(self.period);
            buf[0] = 0x5A;
            Ok(1)
        }
    }
}

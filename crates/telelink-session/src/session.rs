use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use telelink_transport::TransportError;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::recorder::Recorder;
use crate::run::Run;

const POLL_SLICE: Duration = Duration::from_millis(100);

/// Why a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The duration budget ran out.
    #[default]
    Elapsed,
    /// The requested packet count was reached.
    Completed,
    /// The cancellation flag was cleared.
    Interrupted,
    /// The transport failed mid-loop.
    TransportFailure,
}

/// One run of the transmit or receive loop.
///
/// Owns the run's recorder and the cooperative cancellation flag. The
/// transport is acquired inside the loop and dropped before the shutdown
/// path writes its final lines.
#[derive(Debug)]
pub struct Session {
    run: Run,
    recorder: Recorder,
    config: SessionConfig,
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(run: Run, config: SessionConfig, running: Arc<AtomicBool>) -> Self {
        let recorder = Recorder::for_run(
            &run,
            config.signal_columns,
            config.durability,
            config.write_policy,
        );
        Self {
            run,
            recorder,
            config,
            running,
        }
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Flag observed by the loops; clearing it requests an orderly stop.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request an orderly stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Sleep until `until` in short slices. Returns `false` if the session
    /// was cancelled first.
    pub(crate) fn wait_until(&self, until: Instant) -> bool {
        loop {
            if !self.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            thread::sleep((until - now).min(POLL_SLICE));
        }
    }

    /// Honor the configured start delay. Returns `false` if cancelled.
    pub(crate) fn start_delay(&self) -> bool {
        let delay = self.config.start_delay;
        if delay.is_zero() {
            return self.is_running();
        }
        self.recorder
            .event(&format!("Startup delay: {}", delay_text(delay)));
        self.wait_until(Instant::now() + delay)
    }

    /// Event line for a transport that could not be acquired.
    pub(crate) fn open_failed(&self, err: &SessionError) {
        let message = match err {
            SessionError::PortOpen(TransportError::Open { port, source }) => {
                format!("Failed to open port {port}: {source}")
            }
            other => format!("Failed to open port: {other}"),
        };
        self.recorder.event(&message);
    }

    /// Final lines of a session, written after the transport is released.
    pub(crate) fn shutdown(&self, activity: &str, reason: StopReason) {
        if reason == StopReason::Interrupted {
            self.recorder.event(&format!("{activity} stopped by user"));
        }
        self.recorder.event(&format!("{activity} completed"));
        info!(run = self.run.run_number, ?reason, "session finished");

        if let Some(power_off) = &self.config.power_off {
            self.recorder.event("Powering off host");
            power_off.invoke();
        }
    }
}

/// Whole seconds as `N sec`, anything finer as `N ms`.
fn delay_text(delay: Duration) -> String {
    if delay.subsec_nanos() == 0 {
        format!("{} sec", delay.as_secs())
    } else {
        format!("{} ms", delay.as_millis())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;

    use super::*;
    use crate::run::{open_run, Role, RunLayout};

    pub(crate) fn session_in(
        dir: &std::path::Path,
        role: Role,
        label: Option<&str>,
        config: SessionConfig,
    ) -> Session {
        let layout = RunLayout {
            log_dir: dir.join("logs"),
            data_dir: dir.join("data"),
        };
        let run = open_run(&layout, role, 1, label).unwrap();
        Session::new(run, config, Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn log_lines(session: &Session) -> Vec<String> {
        fs::read_to_string(session.recorder().log_path())
            .unwrap_or_default()
            .lines()
            .map(|l| l.splitn(2, "] ").nth(1).unwrap_or(l).to_string())
            .collect()
    }

    #[test]
    fn wait_returns_early_when_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path(), Role::Sender, None, SessionConfig::sender());
        session.stop();
        let start = Instant::now();
        assert!(!session.wait_until(start + Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_reaches_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path(), Role::Sender, None, SessionConfig::sender());
        assert!(session.wait_until(Instant::now() + Duration::from_millis(20)));
    }

    #[test]
    fn start_delay_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            start_delay: Duration::from_millis(10),
            ..SessionConfig::sender()
        };
        let session = session_in(dir.path(), Role::Sender, None, config);
        assert!(session.start_delay());
        assert_eq!(log_lines(&session), ["Startup delay: 10 ms"]);
    }

    #[test]
    fn delay_text_keeps_sub_second_precision() {
        assert_eq!(delay_text(Duration::from_secs(5)), "5 sec");
        assert_eq!(delay_text(Duration::from_millis(1500)), "1500 ms");
        assert_eq!(delay_text(Duration::from_millis(250)), "250 ms");
    }

    #[test]
    fn interrupted_shutdown_lines() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(dir.path(), Role::Receiver, None, SessionConfig::receiver());
        session.shutdown("Reception", StopReason::Interrupted);
        assert_eq!(
            log_lines(&session),
            ["Reception stopped by user", "Reception completed"]
        );
    }

    #[test]
    fn shutdown_runs_power_off() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::receiver().with_power_off(crate::power::PowerOff::new(
            "telelink-no-such-program",
            Vec::<String>::new(),
        ));
        let session = session_in(dir.path(), Role::Receiver, None, config);
        session.shutdown("Reception", StopReason::Elapsed);
        assert_eq!(
            log_lines(&session),
            ["Reception completed", "Powering off host"]
        );
    }
}

use clap::ValueEnum;
use telelink_session::EVENT_TARGET;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-target filter for `level`.
///
/// Run event lines stay visible at `warn` so an operator watching the
/// console sees the same progress the run log records. Only `error`
/// silences them.
pub fn log_filter(level: LogLevel) -> Targets {
    let base = level.as_filter();
    let events = match level {
        LogLevel::Error => base,
        _ => base.max(LevelFilter::INFO),
    };
    Targets::new()
        .with_default(base)
        .with_target(EVENT_TARGET, events)
}

/// Diagnostics go to stderr so stdout stays parseable. Targets are shown
/// so event lines can be told apart from library diagnostics.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_target(true);
    let filter = log_filter(level);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(filter).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(filter).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn events_survive_warn_level() {
        let filter = log_filter(LogLevel::Warn);
        assert!(filter.would_enable(EVENT_TARGET, &Level::INFO));
        assert!(!filter.would_enable("telelink_session::receive", &Level::INFO));
        assert!(filter.would_enable("telelink_session::receive", &Level::WARN));
    }

    #[test]
    fn error_level_silences_events() {
        let filter = log_filter(LogLevel::Error);
        assert!(!filter.would_enable(EVENT_TARGET, &Level::INFO));
        assert!(filter.would_enable("telelink_frame::reader", &Level::ERROR));
    }

    #[test]
    fn verbose_levels_apply_to_events_too() {
        let filter = log_filter(LogLevel::Debug);
        assert!(filter.would_enable(EVENT_TARGET, &Level::DEBUG));
        assert!(filter.would_enable("telelink_frame::codec", &Level::DEBUG));
        assert!(!filter.would_enable("telelink_frame::codec", &Level::TRACE));
    }
}

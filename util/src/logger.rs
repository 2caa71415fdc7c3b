//! Logging setup, mirroring the teacher's `init_logger` / `init_test_logger`
//! split: a full `log4rs` pipeline for the binary, and a cheap
//! once-per-process stderr logger for tests.
//!
//! `LOG_MODE` (§6) is a subset of `{info, probe, stats}`. Each enabled mode
//! gets its own rolling file appender and its own `log` target, so
//! `info!(target: "probe", ...)` only reaches `probe.log` when `probe` is
//! enabled, without the call sites needing to know that.

use std::path::{Path, PathBuf};
use std::sync::Once;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l} [{T}] {m}{n}";
const ROLLED_FILE_CAP: u64 = 32 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub stdout_level: LevelFilter,
    pub info: bool,
    pub probe: bool,
    pub stats: bool,
}

impl LoggingConfig {
    pub fn from_log_mode(log_dir: impl Into<PathBuf>, log_mode: &[String]) -> LoggingConfig {
        let has = |m: &str| log_mode.iter().any(|x| x == m);
        LoggingConfig {
            log_dir: log_dir.into(),
            stdout_level: LevelFilter::Info,
            info: has("info"),
            probe: has("probe"),
            stats: has("stats"),
        }
    }
}

fn rolling_appender(path: &Path) -> RollingFileAppender {
    let pattern = format!("{}.{{}}.gz", path.display());
    let roller = FixedWindowRoller::builder()
        .build(&pattern, 4)
        .expect("fixed window roller pattern is well-formed");
    let trigger = SizeTrigger::new(ROLLED_FILE_CAP);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(path, Box::new(policy))
        .expect("log directory is writable")
}

/// Installs the process-wide `log4rs` pipeline. Safe to call only once per
/// process; the binary calls this before spawning any round workers.
pub fn init_logger(cfg: &LoggingConfig) {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let mut builder = Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");
    let mut loggers = Vec::new();

    if cfg.info {
        builder = builder.appender(
            Appender::builder().build(
                "info_file",
                Box::new(rolling_appender(&cfg.log_dir.join("info.log"))),
            ),
        );
        root = root.appender("info_file");
    }
    if cfg.probe {
        builder = builder.appender(
            Appender::builder().build(
                "probe_file",
                Box::new(rolling_appender(&cfg.log_dir.join("probe.log"))),
            ),
        );
        loggers.push(
            Logger::builder()
                .appender("probe_file")
                .additive(false)
                .build("probe", LevelFilter::Trace),
        );
    }
    if cfg.stats {
        builder = builder.appender(
            Appender::builder().build(
                "stats_file",
                Box::new(rolling_appender(&cfg.log_dir.join("stats.log"))),
            ),
        );
        loggers.push(
            Logger::builder()
                .appender("stats_file")
                .additive(false)
                .build("stats", LevelFilter::Trace),
        );
    }

    let mut builder = builder;
    for logger in loggers {
        builder = builder.logger(logger);
    }

    let config = builder
        .build(root.build(cfg.stdout_level))
        .expect("logging config is internally consistent");

    let _ = log4rs::init_config(config);
}

static TEST_LOGGER_INIT: Once = Once::new();

/// Minimal stderr logger for `#[test]`s, matching the teacher's
/// `init_test_logger` convention; idempotent across repeated test-binary
/// invocations within one process.
pub fn init_test_logger() {
    TEST_LOGGER_INIT.call_once(|| {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        let config = Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Debug))
            .expect("test logging config is internally consistent");
        let _ = log4rs::init_config(config);
    });
}

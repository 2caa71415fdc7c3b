use failure::Fail;

/// Config-time failures (§7 "Config"/"Bootstrap": fail fast, before any
/// round starts).
#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "environment table is missing required key {}", _0)]
    MissingKey(String),

    #[fail(display = "{} is not a valid value for {}", _0, _1)]
    InvalidValue(String, &'static str),

    #[fail(display = "pool HPPs sum to {}, which is not within 1e-3 of 1.0", _0)]
    HppSumInvalid(f64),

    #[fail(display = "pool {} references unknown strategy id {}", _0, _1)]
    UnknownStrategy(String, String),

    #[fail(display = "strategy {} names unregistered entry point {}", _0, _1)]
    UnknownEntryPoint(String, String),

    #[fail(display = "strategy {} config does not match its entry point {}", _0, _1)]
    EntryPointMismatch(String, String),

    #[fail(display = "strategy {} config is malformed: {}", _0, _1)]
    MalformedStrategyConfig(String, String),

    #[fail(display = "difficulty bootstrap row {}: {}", _0, _1)]
    MalformedBootstrapRow(usize, String),

    #[fail(
        display = "difficulty bootstrap has {} rows, needs at least window+lag = {}",
        _0, _1
    )]
    BootstrapTooShort(usize, usize),

    #[fail(
        display = "difficulty bootstrap heights are not strictly consecutive: row {} has height {}, expected {}",
        _0, _1, _2
    )]
    BootstrapHeightGap(usize, u64, u64),

    #[fail(display = "sweep spec is not a JSON/TOML object at its root")]
    SweepSpecNotAnObject,
}

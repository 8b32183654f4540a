use env_logger::{Builder, Env};
use log::LevelFilter;

/// Environment variable that, when set, takes precedence over the
/// `-v`/`-q` command line flags.
const LOG_ENV_VAR: &str = "LAGGARD_LOG";

/// Initialize logging for the whole process.
///
/// The given `verbosity_level` is the difference between the amount of
/// `-v` and `-q` command line flags: `0` maps to `WARN`, positive values
/// increase verbosity, negative values decrease it.
pub fn init(verbosity_level: i8) {
    let default_level = match verbosity_level {
        i8::MIN..=-2 => LevelFilter::Off,
        -1 => LevelFilter::Error,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        3..=i8::MAX => LevelFilter::Trace,
    };

    let mut builder = Builder::new();
    builder.filter_level(default_level);
    builder.parse_env(Env::new().filter(LOG_ENV_VAR));
    builder.init();
}

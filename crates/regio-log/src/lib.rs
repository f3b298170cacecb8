//! Leveled diagnostics for the `regio` workspace.
//!
//! A small, dependency-free logger: one process-wide level, records written to
//! stderr as `[LEVEL] target: message`, where `target` is the module path of
//! the call site. Filtering happens before any formatting, so a disabled
//! `trace!` in a hot path costs one relaxed atomic load.
//!
//! The level defaults to [`Level::Warn`] and can be taken from the
//! `REGIO_LOG` environment variable with [`init_from_env`]. Setting
//! `NO_COLOR` (to any value) turns off ANSI colors.
//!
//! # Example
//!
//! ```
//! use regio_log::{debug, info, Level};
//!
//! regio_log::set_level(Level::Debug);
//!
//! let blocks = 3;
//! info!("arena holds {} blocks", blocks);
//! debug!("head block: {:?}", (128usize, 4096usize));
//! ```

use std::fmt::{self, Arguments};
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Environment variable consulted by [`init_from_env`] for the log level.
pub const LEVEL_ENV: &str = "REGIO_LOG";

/// Environment variable that disables colored output when present.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Severity of a log record. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    /// Upper-case name of the level, as printed in records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`Level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log level: {:?}", self.input)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring case and surrounding whitespace.
    ///
    /// ```
    /// use regio_log::Level;
    ///
    /// assert_eq!("debug".parse(), Ok(Level::Debug));
    /// assert_eq!(" WARN ".parse(), Ok(Level::Warn));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(ParseLevelError {
                input: s.to_owned(),
            }),
        }
    }
}

/// Process-wide logger state.
///
/// Use [`logger`] to reach the singleton; the free functions in this crate
/// are thin wrappers over it.
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(true),
        }
    }

    /// Sets the most verbose level that is written.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Current maximum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Whether a record at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    /// Turns ANSI colors on or off.
    pub fn set_color(&self, on: bool) {
        self.color.store(on, Ordering::Relaxed);
    }

    /// Whether output is colored.
    pub fn color(&self) -> bool {
        self.color.load(Ordering::Relaxed)
    }

    fn format(&self, level: Level, target: &str, args: Arguments) -> String {
        if self.color() {
            format!("{}[{level}]\x1b[0m {target}: {args}", level.color_code())
        } else {
            format!("[{level}] {target}: {args}")
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at [`Level::Warn`] on first use.
pub fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Warn))
}

/// Sets the global logger's level.
pub fn set_level(level: Level) {
    logger().set_level(level);
}

/// Configures the global logger from `REGIO_LOG` and `NO_COLOR`.
///
/// An unset `REGIO_LOG` leaves the level untouched; an unparsable one is
/// reported as an error so the caller can decide whether to abort.
///
/// ```
/// // Nothing set in the doctest environment, so this is a no-op.
/// regio_log::init_from_env().unwrap();
/// ```
pub fn init_from_env() -> Result<(), ParseLevelError> {
    let logger = logger();
    if std::env::var_os(NO_COLOR_ENV).is_some() {
        logger.set_color(false);
    }
    match std::env::var(LEVEL_ENV) {
        Ok(value) => {
            logger.set_level(value.parse()?);
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

/// Writes one record. Called by the macros after the level check.
#[doc(hidden)]
pub fn __write(level: Level, target: &str, args: Arguments) {
    let logger = logger();
    if !logger.enabled(level) {
        return;
    }
    let line = logger.format(level, target, args);
    // A closed stderr is not worth failing an allocation over.
    let _ = writeln!(std::io::stderr().lock(), "{line}");
}

/// Logs at an explicit level.
///
/// ```
/// use regio_log::{log, Level};
///
/// log!(level: Level::Info, "reserved {} bytes", 4096);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logger().enabled(level) {
            $crate::__write(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Evaluates to `true` when records at the given level would be written.
///
/// Useful to skip computing expensive diagnostics.
#[macro_export]
macro_rules! log_enabled {
    ($level:expr) => {
        $crate::logger().enabled($level)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}

//! # Process Mode
//!
//! Process-wide run mode (debug / release / test), read once from the
//! `STRADA_MODE` environment variable and overridable with an explicit
//! [`set_mode`] call at startup. The routing hot path never consults the
//! environment; it sees only the cached atomic value through
//! [`is_debugging`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Environment variable consulted for the initial mode
pub const ENV_STRADA_MODE: &str = "STRADA_MODE";

/// Run mode of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Development mode: route registrations and requests are logged
    Debug = 0,
    /// Production mode: debug output suppressed
    Release = 1,
    /// Test mode: like release, but distinguishable by test harnesses
    Test = 2,
}

impl Mode {
    /// The canonical name of this mode
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
            Self::Test => "test",
        }
    }

    fn from_env_value(value: &str) -> Option<Self> {
        match value {
            "debug" | "" => Some(Self::Debug),
            "release" => Some(Self::Release),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Release,
            2 => Self::Test,
            _ => Self::Debug,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static MODE: AtomicU8 = AtomicU8::new(Mode::Debug as u8);
static MODE_INIT: OnceLock<()> = OnceLock::new();

/// Set the process mode explicitly
///
/// Disables the one-shot environment read; call before traffic starts.
pub fn set_mode(mode: Mode) {
    let _ = MODE_INIT.set(());
    MODE.store(mode as u8, Ordering::Relaxed);
}

/// The current process mode
///
/// On first call without a prior [`set_mode`], reads `STRADA_MODE` once.
///
/// # Panics
///
/// Panics if the environment variable holds an unknown mode name; a
/// misconfigured deployment must not start.
#[must_use]
pub fn mode() -> Mode {
    MODE_INIT.get_or_init(|| {
        let value = std::env::var(ENV_STRADA_MODE).unwrap_or_default();
        let mode = Mode::from_env_value(&value)
            .unwrap_or_else(|| panic!("strada mode unknown: {value}"));
        MODE.store(mode as u8, Ordering::Relaxed);
    });
    Mode::from_u8(MODE.load(Ordering::Relaxed))
}

/// True when the process runs in debug mode
#[must_use]
pub fn is_debugging() -> bool {
    mode() == Mode::Debug
}

//! Tracing setup for programs built on this crate.
//!
//! The library only emits events; it never installs a subscriber. Programs
//! call [`init_journald_or_stdout`] once at startup. Inside the crate, `use
//! crate::tracing::prelude::*` brings in the `trace!()` ... `error!()` macros.

use std::env;

use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// Under systemd (`JOURNAL_STREAM` set) events go to journald; otherwise to
/// stdout, filtered by `RUST_LOG` with `default_level` as the fallback.
pub fn init_journald_or_stdout(default_level: LevelFilter) {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry().with(layer).init();
        } else {
            use_stdout(default_level);
            error!("Failed to initialize journald logging, using stdout.");
        }
    } else {
        use_stdout(default_level);
    }
}

fn use_stdout(default_level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_target(true)
                .with_thread_names(true),
        )
        .init();
}

// Local time, to the nearest second.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second]"
            ))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", formatted)
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logging setup for hosts embedding the command layer

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directive` (for example `"iam_commands=info"`)
/// when `RUST_LOG` is unset or unparsable. Calling this more than once is
/// harmless: later calls leave the first subscriber in place and return
/// `false`.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured logging.
//!
//! With the `tracing` feature the crate-internal macros below are the
//! `tracing` macros. Without it they expand to nothing, so their arguments
//! are never evaluated.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, error, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop {
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    macro_rules! warn_log {
        ($($arg:tt)*) => {};
    }

    pub(crate) use {debug, error, trace, warn_log as warn};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop::{debug, error, trace, warn};

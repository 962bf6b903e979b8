use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use snafu::prelude::*;

use crate::error::{CancelledSnafu, DepthExceededSnafu, Error};

pub const DEFAULT_LIMIT: usize = 10000;

/// Cancellation signal shared between a caller and any number of in-flight decode or encode
/// calls.
///
/// Cancelling does not roll anything back; bytes already written to a sink stay written.
#[derive(Clone, Debug, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Bounds the nesting of both engines.
///
/// The decoder checks its operand stack size, and the encoder checks the number of open
/// containers.  Either way, exceeding `limit` is an error rather than unbounded memory use.
#[derive(Debug)]
pub(crate) struct Governor<'a> {
    limit: usize,
    cancel: Option<&'a Cancel>,
}

impl<'a> Governor<'a> {
    pub(crate) fn new(limit: usize, cancel: Option<&'a Cancel>) -> Self {
        Self { limit, cancel }
    }

    pub(crate) fn ensure_not_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_some_and(Cancel::is_cancelled) {
            tracing::debug!("bencode call cancelled");
            return CancelledSnafu.fail();
        }
        Ok(())
    }

    pub(crate) fn ensure_within(&self, size: usize) -> Result<(), Error> {
        if size > self.limit {
            tracing::debug!(size, limit = self.limit, "bencode nesting limit exceeded");
        }
        ensure!(size <= self.limit, DepthExceededSnafu { limit: self.limit });
        Ok(())
    }

    /// Runs both checks, as the engines do before each unit of work.
    pub(crate) fn check(&self, size: usize) -> Result<(), Error> {
        self.ensure_not_cancelled()?;
        self.ensure_within(size)
    }
}

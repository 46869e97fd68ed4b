//! Cancellation context threaded explicitly through Runner and Orchestrator
//! calls (spec §9 "Context cascade" — never consult a global). A cheap
//! `Arc<AtomicBool>` handle: cancellation is cooperative, checked before
//! each primitive invocation, and never attempts to kill an in-flight VCS
//! process (spec §5 "Suspension points").

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};

use crate::error::VcsError;

#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Call before every VCS primitive invocation. Returns an error that
    /// aborts the current task without starting new primitives; already
    /// in-flight calls are not interrupted.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            bail!("operation cancelled");
        }
        Ok(())
    }

    /// Same check, typed as a `VcsError` so the VCS Runner (which returns
    /// `Result<_, VcsError>` throughout) can consult it before every
    /// primitive invocation without an `anyhow` dependency at that layer.
    pub fn check_vcs(&self) -> Result<(), VcsError> {
        if self.is_cancelled() {
            return Err(VcsError::new("cancelled", "operation cancelled", None));
        }
        Ok(())
    }
}

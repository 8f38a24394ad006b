//! Off-screen render surface ownership
//!
//! The `Stage` stands in for the document an export attaches its page-sized
//! container to. A container is owned by exactly one export from `attach`
//! until it is detached or dropped, and the stage refuses a second one while
//! the first is still attached.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::rendering::ExportView;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct Stage {
    attached: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `view` in a new off-screen container.
    pub fn attach(self: &Arc<Self>, view: ExportView) -> Result<OffscreenContainer> {
        if self
            .attached
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ExportInFlight);
        }
        self.peak.fetch_max(1, Ordering::AcqRel);
        self.total.fetch_add(1, Ordering::AcqRel);
        log::debug!(
            "offscreen container attached ({}x{})",
            view.page.width,
            view.page.height
        );
        Ok(OffscreenContainer {
            stage: Arc::clone(self),
            view,
            detached: AtomicBool::new(false),
        })
    }

    /// Containers currently attached (0 or 1)
    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::Acquire)
    }

    /// Most containers ever attached at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Containers attached over the stage's lifetime
    pub fn total_attached(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }
}

/// Page-fixed container positioned outside the visible area.
#[derive(Debug)]
pub struct OffscreenContainer {
    stage: Arc<Stage>,
    view: ExportView,
    detached: AtomicBool,
}

impl OffscreenContainer {
    pub fn view(&self) -> &ExportView {
        &self.view
    }

    /// Top-left corner in document coordinates; always left of the viewport.
    pub fn origin(&self) -> (i64, i64) {
        (-(self.view.page.width as i64) - 10_000, 0)
    }

    pub fn is_attached(&self) -> bool {
        !self.detached.load(Ordering::Acquire)
    }

    /// Remove the container from the stage. Safe to call more than once.
    pub fn detach(&self) {
        if !self.detached.swap(true, Ordering::AcqRel) {
            self.stage.attached.fetch_sub(1, Ordering::AcqRel);
            log::debug!("offscreen container detached");
        }
    }
}

impl Drop for OffscreenContainer {
    fn drop(&mut self) {
        self.detach();
    }
}

//! Whether the capture view is currently in front of the operator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of view visibility. Ticks are skipped while the view is hidden.
pub trait Visibility {
    fn is_visible(&self) -> bool;
}

/// A view that is never backgrounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl Visibility for AlwaysVisible {
    fn is_visible(&self) -> bool {
        true
    }
}

/// Visibility toggled from elsewhere; clones share one flag.
#[derive(Debug, Clone)]
pub struct VisibilityFlag(Arc<AtomicBool>);

impl VisibilityFlag {
    pub fn new(visible: bool) -> Self {
        Self(Arc::new(AtomicBool::new(visible)))
    }

    pub fn set_visible(&self, visible: bool) {
        self.0.store(visible, Ordering::SeqCst);
    }
}

impl Default for VisibilityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Visibility for VisibilityFlag {
    fn is_visible(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

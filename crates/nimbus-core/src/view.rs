//! Single-active-view router.

use nimbus_types::{ParseResult, View};

/// Tracks which top-level view is shown. No history, no guards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSwitcher {
    active: View,
}

impl ViewSwitcher {
    pub fn new(initial: View) -> Self {
        Self { active: initial }
    }

    pub fn active(&self) -> View {
        self.active
    }

    pub fn is_active(&self, view: View) -> bool {
        self.active == view
    }

    /// Activate `view`. Returns whether the active view changed.
    pub fn switch(&mut self, view: View) -> bool {
        let changed = self.active != view;
        self.active = view;
        changed
    }

    /// Activate the view named by a navigation anchor such as `#photos`.
    pub fn navigate(&mut self, anchor: &str) -> ParseResult<View> {
        let view = anchor.parse::<View>()?;
        self.switch(view);
        Ok(view)
    }
}

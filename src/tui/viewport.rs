//! Selection and scroll state of the topics pane

/// A selectable list window.
///
/// Keeps `selection` inside `[0, len - 1]` (0 when empty) and `scroll` inside
/// `[0, max(0, len - capacity)]`, with the selection always inside the visible rows.
/// Only [`PaneViewport::clamp_and_follow`] moves the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneViewport {
    len: usize,
    capacity: usize,
    selection: usize,
    scroll: usize,
}

impl Default for PaneViewport {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PaneViewport {
    /// An empty list shown in `capacity` rows (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            len: 0,
            capacity: capacity.max(1),
            selection: 0,
            scroll: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn max_scroll(&self) -> usize {
        self.len.saturating_sub(self.capacity)
    }

    /// Select `selection` (clamped to the list) and scroll just enough to show it.
    pub fn clamp_and_follow(&mut self, selection: usize) {
        self.selection = selection.min(self.len.saturating_sub(1));
        if self.selection < self.scroll {
            self.scroll = self.selection;
        } else if self.selection >= self.scroll + self.capacity {
            self.scroll = self.selection + 1 - self.capacity;
        }
        self.scroll = self.scroll.min(self.max_scroll());
    }

    /// Move the selection by `delta` rows.
    pub fn move_by(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.selection.saturating_sub(delta.unsigned_abs())
        } else {
            self.selection.saturating_add(delta as usize)
        };
        self.clamp_and_follow(target);
    }

    /// Replace the list length. The scroll restarts at the top, then the (re-clamped)
    /// selection is brought back into view.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.scroll = 0;
        self.clamp_and_follow(self.selection);
    }

    /// Change the number of visible rows.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.clamp_and_follow(self.selection);
    }
}

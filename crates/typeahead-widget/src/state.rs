use serde_json::Value;

/// One displayed candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Rendered label; may already contain markup.
    pub label: String,
    /// Value committed as the model when chosen.
    pub select_value: Value,
    /// The raw candidate, passed back to on-select.
    pub item: Value,
}

/// Private per-widget state the popup renders from. The match list is
/// always replaced wholesale, never patched.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    pub(crate) matches: Vec<Match>,
    /// Keyboard-highlighted entry; `None` while no list is shown.
    pub(crate) active: Option<usize>,
    /// Text of the last applied lookup, for highlighting.
    pub(crate) query: Option<String>,
    pub(crate) loading: bool,
    pub(crate) force_open: bool,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Return currently highlighted match (if any).
    pub fn active_match(&self) -> Option<&Match> {
        self.active.and_then(|i| self.matches.get(i))
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active == Some(index)
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn force_open(&self) -> bool {
        self.force_open
    }

    /// Whether the popup is shown for the given field text. A lone match
    /// that already equals the text stays hidden unless forced open.
    pub fn is_open(&self, view_value: Option<&str>) -> bool {
        match self.matches.as_slice() {
            [] => false,
            [only] => view_value != Some(only.label.as_str()) || self.force_open,
            _ => true,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.force_open = false;
        self.matches.clear();
        self.active = None;
    }

    pub(crate) fn replace(&mut self, matches: Vec<Match>) {
        self.active = if matches.is_empty() { None } else { Some(0) };
        self.matches = matches;
    }

    /// Move selection down (wraps).
    pub(crate) fn move_down(&mut self) {
        if !self.matches.is_empty() {
            self.active = Some(match self.active {
                Some(i) => (i + 1) % self.matches.len(),
                None => 0,
            });
        }
    }

    /// Move selection up (wraps).
    pub(crate) fn move_up(&mut self) {
        if !self.matches.is_empty() {
            self.active = Some(match self.active {
                Some(0) | None => self.matches.len() - 1,
                Some(i) => i - 1,
            });
        }
    }

    pub(crate) fn set_active(&mut self, index: usize) -> bool {
        if index < self.matches.len() {
            self.active = Some(index);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labelled(labels: &[&str]) -> InteractionState {
        let mut state = InteractionState::new();
        state.replace(
            labels
                .iter()
                .map(|l| Match {
                    label: l.to_string(),
                    select_value: json!(l),
                    item: json!(l),
                })
                .collect(),
        );
        state
    }

    #[test]
    fn test_replace_activates_first() {
        let state = labelled(&["a", "b"]);
        assert_eq!(state.active_index(), Some(0));
        assert_eq!(state.active_match().map(|m| m.label.as_str()), Some("a"));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = labelled(&["a", "b", "c"]);
        state.active = Some(2);
        state.move_down();
        assert_eq!(state.active_index(), Some(0));
        state.move_up();
        assert_eq!(state.active_index(), Some(2));
        state.move_up();
        assert_eq!(state.active_index(), Some(1));
    }

    #[test]
    fn test_is_open_rules() {
        assert!(!InteractionState::new().is_open(Some("a")));
        assert!(labelled(&["a", "b"]).is_open(Some("a")));

        let mut single = labelled(&["Ohio"]);
        assert!(!single.is_open(Some("Ohio")));
        assert!(single.is_open(Some("Oh")));
        assert!(single.is_open(None));
        single.force_open = true;
        assert!(single.is_open(Some("Ohio")));
    }

    #[test]
    fn test_reset_clears_everything_but_query() {
        let mut state = labelled(&["a"]);
        state.query = Some("a".into());
        state.force_open = true;
        state.reset();
        assert!(state.matches().is_empty());
        assert_eq!(state.active_index(), None);
        assert!(!state.force_open());
        assert_eq!(state.query(), Some("a"));
    }

    #[test]
    fn test_set_active_bounds() {
        let mut state = labelled(&["a", "b"]);
        assert!(state.set_active(1));
        assert!(!state.set_active(2));
        assert_eq!(state.active_index(), Some(1));
    }
}

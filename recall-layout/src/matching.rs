use crate::model::WindowSnapshot;
use crate::title::normalize;

/// Which rule picked the live window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    ExactTitle,
    StableTitle,
    PartialStableTitle,
    WindowIndex,
    FirstAvailable,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchStrategy::ExactTitle => "exact title",
            MatchStrategy::StableTitle => "stable title",
            MatchStrategy::PartialStableTitle => "partial stable title",
            MatchStrategy::WindowIndex => "window index",
            MatchStrategy::FirstAvailable => "first available",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMatch {
    pub index: usize,
    pub strategy: MatchStrategy,
}

/// Pick the live window that best corresponds to `snapshot`.
///
/// `titles` are the current titles of the owning application's windows, in the
/// order the window source reported them. Strategies run in a fixed order and
/// the first one that applies wins; only an empty list yields `None`.
pub fn find_best_match<S: AsRef<str>>(
    titles: &[S],
    snapshot: &WindowSnapshot,
) -> Option<WindowMatch> {
    if titles.is_empty() {
        return None;
    }

    let found = |index: usize, strategy: MatchStrategy| Some(WindowMatch { index, strategy });

    if let Some(i) = titles
        .iter()
        .position(|t| t.as_ref() == snapshot.window_title())
    {
        return found(i, MatchStrategy::ExactTitle);
    }

    let saved = snapshot.stable_title();
    let current: Vec<String> = titles.iter().map(|t| normalize(t.as_ref())).collect();

    if let Some(i) = current.iter().position(|c| c == saved) {
        return found(i, MatchStrategy::StableTitle);
    }

    if !saved.is_empty() {
        if let Some(i) = current
            .iter()
            .position(|c| c.contains(saved) || saved.contains(c.as_str()))
        {
            return found(i, MatchStrategy::PartialStableTitle);
        }
    }

    if snapshot.window_index() < titles.len() {
        return found(snapshot.window_index(), MatchStrategy::WindowIndex);
    }

    found(0, MatchStrategy::FirstAvailable)
}

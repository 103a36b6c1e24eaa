//! Commit hooks.

use crate::diff::TableDiff;

/// Identifier returned when registering a commit hook.
pub type HookId = u64;

/// Observer of committed changes.
///
/// Hooks are invoked after the change is applied and while the cache is still
/// borrowed by the writer, so an implementation must not read back from the
/// cache. Recording what changed and deferring work is the expected use.
pub trait CommitHook {
    /// Called once per non-empty commit.
    fn on_commit(&self, diff: &TableDiff);
}

impl<F> CommitHook for F
where
    F: Fn(&TableDiff),
{
    fn on_commit(&self, diff: &TableDiff) {
        self(diff)
    }
}

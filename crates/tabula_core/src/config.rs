//! Workspace configuration.

use crate::schema::OptionRenamePolicy;

/// Configuration for opening a workspace.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the workspace directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the workspace already exists.
    pub error_if_exists: bool,

    /// Whether to flush the journal on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Number of history entries returned when the caller gives no limit.
    pub default_history_limit: usize,

    /// Upper bound applied to any caller-supplied history limit.
    pub max_history_limit: usize,

    /// How edits to a select column's option list rewrite existing values.
    pub option_rename_policy: OptionRenamePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            sync_on_commit: true,
            default_history_limit: 50,
            max_history_limit: 500,
            option_rename_policy: OptionRenamePolicy::PositionAligned,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the workspace if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the workspace exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to flush the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the default history page size.
    #[must_use]
    pub const fn default_history_limit(mut self, limit: usize) -> Self {
        self.default_history_limit = limit;
        self
    }

    /// Sets the maximum history page size.
    #[must_use]
    pub const fn max_history_limit(mut self, limit: usize) -> Self {
        self.max_history_limit = limit;
        self
    }

    /// Sets the option rename policy.
    #[must_use]
    pub const fn option_rename_policy(mut self, policy: OptionRenamePolicy) -> Self {
        self.option_rename_policy = policy;
        self
    }

    /// Resolves a caller-supplied history limit against the configured bounds.
    #[must_use]
    pub fn history_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_history_limit)
            .min(self.max_history_limit)
    }
}

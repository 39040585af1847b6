//! Matcher configuration.

/// Field names preferred as discriminators, in priority order.
pub const DEFAULT_DISCRIMINATOR_PRIORITY: &[&str] = &[
    "type",
    "kind",
    "tag",
    "_tag",
    "__typename",
    "variant",
    "status",
    "op",
];

/// Tunables for a [`Matcher`](crate::Matcher).
///
/// # Example
///
/// ```rust
/// use schematch::MatchConfig;
///
/// let config = MatchConfig::default()
///     .with_dispatch(false)
///     .with_preview_limit(80);
///
/// assert!(!config.dispatch);
/// assert_eq!(config.preview_limit, 80);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Build discriminator dispatch tables. Disabling forces linear scans.
    pub dispatch: bool,
    pub discriminator_priority: Vec<String>,
    /// Maximum characters of the input shown in a no-match message.
    pub preview_limit: usize,
    /// Re-validate candidates on the rayon pool when diagnosing.
    pub parallel_diagnostics: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            dispatch: true,
            discriminator_priority: DEFAULT_DISCRIMINATOR_PRIORITY
                .iter()
                .map(|name| name.to_string())
                .collect(),
            preview_limit: 200,
            parallel_diagnostics: false,
        }
    }
}

impl MatchConfig {
    pub fn with_dispatch(mut self, enabled: bool) -> Self {
        self.dispatch = enabled;
        self
    }

    pub fn with_discriminator_priority<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.discriminator_priority = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn with_parallel_diagnostics(mut self, enabled: bool) -> Self {
        self.parallel_diagnostics = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert!(config.dispatch);
        assert_eq!(config.preview_limit, 200);
        assert!(!config.parallel_diagnostics);
        assert_eq!(config.discriminator_priority[0], "type");
        assert_eq!(config.discriminator_priority.len(), 8);
    }

    #[test]
    fn test_priority_override() {
        let config = MatchConfig::default().with_discriminator_priority(["op"]);
        assert_eq!(config.discriminator_priority, vec!["op".to_string()]);
    }
}

/// Registry configuration
///
/// # Examples
///
/// ```
/// use orm_registry::RegistryConfig;
///
/// let config = RegistryConfig::new("users")
///     .initial_priority(1_000)
///     .auto_increment(false);
/// assert_eq!(config.table_name, "users");
/// ```
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Table whose entities this registry tracks
    pub table_name: String,

    /// First action priority handed out; each mark consumes one slot below it
    pub initial_priority: u64,

    /// Wire the generated-key listener onto every stored entity
    pub auto_increment: bool,
}

impl RegistryConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            initial_priority: u64::MAX,
            auto_increment: true,
        }
    }

    /// Set the first priority slot
    pub fn initial_priority(mut self, priority: u64) -> Self {
        self.initial_priority = priority;
        self
    }

    /// Enable or disable the generated-key listener
    pub fn auto_increment(mut self, enabled: bool) -> Self {
        self.auto_increment = enabled;
        self
    }
}

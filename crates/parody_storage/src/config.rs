//! Node file configuration.

/// Configuration for opening a node file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the file already exists.
    pub error_if_exists: bool,

    /// Whether to take an exclusive advisory lock on the file.
    pub lock: bool,

    /// Whether dropping a [`crate::NodeFile`] writes back a modified header.
    pub flush_on_drop: bool,

    /// Whether a header flush also syncs the file to disk.
    pub sync_on_flush: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            lock: true,
            flush_on_drop: true,
            sync_on_flush: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the file exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to lock the file for exclusive use.
    #[must_use]
    pub const fn lock(mut self, value: bool) -> Self {
        self.lock = value;
        self
    }

    /// Sets whether a modified header is written back on drop.
    #[must_use]
    pub const fn flush_on_drop(mut self, value: bool) -> Self {
        self.flush_on_drop = value;
        self
    }

    /// Sets whether header flushes sync to disk.
    #[must_use]
    pub const fn sync_on_flush(mut self, value: bool) -> Self {
        self.sync_on_flush = value;
        self
    }
}

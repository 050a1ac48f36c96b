//! Menu limits.

/// Configuration for a [`Menu`](crate::Menu).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    /// Highest client index accepted (clients are numbered from 1).
    pub max_clients: usize,
    /// Menu bodies are truncated to this many bytes before sending.
    pub max_text_bytes: usize,
    /// Largest slice handed to the transport in one message.
    pub chunk_size: usize,
    /// Seconds the menu stays up; -1 keeps it until answered.
    pub display_time: i32,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            max_clients: 32,
            max_text_bytes: 507,
            chunk_size: 172,
            display_time: -1,
        }
    }
}

impl MenuConfig {
    /// Set the highest accepted client index.
    #[must_use]
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Set the body truncation limit in bytes.
    #[must_use]
    pub fn with_max_text_bytes(mut self, max_text_bytes: usize) -> Self {
        self.max_text_bytes = max_text_bytes;
        self
    }

    /// Set the per-message chunk size in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the default display time in seconds (-1 for no timeout).
    #[must_use]
    pub fn with_display_time(mut self, display_time: i32) -> Self {
        self.display_time = display_time;
        self
    }

    /// Reject limits the menu cannot work with.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.max_clients == 0 {
            return Err("max_clients must be at least 1");
        }
        if self.max_clients > usize::from(u16::MAX) {
            return Err("max_clients must fit a 16-bit client index");
        }
        if self.chunk_size == 0 {
            return Err("chunk_size must be at least 1");
        }
        Ok(())
    }
}

//! Bully protocol configuration.

use std::time::Duration;

/// Configuration for the bully protocol.
#[derive(Debug, Clone)]
pub struct BullyConfig {
    /// How long a node that got an answer from a higher node waits for the
    /// COORDINATOR announcement before starting over.
    ///
    /// Covers the case where the answering node crashes before announcing.
    /// `None` waits forever.
    pub reelection_timeout: Option<Duration>,
}

impl Default for BullyConfig {
    fn default() -> Self {
        Self {
            reelection_timeout: Some(Duration::from_millis(500)),
        }
    }
}

impl BullyConfig {
    /// Set the re-election timeout.
    pub fn with_reelection_timeout(mut self, timeout: Duration) -> Self {
        self.reelection_timeout = Some(timeout);
        self
    }

    /// Wait for COORDINATOR indefinitely.
    pub fn without_reelection_timeout(mut self) -> Self {
        self.reelection_timeout = None;
        self
    }
}

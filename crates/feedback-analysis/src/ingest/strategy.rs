//! Ordered fallback chains.
//!
//! Each format is normalized by trying a fixed list of strategies in order;
//! the first one that succeeds wins. A terminal placeholder closes every chain
//! so normalization itself can never fail.

use tracing::debug;

use super::Normalized;
use crate::dataset::Dataset;
use crate::types::FormatLabel;

/// A single normalization attempt.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub attempt: fn(&str) -> anyhow::Result<Normalized>,
}

impl Strategy {
    pub const fn new(name: &'static str, attempt: fn(&str) -> anyhow::Result<Normalized>) -> Self {
        Self { name, attempt }
    }
}

/// Dataset returned when every strategy of a chain failed.
#[derive(Debug, Clone, Copy)]
pub struct Terminal {
    pub message: &'static str,
    pub label: FormatLabel,
}

impl Terminal {
    pub fn into_normalized(self) -> Normalized {
        Normalized::new(Dataset::placeholder(self.message), self.label)
    }
}

/// Run `strategies` against `content` in order.
pub fn run_chain(content: &str, strategies: &[Strategy], terminal: Terminal) -> Normalized {
    for strategy in strategies {
        match (strategy.attempt)(content) {
            Ok(normalized) => {
                debug!(
                    "Strategy '{}' produced {} rows ({})",
                    strategy.name,
                    normalized.dataset.height(),
                    normalized.label
                );
                return normalized;
            }
            Err(e) => debug!("Strategy '{}' failed: {e:#}", strategy.name),
        }
    }

    debug!("All strategies failed, using placeholder ({})", terminal.label);
    terminal.into_normalized()
}

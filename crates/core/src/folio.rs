use std::sync::atomic::{AtomicI64, Ordering};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FolioError {
    #[error("folio sequence unavailable: {0}")]
    Unavailable(String),
}

/// Quote identifiers are `<prefix>-<seq>` where the prefix encodes the event
/// type and the sequence is monotonically increasing across the service.
pub fn event_prefix(event_type: &str) -> char {
    let lowered = event_type.to_lowercase();
    if lowered.contains("corpor") {
        'C'
    } else if lowered.contains("social") {
        'S'
    } else {
        'O'
    }
}

pub fn format_folio(prefix: char, seq: i64) -> String {
    format!("{prefix}-{seq}")
}

/// Monotonic sequence backing folio generation. Implemented by the database
/// layer; the in-memory variant serves tests and offline pricing.
#[async_trait::async_trait]
pub trait FolioSequence: Send + Sync {
    async fn next(&self) -> Result<i64, FolioError>;
}

pub async fn next_folio(
    sequence: &dyn FolioSequence,
    event_type: &str,
) -> Result<String, FolioError> {
    let seq = sequence.next().await?;
    Ok(format_folio(event_prefix(event_type), seq))
}

/// Counter seeded at 99 so the first folio is `<prefix>-100`, matching the
/// persistent sequence.
#[derive(Debug)]
pub struct InMemoryFolioSequence {
    last: AtomicI64,
}

impl Default for InMemoryFolioSequence {
    fn default() -> Self {
        Self { last: AtomicI64::new(99) }
    }
}

impl InMemoryFolioSequence {
    pub fn starting_at(last: i64) -> Self {
        Self { last: AtomicI64::new(last) }
    }
}

#[async_trait::async_trait]
impl FolioSequence for InMemoryFolioSequence {
    async fn next(&self) -> Result<i64, FolioError> {
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::{event_prefix, next_folio, InMemoryFolioSequence};

    #[test]
    fn prefix_is_inferred_from_event_type_substring() {
        assert_eq!(event_prefix("Corporativo"), 'C');
        assert_eq!(event_prefix("evento CORPORATIVO anual"), 'C');
        assert_eq!(event_prefix("Social"), 'S');
        assert_eq!(event_prefix("boda social"), 'S');
        assert_eq!(event_prefix("Festival"), 'O');
        assert_eq!(event_prefix(""), 'O');
    }

    #[tokio::test]
    async fn folios_are_monotonic_and_formatted() {
        let sequence = InMemoryFolioSequence::default();
        let first = next_folio(&sequence, "Corporativo").await.expect("first");
        let second = next_folio(&sequence, "Social").await.expect("second");
        assert_eq!(first, "C-100");
        assert_eq!(second, "S-101");
    }
}

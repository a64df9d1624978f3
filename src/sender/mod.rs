mod format;
mod telegram;

pub use format::{format_message, group_thousands};
pub use telegram::TelegramSender;

use teloxide::RequestError;

use crate::common::Entry;
use crate::enrichment::Summaries;
use crate::storage::ChatIdStore;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Chat ID not found for {0}")]
    ChatNotFound(String),
    #[error("Telegram API error: {0}")]
    Telegram(String),
    #[error(transparent)]
    Request(RequestError),
}

impl From<RequestError> for DeliveryError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Api(api_error) => DeliveryError::Telegram(api_error.to_string()),
            other => DeliveryError::Request(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub label: String,
    pub reason: String,
}

/// Outcome of sending a batch; one entry failing does not stop the others
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub success_count: usize,
    pub fail_count: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    #[must_use]
    pub fn all_failed(entries: &[Entry], reason: &str) -> Self {
        let mut report = Self::default();
        for entry in entries {
            report.record_failure(entry, reason);
        }
        report
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, entry: &Entry, reason: &str) {
        self.fail_count += 1;
        self.failures.push(DeliveryFailure {
            label: entry.label(),
            reason: reason.to_string(),
        });
    }
}

pub enum Sender {
    Console(ConsoleSender),
    Telegram(TelegramSender),
}

impl Sender {
    pub async fn send_batch(
        &self,
        entries: &[Entry],
        target: &str,
        chat_ids: &mut ChatIdStore,
        summaries: &Summaries,
    ) -> DeliveryReport {
        match self {
            Sender::Console(sender) => {
                sender.send_batch(entries, target, chat_ids, summaries).await
            }
            Sender::Telegram(sender) => {
                sender.send_batch(entries, target, chat_ids, summaries).await
            }
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait DeliverySender {
    async fn send_batch(
        &self,
        entries: &[Entry],
        target: &str,
        chat_ids: &mut ChatIdStore,
        summaries: &Summaries,
    ) -> DeliveryReport;
}

/// Prints the messages instead of sending them; used when no bot token is set
pub struct ConsoleSender {}

impl DeliverySender for ConsoleSender {
    async fn send_batch(
        &self,
        entries: &[Entry],
        target: &str,
        _chat_ids: &mut ChatIdStore,
        summaries: &Summaries,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for entry in entries {
            let summary = entry
                .as_news()
                .and_then(|item| summaries.get(&item.url))
                .map(String::as_str);
            println!("--- to {target} ---\n{}\n", format_message(entry, summary));
            report.record_success();
        }
        report
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::NewsItem;
    use crate::storage::FileStorage;
    use tokio::test;

    #[test]
    async fn test_console_sender() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat_ids = ChatIdStore::from_fs(dir.path());
        let entries = vec![Entry::News(NewsItem::new(
            "Title",
            "https://example.com",
            "s",
            "",
            "",
            "",
        ))];

        let report = Sender::Console(ConsoleSender {})
            .send_batch(&entries, "@anyone", &mut chat_ids, &Summaries::new())
            .await;
        assert_eq!(report.success_count, 1);
        assert_eq!(report.fail_count, 0);
    }

    #[test]
    async fn test_all_failed() {
        let entries = vec![
            Entry::News(NewsItem::new("A", "https://a", "s", "", "", "")),
            Entry::News(NewsItem::new("B", "https://b", "s", "", "", "")),
        ];
        let report = DeliveryReport::all_failed(&entries, "no chat");
        assert_eq!(report.fail_count, 2);
        assert_eq!(report.success_count, 0);
        assert_eq!(
            report.failures[1],
            DeliveryFailure {
                label: "B".to_string(),
                reason: "no chat".to_string()
            }
        );
    }

    #[test]
    async fn test_chat_not_found_message() {
        assert_eq!(
            DeliveryError::ChatNotFound("@nobody".to_string()).to_string(),
            "Chat ID not found for @nobody"
        );
    }
}

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode, Recipient, Update};
use tracing::{info, warn};
use url::Url;

use crate::common::{http_client, Entry};
use crate::config::TelegramConfig;
use crate::enrichment::Summaries;
use crate::storage::{normalize_username, ChatIdStore, FileStorage};

use super::{format_message, DeliveryError, DeliveryReport, DeliverySender};

/// `name` is already normalized
fn update_matches(update: &Update, name: &str) -> bool {
    let same = |username: Option<&str>| username.is_some_and(|u| normalize_username(u) == name);

    update.chat().is_some_and(|chat| {
        same(chat.username())
            || chat
                .title()
                .is_some_and(|title| title.to_lowercase().contains(name))
    }) || update.from().is_some_and(|user| same(user.username.as_deref()))
}

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Delivers messages through a Telegram bot
pub struct TelegramSender {
    bot: Bot,
    send_delay: Duration,
}

impl TelegramSender {
    #[must_use]
    pub fn new(config: &TelegramConfig, timeout_secs: u64) -> Self {
        Self {
            bot: Bot::with_client(&config.token, http_client(timeout_secs)),
            send_delay: Duration::from_secs(1),
        }
    }

    /// Point the bot at another Bot API server
    #[must_use]
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.bot = self.bot.set_api_url(api_url);
        self
    }

    /// Pause between two consecutive messages
    #[must_use]
    pub fn with_send_delay(mut self, send_delay: Duration) -> Self {
        self.send_delay = send_delay;
        self
    }

    /// Turn `@username` into a numeric chat id; numeric ids pass through and any other
    /// text is treated as a channel username. Hits from `getUpdates` are added to the
    /// cache and written to disk.
    pub async fn resolve_chat_id(
        &self,
        target: &str,
        chat_ids: &mut ChatIdStore,
    ) -> Result<Recipient, DeliveryError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(DeliveryError::ChatNotFound(String::from("an empty target")));
        }
        if !target.starts_with('@') {
            return Ok(match target.parse::<i64>() {
                Ok(id) => Recipient::Id(ChatId(id)),
                Err(_) => Recipient::ChannelUsername(target.to_string()),
            });
        }

        let name = normalize_username(target);
        if let Some(chat_id) = chat_ids.get(&name) {
            return Ok(Recipient::Id(ChatId(chat_id)));
        }

        let updates = self.bot.get_updates().send().await?;
        let found = updates
            .iter()
            .find(|update| update_matches(update, &name))
            .and_then(Update::chat)
            .map(|chat| chat.id);

        match found {
            Some(chat_id) => {
                info!("Resolved @{name} to chat {chat_id}");
                chat_ids.insert(&name, chat_id.0);
                if let Err(e) = chat_ids.dump() {
                    warn!("Could not save the chat id cache: {e}");
                }
                Ok(Recipient::Id(chat_id))
            }
            None => Err(DeliveryError::ChatNotFound(format!("@{name}"))),
        }
    }

    pub async fn send_message(
        &self,
        chat_id: Recipient,
        text: String,
        disable_web_page_preview: bool,
    ) -> Result<(), DeliveryError> {
        let request = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2);
        let request = if disable_web_page_preview {
            request.link_preview_options(no_link_preview())
        } else {
            request
        };

        request.send().await?;
        Ok(())
    }
}

impl DeliverySender for TelegramSender {
    async fn send_batch(
        &self,
        entries: &[Entry],
        target: &str,
        chat_ids: &mut ChatIdStore,
        summaries: &Summaries,
    ) -> DeliveryReport {
        let chat_id = match self.resolve_chat_id(target, chat_ids).await {
            Ok(chat_id) => chat_id,
            Err(e) => {
                warn!("Could not resolve {target}: {e}");
                return DeliveryReport::all_failed(entries, &e.to_string());
            }
        };

        let mut report = DeliveryReport::default();
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.send_delay).await;
            }
            let summary = entry
                .as_news()
                .and_then(|item| summaries.get(&item.url))
                .map(String::as_str);
            let text = format_message(entry, summary);

            match self
                .send_message(chat_id.clone(), text, entry.is_report())
                .await
            {
                Ok(()) => {
                    info!("Sent '{}' to {chat_id}", entry.label());
                    report.record_success();
                }
                Err(e) => {
                    warn!("Could not send '{}': {e}", entry.label());
                    report.record_failure(entry, &e.to_string());
                }
            }
        }

        report
    }
}

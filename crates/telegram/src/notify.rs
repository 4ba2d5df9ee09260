use std::path::Path;

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{InputFile, Recipient},
};
use tracing::info;

use common::{Error, Notifier, Result, TelegramTarget};

/// Telegram rejects document captions longer than this.
const MAX_CAPTION_CHARS: usize = 1024;

/// Uploads snapshot files to one Telegram chat or channel.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: &str) -> Result<Self> {
        Ok(Self {
            bot: Bot::new(token),
            recipient: parse_recipient(chat_id)?,
        })
    }

    pub fn from_target(target: &TelegramTarget) -> Result<Self> {
        Self::new(target.token.clone(), &target.chat_id)
    }

    /// Plain text message, used for lifecycle notices.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_snapshot(&self, path: &Path, caption: &str) -> Result<()> {
        if !path.exists() {
            return Err(Error::Notify(format!("{} does not exist", path.display())));
        }

        let caption = truncate_caption(caption);
        self.bot
            .send_document(self.recipient.clone(), InputFile::file(path))
            .caption(caption)
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;

        info!(path = %path.display(), "Snapshot uploaded to Telegram");
        Ok(())
    }
}

/// `@name` addresses a public channel; anything else must be a numeric chat id.
pub fn parse_recipient(chat_id: &str) -> Result<Recipient> {
    let chat_id = chat_id.trim();
    if chat_id.starts_with('@') && chat_id.len() > 1 {
        return Ok(Recipient::ChannelUsername(chat_id.to_string()));
    }
    chat_id
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .map_err(|_| {
            Error::Config(format!(
                "TELEGRAM_CHAT_ID {chat_id:?} is neither @channel nor a numeric id"
            ))
        })
}

fn truncate_caption(caption: &str) -> String {
    if caption.chars().count() <= MAX_CAPTION_CHARS {
        return caption.to_string();
    }
    let mut out: String = caption.chars().take(MAX_CAPTION_CHARS - 1).collect();
    out.push('…');
    out
}

use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use url::Url;

use crate::{geolocation::ClientLocation, utils::escape_html};

const NO_REFERRER: &str = "нет";
const NO_USER_AGENT: &str = "неизвестно";

/// Everything known about a single page visit at the moment it is reported.
#[derive(Debug, Clone)]
pub struct VisitNotification {
    pub timestamp: DateTime<FixedOffset>,
    pub location: ClientLocation,
    pub ip: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl VisitNotification {
    pub fn render(&self) -> String {
        let user_agent = or_placeholder(&self.user_agent, NO_USER_AGENT);
        let referrer = or_placeholder(&self.referrer, NO_REFERRER);

        [
            "<b>Новый визит</b>".to_string(),
            format!("Время: {}", self.timestamp.format("%d.%m.%Y, %H:%M:%S")),
            format!("Местоположение: {}", escape_html(&self.location.to_string())),
            format!("IP: {}", escape_html(&self.ip)),
            format!("User-Agent: {}", escape_html(user_agent)),
            format!("Реферер: {}", escape_html(referrer)),
        ]
        .join("\n")
    }
}

fn or_placeholder<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    match value.as_deref() {
        Some(value) if !value.is_empty() => value,
        _ => placeholder,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: &'static str,
}

/// Bot API client bound to one bot token and one destination chat.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_url: Url,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, api_url: Url, bot_token: String, chat_id: String) -> Self {
        TelegramClient {
            client,
            api_url,
            bot_token,
            chat_id,
        }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_url.as_str().trim_end_matches('/'),
            self.bot_token
        )
    }

    /// Posts `text` to the configured chat.
    ///
    /// A rejected message is logged and swallowed; only a failure to reach
    /// the API at all is returned to the caller.
    pub async fn send_message(&self, text: String) -> anyhow::Result<()> {
        let request = SendMessageRequest {
            chat_id: self.chat_id.clone(),
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&request)
            .send()
            .await
            .context("Failed to reach Telegram API")?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Successfully sent Telegram message");
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Telegram API rejected message ({}): {}", status, body);
        }

        Ok(())
    }

    pub async fn send_visit(&self, notification: &VisitNotification) -> anyhow::Result<()> {
        self.send_message(notification.render()).await
    }
}

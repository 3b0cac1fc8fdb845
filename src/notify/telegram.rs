// src/notify/telegram.rs
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Channel, DispatchMessage, MessageId, SendError, SendErrorKind};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API client bound to one channel.
#[derive(Clone)]
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    timeout: Duration,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, SendError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let rsp = self
            .client
            .post(self.endpoint(method))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = rsp.status();
        let text = rsp.text().await.map_err(map_reqwest_error)?;

        // Errors come back as JSON too, so parse the envelope regardless of status.
        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(env) => env,
            Err(e) if status.is_success() => {
                return Err(SendError::new(
                    SendErrorKind::Decode,
                    format!("{method}: undecodable response: {e}"),
                ));
            }
            Err(_) => {
                return Err(SendError::new(
                    SendErrorKind::Api {
                        code: status.as_u16(),
                    },
                    format!("{method}: HTTP {status}"),
                ));
            }
        };

        if envelope.ok {
            return envelope.result.ok_or_else(|| {
                SendError::new(SendErrorKind::Decode, format!("{method}: ok without result"))
            });
        }

        let code = envelope.error_code.unwrap_or(status.as_u16());
        let description = envelope
            .description
            .unwrap_or_else(|| "no description".to_string());
        let retry_after = envelope.parameters.and_then(|p| p.retry_after);
        let kind = if code == 429 {
            SendErrorKind::RateLimited
        } else {
            SendErrorKind::Api { code }
        };
        Err(SendError {
            kind,
            message: format!("{method}: {code} {description}"),
            retry_after,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SendError {
    if err.is_timeout() {
        return SendError::new(SendErrorKind::Timeout, err.to_string());
    }
    SendError::new(SendErrorKind::Network, err.to_string())
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct PinBody<'a> {
    chat_id: &'a str,
    message_id: MessageId,
    disable_notification: bool,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

#[async_trait::async_trait]
impl Channel for TelegramChannel {
    async fn send(&self, msg: &DispatchMessage) -> Result<MessageId, SendError> {
        let body = SendMessageBody {
            chat_id: &self.chat_id,
            text: &msg.text,
            parse_mode: msg.parse_mode.api_value(),
            disable_web_page_preview: msg.disable_preview,
        };
        let sent: SentMessage = self.call("sendMessage", &body).await?;
        Ok(sent.message_id)
    }

    async fn pin(&self, id: MessageId) -> Result<(), SendError> {
        let body = PinBody {
            chat_id: &self.chat_id,
            message_id: id,
            disable_notification: true,
        };
        let _: bool = self.call("pinChatMessage", &body).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.chat_id
    }
}

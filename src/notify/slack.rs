use anyhow::{bail, Context, Result};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::info;

use crate::renewal::outcome::RenewalOutcome;
use crate::utils::constants::{SLACK_COLOR_FAILURE, SLACK_COLOR_SUCCESS, SLACK_MESSAGE_TITLE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub text: String,
}

/// One attachment per processed token.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    attachments: Vec<Attachment>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_status(&mut self, token_prefix: &str, success: bool, message: &str) {
        let color = if success {
            SLACK_COLOR_SUCCESS
        } else {
            SLACK_COLOR_FAILURE
        };
        self.attachments.push(Attachment {
            color: color.to_owned(),
            text: format!("Token {}...: {}", token_prefix, message),
        });
    }

    pub fn add_outcome(&mut self, outcome: &RenewalOutcome) {
        self.add_status(&outcome.token_prefix, outcome.success, &outcome.message);
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
    attachments: &'a [Attachment],
}

#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    webhook_url: Url,
}

impl SlackNotifier {
    pub fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("could not build HTTP client")?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    pub async fn notify(&self, registry: &StatusRegistry) -> Result<()> {
        let message = WebhookMessage {
            text: SLACK_MESSAGE_TITLE,
            attachments: registry.attachments(),
        };

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&message)
            .send()
            .await
            // the webhook path is a credential
            .map_err(reqwest::Error::without_url)
            .context("failed to send slack notification")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("slack returned error: status={}, body={}", status, body);
        }

        info!(
            "sent Slack notification with {} statuses",
            registry.attachments().len()
        );
        Ok(())
    }
}

//! Client for the answer-generation collaborator.
//!
//! The service takes a user name and an optional message and replies with
//! a message plus an optional verse and reference, which the `ask`
//! subcommand feeds into the playback pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    user: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerReply {
    pub message: String,
    pub verse: Option<String>,
    pub reference: Option<String>,
}

impl AnswerReply {
    /// The full text to speak: message, then verse, then reference.
    pub fn spoken_text(&self) -> String {
        let mut out = self.message.trim().to_string();
        for part in [self.verse.as_deref(), self.reference.as_deref()] {
            if let Some(part) = part {
                let part = part.trim();
                if !part.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(part);
                }
            }
        }
        out
    }
}

pub async fn fetch_answer(
    client: &reqwest::Client,
    url: &str,
    user: &str,
    message: Option<&str>,
) -> Result<AnswerReply> {
    let response = client
        .post(url)
        .json(&AnswerRequest { user, message })
        .send()
        .await
        .context("Failed to reach the answer service")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Answer service error ({status}): {body}");
    }

    response
        .json()
        .await
        .context("Failed to parse the answer service response")
}

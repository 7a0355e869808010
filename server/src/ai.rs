//! Thin client for the external chat-completion text service, used to
//! bold key phrases in a reflection and to produce the collective
//! executive summary. Neither call is cancellable; callers own rollback.

use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::BackendError;
use crate::submission::Submission;

pub trait TextModel {
    /// Returns the reflection with `**bold**` markdown applied to key
    /// terms and ideas.
    fn highlight(&self, question1: &str) -> BoxFuture<Result<String, BackendError>>;

    /// Returns a markdown executive summary over the given entries.
    fn executive_summary(
        &self,
        entries: Vec<SummaryEntry>,
    ) -> BoxFuture<Result<String, BackendError>>;
}

/// One public submission as presented to the summary prompt, with the
/// "Other" categories already folded into their free-text overrides.
#[derive(Clone, Debug, Serialize)]
pub struct SummaryEntry {
    pub response: String,
    pub occupation: String,
    pub sector: String,
}

impl SummaryEntry {
    pub fn from_submission(submission: &Submission) -> Self {
        SummaryEntry {
            response: submission.question1.clone(),
            occupation: submission.folded_occupation().to_owned(),
            sector: submission.folded_sector().to_owned(),
        }
    }
}

/// A client for an OpenAI-compatible chat-completions endpoint.
pub struct AiClient {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl AiClient {
    /// Creates a new instance. `endpoint` is the full chat-completions
    /// URL, including any version prefix.
    pub fn new(endpoint: Url, model: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(info::user_agent())
            .build()
            .expect("construct HTTP client");

        AiClient {
            client,
            endpoint,
            model,
        }
    }

    pub fn from_env() -> Self {
        use crate::config::get_variable;

        let base_url =
            Url::parse(&get_variable("BACKEND_AI_BASE_URL")).expect("parse BACKEND_AI_BASE_URL");
        let endpoint = base_url
            .join("chat/completions")
            .expect("join chat/completions onto BACKEND_AI_BASE_URL");

        AiClient::new(endpoint, get_variable("BACKEND_AI_MODEL"))
    }

    async fn complete(&self, prompt: String, temperature: f32) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| BackendError::AiRequest { source })?
            .json()
            .await
            .map_err(|source| BackendError::AiRequest { source })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::AiResponse("no message content".into()))
    }
}

impl TextModel for AiClient {
    fn highlight(&self, question1: &str) -> BoxFuture<Result<String, BackendError>> {
        let prompt = highlight_prompt(question1);

        async move {
            let content = self.complete(prompt, 0.3).await?;

            extract_field(&content, "boldedText")
        }
        .boxed()
    }

    fn executive_summary(
        &self,
        entries: Vec<SummaryEntry>,
    ) -> BoxFuture<Result<String, BackendError>> {
        async move {
            let prompt = summary_prompt(&entries)?;
            let content = self.complete(prompt, 0.7).await?;

            extract_field(&content, "executiveSummary")
        }
        .boxed()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

fn highlight_prompt(question1: &str) -> String {
    format!(
        r#"You are tasked with analyzing the following text and making key terms and important ideas bold using **bold** markdown syntax.

Instructions:
1. Identify KEY terms (important nouns, concepts, names, places, etc.)
2. Identify BOLD ideas (important statements, conclusions, main points)
3. Return a JSON object with a "boldedText" field containing the text with **bold** markdown applied to key terms and ideas
4. Do NOT change the original text content, only add **bold** formatting
5. Be selective - only bold truly important terms and ideas
6. Avoid bolding too many words
7. Bold text should be concise and to the point

Text to process:
{}

Return only a valid JSON object with a single string field named "boldedText"."#,
        question1
    )
}

fn summary_prompt(entries: &[SummaryEntry]) -> Result<String, BackendError> {
    let data = serde_json::to_string_pretty(entries)
        .map_err(|e| BackendError::AiResponse(format!("could not encode summary data: {}", e)))?;

    Ok(format!(
        r#"You are an executive summary generator analyzing collective data from public submissions. Create an empowering, professional executive summary that captures the current mental state and wellbeing of the youth in Brunei.

Instructions:
1. Analyze patterns across all responses, occupations, and sectors
2. Identify common themes, aspirations, and challenges mentioned
3. Create an inspiring narrative about the collective potential and diversity
4. Highlight the range of sectors and occupations represented
5. Use professional, empowering language suitable for stakeholders or investors
6. Keep the summary comprehensive but concise (4-6 sentences)
7. Focus on collective strengths, shared values, and community potential
8. Pick out one quote from the submissions that is most representative of the collective mindset and add it to the summary in block quotes. Indicate the occupation and sector of the person who said the quote.
9. Format the response in MARKDOWN with **bold** text for key terms, important statistics, and impactful phrases. Avoid bolding too many words.
10. Use bullet points or other markdown formatting where appropriate to enhance readability
11. Return a JSON object with an "executiveSummary" field containing the markdown-formatted text

Data to analyze ({} submissions):
{}

Return only a valid JSON object with a single string field named "executiveSummary"."#,
        entries.len(),
        data
    ))
}

/// Pulls the named string field out of the model's output: first as
/// straight JSON, then by a best-effort search for an embedded object,
/// mirroring how loosely these models follow format instructions.
fn extract_field(content: &str, field: &str) -> Result<String, BackendError> {
    if let Some(text) = field_of(content, field) {
        return Ok(text);
    }

    let pattern = format!(r#"\{{[^{{}}]*"{}"[^{{}}]*\}}"#, regex::escape(field));
    let finder = Regex::new(&pattern).expect("embedded-object pattern is valid");

    if let Some(found) = finder.find(content) {
        if let Some(text) = field_of(found.as_str(), field) {
            return Ok(text);
        }
    }

    Err(BackendError::AiResponse(format!(
        "no \"{}\" field in model output",
        field
    )))
}

fn field_of(json: &str, field: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()?
        .get(field)?
        .as_str()
        .map(str::to_owned)
}

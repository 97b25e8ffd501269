use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info};

use crate::error::GlamoError;
use crate::models::{AnalysisResult, StyleSuggestion};
use crate::preprocess::Preprocessed;

/// Optional form selections sent alongside the photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected_app: Option<String>,
    pub style: Option<String>,
}

/// The external services that turn a photo into analysis text.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, photo: &Preprocessed, selection: &Selection) -> Result<AnalysisResult, GlamoError>;
    async fn suggest_style(&self, photo: &Preprocessed) -> Result<StyleSuggestion, GlamoError>;
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[truncated {} chars]", &s[..idx], s[idx..].chars().count()),
        None => s.to_string(),
    }
}

/// `detail` string of a FastAPI-style error body, if any.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

pub struct AnalysisClient {
    client: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn photo_part(photo: &Preprocessed) -> Result<Part, GlamoError> {
        let part = Part::stream(photo.bytes()).file_name(photo.file_name().to_string());
        Ok(part.mime_str(photo.media_type())?)
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, GlamoError> {
        let url = format!("{}/{}", self.base_url, path);
        info!("🔗 Making request to: {}", url);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        info!("📥 Response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            error!("❌ Analysis service error response: {}", truncate(&body, 500));
            return Err(GlamoError::Server { status, detail: extract_detail(&body) });
        }

        info!("📥 Raw analysis response: {}", truncate(&body, 1000));
        serde_json::from_str(&body).map_err(|e| {
            error!("❌ Unparseable analysis response: {}", e);
            GlamoError::Server { status, detail: None }
        })
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    async fn analyze(&self, photo: &Preprocessed, selection: &Selection) -> Result<AnalysisResult, GlamoError> {
        let mut form = Form::new().part("photo", Self::photo_part(photo)?);
        if let Some(app) = &selection.selected_app {
            form = form.text("selected_app", app.clone());
        }
        if let Some(style) = &selection.style {
            form = form.text("style", style.clone());
        }
        self.post_form("analyze", form).await
    }

    async fn suggest_style(&self, photo: &Preprocessed) -> Result<StyleSuggestion, GlamoError> {
        let form = Form::new().part("photo", Self::photo_part(photo)?);
        self.post_form("suggest_style_app", form).await
    }
}

/// Offline backend returning canned results, used when no analysis service
/// is configured.
pub struct DemoBackend;

#[async_trait]
impl AnalysisBackend for DemoBackend {
    async fn analyze(&self, photo: &Preprocessed, selection: &Selection) -> Result<AnalysisResult, GlamoError> {
        info!("Using demo mode - no analysis service called ({} bytes)", photo.bytes().len());
        let style = selection.style.as_deref().unwrap_or("Natural");
        Ok(AnalysisResult {
            mood_narrative: Some(format!("- Style: {style}\n- Mood: Unknown\n- Scene: Unknown\n- Colors: Unknown")),
            editing_narrative: Some("Step 1: Auto Enhance – Apply\nReason: Default enhancement.".to_string()),
            captions: Some(vec!["#Glamo #GlowGoals #Inspo".to_string(), "#VibeCheck #Glamo #Magic".to_string()]),
            songs: Some(Vec::new()),
        })
    }

    async fn suggest_style(&self, _photo: &Preprocessed) -> Result<StyleSuggestion, GlamoError> {
        info!("Using demo mode - returning default style suggestion");
        Ok(StyleSuggestion { result: "Style: Bright & Airy\nApp: iPhone Photos App\nReason: Default fallback.".to_string() })
    }
}

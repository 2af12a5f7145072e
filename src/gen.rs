//! Generative backends: expert answer text and speech synthesis

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Shown instead of an answer when the text backend fails or returns
/// nothing
pub const ANSWER_UNAVAILABLE: &str = "Could not generate an answer at this time.";

/// Client for the generative text and speech endpoints
pub struct GenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    tts_model: String,
    tts_voice: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "googleSearch")]
    google_search: serde_json::Value,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'a str>,
    #[serde(rename = "speechConfig")]
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
struct SpeechConfig<'a> {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
struct VoiceConfig<'a> {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt: PrebuiltVoice<'a>,
}

#[derive(Serialize)]
struct PrebuiltVoice<'a> {
    #[serde(rename = "voiceName")]
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "inlineData", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenAiClient {
    /// Create a client for the generative endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(
        base_url: &str,
        api_key: &str,
        text_model: &str,
        tts_model: &str,
        tts_voice: &str,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("generative API key required".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            text_model: text_model.to_string(),
            tts_model: tts_model.to_string(),
            tts_voice: tts_voice.to_string(),
        })
    }

    /// Generate an expert-level answer for an interview question, with
    /// search grounding. Returns a user-visible placeholder when the model
    /// produces no text.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails; callers surface a placeholder
    /// instead of crashing.
    pub async fn generate_expert_answer(&self, question_text: &str) -> Result<String> {
        let prompt = format!(
            "Acting as a Senior Angular Architect with 9+ years of deep experience, \
             provide a detailed technical explanation for the following interview \
             question: \"{question_text}\". The explanation should include architecture \
             insights, code examples where relevant, and industry best practices that \
             would impress an interviewer. Keep it structured and professional."
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            tools: Some(vec![Tool {
                google_search: serde_json::json!({}),
            }]),
            generation_config: None,
        };

        let response = self.generate(&self.text_model, &request).await?;
        let text = first_part(&response).and_then(|p| p.text.clone());
        Ok(text.unwrap_or_else(|| ANSWER_UNAVAILABLE.to_string()))
    }

    /// Synthesize speech for an answer; returns raw 16-bit mono PCM at
    /// 24 kHz, decoded from the base64 response payload
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or the response carries no audio
    pub async fn generate_tts(&self, text: &str) -> Result<Vec<u8>> {
        let prompt = format!(
            "Speak as a professional tech mentor in a podcast style. \
             Be clear and engaging: {text}"
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt: PrebuiltVoice {
                            voice_name: &self.tts_voice,
                        },
                    },
                },
            }),
        };

        let response = self.generate(&self.tts_model, &request).await?;
        let base64_audio = first_part(&response)
            .and_then(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone())
            .ok_or_else(|| Error::Generation("TTS response carried no audio".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(base64_audio)
            .map_err(|e| Error::Generation(format!("TTS audio decode failed: {e}")))
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse> {
        let url = format!(
            "{}/v1beta/models/{model}:generateContent?key={}",
            self.base_url, self.api_key
        );

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "generative API error {status}: {body}"
            )));
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

/// Decode a success body; malformed payloads stay in the generation error
/// class so callers can fall back to the placeholder
fn parse_response(body: &str) -> Result<GenerateResponse> {
    serde_json::from_str(body)
        .map_err(|e| Error::Generation(format!("malformed generative response: {e}")))
}

fn first_part(response: &GenerateResponse) -> Option<&ResponsePart> {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_success_body_is_a_generation_error() {
        let err = parse_response("<html>upstream error</html>").unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn empty_response_parses_with_no_parts() {
        let response = parse_response("{}").unwrap();
        assert!(first_part(&response).is_none());
    }
}

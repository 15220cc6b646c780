//! Dialogflow CX v3 REST payloads for `sessions.detectIntent`.
//!
//! Only the fields the conversation flow reads or writes are modelled.
//! Google omits zero-valued and empty fields from JSON, so every response
//! field is defaulted.

use lasting_conversation::{
    DetectRequest, DetectResponse, Page, Parameters, Sentiment, TurnRequest,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectIntentRequest {
    pub query_input: QueryInput,
    pub query_params: QueryParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryInput {
    pub text: TextInput,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TextInput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryParameters {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub analyze_query_text_sentiment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
}

impl From<&DetectRequest> for DetectIntentRequest {
    fn from(request: &DetectRequest) -> Self {
        let (current_page, parameters) = match &request.turn {
            TurnRequest::Fresh => (None, None),
            TurnRequest::Resumption {
                current_page,
                parameters,
            } => (Some(current_page.name.clone()), Some(parameters.clone())),
        };

        Self {
            query_input: QueryInput {
                text: TextInput {
                    text: request.utterance.clone(),
                },
                language_code: request.language_code.clone(),
            },
            query_params: QueryParameters {
                analyze_query_text_sentiment: request.analyze_sentiment,
                current_page,
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectIntentResponse {
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResult {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub trigger_intent: Option<String>,
    #[serde(default)]
    pub response_messages: Vec<ResponseMessage>,
    #[serde(default, rename = "match")]
    pub intent_match: Option<Match>,
    #[serde(default)]
    pub sentiment_analysis_result: Option<SentimentAnalysisResult>,
    #[serde(default)]
    pub parameters: Option<Parameters>,
    #[serde(default)]
    pub current_page: Option<Page>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub text: Option<TextMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TextMessage {
    #[serde(default)]
    pub text: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Match {
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SentimentAnalysisResult {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub magnitude: f64,
}

impl QueryResult {
    pub(crate) fn into_detect_response(self) -> DetectResponse {
        let reply_messages = self
            .response_messages
            .into_iter()
            .filter_map(|message| message.text)
            .filter_map(|text| text.text.into_iter().next())
            .collect();

        let detected_text = self
            .text
            .or(self.transcript)
            .or(self.trigger_intent)
            .unwrap_or_default();

        DetectResponse {
            reply_messages,
            detected_text,
            confidence: self.intent_match.and_then(|m| m.confidence),
            sentiment: self.sentiment_analysis_result.map(|s| Sentiment {
                score: s.score,
                magnitude: s.magnitude,
            }),
            parameters: self.parameters.unwrap_or_default(),
            current_page: self.current_page.unwrap_or_else(|| Page::new("", "")),
        }
    }
}

/// Google API error envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GoogleErrorBody {
    #[serde(default)]
    pub error: Option<GoogleError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GoogleError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::ApiResult;
use crate::app::AppState;
use crate::error::Error;
use crate::models::{to_percent, Sentiment};
use crate::pipeline::ModelInfo;
use crate::validators::validate_text_length;

pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub texts: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Analyzed {
        text: String,
        sentiment: Sentiment,
        confidence: f64,
    },
    /// `text` echoes the submitted item, which may not be a string.
    Failed {
        text: Value,
        error: String,
    },
}

pub(crate) fn percent_map(probabilities: &BTreeMap<Sentiment, f64>) -> BTreeMap<Sentiment, f64> {
    probabilities
        .iter()
        .map(|(&label, &p)| (label, to_percent(p)))
        .collect()
}

#[tracing::instrument(skip_all)]
pub async fn analyze_text(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    validate_text_length(&body.text, &state.limits)?;

    let analysis = state.analyzer.analyze(&body.text)?;
    tracing::info!(sentiment = %analysis.sentiment, "Text analyzed");

    Ok(Json(json!({
        "sentiment": analysis.sentiment,
        "confidence": to_percent(analysis.confidence),
        "probabilities": percent_map(&analysis.probabilities),
        "original_text": analysis.original_text,
    })))
}

/// Analyzes up to [`MAX_BATCH_SIZE`] texts; an item that is not a valid
/// string gets an error entry without affecting the others.
#[tracing::instrument(skip_all)]
pub async fn analyze_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    if body.texts.len() > MAX_BATCH_SIZE {
        return Err(Error::Validation(format!(
            "{MAX_BATCH_SIZE} texts maximum per request"
        ))
        .into());
    }

    let mut results = Vec::with_capacity(body.texts.len());
    for item in body.texts {
        let text = match item {
            Value::String(text) => text,
            Value::Null => {
                results.push(BatchItem::Failed {
                    text: Value::Null,
                    error: "Text cannot be empty".into(),
                });
                continue;
            }
            other => {
                results.push(BatchItem::Failed {
                    text: other,
                    error: "Text must be a string".into(),
                });
                continue;
            }
        };

        let item = match validate_text_length(&text, &state.limits) {
            Ok(()) => {
                // An untrained model fails the whole request, not a single item.
                let analysis = state.analyzer.analyze(&text)?;
                BatchItem::Analyzed {
                    text,
                    sentiment: analysis.sentiment,
                    confidence: to_percent(analysis.confidence),
                }
            }
            Err(err) => BatchItem::Failed {
                text: Value::String(text),
                error: err.to_string(),
            },
        };
        results.push(item);
    }

    Ok(Json(json!({ "total": results.len(), "results": results })))
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.analyzer.info())
}

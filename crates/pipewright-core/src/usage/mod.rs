//! Token usage accounting for chat completions.
//!
//! Costs are estimated from a small rate card keyed on the model name.
//! Recording is best-effort: a sink failure is logged and never fails the
//! step that produced the usage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::usage::UsageRecord;

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCard {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const GPT_4O: RateCard = RateCard { input_per_million: 5.0, output_per_million: 15.0 };
const GPT_4_TURBO: RateCard = RateCard { input_per_million: 10.0, output_per_million: 30.0 };
const GPT_35: RateCard = RateCard { input_per_million: 0.5, output_per_million: 1.5 };
const FALLBACK: RateCard = RateCard { input_per_million: 30.0, output_per_million: 60.0 };

/// Pick the rate card for a model name. Matching is case-insensitive and the
/// first matching rule wins.
pub fn rate_for(model_name: &str) -> RateCard {
    let name = model_name.to_lowercase();
    if name.contains("gpt-4o") {
        GPT_4O
    } else if name.contains("turbo") || name.contains("gpt-4.1") {
        GPT_4_TURBO
    } else if name.contains("gpt-3.5") {
        GPT_35
    } else {
        FALLBACK
    }
}

pub fn estimate_cost(model_name: &str, tokens_input: u64, tokens_output: u64) -> f64 {
    let rate = rate_for(model_name);
    (tokens_input as f64 * rate.input_per_million) / 1_000_000.0
        + (tokens_output as f64 * rate.output_per_million) / 1_000_000.0
}

/// Destination for usage records.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, record: UsageRecord) -> Result<(), EngineError>;
}

/// A single call's token counts, as reported by the provider.
#[derive(Debug, Clone)]
pub struct UsageEvent<'a> {
    pub user_id: &'a str,
    pub app_name: &'a str,
    pub model_name: &'a str,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub total_tokens: u64,
    pub trace_id: Option<&'a str>,
}

#[derive(Clone)]
pub struct UsageRecorder {
    sink: Arc<dyn UsageSink>,
}

impl UsageRecorder {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self { sink }
    }

    /// Price and persist an event. Returns the record that was attempted.
    pub async fn record(&self, event: UsageEvent<'_>) -> UsageRecord {
        let record = UsageRecord {
            id: Uuid::new_v4().to_string(),
            user_id: event.user_id.to_string(),
            app_name: event.app_name.to_string(),
            model_name: event.model_name.to_string(),
            tokens_input: event.tokens_input,
            tokens_output: event.tokens_output,
            total_tokens: event.total_tokens,
            estimated_cost: estimate_cost(event.model_name, event.tokens_input, event.tokens_output),
            trace_id: event.trace_id.map(String::from),
            timestamp: Utc::now(),
        };

        match self.sink.record(record.clone()).await {
            Ok(()) => tracing::debug!(
                user_id = %record.user_id,
                model = %record.model_name,
                tokens = record.total_tokens,
                cost = record.estimated_cost,
                "Usage recorded"
            ),
            Err(e) => tracing::warn!(
                user_id = %record.user_id,
                model = %record.model_name,
                "Failed to record usage: {}",
                e
            ),
        }
        record
    }
}

//! Sentiment classification prompt, response parsing and scoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalyticsError;

/// Confidence used when the classifier omits it.
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positivo,
    #[default]
    Neutro,
    Negativo,
}

impl SentimentLabel {
    /// Case-insensitive parse; anything unrecognized is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positivo" => Self::Positivo,
            "negativo" => Self::Negativo,
            _ => Self::Neutro,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positivo => "positivo",
            Self::Neutro => "neutro",
            Self::Negativo => "negativo",
        }
    }

    fn sign(&self) -> f64 {
        match self {
            Self::Positivo => 1.0,
            Self::Neutro => 0.0,
            Self::Negativo => -1.0,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub confidence: f64,
    pub emotions: Vec<String>,
    pub reason: String,
}

impl SentimentResult {
    /// Neutral result with zero confidence, used when classification fails.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            label: SentimentLabel::Neutro,
            confidence: 0.0,
            emotions: Vec::new(),
            reason: format!("Falha na análise: {}", reason),
        }
    }

    pub fn score(&self) -> f64 {
        score_from_label(self.label, self.confidence)
    }
}

/// One point of a session's sentiment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    /// 1-based count of user messages when the analysis ran.
    pub idx: usize,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub score: f64,
}

impl SentimentPoint {
    pub fn new(idx: usize, result: &SentimentResult) -> Self {
        Self {
            idx,
            label: result.label,
            confidence: result.confidence,
            score: result.score(),
        }
    }
}

/// Instruction sent to the classifier model for `text`.
pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "Você é um classificador de sentimento. Classifique a mensagem a seguir.\n\
         Responda APENAS com JSON válido com as chaves exatamente assim:\n\
         {{\"label\":\"positivo|neutro|negativo\",\"confidence\":0.0-1.0,\"emotions\":[\"...\"],\"reason\":\"...\"}}\n\
         Mensagem:\n{}",
        text.trim()
    )
}

/// Signed score in [-1, 1]: +confidence, 0 or -confidence by label,
/// rounded to three decimals.
pub fn score_from_label(label: SentimentLabel, confidence: f64) -> f64 {
    let c = if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    };
    let score = label.sign() * c;
    let rounded = (score * 1000.0).round() / 1000.0;
    // Avoid emitting -0.0 for neutral labels.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Parse the classifier's raw JSON reply into a normalized result.
pub fn parse_sentiment(raw: &str) -> Result<SentimentResult, AnalyticsError> {
    let data: Value = serde_json::from_str(raw.trim())
        .map_err(|e| AnalyticsError::MalformedSentiment(e.to_string()))?;
    let obj = data.as_object().ok_or_else(|| {
        AnalyticsError::MalformedSentiment("expected a JSON object".to_string())
    })?;

    let label = match obj.get("label") {
        Some(Value::String(s)) => SentimentLabel::from_label(s),
        Some(other) => SentimentLabel::from_label(&other.to_string()),
        None => SentimentLabel::Neutro,
    };

    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => DEFAULT_CONFIDENCE,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_CONFIDENCE),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            AnalyticsError::MalformedSentiment(format!("invalid confidence: {}", s))
        })?,
        Some(other) => {
            return Err(AnalyticsError::MalformedSentiment(format!(
                "invalid confidence: {}",
                other
            )))
        }
    };
    let confidence = if confidence.is_nan() {
        DEFAULT_CONFIDENCE
    } else {
        confidence.clamp(0.0, 1.0)
    };

    let emotions = match obj.get("emotions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        Some(other) => vec![value_text(other)],
    };
    let emotions = emotions
        .into_iter()
        .filter(|e| !e.trim().is_empty())
        .collect();

    let reason = obj
        .get("reason")
        .map(value_text)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(SentimentResult {
        label,
        confidence,
        emotions,
        reason,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

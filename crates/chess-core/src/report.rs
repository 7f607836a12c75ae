//! Coaching report schemas and validation of LLM output.
//!
//! The generator is treated as an untrusted source: top-level scalars are
//! required, every array is optional, and array elements that do not match
//! their schema (unknown enum values, non-positive move numbers, wrong types)
//! are dropped individually.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shakmaty::fen::Fen;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Report is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Report does not match schema: {0}")]
    Schema(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MistakeCategory {
    Inaccuracy,
    Mistake,
    Blunder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "1-0")]
    WhiteWins,
    #[serde(rename = "0-1")]
    BlackWins,
    #[serde(rename = "1/2-1/2")]
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Tactic,
    Endgame,
    Opening,
    Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMoment {
    #[serde(deserialize_with = "move_number")]
    pub move_number: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "centipawns")]
    pub evaluation_change: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mistake {
    #[serde(deserialize_with = "move_number")]
    pub move_number: u32,
    pub move_played: String,
    pub category: MistakeCategory,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_suggestion_explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub exercise_type: ExerciseType,
    pub estimated_level: EstimatedLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReport {
    pub summary: String,
    pub analyzed_side: Side,
    pub result: GameResult,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub mistakes: Vec<Mistake>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub recommended_exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequentError {
    pub theme: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub how_to_punish: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveVariant {
    #[serde(rename = "move")]
    pub mv: String,
    #[serde(default)]
    pub is_best: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentExercise {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub exercise_type: ExerciseType,
    pub estimated_level: EstimatedLevel,
    /// Cleared when the generator's FEN does not describe a legal position.
    #[serde(default, deserialize_with = "legal_fen")]
    pub position_fen: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub solution: Vec<String>,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub weakness_exploited: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub move_variants: Vec<MoveVariant>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub opponent_moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentReport {
    pub global_summary: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub main_weaknesses: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub main_strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub frequent_errors: Vec<FrequentError>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub recommended_exercises: Vec<OpponentExercise>,
}

/// Validate the generator's reply for a single-game report.
pub fn validate_game_report(content: &str) -> Result<GameReport, ReportError> {
    let value = parse_object(content)?;
    for field in ["summary", "analyzedSide", "result"] {
        require_field(&value, field)?;
    }
    let report: GameReport =
        serde_json::from_value(value).map_err(|e| ReportError::Schema(e.to_string()))?;
    if report.summary.trim().is_empty() {
        return Err(ReportError::MissingField("summary"));
    }
    Ok(report)
}

/// Validate the generator's reply for an opponent report.
pub fn validate_opponent_report(content: &str) -> Result<OpponentReport, ReportError> {
    let value = parse_object(content)?;
    require_field(&value, "globalSummary")?;
    let report: OpponentReport =
        serde_json::from_value(value).map_err(|e| ReportError::Schema(e.to_string()))?;
    if report.global_summary.trim().is_empty() {
        return Err(ReportError::MissingField("globalSummary"));
    }
    Ok(report)
}

fn parse_object(content: &str) -> Result<Value, ReportError> {
    let trimmed = strip_code_fence(content.trim());
    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| ReportError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ReportError::InvalidJson("expected a JSON object".into()));
    }
    Ok(value)
}

fn require_field(value: &Value, field: &'static str) -> Result<(), ReportError> {
    match value.get(field) {
        None | Some(Value::Null) => Err(ReportError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ReportError::MissingField(field)),
        Some(_) => Ok(()),
    }
}

/// Some models wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = raw else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Dropping report element that does not match schema: {e}");
                None
            }
        })
        .collect())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('+').parse().ok(),
        _ => None,
    }
}

fn move_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_number(&value)
        .filter(|n| n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid move number: {value}")))
}

fn centipawns<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_number(&value)
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
        .unwrap_or(0))
}

fn legal_fen<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::String(text)) = raw else {
        return Ok(None);
    };
    let legal = text
        .trim()
        .parse::<Fen>()
        .ok()
        .and_then(|fen| fen.into_position::<shakmaty::Chess>(shakmaty::CastlingMode::Standard).ok())
        .is_some();
    if legal {
        Ok(Some(text.trim().to_string()))
    } else {
        tracing::warn!(fen = %text, "Clearing exercise FEN that is not a legal position");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_report() -> Value {
        json!({
            "summary": "A sharp Sicilian.",
            "analyzedSide": "White",
            "result": "1-0"
        })
    }

    #[test]
    fn missing_arrays_default_to_empty() {
        let report = validate_game_report(&minimal_report().to_string()).unwrap();
        assert!(report.key_moments.is_empty());
        assert!(report.mistakes.is_empty());
        assert!(report.recommended_exercises.is_empty());
        assert_eq!(report.result, GameResult::WhiteWins);
    }

    #[test]
    fn missing_scalars_are_rejected() {
        for field in ["summary", "analyzedSide", "result"] {
            let mut value = minimal_report();
            value.as_object_mut().unwrap().remove(field);
            assert_eq!(
                validate_game_report(&value.to_string()),
                Err(ReportError::MissingField(field))
            );
        }
    }

    #[test]
    fn blank_summary_is_rejected() {
        let mut value = minimal_report();
        value["summary"] = json!("   ");
        assert_eq!(
            validate_game_report(&value.to_string()),
            Err(ReportError::MissingField("summary"))
        );
    }

    #[test]
    fn invalid_scalar_enum_is_schema_error() {
        let mut value = minimal_report();
        value["result"] = json!("win");
        assert!(matches!(
            validate_game_report(&value.to_string()),
            Err(ReportError::Schema(_))
        ));
    }

    #[test]
    fn non_json_is_rejected() {
        assert!(matches!(
            validate_game_report("Sure! Here is your report."),
            Err(ReportError::InvalidJson(_))
        ));
        assert!(matches!(validate_game_report("[1, 2]"), Err(ReportError::InvalidJson(_))));
    }

    #[test]
    fn nonconforming_elements_are_dropped() {
        let mut value = minimal_report();
        value["mistakes"] = json!([
            {"moveNumber": 12, "movePlayed": "Qe2", "category": "inaccuracy", "explanation": "Passive.", "bestSuggestion": "Rd1"},
            {"moveNumber": 14, "movePlayed": "Nxd5", "category": "catastrophe", "explanation": "?"},
            {"moveNumber": 0, "movePlayed": "h3", "category": "blunder"},
            {"moveNumber": "22", "movePlayed": "h3", "category": "blunder"},
            "not an object"
        ]);
        value["keyMoments"] = json!([
            {"moveNumber": 5, "description": "Opening edge", "evaluationChange": 85},
            {"moveNumber": 9.0, "description": "Drift", "evaluationChange": -42.6},
            {"moveNumber": 11, "description": "Sign only", "evaluationChange": "+120"},
            {"moveNumber": -3, "description": "Bad"}
        ]);
        value["recommendedExercises"] = json!("none");

        let report = validate_game_report(&value.to_string()).unwrap();
        assert_eq!(report.mistakes.len(), 2);
        assert_eq!(report.mistakes[0].best_suggestion.as_deref(), Some("Rd1"));
        assert_eq!(report.mistakes[1].move_number, 22);
        assert_eq!(report.mistakes[1].category, MistakeCategory::Blunder);

        let evals: Vec<i32> = report.key_moments.iter().map(|k| k.evaluation_change).collect();
        assert_eq!(evals, vec![85, -43, 120]);
        assert!(report.recommended_exercises.is_empty());
    }

    #[test]
    fn code_fenced_reply_is_accepted() {
        let content = format!("```json\n{}\n```", minimal_report());
        assert!(validate_game_report(&content).is_ok());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut value = minimal_report();
        value["mistakes"] = json!([{"moveNumber": 3, "movePlayed": "f3", "category": "mistake"}]);
        let report = validate_game_report(&value.to_string()).unwrap();
        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["analyzedSide"], "White");
        assert_eq!(out["result"], "1-0");
        assert_eq!(out["mistakes"][0]["movePlayed"], "f3");
        assert!(out["mistakes"][0].get("bestSuggestion").is_none());
    }

    #[test]
    fn opponent_report_coerces_exercises() {
        let content = json!({
            "globalSummary": "Aggressive but careless.",
            "mainWeaknesses": ["Back rank", 7, "Time trouble"],
            "frequentErrors": [{"theme": "Back rank", "description": "Forgets luft", "howToPunish": "Rook lifts"}],
            "recommendedExercises": [
                {
                    "title": "Punish the back rank",
                    "description": "Find the mate",
                    "exerciseType": "tactic",
                    "estimatedLevel": "intermediate",
                    "positionFen": "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
                    "solution": ["Rd8#"],
                    "hint": "Look at the eighth rank",
                    "weaknessExploited": "Back rank",
                    "moveVariants": [
                        {"move": "Rd8#", "isBest": true, "explanation": "Mate"},
                        {"move": "h3", "isBest": false},
                        {"isBest": true}
                    ],
                    "opponentMoves": ["h6"]
                },
                {
                    "title": "Broken FEN",
                    "exerciseType": "endgame",
                    "estimatedLevel": "advanced",
                    "positionFen": "not a fen"
                },
                {"title": "No type", "estimatedLevel": "beginner"}
            ]
        });

        let report = validate_opponent_report(&content.to_string()).unwrap();
        assert_eq!(report.main_weaknesses, vec!["Back rank", "Time trouble"]);
        assert!(report.main_strengths.is_empty());
        assert_eq!(report.recommended_exercises.len(), 2);

        let first = &report.recommended_exercises[0];
        assert!(first.position_fen.is_some());
        assert_eq!(first.move_variants.len(), 2);
        assert!(first.move_variants[0].is_best);

        let second = &report.recommended_exercises[1];
        assert_eq!(second.position_fen, None);
        assert!(second.solution.is_empty());
    }

    #[test]
    fn opponent_report_requires_summary() {
        assert_eq!(
            validate_opponent_report(r#"{"mainWeaknesses": []}"#),
            Err(ReportError::MissingField("globalSummary"))
        );
    }
}

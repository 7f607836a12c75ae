//! Prompts sent to the LLM. Each one spells out the JSON shape the report
//! validators accept.

pub const GAME_SYSTEM: &str = "You are a chess analysis engine.";
pub const OPPONENT_SYSTEM: &str = "You are an assistant that analyses chess games.";

/// Separator placed before every game of an opponent batch.
pub const PGN_SEPARATOR: &str = "---PGN---";

const GAME_SCHEMA: &str = r#"type MistakeCategory = "inaccuracy" | "mistake" | "blunder";

interface KeyMoment {
  moveNumber: number;
  description: string;
  evaluationChange: number; // centipawns, positive when good for the analysed side
}

interface Mistake {
  moveNumber: number;
  movePlayed: string;
  category: MistakeCategory;
  explanation: string;
  bestSuggestion?: string;
  bestSuggestionExplanation?: string;
}

interface Exercise {
  title: string;
  description: string;
  exerciseType: "tactic" | "endgame" | "opening" | "strategy";
  estimatedLevel: "beginner" | "intermediate" | "advanced";
}

interface GameReport {
  summary: string;
  analyzedSide: "White" | "Black";
  result: "1-0" | "0-1" | "1/2-1/2";
  keyMoments: KeyMoment[];
  mistakes: Mistake[];
  recommendedExercises: Exercise[];
}"#;

const OPPONENT_SCHEMA: &str = r#"type ExerciseType = "tactic" | "endgame" | "opening" | "strategy";
type EstimatedLevel = "beginner" | "intermediate" | "advanced";

type OpponentReport = {
  globalSummary: string;
  mainWeaknesses: string[];
  mainStrengths: string[];
  frequentErrors: { theme: string; description: string; howToPunish: string }[];
  recommendedExercises: {
    title: string;
    description: string;
    exerciseType: ExerciseType;
    estimatedLevel: EstimatedLevel;
    positionFen: string;
    solution: string[];
    hint: string;
    weaknessExploited: string;
    moveVariants: { move: string; isBest: boolean; explanation?: string; opponentResponse?: string }[];
    opponentMoves: string[];
  }[];
};"#;

pub fn game_prompt(pgn: &str) -> String {
    format!(
        r#"You are an experienced chess coach at International Master level.

You are given a complete game in PGN notation. Analyse it in depth, paying attention to tactical and strategic details.

1. SUMMARY: name the analysed side (White or Black), give the result (1-0, 0-1 or 1/2-1/2) and summarise the game: opening, strategic themes, turning points, quality of play.

2. KEY MOMENTS: identify every moment where the evaluation changes by more than 50 centipawns. For each give the exact move number (moveNumber), a detailed description of what happened, and the evaluation change in centipawns (positive when it favours the analysed side).

3. MISTAKES: list every inaccuracy, mistake and blunder of the analysed side. For each give the move number, the move played in algebraic notation (movePlayed), the category ("inaccuracy" loses 10-30 centipawns, "mistake" 30-100, "blunder" more than 100), a detailed explanation, the best move in algebraic notation (bestSuggestion) when there is one and why it is better (bestSuggestionExplanation).

4. EXERCISES: propose 3-5 targeted exercises with a title, a description, a type and an estimated level.

Reply STRICTLY with JSON matching this TypeScript type:

{GAME_SCHEMA}

Rules:
- Return no text outside the JSON.
- Use only the categories "inaccuracy", "mistake", "blunder".
- Use only the types "tactic", "endgame", "opening", "strategy" and the levels "beginner", "intermediate", "advanced".
- Move numbers must match the move numbers in the PGN exactly.

Here is the PGN:

{pgn}"#
    )
}

/// Games are joined with the separator so the model can tell them apart.
pub fn opponent_prompt(games: &[String]) -> String {
    let payload = games
        .iter()
        .map(|pgn| format!("{PGN_SEPARATOR}\n{pgn}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an experienced chess coach.

You receive several games in PGN format, all played by the SAME player. Analyse their overall style, identify STRENGTHS and WEAKNESSES, detect recurring errors and propose interactive SIMULATION exercises.

For each exercise:
1. Pick ONE specific weakness to exploit (weaknessExploited).
2. Build a realistic FEN position (positionFen) that exposes it.
3. Give the best line (solution) in 3-5 moves of SAN.
4. Give 3-5 candidate moves (moveVariants): 1-2 good moves (isBest: true) and 2-3 typical bad moves (isBest: false), each with an explanation and the opponent's typical reply (opponentResponse).
5. List the moves this opponent typically plays in such positions (opponentMoves).

Reply ONLY with valid JSON matching this TypeScript type:

{OPPONENT_SCHEMA}

Here are the games, each preceded by '{PGN_SEPARATOR}':

{payload}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_prompt_embeds_pgn_and_schema() {
        let prompt = game_prompt("1. e4 e5 *");
        assert!(prompt.ends_with("1. e4 e5 *"));
        assert!(prompt.contains("analyzedSide: \"White\" | \"Black\""));
    }

    #[test]
    fn opponent_games_are_separated() {
        let prompt = opponent_prompt(&["1. e4 *".to_string(), "1. d4 *".to_string()]);
        assert!(prompt.ends_with("---PGN---\n1. e4 *\n\n---PGN---\n1. d4 *"));
        assert!(prompt.contains("globalSummary"));
    }
}

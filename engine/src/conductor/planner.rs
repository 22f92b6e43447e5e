//! Query Planner
//!
//! Turns a question into the sub-queries the SQL agent will run. A question
//! that already asks for one concrete stat comes back unchanged; exploratory
//! ones are decomposed. Referring expressions ("he", "that player") are
//! replaced with the most recent player named in memory, both before the model
//! sees the question and in whatever it returns. When memory names no player
//! the text is left for the model to resolve.

use regex::{Captures, Regex};
use sdk::errors::EngineError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::memory::Actor;
use super::types::SubQuery;
use crate::llm::router::LLMRouter;
use crate::llm::Message;

/// Capitalised words that never start or continue a player name
const NOT_NAME_WORDS: &[&str] = &[
    "A", "Also", "An", "And", "Are", "Average", "Big", "Can", "Compare", "Conference", "Did",
    "Does", "Give", "He", "Her", "His", "How", "I", "In", "Is", "It", "Me", "No", "Now", "She",
    "Show", "So", "Tell", "The", "Then", "They", "This", "That", "West", "What", "When", "Where",
    "Which", "Who", "Why", "Yes", "HUMAN", "ASSISTANT",
];

/// Stat and box-score vocabulary. Answers often title-case these
/// ("18.2 Points Per Game"), so they end a name run instead of forming one.
const STAT_WORDS: &[&str] = &[
    "Apg", "Assist", "Assists", "Block", "Blocks", "Defensive", "Efficiency", "Fg", "Field",
    "Free", "Ft", "Game", "Games", "Goal", "Goals", "High", "Leader", "Leaders", "Low",
    "Minute", "Minutes", "Offensive", "Overall", "Pct", "Per", "Percent", "Percentage",
    "Point", "Points", "Ppg", "Rate", "Rating", "Rebound", "Rebounds", "Record", "Rpg",
    "Scoring", "Season", "Shooting", "Stat", "Stats", "Statistics", "Steal", "Steals",
    "Three", "Throw", "Throws", "Total", "Totals", "Turnover", "Turnovers", "Usage",
];

/// Longest run of capitalised words still taken for a person's name
const MAX_NAME_WORDS: usize = 4;

/// Words that follow object-case "her" rather than a possessed noun
const OBJECT_FOLLOWERS: &[&str] = &[
    "against", "and", "at", "by", "compared", "for", "from", "in", "is", "on", "or", "than",
    "to", "versus", "vs", "was", "with",
];

/// Intermediate deserialization type for model output
#[derive(Debug, Deserialize)]
struct QueryQuestionsOutput {
    #[serde(default)]
    questions: Vec<String>,
}

pub struct Planner {
    router: Arc<LLMRouter>,
    teams: Vec<String>,
    max_sub_queries: usize,
    pronouns: Regex,
}

impl Planner {
    pub fn new(
        router: Arc<LLMRouter>,
        teams: Vec<String>,
        max_sub_queries: usize,
    ) -> Result<Self, EngineError> {
        let pronouns = Regex::new(r"(?i)\b(that player|this player|he|him|his|she|her|hers)\b")
            .map_err(|e| EngineError::Config(format!("Invalid pronoun pattern: {}", e)))?;

        Ok(Self {
            router,
            teams,
            max_sub_queries,
            pronouns,
        })
    }

    /// Plan sub-queries for a question.
    ///
    /// A failed or unparsable model call yields no sub-queries; the caller
    /// reports that as a failed database path.
    pub async fn plan(&self, question: &str, memory: &str, table_info: &str) -> Vec<SubQuery> {
        let referent = self.latest_player(memory);
        let question = self.substitute_referents(question, referent.as_deref());

        let prompt = format!(
            "You are a UC Davis Basketball analyst and scout. Your task is to determine which database queries will provide the most useful insights based on the user's input.\n\n\
             - If the question is already a direct request for a single piece of data (for example: \"Who is the leading scorer on UC Davis?\"), return the original question unchanged.\n\
             - If the question is more general or exploratory (for example: \"Give me a scouting report on UC Riverside\"), break it down into multiple detailed query questions, each scoped to one table or stat category. Prefer per-game metrics over season totals when both exist.\n\
             - Replace pronouns and phrases like \"that player\" with the name they refer to in the conversation.\n\
             - The output should always be a JSON object with a list of questions.\n\n\
             You have access to the following table information:\n{}\n\n\
             Conversation so far:\n{}\n\n\
             User Question:\n{}\n\n\
             Output format:\n{{ \"questions\": [\"<query question 1>\", \"<query question 2>\", ...] }}",
            table_info,
            if memory.is_empty() { "(none)" } else { memory },
            question
        );

        let output = match self
            .router
            .invoke_structured::<QueryQuestionsOutput>(&[Message::user(prompt)])
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Query planning failed: {}", e);
                return Vec::new();
            }
        };

        let sub_queries: Vec<SubQuery> = output
            .questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .take(self.max_sub_queries)
            .map(|q| SubQuery::new(self.substitute_referents(q, referent.as_deref())))
            .collect();

        if output.questions.len() > self.max_sub_queries {
            warn!(
                "Planner returned {} questions, keeping the first {}",
                output.questions.len(),
                self.max_sub_queries
            );
        }
        info!(count = sub_queries.len(), "Planner generated sub-queries");

        sub_queries
    }

    /// Replace referring expressions with `name`. Without a name the text is
    /// returned verbatim.
    pub fn substitute_referents(&self, text: &str, name: Option<&str>) -> String {
        let Some(name) = name else {
            return text.to_string();
        };

        self.pronouns
            .replace_all(text, |caps: &Captures| {
                let Some(m) = caps.get(0) else {
                    return String::new();
                };
                let word = m.as_str().to_lowercase();
                let next_word = text[m.end()..]
                    .split_whitespace()
                    .next()
                    .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase());
                let possessive_her = next_word
                    .as_deref()
                    .is_some_and(|w| !w.is_empty() && !OBJECT_FOLLOWERS.contains(&w))
                    && text[m.end()..].starts_with(char::is_whitespace);

                match word.as_str() {
                    "his" | "hers" => format!("{}'s", name),
                    "her" if possessive_her => format!("{}'s", name),
                    _ => name.to_string(),
                }
            })
            .into_owned()
    }

    /// Most recently mentioned player name in rendered memory, if any.
    ///
    /// A name is a run of two to four capitalised words that is neither a
    /// team nor stat vocabulary. Continuation lines of a multi-line entry are
    /// read whole.
    pub fn latest_player(&self, memory: &str) -> Option<String> {
        let human = format!("{}: ", Actor::Human);
        let assistant = format!("{}: ", Actor::Assistant);

        memory.lines().rev().find_map(|line| {
            let text = line
                .strip_prefix(human.as_str())
                .or_else(|| line.strip_prefix(assistant.as_str()))
                .unwrap_or(line);
            name_candidates(text)
                .into_iter()
                .rev()
                .find(|candidate| !self.is_team(candidate))
        })
    }

    fn is_team(&self, candidate: &str) -> bool {
        let lower = candidate.to_lowercase();
        self.teams
            .iter()
            .any(|team| lower.contains(&team.to_lowercase()))
    }
}

/// Runs of capitalised words in reading order
fn name_candidates(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    fn flush(current: &mut Vec<&str>, out: &mut Vec<String>) {
        if (2..=MAX_NAME_WORDS).contains(&current.len()) {
            out.push(current.join(" "));
        }
        current.clear();
    }

    for raw in text.split_whitespace() {
        let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        let possessive = trimmed.ends_with("'s");
        let word = trimmed.strip_suffix("'s").unwrap_or(trimmed);

        let capitalised = word.chars().next().is_some_and(char::is_uppercase)
            && !NOT_NAME_WORDS.contains(&word)
            && !is_stat_word(word);

        if capitalised {
            current.push(word);
        } else {
            flush(&mut current, &mut out);
        }

        let ends_clause = raw.ends_with(|c: char| matches!(c, ',' | '.' | '?' | '!' | ';' | ':'));
        if ends_clause || possessive {
            flush(&mut current, &mut out);
        }
    }
    flush(&mut current, &mut out);

    out
}

fn is_stat_word(word: &str) -> bool {
    STAT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssistantConfig, LLMConfig};

    fn planner() -> Planner {
        let router = LLMRouter::new(vec![], Arc::new(LLMConfig::default()));
        Planner::new(Arc::new(router), AssistantConfig::default().teams, 8).unwrap()
    }

    #[test]
    fn test_name_candidates() {
        assert_eq!(
            name_candidates("TY Johnson plays for UC Davis"),
            vec!["TY Johnson", "UC Davis"]
        );
        assert_eq!(name_candidates("Who is Elijah Pepper?"), vec!["Elijah Pepper"]);
        assert!(name_candidates("What about him").is_empty());
    }

    #[test]
    fn test_latest_player_skips_teams() {
        let p = planner();
        let memory = "HUMAN: Tell me about TY Johnson\nASSISTANT: TY Johnson plays for UC Davis.";
        assert_eq!(p.latest_player(memory).as_deref(), Some("TY Johnson"));
        assert_eq!(p.latest_player("HUMAN: How is UC Irvine doing?"), None);
        assert_eq!(p.latest_player(""), None);
    }

    #[test]
    fn test_latest_player_prefers_newest_line() {
        let p = planner();
        let memory = "ASSISTANT: Elijah Pepper led in 2023.\nASSISTANT: The leader now is TY Johnson.";
        assert_eq!(p.latest_player(memory).as_deref(), Some("TY Johnson"));
    }

    #[test]
    fn test_title_case_stat_label_is_not_a_player() {
        let p = planner();
        let memory = "HUMAN: Who is TY Johnson?\n\
                      ASSISTANT: TY Johnson leads UC Davis with 18.2 Points Per Game.";
        assert_eq!(p.latest_player(memory).as_deref(), Some("TY Johnson"));

        let name = p.latest_player(memory);
        assert_eq!(
            p.substitute_referents("How many rebounds does he average?", name.as_deref()),
            "How many rebounds does TY Johnson average?"
        );

        assert_eq!(
            p.latest_player("ASSISTANT: Team Field Goal Percentage is 45.1."),
            None
        );
    }

    #[test]
    fn test_name_at_start_of_continuation_line() {
        let p = planner();
        let memory = "HUMAN: Who scores the most?\nASSISTANT: Top scorers:\nTY Johnson: 18.2 ppg";
        assert_eq!(p.latest_player(memory).as_deref(), Some("TY Johnson"));
    }

    #[test]
    fn test_long_title_runs_are_not_names() {
        assert!(name_candidates("Big West Tournament First Round Recap Today").is_empty());
    }

    #[test]
    fn test_substitute_referents() {
        let p = planner();
        let name = Some("TY Johnson");
        assert_eq!(p.substitute_referents("he", name), "TY Johnson");
        assert_eq!(
            p.substitute_referents("How many points did he score?", name),
            "How many points did TY Johnson score?"
        );
        assert_eq!(
            p.substitute_referents("What is his free throw percentage?", name),
            "What is TY Johnson's free throw percentage?"
        );
        assert_eq!(
            p.substitute_referents("How does that player defend?", name),
            "How does TY Johnson defend?"
        );
        assert_eq!(
            p.substitute_referents("Compare her to the Gauchos", name),
            "Compare TY Johnson to the Gauchos"
        );
    }

    #[test]
    fn test_no_referent_keeps_text() {
        let p = planner();
        assert_eq!(p.substitute_referents("Where is he from?", None), "Where is he from?");
    }

    #[test]
    fn test_words_containing_pronouns_untouched() {
        let p = planner();
        assert_eq!(
            p.substitute_referents("Show the heat map for the theme", Some("TY Johnson")),
            "Show the heat map for the theme"
        );
    }

    #[tokio::test]
    async fn test_failed_planning_yields_nothing() {
        let p = planner();
        assert!(p.plan("Who leads in assists?", "", "").await.is_empty());
    }
}

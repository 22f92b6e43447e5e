//! Team/Entity Resolver
//!
//! Maps a question to a (primary, comparison) pair of entities drawn from the
//! configured team vocabulary plus "Conference Average". Names and common
//! aliases are matched first; the language model is only asked when nothing
//! in the question matches. The result is advisory and never fails a request.

use regex::Regex;
use sdk::errors::EngineError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{AssistantConfig, CONFERENCE_AVERAGE};
use crate::llm::router::LLMRouter;
use crate::llm::Message;

/// Well-known short names, mapped onto vocabulary entries when present
const ALIASES: &[(&str, &str)] = &[
    ("UCD", "UC Davis"),
    ("Aggies", "UC Davis"),
    ("UCI", "UC Irvine"),
    ("Anteaters", "UC Irvine"),
    ("UCR", "UC Riverside"),
    ("Highlanders", "UC Riverside"),
    ("UCSD", "UC San Diego"),
    ("Tritons", "UC San Diego"),
    ("UCSB", "UC Santa Barbara"),
    ("Gauchos", "UC Santa Barbara"),
    ("Mustangs", "Cal Poly"),
    ("CSUB", "Cal State Bakersfield"),
    ("Roadrunners", "Cal State Bakersfield"),
    ("CSUF", "Cal State Fullerton"),
    ("Titans", "Cal State Fullerton"),
    ("CSUN", "Cal State Northridge"),
    ("Matadors", "Cal State Northridge"),
    ("Long Beach", "Long Beach State"),
    ("LBSU", "Long Beach State"),
    ("Hawaii", "Hawai'i"),
    ("Rainbow Warriors", "Hawai'i"),
    ("conference average", CONFERENCE_AVERAGE),
    ("league average", CONFERENCE_AVERAGE),
];

#[derive(Debug, Deserialize)]
struct TeamsOutput {
    #[serde(default)]
    teams: Vec<String>,
}

struct Pattern {
    regex: Regex,
    entity: String,
}

pub struct TeamResolver {
    home_team: String,
    teams: Vec<String>,
    patterns: Vec<Pattern>,
    router: Option<Arc<LLMRouter>>,
}

impl TeamResolver {
    pub fn new(
        config: &AssistantConfig,
        router: Option<Arc<LLMRouter>>,
    ) -> Result<Self, EngineError> {
        let mut patterns: Vec<Pattern> = config
            .teams
            .iter()
            .map(|team| (team.as_str(), team.as_str()))
            .chain(ALIASES.iter().copied().filter(|(_, entity)| {
                *entity == CONFERENCE_AVERAGE || config.teams.iter().any(|t| t == entity)
            }))
            .map(|(needle, entity)| {
                let regex = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(needle)))
                    .map_err(|e| {
                        EngineError::Config(format!("Invalid team name '{}': {}", needle, e))
                    })?;
                Ok(Pattern {
                    regex,
                    entity: entity.to_string(),
                })
            })
            .collect::<Result<_, EngineError>>()?;

        // "UC Davis" must win over a shorter alias that overlaps it
        patterns.sort_by_key(|p| std::cmp::Reverse(p.regex.as_str().len()));

        Ok(Self {
            home_team: config.home_team.clone(),
            teams: config.teams.clone(),
            patterns,
            router,
        })
    }

    /// Entities named in the question, in order of first mention, deduplicated.
    pub fn named_entities(&self, question: &str) -> Vec<String> {
        let mut found: Vec<(usize, &str)> = Vec::new();
        let mut claimed: Vec<(usize, usize)> = Vec::new();

        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(question) {
                let overlaps = claimed
                    .iter()
                    .any(|&(s, e)| m.start() < e && s < m.end());
                if overlaps {
                    continue;
                }
                claimed.push((m.start(), m.end()));
                found.push((m.start(), pattern.entity.as_str()));
            }
        }

        found.sort_by_key(|&(pos, _)| pos);

        let mut entities: Vec<String> = Vec::new();
        for (_, entity) in found {
            if !entities.iter().any(|e| e == entity) {
                entities.push(entity.to_string());
            }
        }
        entities
    }

    /// Apply the defaulting rules to a list of named entities.
    pub fn pair(&self, named: &[String]) -> [String; 2] {
        let teams: Vec<&String> = named
            .iter()
            .filter(|e| e.as_str() != CONFERENCE_AVERAGE)
            .collect();

        match teams.as_slice() {
            [] => [self.home_team.clone(), CONFERENCE_AVERAGE.to_string()],
            [only] => [(*only).clone(), CONFERENCE_AVERAGE.to_string()],
            [first, second, ..] => [(*first).clone(), (*second).clone()],
        }
    }

    /// Resolve the entity pair for a question.
    pub async fn resolve(&self, question: &str) -> [String; 2] {
        let mut named = self.named_entities(question);

        if named.is_empty() {
            if let Some(router) = &self.router {
                named = self.classify(router, question).await;
            }
        }

        let pair = self.pair(&named);
        debug!("Resolved teams {:?} from {:?}", pair, named);
        pair
    }

    async fn classify(&self, router: &LLMRouter, question: &str) -> Vec<String> {
        let prompt = format!(
            "Which of these basketball teams does the question refer to?\n\
             Teams: {}\n\n\
             Question: {}\n\n\
             Respond with a JSON object {{\"teams\": [...]}} using only names from the list, \
             in the order they are mentioned. Use an empty list if none apply.",
            self.teams.join(", "),
            question
        );

        match router
            .invoke_structured::<TeamsOutput>(&[Message::user(prompt)])
            .await
        {
            Ok(output) => output
                .teams
                .into_iter()
                .filter_map(|t| {
                    self.teams
                        .iter()
                        .find(|known| known.eq_ignore_ascii_case(t.trim()))
                        .cloned()
                })
                .collect(),
            Err(e) => {
                warn!("Team classification failed, using defaults: {}", e);
                Vec::new()
            }
        }
    }
}

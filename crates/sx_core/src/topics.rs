//! Deterministic topic taxonomy used to route questions.
//!
//! A query is tokenized into lower-cased alphanumeric words. A keyword matches
//! a token equal to it, or equal to it plus a trailing `s`. Local keywords win
//! over outdoor keywords; no match at all means the query is off-topic.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topic {
    /// Covered by the local evidence store.
    Local { sport: String },
    /// Another outdoor sport; answered from web search. `sport` is `None`
    /// when only generic sports vocabulary matched.
    Outdoor { sport: Option<String> },
    OffTopic,
}

impl Topic {
    pub fn in_scope(&self) -> bool {
        !matches!(self, Topic::OffTopic)
    }
}

const TENNIS: &[&str] = &[
    "tennis", "wimbledon", "deuce", "tiebreak", "tiebreaker", "atp", "wta", "racquet", "racket",
];

const CRICKET: &[&str] = &[
    "cricket", "lbw", "wicket", "batsman", "batsmen", "bowler", "innings", "ashes", "ipl", "odi",
    "t20",
];

const OUTDOOR: &[(&str, &[&str])] = &[
    ("soccer", &["soccer", "fifa", "offside"]),
    ("football", &["football", "nfl", "touchdown"]),
    ("baseball", &["baseball", "mlb", "inning", "pitcher"]),
    ("softball", &["softball"]),
    ("golf", &["golf", "golfer", "pga"]),
    ("rugby", &["rugby"]),
    ("hockey", &["hockey"]),
    ("lacrosse", &["lacrosse"]),
    ("cycling", &["cycling", "cyclist"]),
    ("athletics", &["athletics", "marathon", "sprint", "triathlon"]),
    ("hiking", &["hiking", "trekking"]),
    ("climbing", &["climbing", "bouldering", "mountaineering"]),
    ("skiing", &["skiing", "snowboarding"]),
    ("surfing", &["surfing"]),
    ("sailing", &["sailing", "regatta"]),
    ("rowing", &["rowing", "kayaking", "canoeing"]),
    ("volleyball", &["volleyball"]),
    ("basketball", &["basketball", "nba"]),
    ("polo", &["polo"]),
    ("archery", &["archery"]),
    ("equestrian", &["equestrian", "showjumping"]),
];

const GENERIC: &[&str] = &[
    "sport", "game", "player", "match", "matches", "rule", "outdoor", "tournament", "league",
    "team", "olympic", "olympics", "athlete", "coach", "referee", "umpire", "championship",
];

#[derive(Debug, Clone)]
pub struct TopicTaxonomy {
    local: BTreeMap<String, String>,
    outdoor: BTreeMap<String, String>,
    generic: BTreeSet<String>,
}

impl Default for TopicTaxonomy {
    fn default() -> Self {
        let mut local = BTreeMap::new();
        for kw in TENNIS {
            local.insert(kw.to_string(), "tennis".to_string());
        }
        for kw in CRICKET {
            local.insert(kw.to_string(), "cricket".to_string());
        }
        let mut outdoor = BTreeMap::new();
        for (sport, kws) in OUTDOOR {
            for kw in kws.iter() {
                outdoor.insert(kw.to_string(), sport.to_string());
            }
        }
        Self {
            local,
            outdoor,
            generic: GENERIC.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TopicTaxonomy {
    pub fn classify(&self, text: &str) -> Topic {
        let tokens = tokenize(text);
        if let Some(sport) = first_match(&tokens, &self.local) {
            return Topic::Local { sport };
        }
        if let Some(sport) = first_match(&tokens, &self.outdoor) {
            return Topic::Outdoor { sport: Some(sport) };
        }
        let generic_hit = tokens.iter().any(|t| {
            self.generic.contains(t.as_str()) || singular(t).is_some_and(|s| self.generic.contains(s))
        });
        if generic_hit {
            return Topic::Outdoor { sport: None };
        }
        Topic::OffTopic
    }
}

fn first_match(tokens: &[String], table: &BTreeMap<String, String>) -> Option<String> {
    for t in tokens {
        if let Some(sport) = table.get(t.as_str()) {
            return Some(sport.clone());
        }
        if let Some(sport) = singular(t).and_then(|s| table.get(s)) {
            return Some(sport.clone());
        }
    }
    None
}

fn singular(token: &str) -> Option<&str> {
    token.strip_suffix('s').filter(|s| !s.is_empty())
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

//! Concept extraction and salience scoring
//!
//! Architecture: Service Layer - The scorer turns raw text into ranked concept candidates
//! - Tokenizing, noise filtering, and scoring are one deterministic pass over the text
//! - Proper-noun detection is a capitalization heuristic, not a grammar parser
//! - The stopword table is data; scoring logic never special-cases individual words

use crate::config::ConceptConfig;
use crate::domain::graph::Concept;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Common words (plus honorifics and contraction stems) that carry no
/// concept value on their own
static STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "almost", "also", "although", "always",
    "among", "and", "another", "any", "anything", "are", "aren", "around", "away", "back",
    "because", "been", "before", "began", "behind", "being", "below", "beside", "between", "both",
    "but", "came", "can", "cannot", "come", "could", "couldn", "did", "didn", "does", "doesn",
    "doing", "don", "done", "down", "during", "each", "either", "else", "even", "ever", "every",
    "everything", "few", "for", "from", "further", "get", "got", "had", "hadn", "has", "hasn",
    "have", "haven", "having", "her", "here", "hers", "herself", "him", "himself", "his", "how",
    "however", "into", "isn", "its", "itself", "just", "knew", "know", "later", "least", "less",
    "let", "like", "made", "make", "many", "may", "maybe", "might", "mine", "more", "most",
    "much", "must", "mustn", "myself", "near", "neither", "never", "next", "none", "nor", "not",
    "nothing", "now", "off", "once", "one", "only", "onto", "other", "others", "our", "ours",
    "ourselves", "out", "over", "own", "perhaps", "put", "quite", "rather", "really", "said",
    "same", "saw", "say", "says", "see", "seen", "shall", "shan", "she", "should", "shouldn",
    "since", "some", "someone", "something", "soon", "still", "such", "take", "taken", "than",
    "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "this", "those", "though", "through", "thus", "together", "too", "took", "toward", "towards",
    "under", "until", "upon", "very", "was", "wasn", "way", "well", "went", "were", "weren",
    "what", "whatever", "when", "whenever", "where", "which", "while", "who", "whom", "whose",
    "why", "will", "with", "within", "without", "won", "would", "wouldn", "yes", "yet", "you",
    "your", "yours", "yourself", "yourselves",
    // Honorifics read as names but carry no concept value
    "sir", "lady", "lord", "mister", "madam", "mrs", "miss",
];

/// Whether a normalized token is in the stopword table
pub fn is_stopword(term: &str) -> bool {
    STOPWORDS.contains(&term)
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]+").expect("token pattern is a valid regex"))
}

#[derive(Debug, Default)]
struct Candidate {
    frequency: usize,
    first_order: usize,
    is_proper_noun: bool,
}

/// Tokenizes story text and ranks candidate concepts by salience
#[derive(Debug)]
pub struct ConceptScorer {
    top_k: usize,
    min_token_chars: usize,
}

impl ConceptScorer {
    pub fn new(config: &ConceptConfig) -> Self {
        Self { top_k: config.top_k, min_token_chars: config.min_token_chars }
    }

    /// Score and rank concepts: descending by score, ties broken by first
    /// occurrence order. At most `top_k` concepts are returned and stopwords
    /// never appear.
    pub fn score(&self, text: &str) -> Vec<Concept> {
        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        let mut order = 0usize;

        for sentence in text.split(|c: char| matches!(c, '.' | '!' | '?')) {
            for (position, token) in token_regex().find_iter(sentence).enumerate() {
                let word = token.as_str();
                if word.chars().count() < self.min_token_chars {
                    continue;
                }
                let normalized = word.to_lowercase();
                if is_stopword(&normalized) {
                    continue;
                }

                let candidate = candidates.entry(normalized).or_insert(Candidate {
                    frequency: 0,
                    first_order: order,
                    is_proper_noun: false,
                });
                candidate.frequency += 1;

                // Capitalized away from a sentence start reads as a name
                let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
                if capitalized && position > 0 {
                    candidate.is_proper_noun = true;
                }

                order += 1;
            }
        }

        let mut ranked: Vec<(usize, Concept)> = candidates
            .into_iter()
            .map(|(term, candidate)| {
                let mut score = candidate.frequency as f64;
                if candidate.is_proper_noun {
                    score += 3.0;
                }
                if term.chars().count() > 6 {
                    score += 1.0;
                }
                (
                    candidate.first_order,
                    Concept {
                        term,
                        frequency: candidate.frequency,
                        is_proper_noun: candidate.is_proper_noun,
                        score,
                    },
                )
            })
            .collect();

        ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
        ranked.truncate(self.top_k);
        ranked.into_iter().map(|(_, concept)| concept).collect()
    }
}

//! Lexicon Named Entity Recognition (NER)
//!
//! Fallback layer used when no pretrained model is available (see
//! `crate::bert` for the pretrained recognizer). Its hits are tagged
//! `EntityOrigin::Lexicon`, so they are reported in `entities` but never
//! name the candidate.
//!
//! `StatisticalNer` is a feature-weighted span classifier. Candidate spans
//! are runs of capitalized tokens on a line (lowercase connectors such as
//! "of" may sit inside a run). Each span is scored for PERSON, ORG and GPE
//! from lexicon features and weights stored in a JSON model file; the best
//! category wins if it clears the model threshold. Spans that clear no
//! threshold are searched for place names from the gazetteer.
//!
//! A model ships with the crate (`models/en_resume_small.json`); others can
//! be loaded from disk. Any failure to obtain a usable model is reported as
//! `CvError::ModelUnavailable`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::EntityRecognizer;
use cvx_core::{CvError, EntityCategory, EntityMatch, EntityOrigin, ExtractedText, Result};

const BUNDLED_MODEL: &str = include_str!("models/en_resume_small.json");

// ============================================================================
// Model file
// ============================================================================

/// Feature weights of the span classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureWeights {
    /// Span of two or three words
    pub person_span: f32,
    /// First word is a known given name
    pub person_given_name: f32,
    /// Span covers the whole line
    pub person_whole_line: f32,
    pub person_single_token: f32,
    /// More than three words
    pub person_long_span: f32,
    /// Span contains a connector word
    pub person_connector: f32,
    /// Last word is an organization suffix ("Inc", "Ltd", ...)
    pub org_suffix: f32,
    /// Any word is an organization head ("University", "Bank", ...)
    pub org_head: f32,
    /// Whole span is a gazetteer place
    pub gpe_gazetteer: f32,
    /// Span is made of generic résumé vocabulary
    pub non_entity: f32,
    pub digits: f32,
}

/// Serialized NER model: lexicons plus feature weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerModel {
    pub name: String,
    pub version: String,
    pub threshold: f32,
    pub weights: FeatureWeights,
    pub connectors: Vec<String>,
    pub given_names: Vec<String>,
    pub org_suffixes: Vec<String>,
    pub org_heads: Vec<String>,
    pub places: Vec<String>,
    pub non_entity_terms: Vec<String>,
}

impl NerModel {
    /// Parse a model from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let model: NerModel = serde_json::from_str(json)
            .map_err(|e| CvError::ModelUnavailable(format!("invalid model file: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    /// Read a model file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CvError::ModelUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// The model shipped with this crate
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_MODEL)
    }

    fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(CvError::ModelUnavailable(format!(
                "model {} has a non-finite threshold",
                self.name
            )));
        }
        if self.given_names.is_empty() && self.org_suffixes.is_empty() && self.places.is_empty()
        {
            return Err(CvError::ModelUnavailable(format!(
                "model {} has empty lexicons",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tokens and spans
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

/// Split a line into word tokens and standalone `&`
///
/// Tokens start with a letter or digit and may contain apostrophes,
/// hyphens and dots; a trailing dot is not part of the token.
fn tokenize(line: &str) -> Vec<Token<'_>> {
    fn close<'a>(line: &'a str, start: usize, end: usize, tokens: &mut Vec<Token<'a>>) {
        let text = line[start..end].trim_end_matches('.');
        if !text.is_empty() {
            tokens.push(Token {
                text,
                start,
                end: start + text.len(),
            });
        }
    }

    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in line.char_indices() {
        if let Some(s) = start {
            let inner = c.is_alphanumeric() || matches!(c, '\'' | '’' | '-' | '.');
            if !inner {
                close(line, s, i, &mut tokens);
                start = None;
            }
        }

        if start.is_none() {
            if c.is_alphanumeric() {
                start = Some(i);
            } else if c == '&' {
                tokens.push(Token {
                    text: &line[i..i + 1],
                    start: i,
                    end: i + 1,
                });
            }
        }
    }
    if let Some(s) = start {
        close(line, s, line.len(), &mut tokens);
    }

    tokens
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

fn key(token: &str) -> String {
    token.to_lowercase()
}

/// Candidate span: token index range within a line
#[derive(Debug, Clone, Copy)]
struct Span {
    first: usize,
    last: usize,
}

// ============================================================================
// Statistical NER
// ============================================================================

/// Feature-weighted span classifier over a lexicon model
pub struct StatisticalNer {
    model_id: String,
    threshold: f32,
    weights: FeatureWeights,
    connectors: HashSet<String>,
    given_names: HashSet<String>,
    org_suffixes: HashSet<String>,
    org_heads: HashSet<String>,
    places: HashSet<String>,
    non_entity: HashSet<String>,
    max_place_words: usize,
}

impl StatisticalNer {
    /// Build a recognizer from a model
    pub fn new(model: NerModel) -> Result<Self> {
        model.validate()?;

        let lower = |items: Vec<String>| -> HashSet<String> {
            items.iter().map(|s| key(s.trim_end_matches('.'))).collect()
        };

        let max_place_words = model
            .places
            .iter()
            .map(|p| p.split_whitespace().count())
            .max()
            .unwrap_or(1);

        Ok(Self {
            model_id: format!("{}@{}", model.name, model.version),
            threshold: model.threshold,
            weights: model.weights,
            connectors: lower(model.connectors),
            given_names: lower(model.given_names),
            org_suffixes: lower(model.org_suffixes),
            org_heads: lower(model.org_heads),
            places: model.places.iter().map(|p| key(p.trim())).collect(),
            non_entity: lower(model.non_entity_terms),
            max_place_words,
        })
    }

    /// Recognizer backed by the bundled model
    pub fn bundled() -> Result<Self> {
        Self::new(NerModel::bundled()?)
    }

    /// Recognizer backed by a model file on disk
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::new(NerModel::from_path(path)?)
    }

    fn is_connector(&self, token: &str) -> bool {
        !is_capitalized(token) && self.connectors.contains(&key(token))
    }

    /// Group capitalized tokens into candidate spans
    fn spans(&self, line: &str, tokens: &[Token<'_>]) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut current: Vec<usize> = Vec::new();

        let flush = |current: &mut Vec<usize>, spans: &mut Vec<Span>| {
            while let Some(&last) = current.last() {
                if is_capitalized(tokens[last].text) {
                    break;
                }
                current.pop();
            }
            if let (Some(&first), Some(&last)) = (current.first(), current.last()) {
                spans.push(Span { first, last });
            }
            current.clear();
        };

        for (i, token) in tokens.iter().enumerate() {
            let contiguous = i > 0 && line[tokens[i - 1].end..token.start].trim().is_empty();
            if !contiguous {
                flush(&mut current, &mut spans);
            }

            if is_capitalized(token.text) {
                current.push(i);
            } else if self.is_connector(token.text) && !current.is_empty() {
                current.push(i);
            } else {
                flush(&mut current, &mut spans);
            }
        }
        flush(&mut current, &mut spans);

        spans
    }

    /// Score a span, returning the winning category if it clears the threshold
    fn classify(&self, tokens: &[Token<'_>], span: Span, whole_line: bool) -> Option<(EntityCategory, f32)> {
        let w = &self.weights;
        let span_tokens = &tokens[span.first..=span.last];

        let words: Vec<String> = span_tokens
            .iter()
            .filter(|t| !self.is_connector(t.text))
            .map(|t| key(t.text))
            .collect();
        let phrase = span_tokens
            .iter()
            .map(|t| key(t.text))
            .collect::<Vec<_>>()
            .join(" ");

        let has_connector = words.len() < span_tokens.len();
        let has_digits = span_tokens
            .iter()
            .any(|t| t.text.chars().any(|c| c.is_ascii_digit()));
        let has_suffix = words.len() > 1
            && words.last().is_some_and(|last| self.org_suffixes.contains(last));
        let has_head = words.iter().any(|word| self.org_heads.contains(word));
        let generic = words.iter().all(|word| {
            self.non_entity.contains(word)
                || self.org_suffixes.contains(word)
                || self.org_heads.contains(word)
        });
        let is_place = self.places.contains(&phrase);

        let mut person = match words.len() {
            1 => w.person_single_token,
            2 | 3 => w.person_span,
            _ => w.person_long_span,
        };
        if words.first().is_some_and(|first| self.given_names.contains(first)) {
            person += w.person_given_name;
        }
        if whole_line {
            person += w.person_whole_line;
        }
        if has_connector {
            person += w.person_connector;
        }
        if words.iter().any(|word| self.non_entity.contains(word)) {
            person += w.non_entity;
        }
        if has_suffix || has_head || is_place {
            person += w.non_entity;
        }

        let mut org = 0.0;
        if has_suffix {
            org += w.org_suffix;
        }
        if has_head && words.len() > 1 {
            org += w.org_head;
        }
        if generic {
            org += w.non_entity;
        }

        let mut gpe = if is_place { w.gpe_gazetteer } else { 0.0 };

        if has_digits {
            person += w.digits;
            org += w.digits;
            gpe += w.digits;
        }

        // Ties go to the more specific category
        let mut best = (EntityCategory::Gpe, gpe);
        for candidate in [(EntityCategory::Org, org), (EntityCategory::Person, person)] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }

        (best.1 >= self.threshold).then_some(best)
    }

    /// Longest-first gazetteer search inside an unclassified span
    fn places_within(&self, tokens: &[Token<'_>], span: Span) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        let mut i = span.first;

        while i <= span.last {
            let longest = (1..=self.max_place_words.min(span.last - i + 1))
                .rev()
                .find(|&n| {
                    let phrase = tokens[i..i + n]
                        .iter()
                        .map(|t| key(t.text))
                        .collect::<Vec<_>>()
                        .join(" ");
                    is_capitalized(tokens[i].text) && self.places.contains(&phrase)
                });

            match longest {
                Some(n) => {
                    found.push((i, i + n - 1));
                    i += n;
                }
                None => i += 1,
            }
        }

        found
    }

    fn recognize_line(&self, line_no: usize, line: &str, out: &mut Vec<EntityMatch>) {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return;
        }

        for span in self.spans(line, &tokens) {
            let whole_line = span.first == 0 && span.last == tokens.len() - 1;
            let text_of = |first: usize, last: usize| &line[tokens[first].start..tokens[last].end];

            match self.classify(&tokens, span, whole_line) {
                Some((category, score)) => out.push(
                    EntityMatch::new(category, text_of(span.first, span.last))
                        .with_line(line_no)
                        .with_score(score)
                        .with_origin(EntityOrigin::Lexicon),
                ),
                None => {
                    for (first, last) in self.places_within(&tokens, span) {
                        out.push(
                            EntityMatch::new(EntityCategory::Gpe, text_of(first, last))
                                .with_line(line_no)
                                .with_score(self.weights.gpe_gazetteer)
                                .with_origin(EntityOrigin::Lexicon),
                        );
                    }
                }
            }
        }
    }
}

impl EntityRecognizer for StatisticalNer {
    fn recognize(&self, text: &ExtractedText) -> Result<Vec<EntityMatch>> {
        let mut entities = Vec::new();
        for (line_no, line) in text.iter() {
            self.recognize_line(line_no, line, &mut entities);
        }

        tracing::debug!(model = %self.model_id, entities = entities.len(), "Recognized entities");
        Ok(entities)
    }

    fn name(&self) -> &str {
        &self.model_id
    }

    fn origin(&self) -> EntityOrigin {
        EntityOrigin::Lexicon
    }
}

// ============================================================================
// Unavailable model
// ============================================================================

/// Stand-in for a model that failed to load; every call reports
/// `ModelUnavailable` so the caller's policy decides what happens
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl EntityRecognizer for UnavailableRecognizer {
    fn recognize(&self, _text: &ExtractedText) -> Result<Vec<EntityMatch>> {
        Err(CvError::ModelUnavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

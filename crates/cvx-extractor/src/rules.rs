//! Rule-based field extraction
//!
//! Rules live in a declarative table: each `FieldRule` maps a rule id to a
//! field kind and a matcher. The standard table covers contact details,
//! education, qualifications, projects, and skills. Rules never fail; a
//! rule that matches nothing contributes nothing.

use cvx_core::{ExtractedText, FieldKind, FieldMatch};
use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Rule vocabulary
// ============================================================================

pub const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

/// Digit/`+`/`-`/paren/whitespace runs bounded by digits. Any Unicode space
/// (including NBSP) separates groups, but a match never crosses a line break.
pub const PHONE_PATTERN: &str = r"\+?[0-9][0-9\-()[^\S\r\n]]+[0-9]";

/// Phone candidates need more than seven digits
pub const PHONE_MIN_DIGITS: usize = 8;

pub const EDUCATION_KEYWORDS: &[&str] = &[
    "Bachelor",
    "Master",
    "PhD",
    "B.Sc",
    "M.Sc",
    "B.Tech",
    "M.Tech",
    "Engineering",
    "Degree",
    "Diploma",
];

pub const QUALIFICATION_KEYWORDS: &[&str] = &[
    "Certified",
    "Certification",
    "Diploma",
    "Course",
    "Training",
];

pub const PROJECT_KEYWORDS: &[&str] = &[
    "Project",
    "Developed",
    "Designed",
    "Implemented",
    "Built",
    "Created",
];

pub const SKILL_TERMS: &[&str] = &[
    "Python",
    "JavaScript",
    "Java",
    "SQL",
    "Machine Learning",
    "Data Analysis",
];

/// Count ASCII digits in a string
pub fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

// ============================================================================
// Rule table
// ============================================================================

/// Where a rule looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    WholeText,
    PerLine,
}

impl std::fmt::Display for RuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WholeText => write!(f, "whole-text"),
            Self::PerLine => write!(f, "per-line"),
        }
    }
}

/// How a rule recognizes its field
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Every non-overlapping regex match over the whole text
    Pattern {
        regex: Regex,
        /// Drop matches with fewer digits than this
        min_digits: Option<usize>,
    },
    /// Case-sensitive substrings; the whole line is returned as loaded
    LineKeywords(Vec<String>),
    /// Case-insensitive terms; the canonical term is returned once
    Terms(Vec<String>),
}

impl Matcher {
    pub fn scope(&self) -> RuleScope {
        match self {
            Self::Pattern { .. } | Self::Terms(_) => RuleScope::WholeText,
            Self::LineKeywords(_) => RuleScope::PerLine,
        }
    }

    /// Human-readable summary used by `cvx rules`
    pub fn describe(&self) -> String {
        match self {
            Self::Pattern { regex, min_digits } => match min_digits {
                Some(n) => format!("/{}/ with at least {n} digits", regex.as_str()),
                None => format!("/{}/", regex.as_str()),
            },
            Self::LineKeywords(words) => format!("line contains any of [{}]", words.join(", ")),
            Self::Terms(terms) => format!("text mentions any of [{}]", terms.join(", ")),
        }
    }
}

/// One entry of the rule table
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub id: String,
    pub field: FieldKind,
    pub matcher: Matcher,
}

impl FieldRule {
    /// Regex rule over the whole text
    pub fn pattern(
        id: impl Into<String>,
        field: FieldKind,
        pattern: &str,
        min_digits: Option<usize>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            id: id.into(),
            field,
            matcher: Matcher::Pattern {
                regex: Regex::new(pattern)?,
                min_digits,
            },
        })
    }

    /// Keyword rule returning whole lines
    pub fn line_keywords(id: impl Into<String>, field: FieldKind, keywords: &[&str]) -> Self {
        Self {
            id: id.into(),
            field,
            matcher: Matcher::LineKeywords(keywords.iter().map(|k| k.to_string()).collect()),
        }
    }

    /// Case-insensitive term rule
    pub fn terms(id: impl Into<String>, field: FieldKind, terms: &[&str]) -> Self {
        Self {
            id: id.into(),
            field,
            matcher: Matcher::Terms(terms.iter().map(|t| t.to_string()).collect()),
        }
    }

    pub fn scope(&self) -> RuleScope {
        self.matcher.scope()
    }

    /// Apply this rule to a text
    pub fn apply(&self, text: &ExtractedText, index: &LineIndex) -> Vec<FieldMatch> {
        match &self.matcher {
            Matcher::Pattern { regex, min_digits } => regex
                .find_iter(index.text())
                .filter(|m| min_digits.map_or(true, |n| digit_count(m.as_str()) >= n))
                .map(|m| FieldMatch::new(self.field, m.as_str(), index.line_of(m.start()), &self.id))
                .collect(),
            Matcher::LineKeywords(keywords) => text
                .iter()
                .filter(|(_, line)| keywords.iter().any(|k| line.contains(k.as_str())))
                .map(|(i, line)| FieldMatch::new(self.field, line, i, &self.id))
                .collect(),
            Matcher::Terms(terms) => {
                let lowered: Vec<String> = text.lines().iter().map(|l| l.to_lowercase()).collect();
                terms
                    .iter()
                    .filter_map(|term| {
                        let needle = term.to_lowercase();
                        lowered
                            .iter()
                            .position(|line| line.contains(&needle))
                            .map(|i| FieldMatch::new(self.field, term.as_str(), i, &self.id))
                    })
                    .collect()
            }
        }
    }
}

/// Joined text plus the byte offset where each line starts
pub struct LineIndex {
    text: String,
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &ExtractedText) -> Self {
        let mut starts = Vec::with_capacity(text.line_count());
        let mut offset = 0;
        for line in text.lines() {
            starts.push(offset);
            offset += line.len() + 1;
        }

        Self {
            text: text.to_text(),
            starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Line containing the given byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).saturating_sub(1)
    }
}

/// Ordered table of field rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard résumé rule table
    pub fn standard() -> Self {
        let mut set = Self::empty();

        set.add_pattern("email.address", FieldKind::Email, EMAIL_PATTERN, None);
        set.add_pattern(
            "phone.digits",
            FieldKind::Phone,
            PHONE_PATTERN,
            Some(PHONE_MIN_DIGITS),
        );
        set.push(FieldRule::line_keywords(
            "education.keywords",
            FieldKind::Education,
            EDUCATION_KEYWORDS,
        ));
        set.push(FieldRule::line_keywords(
            "qualification.keywords",
            FieldKind::Qualification,
            QUALIFICATION_KEYWORDS,
        ));
        set.push(FieldRule::line_keywords(
            "project.keywords",
            FieldKind::Project,
            PROJECT_KEYWORDS,
        ));
        set.push(FieldRule::terms("skill.terms", FieldKind::Skill, SKILL_TERMS));

        set
    }

    fn add_pattern(&mut self, id: &str, field: FieldKind, pattern: &str, min_digits: Option<usize>) {
        match FieldRule::pattern(id, field, pattern, min_digits) {
            Ok(rule) => self.rules.push(rule),
            Err(e) => tracing::warn!(rule = id, error = %e, "Skipping rule with invalid pattern"),
        }
    }

    /// Append a rule
    pub fn push(&mut self, rule: FieldRule) {
        self.rules.push(rule);
    }

    /// Builder-style append
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.push(rule);
        self
    }

    /// Remove a rule by id, returning whether it existed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() != before
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Run every rule over the text, in table order
    pub fn extract_fields(&self, text: &ExtractedText) -> Vec<FieldMatch> {
        let index = LineIndex::new(text);
        let matches: Vec<FieldMatch> = self
            .rules
            .iter()
            .flat_map(|rule| rule.apply(text, &index))
            .collect();

        tracing::debug!(rules = self.rules.len(), matches = matches.len(), "Extracted fields");
        matches
    }
}

static STANDARD_RULES: Lazy<RuleSet> = Lazy::new(RuleSet::standard);

/// Run the standard rule table over a text
pub fn extract_fields(text: &ExtractedText) -> Vec<FieldMatch> {
    STANDARD_RULES.extract_fields(text)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts_of(matches: &[FieldMatch], field: FieldKind) -> Vec<String> {
        matches
            .iter()
            .filter(|m| m.field == field)
            .map(|m| m.text.clone())
            .collect()
    }

    #[test]
    fn test_email_rule() {
        let text = ExtractedText::from_text("Contact: john.doe+work@example.co.uk");
        let matches = extract_fields(&text);
        assert_eq!(
            texts_of(&matches, FieldKind::Email),
            vec!["john.doe+work@example.co.uk"]
        );
        assert_eq!(matches[0].rule_id, "email.address");
    }

    #[test]
    fn test_multiple_emails_in_order() {
        let text = ExtractedText::from_text("a@x.io, b_c@y.org\nsecond: d%e@z.travel");
        let matches = extract_fields(&text);
        let emails: Vec<_> = matches.iter().filter(|m| m.field == FieldKind::Email).collect();
        assert_eq!(emails.len(), 3);
        assert_eq!(emails[0].text, "a@x.io");
        assert_eq!(emails[1].text, "b_c@y.org");
        assert_eq!(emails[2].text, "d%e@z.travel");
        assert_eq!(emails[2].line, 1);
    }

    #[test]
    fn test_email_requires_tld() {
        let text = ExtractedText::from_text("user@localhost and user@host.c");
        assert!(texts_of(&extract_fields(&text), FieldKind::Email).is_empty());
    }

    #[test]
    fn test_phone_threshold() {
        let text = ExtractedText::from_text("Phone: 123-456-7890\nPage 1234567\nFax 12345678");
        let phones = texts_of(&extract_fields(&text), FieldKind::Phone);
        assert_eq!(phones, vec!["123-456-7890", "12345678"]);
    }

    #[test]
    fn test_phone_international_format() {
        let text = ExtractedText::from_text("Mobile: +44 (20) 7946 0958");
        let phones = texts_of(&extract_fields(&text), FieldKind::Phone);
        assert_eq!(phones, vec!["+44 (20) 7946 0958"]);
    }

    #[test]
    fn test_phone_with_unicode_spaces() {
        let text = ExtractedText::from_text("Phone: +94\u{a0}77\u{a0}123\u{a0}4567\nTel 020\u{2009}7946\u{2009}0958");
        let phones = texts_of(&extract_fields(&text), FieldKind::Phone);
        assert_eq!(
            phones,
            vec!["+94\u{a0}77\u{a0}123\u{a0}4567", "020\u{2009}7946\u{2009}0958"]
        );
    }

    #[test]
    fn test_phone_does_not_cross_lines() {
        let text = ExtractedText::from_text("2019\n2021");
        assert!(texts_of(&extract_fields(&text), FieldKind::Phone).is_empty());
    }

    #[test]
    fn test_diploma_overlap() {
        let text = ExtractedText::from_text("Diploma in Computer Science");
        let matches = extract_fields(&text);
        assert_eq!(
            texts_of(&matches, FieldKind::Education),
            vec!["Diploma in Computer Science"]
        );
        assert_eq!(
            texts_of(&matches, FieldKind::Qualification),
            vec!["Diploma in Computer Science"]
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        let text = ExtractedText::from_text("my master plan\nMaster of Arts");
        assert_eq!(
            texts_of(&extract_fields(&text), FieldKind::Education),
            vec!["Master of Arts"]
        );
    }

    #[test]
    fn test_project_lines_keep_duplicates() {
        let text = ExtractedText::from_text("  Built a parser  \nBuilt a parser\nBuilt a parser");
        let projects = texts_of(&extract_fields(&text), FieldKind::Project);
        assert_eq!(projects, vec!["  Built a parser  ", "Built a parser", "Built a parser"]);
    }

    #[test]
    fn test_skill_terms_case_insensitive() {
        let text = ExtractedText::from_text("Skills: python, sql\nsome MACHINE LEARNING work");
        let skills = texts_of(&extract_fields(&text), FieldKind::Skill);
        assert_eq!(skills, vec!["Python", "SQL", "Machine Learning"]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let text = ExtractedText::from_lines(Vec::new());
        assert!(extract_fields(&text).is_empty());
    }

    #[test]
    fn test_custom_rule_table() {
        let rules = RuleSet::empty().with_rule(FieldRule::line_keywords(
            "project.github",
            FieldKind::Project,
            &["github.com"],
        ));
        let text = ExtractedText::from_text("see github.com/jane/parser\nBuilt things");
        let matches = rules.extract_fields(&text);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule_id, "project.github");
    }

    #[test]
    fn test_remove_rule() {
        let mut rules = RuleSet::standard();
        assert!(rules.remove("skill.terms"));
        assert!(!rules.remove("skill.terms"));
        assert!(rules.get("email.address").is_some());
        assert_eq!(rules.get("phone.digits").unwrap().scope(), RuleScope::WholeText);
    }

    #[test]
    fn test_line_index() {
        let text = ExtractedText::from_text("ab\n\ncd");
        let index = LineIndex::new(&text);
        assert_eq!(index.line_of(0), 0);
        assert_eq!(index.line_of(2), 0);
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(4), 2);
    }

    proptest! {
        #[test]
        fn prop_phone_matches_have_enough_digits(line in "[0-9 ()+-]{0,24}") {
            let text = ExtractedText::from_text(&line);
            for m in extract_fields(&text).iter().filter(|m| m.field == FieldKind::Phone) {
                prop_assert!(digit_count(&m.text) >= PHONE_MIN_DIGITS);
            }
        }
    }
}

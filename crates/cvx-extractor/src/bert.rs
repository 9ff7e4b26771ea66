//! Pretrained BERT named entity recognizer
//!
//! Runs a BERT token-classification checkpoint trained on the CoNLL-2003
//! label set (for example `dslim/bert-base-NER`) with candle on the CPU.
//! The model directory is a Hugging Face export holding `config.json`,
//! `tokenizer.json` and `model.safetensors`.
//!
//! Each line is tagged on its own. A word takes the label of its first
//! sub-token, and B-/I- tags are merged into spans. `PER` maps to PERSON,
//! `ORG` to ORG and `LOC` to GPE; `MISC` spans are dropped.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use crate::EntityRecognizer;
use cvx_core::{CvError, EntityCategory, EntityMatch, ExtractedText, Result};

/// BERT position limit
const MAX_TOKENS: usize = 512;

/// Spans whose mean word probability is below this are dropped
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

fn unavailable(context: &str, err: impl std::fmt::Display) -> CvError {
    CvError::ModelUnavailable(format!("{context}: {err}"))
}

// ============================================================================
// Labels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Person,
    Org,
    Location,
    Misc,
}

impl Kind {
    fn category(self) -> Option<EntityCategory> {
        match self {
            Kind::Person => Some(EntityCategory::Person),
            Kind::Org => Some(EntityCategory::Org),
            Kind::Location => Some(EntityCategory::Gpe),
            Kind::Misc => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Outside,
    Begin(Kind),
    Inside(Kind),
}

impl Tag {
    /// Parse an IOB2 label such as `B-PER` or `I-LOC`
    fn parse(label: &str) -> Tag {
        let Some((prefix, kind)) = label.split_once('-') else {
            return Tag::Outside;
        };
        let kind = match kind {
            "PER" | "PERSON" => Kind::Person,
            "ORG" => Kind::Org,
            "LOC" | "GPE" => Kind::Location,
            _ => Kind::Misc,
        };
        match prefix {
            "B" | "S" => Tag::Begin(kind),
            "I" | "E" => Tag::Inside(kind),
            _ => Tag::Outside,
        }
    }
}

/// Classifier head settings read from `config.json`
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    id2label: HashMap<String, String>,
}

/// Label for every classifier output, indexed by id
fn label_table(id2label: &HashMap<String, String>) -> Result<Vec<Tag>> {
    (0..id2label.len())
        .map(|id| {
            id2label
                .get(&id.to_string())
                .map(|label| Tag::parse(label))
                .ok_or_else(|| {
                    CvError::ModelUnavailable(format!("id2label has no entry for class {id}"))
                })
        })
        .collect()
}

// ============================================================================
// Span grouping
// ============================================================================

/// One word of a line with the label of its first sub-token
#[derive(Debug, Clone, Copy)]
struct TaggedWord {
    start: usize,
    end: usize,
    tag: Tag,
    score: f32,
}

struct OpenSpan {
    kind: Kind,
    start: usize,
    end: usize,
    score_sum: f32,
    words: usize,
}

/// Merge tagged words into entity spans
fn group_words(
    line: &str,
    line_no: usize,
    words: &[TaggedWord],
    min_score: f32,
) -> Vec<EntityMatch> {
    let mut entities = Vec::new();
    let mut open: Option<OpenSpan> = None;

    let close = |span: OpenSpan, entities: &mut Vec<EntityMatch>| {
        let score = span.score_sum / span.words as f32;
        let (Some(category), Some(text)) = (span.kind.category(), line.get(span.start..span.end))
        else {
            return;
        };
        let text = text.trim();
        if score >= min_score && !text.is_empty() {
            entities.push(
                EntityMatch::new(category, text)
                    .with_line(line_no)
                    .with_score(score),
            );
        }
    };

    for word in words {
        if let (Tag::Inside(kind), Some(span)) = (word.tag, open.as_mut()) {
            if span.kind == kind {
                span.end = word.end;
                span.score_sum += word.score;
                span.words += 1;
                continue;
            }
        }

        if let Some(span) = open.take() {
            close(span, &mut entities);
        }
        open = match word.tag {
            Tag::Begin(kind) | Tag::Inside(kind) => Some(OpenSpan {
                kind,
                start: word.start,
                end: word.end,
                score_sum: word.score,
                words: 1,
            }),
            Tag::Outside => None,
        };
    }
    if let Some(span) = open.take() {
        close(span, &mut entities);
    }

    entities
}

// ============================================================================
// Recognizer
// ============================================================================

/// BERT token classifier over a local checkpoint
pub struct BertNer {
    model_id: String,
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<Tag>,
    device: Device,
    min_score: f32,
}

impl BertNer {
    /// Load a checkpoint directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.json");
        let config_json = std::fs::read(&config_path)
            .map_err(|e| unavailable(&format!("cannot read {}", config_path.display()), e))?;
        let bert_config: BertConfig = serde_json::from_slice(&config_json)
            .map_err(|e| unavailable("invalid BERT config", e))?;
        let head: HeadConfig = serde_json::from_slice(&config_json)
            .map_err(|e| unavailable("invalid classifier config", e))?;
        let labels = label_table(&head.id2label)?;

        let tokenizer_path = dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| unavailable(&format!("cannot load {}", tokenizer_path.display()), e))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| unavailable("tokenizer truncation", e))?;

        let weights_path = dir.join("model.safetensors");
        let weights = std::fs::read(&weights_path)
            .map_err(|e| unavailable(&format!("cannot read {}", weights_path.display()), e))?;

        let device = Device::Cpu;
        let vb = VarBuilder::from_buffered_safetensors(weights, DType::F32, &device)
            .map_err(|e| unavailable("invalid weights", e))?;

        // Token-classification exports nest the encoder under `bert.`
        let encoder_vb = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            vb.pp("bert")
        } else {
            vb.clone()
        };
        let model = BertModel::load(encoder_vb, &bert_config)
            .map_err(|e| unavailable("cannot build BERT encoder", e))?;
        let classifier = candle_nn::linear(head.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| unavailable("cannot build classifier head", e))?;

        let name = dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("model");

        Ok(Self {
            model_id: format!("bert:{name}"),
            model,
            classifier,
            tokenizer,
            labels,
            device,
            min_score: DEFAULT_MIN_SCORE,
        })
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Per-token class probabilities for one encoded line
    fn probabilities(&self, ids: &[u32], type_ids: &[u32], mask: &[u32]) -> candle_core::Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids, &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(mask, &self.device)?.unsqueeze(0)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?;
        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec2::<f32>()
    }

    /// Tag every word of a line
    fn tag_words(&self, line: &str) -> Result<Vec<TaggedWord>> {
        let encoding = self
            .tokenizer
            .encode(line, true)
            .map_err(|e| unavailable("tokenization failed", e))?;

        let probs = self
            .probabilities(
                encoding.get_ids(),
                encoding.get_type_ids(),
                encoding.get_attention_mask(),
            )
            .map_err(|e| unavailable("BERT inference failed", e))?;

        let mut words: Vec<TaggedWord> = Vec::new();
        let mut last_word = None;

        for ((word_id, &(start, end)), row) in encoding
            .get_word_ids()
            .iter()
            .zip(encoding.get_offsets())
            .zip(&probs)
        {
            // Special and padding tokens carry no word id
            let Some(word_id) = *word_id else {
                continue;
            };

            if last_word == Some(word_id) {
                if let Some(word) = words.last_mut() {
                    word.end = end;
                }
                continue;
            }
            last_word = Some(word_id);

            let (class, score) = row
                .iter()
                .copied()
                .enumerate()
                .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });
            let tag = self.labels.get(class).copied().unwrap_or(Tag::Outside);

            words.push(TaggedWord {
                start,
                end,
                tag,
                score,
            });
        }

        Ok(words)
    }
}

impl EntityRecognizer for BertNer {
    fn recognize(&self, text: &ExtractedText) -> Result<Vec<EntityMatch>> {
        let mut entities = Vec::new();
        for (line_no, line) in text.iter() {
            if line.trim().is_empty() {
                continue;
            }
            let words = self.tag_words(line)?;
            entities.extend(group_words(line, line_no, &words, self.min_score));
        }

        debug!(model = %self.model_id, entities = entities.len(), "Recognized entities");
        Ok(entities)
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Tests
// ============================================================================

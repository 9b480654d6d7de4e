//! Language-tagged heading vocabulary.
//!
//! The heading-heuristic tier needs to know what a chapter opener looks like
//! in the document's language ("Chapter 3", "Capítulo IV", "2.1 …"). Those
//! keyword and ordinal-prefix lists are data, not code: they live in a
//! [`HeadingLexicon`] that callers can replace wholesale to support another
//! language without touching the detector.
//!
//! Built-in lexicons exist for English and Spanish. The Spanish one also
//! carries the English keywords — Spanish-market documents routinely mix
//! both, and a missed keyword only costs a heading candidate.

use crate::error::ConvertError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Configurable heading vocabulary for one source language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingLexicon {
    /// Language tag this lexicon targets, e.g. "en", "es".
    pub language: String,
    /// Chapter/part/section keywords matched case-insensitively at the
    /// start of a candidate block, followed by whitespace.
    pub keywords: Vec<String>,
    /// Regex sources matched at the start of a candidate block; defaults
    /// cover decimal ("3.", "12)") and Roman-numeral ("IV.") ordinals.
    pub ordinal_patterns: Vec<String>,
    /// Title of the synthetic front-matter chapter.
    pub front_matter_title: String,
    /// Label prefix for tier-3 fixed chunks ("Section" → "Section 1").
    pub section_label: String,
}

const DEFAULT_ORDINALS: [&str; 2] = [r"^\d+[\.\)\-\s]", r"^[IVXLCDM]+[\.\)\-\s]"];

impl HeadingLexicon {
    /// The built-in lexicon for a language tag; unknown tags get English.
    pub fn builtin(language: &str) -> Self {
        match language.split('-').next().unwrap_or("en") {
            "es" => Self {
                language: "es".into(),
                keywords: [
                    "capítulo", "capitulo", "chapter", "parte", "part", "sección", "seccion",
                    "section",
                ]
                .map(String::from)
                .to_vec(),
                ordinal_patterns: DEFAULT_ORDINALS.map(String::from).to_vec(),
                front_matter_title: "Portada".into(),
                section_label: "Sección".into(),
            },
            _ => Self {
                language: "en".into(),
                keywords: ["chapter", "part", "section"].map(String::from).to_vec(),
                ordinal_patterns: DEFAULT_ORDINALS.map(String::from).to_vec(),
                front_matter_title: "Front Matter".into(),
                section_label: "Section".into(),
            },
        }
    }

    /// Compile the vocabulary into matchers, once per conversion.
    pub fn compile(&self) -> Result<CompiledLexicon, ConvertError> {
        let alternation = self
            .keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let keyword_re = RegexBuilder::new(&format!(r"^(?:{alternation})\s"))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConvertError::InvalidConfig(format!("keyword list: {e}")))?;

        let ordinal_res = self
            .ordinal_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ConvertError::InvalidConfig(format!("ordinal pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledLexicon {
            keyword_re,
            ordinal_res,
            front_matter_title: self.front_matter_title.clone(),
            section_label: self.section_label.clone(),
        })
    }
}

impl Default for HeadingLexicon {
    fn default() -> Self {
        Self::builtin("en")
    }
}

/// A [`HeadingLexicon`] with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledLexicon {
    keyword_re: Regex,
    ordinal_res: Vec<Regex>,
    front_matter_title: String,
    section_label: String,
}

impl CompiledLexicon {
    /// True when `text` opens with a chapter/part/section keyword.
    pub fn starts_with_keyword(&self, text: &str) -> bool {
        self.keyword_re.is_match(text)
    }

    /// True when `text` opens with a decimal or Roman-numeral ordinal.
    pub fn starts_with_ordinal(&self, text: &str) -> bool {
        self.ordinal_res.iter().any(|re| re.is_match(text))
    }

    pub fn front_matter_title(&self) -> &str {
        &self.front_matter_title
    }

    /// Title for the n-th tier-3 chunk (1-indexed).
    pub fn section_title(&self, n: usize) -> String {
        format!("{} {}", self.section_label, n)
    }
}

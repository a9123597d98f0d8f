//! Scam-likelihood scoring.
//!
//! Each matched signal adds its weight once; the confidence is the sum
//! clipped to `[0, 1]`. Weights are non-negative, so more matched signals can
//! never lower the score.

use crate::extractor::IntelExtractor;
use crate::patterns::PatternLibrary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Default confidence at or above which a message counts as a scam.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Outcome of scoring one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Whether the confidence reached the threshold.
    pub is_scam: bool,
    /// Normalised score in `[0, 1]`.
    pub confidence: f64,
    /// Names of the signals that matched, in library order.
    #[serde(default)]
    pub signals: Vec<String>,
}

impl Detection {
    fn clean() -> Self {
        Self {
            is_scam: false,
            confidence: 0.0,
            signals: Vec::new(),
        }
    }
}

/// Scores messages for scam likelihood.
#[derive(Debug, Clone)]
pub struct ScamClassifier {
    library: Arc<PatternLibrary>,
    extractor: IntelExtractor,
    threshold: f64,
}

impl ScamClassifier {
    /// Creates a classifier with the default threshold.
    #[must_use]
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Self {
            extractor: IntelExtractor::new(Arc::clone(&library)),
            library,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Sets the scam threshold. Values outside `[0, 1]` are clamped; NaN
    /// keeps the default.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = if threshold.is_nan() {
            DEFAULT_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self
    }

    /// The configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores `text`.
    #[must_use]
    pub fn score(&self, text: &str) -> Detection {
        if text.trim().is_empty() {
            return Detection::clean();
        }

        let revealed = Revealed::of(text);
        let mut signals = Vec::new();
        let mut total = 0.0;

        for signal in self.library.signals() {
            if signal.is_match(text)
                || signal.is_match(&revealed.joined)
                || signal.is_match(&revealed.prefixes)
            {
                total += signal.weight();
                signals.push(signal.name().to_string());
            }
        }

        let intel = self.extractor.extract(text);
        let presence = self.library.presence();
        for (name, found, weight) in [
            ("link", !intel.links.is_empty(), presence.link),
            ("payment_identifier", !intel.upi_ids.is_empty(), presence.payment_id),
            ("bank_account", !intel.bank_accounts.is_empty(), presence.bank_account),
        ] {
            if found {
                total += weight;
                signals.push(name.to_string());
            }
        }

        // Rounding keeps float noise from flipping a threshold comparison.
        let confidence = ((total * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0);
        let is_scam = confidence >= self.threshold && confidence > 0.0;

        debug!(confidence, is_scam, signals = ?signals, "scored message");

        Detection {
            is_scam,
            confidence,
            signals,
        }
    }
}

impl Default for ScamClassifier {
    fn default() -> Self {
        Self::new(PatternLibrary::builtin())
    }
}

/// Longest spelled-out run expanded into per-prefix candidates.
const MAX_SPELLED_LETTERS: usize = 32;
/// Preceding words longer than this are left out of the candidates.
const MAX_CONTEXT_BYTES: usize = 64;

/// Lowercase views of a message with common obfuscations undone: letters
/// split by spaces, dots or dashes are re-joined and digits standing in for
/// letters inside words are mapped back.
#[derive(Debug)]
struct Revealed {
    /// Every run of single characters joined into one word.
    joined: String,
    /// Every run rendered as its successive prefixes (`o ; o t ; otp ; otpa`),
    /// each led by the word before the run. A spelled keyword followed by a
    /// one-letter word (`o t p a fee`) still shows up as `otp` here.
    prefixes: String,
}

impl Revealed {
    fn of(text: &str) -> Self {
        let mut views = Views::default();

        for token in text.split_whitespace() {
            let token = unleet(&token.to_lowercase());
            let collapsed = collapse_separated_letters(&token);

            // `t:` still ends a spaced-out word.
            let core = collapsed.trim_end_matches(|c: char| !c.is_alphanumeric());
            if core.chars().count() == 1 {
                let suffix = &collapsed[core.len()..];
                views.run.push(core.to_string());
                if !suffix.is_empty() {
                    views.flush_run();
                    views.push_suffix(suffix);
                }
                continue;
            }
            views.flush_run();
            views.joined.push(collapsed.clone());
            views.prefixes.push(collapsed);
        }
        views.flush_run();

        Self {
            joined: views.joined.join(" "),
            prefixes: views.prefixes.join(" "),
        }
    }
}

#[derive(Default)]
struct Views {
    run: Vec<String>,
    joined: Vec<String>,
    prefixes: Vec<String>,
}

impl Views {
    fn flush_run(&mut self) {
        if self.run.is_empty() {
            return;
        }

        let before = self
            .joined
            .last()
            .filter(|word| word.len() <= MAX_CONTEXT_BYTES)
            .cloned();
        let candidates: Vec<String> = (1..=self.run.len().min(MAX_SPELLED_LETTERS))
            .map(|len| {
                let word = spell(&self.run[..len]);
                match &before {
                    Some(before) => format!("{before} {word}"),
                    None => word,
                }
            })
            .collect();
        self.prefixes.push(candidates.join(" ; "));

        self.joined.push(spell(&self.run));
        self.run.clear();
    }

    fn push_suffix(&mut self, suffix: &str) {
        for words in [&mut self.joined, &mut self.prefixes] {
            if let Some(last) = words.last_mut() {
                last.push_str(suffix);
            }
        }
    }
}

/// Single-character tokens join into one word once at least three line up
/// (`u r g e n t`); shorter runs stay as they were.
fn spell(letters: &[String]) -> String {
    if letters.len() >= 3 {
        letters.concat()
    } else {
        letters.join(" ")
    }
}

/// `u.r.g.e.n.t` / `p-r-i-z-e` → `urgent` / `prize`.
fn collapse_separated_letters(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let letters = chars.iter().step_by(2).count();
    let separated = chars.len() >= 5
        && chars.iter().step_by(2).all(|c| c.is_alphanumeric())
        && chars
            .iter()
            .skip(1)
            .step_by(2)
            .all(|c| matches!(c, '.' | '-' | '_' | '*'))
        && letters >= 3;

    if separated {
        chars.into_iter().step_by(2).collect()
    } else {
        token.to_string()
    }
}

/// Maps digit and symbol stand-ins back to letters, but only when the token
/// also contains real letters so plain numbers are left alone.
fn unleet(token: &str) -> String {
    if !token.chars().any(|c| c.is_ascii_alphabetic()) {
        return token.to_string();
    }
    token
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'i',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            '$' => 's',
            other => other,
        })
        .collect()
}

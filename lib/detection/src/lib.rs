//! Scam detection for scambait.
//!
//! - **Pattern library**: tunable signals and identifier formats
//! - **Classifier**: weighted signal scoring into a [`Detection`]
//! - **Extractor**: payment identifiers, links and bank accounts as an [`IntelBundle`]
//!
//! Both the classifier and the extractor are total: any text, including the
//! empty string, yields a well-formed result.

pub mod classifier;
pub mod error;
pub mod extractor;
pub mod patterns;

pub use classifier::{DEFAULT_THRESHOLD, Detection, ScamClassifier};
pub use error::PatternError;
pub use extractor::{IntelBundle, IntelExtractor};
pub use patterns::{PatternConfig, PatternLibrary, PresenceWeights, SignalSpec};

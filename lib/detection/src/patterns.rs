//! Pattern library shared by the classifier and the extractor.
//!
//! Every pattern, weight and allow/deny list here is tuning, not contract.
//! `PatternConfig::default()` carries the built-in set; deployments can ship
//! their own as JSON and compile it with [`PatternLibrary::from_config`].

use crate::error::PatternError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// A keyword signal as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    /// Name reported in `Detection::signals`.
    pub name: String,
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
    /// Contribution to the confidence when matched. Must be >= 0.
    pub weight: f64,
}

impl SignalSpec {
    /// Creates a signal specification.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            weight,
        }
    }
}

/// Weights for signals derived from extracted identifiers rather than
/// keywords.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresenceWeights {
    /// A link is present.
    #[serde(default = "default_link_weight")]
    pub link: f64,
    /// A payment identifier (UPI-style handle) is present.
    #[serde(default = "default_payment_id_weight")]
    pub payment_id: f64,
    /// A bank-account-like number is present.
    #[serde(default = "default_bank_account_weight")]
    pub bank_account: f64,
}

fn default_link_weight() -> f64 {
    0.25
}

fn default_payment_id_weight() -> f64 {
    0.3
}

fn default_bank_account_weight() -> f64 {
    0.2
}

impl Default for PresenceWeights {
    fn default() -> Self {
        Self {
            link: default_link_weight(),
            payment_id: default_payment_id_weight(),
            bank_account: default_bank_account_weight(),
        }
    }
}

/// Serializable pattern configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Keyword signals.
    #[serde(default = "default_signals")]
    pub signals: Vec<SignalSpec>,
    /// Weights for identifier-presence signals.
    #[serde(default)]
    pub presence: PresenceWeights,
    /// Known payment handles (`name@<handle>`).
    #[serde(default = "default_upi_handles")]
    pub upi_handles: Vec<String>,
    /// Free-mail provider names never treated as payment handles.
    #[serde(default = "default_email_exclusions")]
    pub email_exclusions: Vec<String>,
    /// Accept `name@handle` with a handle missing from `upi_handles`, as long
    /// as it is not excluded.
    #[serde(default = "default_accept_unknown_handles")]
    pub accept_unknown_handles: bool,
    /// Top-level domains recognised in bare (scheme-less) links.
    #[serde(default = "default_link_tlds")]
    pub link_tlds: Vec<String>,
}

fn default_signals() -> Vec<SignalSpec> {
    vec![
        SignalSpec::new(
            "urgency",
            r"\b(?:urgent(?:ly)?|immediately|right away|now|asap|hurry|act fast|last chance|final (?:notice|warning|reminder)|expir(?:e|es|ed|ing|y)|within \d+\s*(?:hours?|hrs?|minutes?|mins?)|today only|limited time)\b",
            0.25,
        ),
        SignalSpec::new(
            "account_threat",
            r"\b(?:block(?:ed|ing)?|suspend(?:ed)?|suspension|deactivat(?:e|ed|ion)|locked|frozen|freez(?:e|ing)|kyc|legal action|arrest(?:ed)?|warrant|penalty|disconnect(?:ed|ion)?)\b",
            0.3,
        ),
        SignalSpec::new(
            "prize",
            r"\b(?:congrat(?:s|ulations?)|won|winner|winning|prize|lottery|jackpot|rewards?|cashback|lucky (?:draw|winner)|selected|gift card|claim)\b",
            0.35,
        ),
        SignalSpec::new(
            "payment_request",
            r"(?:\b(?:send|pay|payment|transfer|deposit|(?:processing |registration |delivery )?fee|refund|rupees|inr)\b|₹)",
            0.25,
        ),
        SignalSpec::new(
            "credential_request",
            r"\b(?:otp|one time password|pin|password|cvv|verification code|card (?:number|details)|aadha?ar|pan card|net ?banking|login details)\b",
            0.35,
        ),
        SignalSpec::new(
            "call_to_action",
            r"\b(?:click|tap|open the link|visit|download|install|scan the qr|share the code)\b",
            0.15,
        ),
        SignalSpec::new(
            "impersonation",
            r"\b(?:bank manager|customer care|rbi|income tax|customs|courier|electricity (?:board|bill)|sbi|hdfc|icici)\b",
            0.15,
        ),
    ]
}

fn default_upi_handles() -> Vec<String> {
    [
        "upi", "ybl", "ibl", "axl", "paytm", "apl", "yapl", "okaxis", "okhdfcbank", "okicici",
        "oksbi", "axisbank", "icici", "hdfcbank", "sbi", "kotak", "boi", "pnb", "barodampay",
        "unionbank", "idfcbank", "indus", "fbl", "rbl", "jupiteraxis", "freecharge", "airtel",
        "jio", "waicici", "wahdfcbank", "waaxis", "wasbi", "ikwik", "postbank", "dbs",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_email_exclusions() -> Vec<String> {
    [
        "gmail", "googlemail", "yahoo", "ymail", "outlook", "hotmail", "live", "msn", "icloud",
        "me", "aol", "protonmail", "proton", "zoho", "gmx", "mail", "yandex", "rediffmail",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_accept_unknown_handles() -> bool {
    true
}

fn default_link_tlds() -> Vec<String> {
    [
        "com", "net", "org", "in", "co", "io", "info", "biz", "xyz", "top", "online", "site",
        "app", "link", "live", "club", "shop", "store", "me", "ly", "gl", "to", "cc", "tk", "ml",
        "ga", "cf", "gq", "ru", "cn",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            signals: default_signals(),
            presence: PresenceWeights::default(),
            upi_handles: default_upi_handles(),
            email_exclusions: default_email_exclusions(),
            accept_unknown_handles: default_accept_unknown_handles(),
            link_tlds: default_link_tlds(),
        }
    }
}

impl PatternConfig {
    /// Parses a pattern configuration from JSON. Missing fields take the
    /// built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a pattern configuration.
    pub fn from_json(json: &str) -> scambait_core::Result<Self, PatternError> {
        let config = serde_json::from_str(json).map_err(|e| PatternError::ParseFailed {
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Reads a JSON pattern configuration from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> scambait_core::Result<Self, PatternError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| PatternError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json)
    }
}

/// A compiled keyword signal.
#[derive(Debug, Clone)]
pub struct Signal {
    name: String,
    regex: Regex,
    weight: f64,
}

impl Signal {
    /// The signal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signal weight.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns true if the signal matches anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Compiled patterns for scam signals, payment identifiers, bank accounts,
/// phone numbers and links.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    signals: Vec<Signal>,
    presence: PresenceWeights,
    link: Regex,
    payment_id: Regex,
    account_number: Regex,
    phone: Regex,
    upi_handles: HashSet<String>,
    email_exclusions: HashSet<String>,
    accept_unknown_handles: bool,
}

static BUILTIN: LazyLock<Arc<PatternLibrary>> = LazyLock::new(|| {
    let library = PatternLibrary::compile(&PatternConfig::default())
        .unwrap_or_else(|e| panic!("built-in patterns must compile: {e}"));
    Arc::new(library)
});

const PAYMENT_ID_PATTERN: &str =
    r"\b([a-z0-9][a-z0-9._-]{0,63})@([a-z][a-z0-9]{1,63})(\.[a-z][a-z0-9-]*)?";
const ACCOUNT_NUMBER_PATTERN: &str = r"\b\d{9,18}\b";
const PHONE_PATTERN: &str = r"^(?:0|91)?[6-9]\d{9}$";

impl PatternLibrary {
    /// Returns the shared built-in library.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Compiles a library from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile, a signal has an empty
    /// name, or a weight is negative or not finite.
    pub fn from_config(config: &PatternConfig) -> scambait_core::Result<Self, PatternError> {
        Ok(Self::compile(config)?)
    }

    fn compile(config: &PatternConfig) -> Result<Self, PatternError> {
        let signals = config
            .signals
            .iter()
            .map(compile_signal)
            .collect::<Result<Vec<_>, _>>()?;

        let presence = config.presence;
        for (name, weight) in [
            ("link", presence.link),
            ("payment_identifier", presence.payment_id),
            ("bank_account", presence.bank_account),
        ] {
            check_weight(name, weight)?;
        }

        let tlds = config
            .link_tlds
            .iter()
            .map(|tld| regex::escape(tld.trim_start_matches('.')))
            .filter(|tld| !tld.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        let link_pattern = format!(
            r#"\bhttps?://[^\s<>"'`]*[^\s<>"'`.,;:!?)\]}}]|\b(?:www\.)?(?:[a-z0-9](?:[a-z0-9-]{{0,61}}[a-z0-9])?\.)+(?:{tlds})\b(?:/[^\s<>"'`]*[^\s<>"'`.,;:!?)\]}}])?"#
        );

        Ok(Self {
            signals,
            presence,
            link: build_regex("link", &link_pattern)?,
            payment_id: build_regex("payment_identifier", PAYMENT_ID_PATTERN)?,
            account_number: build_regex("bank_account", ACCOUNT_NUMBER_PATTERN)?,
            phone: build_regex("phone", PHONE_PATTERN)?,
            upi_handles: lowercase_set(&config.upi_handles),
            email_exclusions: lowercase_set(&config.email_exclusions),
            accept_unknown_handles: config.accept_unknown_handles,
        })
    }

    /// Keyword signals in configuration order.
    #[must_use]
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Weights for identifier-presence signals.
    #[must_use]
    pub fn presence(&self) -> PresenceWeights {
        self.presence
    }

    pub(crate) fn link_regex(&self) -> &Regex {
        &self.link
    }

    pub(crate) fn payment_id_regex(&self) -> &Regex {
        &self.payment_id
    }

    pub(crate) fn account_number_regex(&self) -> &Regex {
        &self.account_number
    }

    /// Returns true if a bare digit run is shaped like a phone number.
    #[must_use]
    pub fn is_phone_number(&self, digits: &str) -> bool {
        self.phone.is_match(digits)
    }

    /// Decides whether a dotless handle (the part after `@`) names a payment
    /// provider.
    #[must_use]
    pub fn is_payment_handle(&self, handle: &str) -> bool {
        let handle = handle.to_ascii_lowercase();
        if self.upi_handles.contains(&handle) {
            return true;
        }
        self.accept_unknown_handles && !self.email_exclusions.contains(&handle)
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::builtin().as_ref().clone()
    }
}

fn compile_signal(spec: &SignalSpec) -> Result<Signal, PatternError> {
    if spec.name.trim().is_empty() {
        return Err(PatternError::EmptyName);
    }
    check_weight(&spec.name, spec.weight)?;
    Ok(Signal {
        name: spec.name.clone(),
        regex: build_regex(&spec.name, &spec.pattern)?,
        weight: spec.weight,
    })
}

fn check_weight(name: &str, weight: f64) -> Result<(), PatternError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(PatternError::InvalidWeight {
            name: name.to_string(),
            weight,
        })
    }
}

fn build_regex(name: &str, pattern: &str) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PatternError::InvalidRegex {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn lowercase_set(items: &[String]) -> HashSet<String> {
    items
        .iter()
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

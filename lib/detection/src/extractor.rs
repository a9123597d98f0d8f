//! Intelligence extraction.
//!
//! Pulls payment identifiers, links and bank-account-like numbers out of a
//! single message. Extraction is pure: the same text always yields the same
//! bundle, in first-seen order, without duplicates.

use crate::patterns::PatternLibrary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

/// Identifiers extracted from a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelBundle {
    /// UPI-style payment identifiers (`name@handle`).
    pub upi_ids: Vec<String>,
    /// URLs and bare domains.
    pub links: Vec<String>,
    /// Bank-account-like digit runs.
    pub bank_accounts: Vec<String>,
}

impl IntelBundle {
    /// Returns true if nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upi_ids.is_empty() && self.links.is_empty() && self.bank_accounts.is_empty()
    }

    /// Total number of extracted identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.upi_ids.len() + self.links.len() + self.bank_accounts.len()
    }

    /// Folds `other` into `self`, keeping first-seen order and skipping
    /// entries already present.
    pub fn merge(&mut self, other: &IntelBundle) {
        merge_into(&mut self.upi_ids, &other.upi_ids);
        merge_into(&mut self.links, &other.links);
        merge_into(&mut self.bank_accounts, &other.bank_accounts);
    }
}

fn merge_into(target: &mut Vec<String>, items: &[String]) {
    let mut seen: HashSet<String> = target.iter().map(|s| dedup_key(s)).collect();
    for item in items {
        if seen.insert(dedup_key(item)) {
            target.push(item.clone());
        }
    }
}

fn dedup_key(item: &str) -> String {
    item.to_lowercase()
}

/// Insertion-ordered set keyed case-insensitively.
#[derive(Default)]
struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    fn insert(&mut self, item: &str) {
        if self.seen.insert(dedup_key(item)) {
            self.items.push(item.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// Extracts intelligence from free text.
#[derive(Debug, Clone)]
pub struct IntelExtractor {
    library: Arc<PatternLibrary>,
}

impl IntelExtractor {
    /// Creates an extractor over the given pattern library.
    #[must_use]
    pub fn new(library: Arc<PatternLibrary>) -> Self {
        Self { library }
    }

    /// Extracts every identifier found in `text`.
    #[must_use]
    pub fn extract(&self, text: &str) -> IntelBundle {
        // Spans already claimed by links or `x@y` tokens; digits inside them
        // are never bank accounts.
        let mut claimed: Vec<Range<usize>> = Vec::new();

        let mut links = OrderedSet::default();
        let mut link_spans = Vec::new();
        for m in self.library.link_regex().find_iter(text) {
            claimed.push(m.range());
            if is_email_fragment(text, m.range()) {
                continue;
            }
            link_spans.push(m.range());
            links.insert(m.as_str());
        }

        let mut upi_ids = OrderedSet::default();
        for caps in self.library.payment_id_regex().captures_iter(text) {
            let (Some(whole), Some(handle)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            claimed.push(whole.range());
            // A dotted domain makes this an e-mail address.
            if caps.get(3).is_some() || overlaps_any(&link_spans, &whole.range()) {
                continue;
            }
            if self.library.is_payment_handle(handle.as_str()) {
                upi_ids.insert(whole.as_str());
            }
        }

        let mut bank_accounts = OrderedSet::default();
        for m in self.library.account_number_regex().find_iter(text) {
            if overlaps_any(&claimed, &m.range())
                || preceded_by(text, m.start(), '+')
                || is_decimal_part(text, m.range())
                || self.library.is_phone_number(m.as_str())
            {
                continue;
            }
            bank_accounts.insert(m.as_str());
        }

        IntelBundle {
            upi_ids: upi_ids.into_vec(),
            links: links.into_vec(),
            bank_accounts: bank_accounts.into_vec(),
        }
    }
}

impl Default for IntelExtractor {
    fn default() -> Self {
        Self::new(PatternLibrary::builtin())
    }
}

fn is_email_fragment(text: &str, span: Range<usize>) -> bool {
    preceded_by(text, span.start, '@') || text[span.end..].starts_with('@')
}

fn preceded_by(text: &str, index: usize, c: char) -> bool {
    text[..index].chars().next_back() == Some(c)
}

/// True when the digits are one side of a decimal amount (`123456789.50`,
/// `0.123456789`).
fn is_decimal_part(text: &str, span: Range<usize>) -> bool {
    let mut after = text[span.end..].chars();
    let decimal_after = matches!(after.next(), Some('.' | ','))
        && after.next().is_some_and(|c| c.is_ascii_digit());

    let mut before = text[..span.start].chars().rev();
    let decimal_before = matches!(before.next(), Some('.' | ','))
        && before.next().is_some_and(|c| c.is_ascii_digit());

    decimal_after || decimal_before
}

fn overlaps_any(spans: &[Range<usize>], span: &Range<usize>) -> bool {
    spans
        .iter()
        .any(|other| other.start < span.end && span.start < other.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternConfig;

    fn extract(text: &str) -> IntelBundle {
        IntelExtractor::default().extract(text)
    }

    #[test]
    fn empty_text_yields_empty_bundle() {
        let bundle = extract("");
        assert!(bundle.is_empty());
        assert_eq!(bundle.len(), 0);
    }

    #[test]
    fn http_link_without_trailing_punctuation() {
        let bundle =
            extract("Congratulations! You won a prize. Click http://example.com to claim.");
        assert_eq!(bundle.links, vec!["http://example.com"]);
        assert!(bundle.upi_ids.is_empty());
        assert!(bundle.bank_accounts.is_empty());

        let bundle = extract("Go to https://secure-login.example.net/verify?id=7.");
        assert_eq!(
            bundle.links,
            vec!["https://secure-login.example.net/verify?id=7"]
        );
    }

    #[test]
    fn bare_domains_are_links() {
        let bundle = extract("visit www.kyc-update.in/form or bit.ly/x9z now");
        assert_eq!(bundle.links, vec!["www.kyc-update.in/form", "bit.ly/x9z"]);
    }

    #[test]
    fn upi_ids_are_extracted() {
        let bundle = extract("send to meena123@upi now or account is blocked");
        assert_eq!(bundle.upi_ids, vec!["meena123@upi"]);
        assert!(bundle.links.is_empty());

        let bundle = extract("pay rahul.k-22@okaxis or 9876543210@ybl.");
        assert_eq!(bundle.upi_ids, vec!["rahul.k-22@okaxis", "9876543210@ybl"]);
        assert!(bundle.bank_accounts.is_empty());
    }

    #[test]
    fn emails_are_not_upi_ids_or_links() {
        let bundle = extract("mail me at john.doe@gmail.com or support@bank.co.in");
        assert!(bundle.upi_ids.is_empty());
        assert!(bundle.links.is_empty());

        let bundle = extract("ping me at someone@gmail");
        assert!(bundle.upi_ids.is_empty());
    }

    #[test]
    fn unknown_handles_follow_configuration() {
        assert_eq!(extract("use fraud@newbank").upi_ids, vec!["fraud@newbank"]);

        let strict = PatternLibrary::from_config(&PatternConfig {
            accept_unknown_handles: false,
            ..PatternConfig::default()
        })
        .expect("compiles");
        let bundle = IntelExtractor::new(Arc::new(strict)).extract("use fraud@newbank or x@ybl");
        assert_eq!(bundle.upi_ids, vec!["x@ybl"]);
    }

    #[test]
    fn bank_accounts_skip_phones_and_short_numbers() {
        let bundle = extract(
            "deposit into 123456789012 IFSC SBIN0001234, call 9876543210 or +91 9123456789, otp 482913",
        );
        assert_eq!(bundle.bank_accounts, vec!["123456789012"]);
    }

    #[test]
    fn bank_accounts_ignore_overlong_and_embedded_digits() {
        let bundle = extract("ref 1234567890123456789012 and https://x.com/pay/123456789012");
        assert!(bundle.bank_accounts.is_empty());
        assert_eq!(bundle.links, vec!["https://x.com/pay/123456789012"]);
    }

    #[test]
    fn decimal_amounts_are_not_bank_accounts() {
        assert!(extract("pay Rs 123456789.50 now").bank_accounts.is_empty());
        assert!(extract("fee of 1,234567890123 or 0.123456789").bank_accounts.is_empty());
        assert_eq!(
            extract("acct 123456789012. Pay today").bank_accounts,
            vec!["123456789012"]
        );
    }

    #[test]
    fn duplicates_are_dropped_in_first_seen_order() {
        let bundle = extract(
            "pay b@ybl then a@ybl then B@YBL; acct 111122223333 and 111122223333; http://z.com http://z.com",
        );
        assert_eq!(bundle.upi_ids, vec!["b@ybl", "a@ybl"]);
        assert_eq!(bundle.bank_accounts, vec!["111122223333"]);
        assert_eq!(bundle.links, vec!["http://z.com"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "send 5000 to scam@paytm, account 000111222333, see http://a.xyz/b";
        let extractor = IntelExtractor::default();
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }

    #[test]
    fn merge_keeps_order_and_skips_known() {
        let mut ledger = extract("pay a@ybl at http://one.com");
        ledger.merge(&extract("pay A@ybl or b@ybl, acct 123456789012"));
        assert_eq!(ledger.upi_ids, vec!["a@ybl", "b@ybl"]);
        assert_eq!(ledger.links, vec!["http://one.com"]);
        assert_eq!(ledger.bank_accounts, vec!["123456789012"]);
    }

    #[test]
    fn bundle_serializes_with_wire_field_names() {
        let json = serde_json::to_value(extract("a@ybl")).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"upi_ids": ["a@ybl"], "links": [], "bank_accounts": []})
        );
    }
}

//! Prompt templates.
//!
//! Templates use `{{variable}}` placeholders. Rendering is a single pass over
//! the template, so placeholder-looking text inside a substituted value (a
//! scammer writing `{{context}}`, say) is never expanded again.

use std::collections::HashMap;

/// Persona directive sent as the system message.
pub const PERSONA_SYSTEM_PROMPT: &str = "\
You are roleplaying as a gullible but friendly elderly person who is trying hard to cooperate \
with whoever is messaging you. Your goal is to keep them talking and waste their time by \
responding directly to what they asked, sounding a little confused and asking for step-by-step \
instructions.

Hard rules:
- Never warn, lecture, or mention scams, safety, fraud or authorities.
- Never break character or reveal that you are an AI or automated.
- Never give real sensitive information. If asked for a UPI ID, bank account, card, OTP or \
password, offer an obviously invalid placeholder and ask whether that is the right one.
- Reply in one or two short sentences, in the same language and tone as their message.
- Address their latest request and end with a follow-up question that slows them down.

Helpful patterns:
- Asked for a UPI ID: \"Is it meena123@abc? My phone says invalid, where do I find the proper one?\"
- Asked for an OTP or password: \"I see some numbers but I'm not sure which one, where exactly should I look?\"
- Asked to pay: \"I'm trying but it keeps showing an error, can you show me slowly step by step?\"
- Mix up terms or misread digits now and then, but stay polite and cooperative.";

/// User-message template for one honeypot turn.
pub const REPLY_TEMPLATE: &str = "\
Conversation so far:
{{context}}

Their latest message:
{{message}}

Your one or two sentence reply:";

/// A prompt template with an optional system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Template name (used in logs).
    pub name: String,
    /// Template content with placeholders.
    pub content: String,
    /// Optional system prompt template.
    pub system_prompt: Option<String>,
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            system_prompt: None,
        }
    }

    /// The built-in honeypot persona.
    #[must_use]
    pub fn honeypot_persona() -> Self {
        Self::new("honeypot_reply", REPLY_TEMPLATE).with_system_prompt(PERSONA_SYSTEM_PROMPT)
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Renders the template. Unknown placeholders are left in place.
    #[must_use]
    pub fn render(&self, variables: &HashMap<&str, &str>) -> String {
        substitute(&self.content, variables)
    }

    /// Renders the system prompt with the given variables.
    #[must_use]
    pub fn render_system_prompt(&self, variables: &HashMap<&str, &str>) -> Option<String> {
        self.system_prompt
            .as_deref()
            .map(|template| substitute(template, variables))
    }
}

fn substitute(template: &str, variables: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match variables.get(after[..end].trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

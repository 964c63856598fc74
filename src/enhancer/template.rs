//! Shared pieces of the event template miners

use std::hash::Hasher;

use fnv::FnvHasher;

/// Placeholder for a variable token in a template
pub const WILDCARD: &str = "<*>";

/// Mines one event template per message
///
/// Implementations see the whole batch before answering, so a template may be
/// generalized by messages that arrive after the one it is reported for.
pub trait TemplateMiner {
    /// Returns one template per input message, in input order
    fn mine(&mut self, messages: &[&str]) -> Vec<String>;

    /// Miner name (for logging)
    fn name(&self) -> &str;
}

/// Stable identifier of a template text
///
/// Ids depend only on the template, so tables mined separately (train and
/// test) share ids for identical templates.
pub fn template_id(template: &str) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(template.as_bytes());
    format!("{:016x}", hasher.finish())
}

pub(crate) fn has_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn split_tokens(message: &str) -> Vec<String> {
    message.split_whitespace().map(str::to_string).collect()
}

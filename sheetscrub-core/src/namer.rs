//! Template name derivation through the translation table

use crate::error::StoreError;
use crate::extract::ContentSignature;
use crate::store::TranslationStore;
use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("separator pattern is valid"));

/// Outcome of a name lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Known(String),
    Needed(NameRequest),
}

/// A signature with no name yet. The caller supplies one and hands it back
/// through [`NameRequest::fulfill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRequest {
    pub signature: ContentSignature,
    pub suggestion: String,
}

impl NameRequest {
    pub fn new(signature: ContentSignature) -> Self {
        let suggestion = suggest_name(&signature);
        Self {
            signature,
            suggestion,
        }
    }

    /// Record the chosen name and return it. A blank answer takes the suggestion.
    pub fn fulfill(self, store: &mut TranslationStore<'_>, name: &str) -> Result<String, StoreError> {
        let name = match name.trim() {
            "" => self.suggestion,
            chosen => chosen.to_string(),
        };
        store.record(&self.signature.key, &name)?;
        Ok(name)
    }
}

/// Look the signature up in the store
pub fn resolve(store: &TranslationStore<'_>, signature: &ContentSignature) -> Resolution {
    match store.lookup(&signature.key) {
        Some(name) => Resolution::Known(name.to_string()),
        None => Resolution::Needed(NameRequest::new(signature.clone())),
    }
}

/// Signature values joined with `_`, whitespace collapsed: `Leg Day|Advanced` -> `Leg_Day_Advanced`
pub fn suggest_name(signature: &ContentSignature) -> String {
    let joined = signature.values().collect::<Vec<_>>().join("_");
    SEPARATOR_RUN
        .replace_all(joined.trim(), "_")
        .trim_matches('_')
        .to_string()
}

/// Final title for a copy: the template name, with the client token appended
/// when one is given
pub fn title_for(name: &str, client_token: Option<&str>, token_separator: &str) -> String {
    match client_token {
        Some(token) if !token.trim().is_empty() => format!("{name}{token_separator}{}", token.trim()),
        _ => name.to_string(),
    }
}

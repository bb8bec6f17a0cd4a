//! Utterance classification
//!
//! Lexical check deciding whether a message describes a transfer between
//! the user's own accounts or a single-sided expense/income.

/// Result of classifying an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceKind {
    Transfer,
    SingleSided,
}

/// Transfer, withdrawal, top-up and cash-out markers
const TRANSFER_MARKERS: &[&str] = &[
    // Russian verbs and inflections
    "перевел",
    "перевёл",
    "перевела",
    "перевести",
    "перевод",
    "снял",
    "сняла",
    "снять",
    "взял",
    "пополнил",
    "пополнила",
    "пополнить",
    "перекинул",
    "перекинула",
    "перебросил",
    "наличными",
    "в наличные",
    "наличкой",
    // English
    "transfer",
    "withdr",
    "top up",
    "topped up",
    "top-up",
    "cash out",
];

/// Classify an utterance by case-insensitive marker membership
pub fn classify(utterance: &str) -> UtteranceKind {
    let lowered = utterance.to_lowercase();
    if TRANSFER_MARKERS.iter().any(|m| lowered.contains(m)) {
        UtteranceKind::Transfer
    } else {
        UtteranceKind::SingleSided
    }
}

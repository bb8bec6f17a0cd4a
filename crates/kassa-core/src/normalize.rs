//! Account name normalization
//!
//! Maps free-text bank/account mentions ("Каспи голд", "halyk card",
//! "налом") onto the closed [`AccountName`] set. Rules are checked in order
//! and the first rule with a matching marker wins.

use crate::models::AccountName;

/// Ordered (markers, account) rules, matched as lowercase substrings
const RULES: &[(&[&str], AccountName)] = &[
    (&["каспи", "kaspi"], AccountName::Kaspi),
    (&["халык", "halyk"], AccountName::Halyk),
    (&["сбер", "sber"], AccountName::Sber),
    (&["форте", "forte"], AccountName::Forte),
    (&["налич", "кэш", "cash"], AccountName::Cash),
];

/// Normalize a raw account mention
///
/// Empty, missing, or unrecognized input maps to [`AccountName::Other`].
pub fn normalize_account(raw: Option<&str>) -> AccountName {
    let Some(raw) = raw else {
        return AccountName::Other;
    };

    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return AccountName::Other;
    }

    RULES
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| needle.contains(m)))
        .map(|(_, account)| *account)
        .unwrap_or(AccountName::Other)
}

/// Normalize an optional account field, keeping absence as `None`
///
/// Used for single-sided transactions where "no account mentioned" must
/// stay distinct from "unrecognized account".
pub fn normalize_optional(raw: Option<&str>) -> Option<AccountName> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && !is_null_marker(s))
        .map(|s| normalize_account(Some(s)))
}

// Oracles sometimes spell "no value" as a string
fn is_null_marker(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "null" | "none" | "n/a")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_banks() {
        assert_eq!(normalize_account(Some("Каспи")), AccountName::Kaspi);
        assert_eq!(normalize_account(Some("kaspi gold")), AccountName::Kaspi);
        assert_eq!(normalize_account(Some("ХАЛЫК банк")), AccountName::Halyk);
        assert_eq!(normalize_account(Some("Halyk")), AccountName::Halyk);
        assert_eq!(normalize_account(Some("сбербанк")), AccountName::Sber);
        assert_eq!(normalize_account(Some("ForteBank")), AccountName::Forte);
    }

    #[test]
    fn test_cash_variants() {
        assert_eq!(normalize_account(Some("наличные")), AccountName::Cash);
        assert_eq!(normalize_account(Some("наличка")), AccountName::Cash);
        assert_eq!(normalize_account(Some("кэш")), AccountName::Cash);
        assert_eq!(normalize_account(Some("Cash")), AccountName::Cash);
    }

    #[test]
    fn test_unknown_and_empty_map_to_other() {
        assert_eq!(normalize_account(None), AccountName::Other);
        assert_eq!(normalize_account(Some("")), AccountName::Other);
        assert_eq!(normalize_account(Some("   ")), AccountName::Other);
        assert_eq!(normalize_account(Some("Jusan")), AccountName::Other);
    }

    #[test]
    fn test_first_rule_wins() {
        // Mentions two banks; kaspi is listed first
        assert_eq!(
            normalize_account(Some("halyk → kaspi")),
            AccountName::Kaspi
        );
    }

    #[test]
    fn test_idempotent_on_canonical_tokens() {
        for account in AccountName::all() {
            let once = normalize_account(Some(account.as_str()));
            assert_eq!(once, *account);
            assert_eq!(normalize_account(Some(once.as_str())), once);
        }
    }

    #[test]
    fn test_optional_keeps_absence() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("")), None);
        assert_eq!(normalize_optional(Some("null")), None);
        assert_eq!(normalize_optional(Some("каспи")), Some(AccountName::Kaspi));
        assert_eq!(normalize_optional(Some("Jusan")), Some(AccountName::Other));
    }
}

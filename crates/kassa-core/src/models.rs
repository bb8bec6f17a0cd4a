//! Domain models for Kassa

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which way money moves in a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Expense,
    Income,
    Transfer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "расход" => Ok(Self::Expense),
            "income" | "доход" => Ok(Self::Income),
            "transfer" | "перевод" => Ok(Self::Transfer),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical account/bank tokens
///
/// Every free-text account mention is normalized into one of these
/// (see [`crate::normalize::normalize_account`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountName {
    Kaspi,
    Halyk,
    Sber,
    Forte,
    Cash,
    Other,
}

impl AccountName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kaspi => "kaspi",
            Self::Halyk => "halyk",
            Self::Sber => "sber",
            Self::Forte => "forte",
            Self::Cash => "cash",
            Self::Other => "other",
        }
    }

    pub fn all() -> &'static [AccountName] {
        &[
            Self::Kaspi,
            Self::Halyk,
            Self::Sber,
            Self::Forte,
            Self::Cash,
            Self::Other,
        ]
    }
}

impl std::str::FromStr for AccountName {
    type Err = String;

    /// Strict parse of a canonical token (stored values, CLI flags)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown account: {}", s))
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed category vocabulary
///
/// Expense and income share the `Other` sentinel; `Transfer` is reserved for
/// transfer rows and never valid for a single-sided transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    // Expense
    Food,
    Transport,
    Entertainment,
    Shopping,
    Housing,
    Health,
    // Income
    Salary,
    Investments,
    Gifts,
    SideJob,
    // Shared sentinel
    Other,
    // Transfer sentinel
    Transfer,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Entertainment => "entertainment",
            Self::Shopping => "shopping",
            Self::Housing => "housing",
            Self::Health => "health",
            Self::Salary => "salary",
            Self::Investments => "investments",
            Self::Gifts => "gifts",
            Self::SideJob => "side_job",
            Self::Other => "other",
            Self::Transfer => "transfer",
        }
    }

    /// Native-script label used in prompts and accepted back from the oracle
    pub fn native_label(&self) -> &'static str {
        match self {
            Self::Food => "еда",
            Self::Transport => "транспорт",
            Self::Entertainment => "развлечения",
            Self::Shopping => "покупки",
            Self::Housing => "жилье",
            Self::Health => "здоровье",
            Self::Salary => "зарплата",
            Self::Investments => "инвестиции",
            Self::Gifts => "подарки",
            Self::SideJob => "подработка",
            Self::Other => "другое",
            Self::Transfer => "перевод",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Food => "🍕",
            Self::Transport => "🚗",
            Self::Entertainment => "🎮",
            Self::Shopping => "🛒",
            Self::Housing => "🏠",
            Self::Health => "💊",
            Self::Salary => "💼",
            Self::Investments => "📈",
            Self::Gifts => "🎁",
            Self::SideJob => "💰",
            Self::Other => "📦",
            Self::Transfer => "🔄",
        }
    }

    pub fn expense_vocabulary() -> &'static [Category] {
        &[
            Self::Food,
            Self::Transport,
            Self::Entertainment,
            Self::Shopping,
            Self::Housing,
            Self::Health,
            Self::Other,
        ]
    }

    pub fn income_vocabulary() -> &'static [Category] {
        &[
            Self::Salary,
            Self::Investments,
            Self::Gifts,
            Self::SideJob,
            Self::Other,
        ]
    }

    /// Categories a row with the given direction may carry
    pub fn vocabulary_for(direction: Direction) -> &'static [Category] {
        match direction {
            Direction::Expense => Self::expense_vocabulary(),
            Direction::Income => Self::income_vocabulary(),
            Direction::Transfer => &[Self::Transfer],
        }
    }

    pub fn is_valid_for(&self, direction: Direction) -> bool {
        Self::vocabulary_for(direction).contains(self)
    }

    fn every() -> &'static [Category] {
        &[
            Self::Food,
            Self::Transport,
            Self::Entertainment,
            Self::Shopping,
            Self::Housing,
            Self::Health,
            Self::Salary,
            Self::Investments,
            Self::Gifts,
            Self::SideJob,
            Self::Other,
            Self::Transfer,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Accepts canonical tokens and native-script labels
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('ё', "е");
        Self::every()
            .iter()
            .copied()
            .find(|c| c.as_str() == needle || c.native_label() == needle)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a ledger row moves money between accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum Movement {
    /// Money leaves the named account (or an unspecified one)
    Expense { account: Option<AccountName> },
    /// Money arrives on the named account (or an unspecified one)
    Income { account: Option<AccountName> },
    /// Money moves from one account to another
    Transfer {
        source: AccountName,
        destination: AccountName,
    },
}

impl Movement {
    pub fn direction(&self) -> Direction {
        match self {
            Self::Expense { .. } => Direction::Expense,
            Self::Income { .. } => Direction::Income,
            Self::Transfer { .. } => Direction::Transfer,
        }
    }

    /// Primary account column: the named account, or the transfer source
    pub fn account(&self) -> Option<AccountName> {
        match *self {
            Self::Expense { account } | Self::Income { account } => account,
            Self::Transfer { source, .. } => Some(source),
        }
    }

    pub fn destination(&self) -> Option<AccountName> {
        match *self {
            Self::Transfer { destination, .. } => Some(destination),
            _ => None,
        }
    }

    /// Display label; transfers render as "source → destination"
    pub fn account_label(&self) -> Option<String> {
        match self {
            Self::Expense { account } | Self::Income { account } => {
                account.map(|a| a.as_str().to_string())
            }
            Self::Transfer {
                source,
                destination,
            } => Some(format!("{} → {}", source, destination)),
        }
    }

    /// Signed balance adjustments this movement applies for `amount`
    ///
    /// Single-sided rows without an account touch no balance.
    pub fn balance_deltas(&self, amount: f64) -> Vec<(AccountName, f64)> {
        match *self {
            Self::Expense { account } => account.map(|a| (a, -amount)).into_iter().collect(),
            Self::Income { account } => account.map(|a| (a, amount)).into_iter().collect(),
            Self::Transfer {
                source,
                destination,
            } => vec![(source, -amount), (destination, amount)],
        }
    }

    /// Rebuild a movement from stored columns
    pub fn from_columns(
        direction: Direction,
        account: Option<AccountName>,
        destination: Option<AccountName>,
    ) -> Self {
        match direction {
            Direction::Expense => Self::Expense { account },
            Direction::Income => Self::Income { account },
            Direction::Transfer => Self::Transfer {
                source: account.unwrap_or(AccountName::Other),
                destination: destination.unwrap_or(AccountName::Other),
            },
        }
    }
}

/// A persisted ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    /// Always positive; the sign comes from `movement`
    pub amount: f64,
    pub currency: String,
    pub category: Category,
    pub description: String,
    pub movement: Movement,
    /// Extraction confidence in [0, 1]
    pub confidence: f64,
    /// Verbatim source utterance
    pub raw_text: String,
    pub occurred_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn direction(&self) -> Direction {
        self.movement.direction()
    }

    pub fn account_label(&self) -> Option<String> {
        self.movement.account_label()
    }

    pub fn balance_deltas(&self) -> Vec<(AccountName, f64)> {
        self.movement.balance_deltas(self.amount)
    }

    /// Whether this row adjusts the balance of `account`
    pub fn touches(&self, account: AccountName) -> bool {
        self.balance_deltas().iter().any(|(a, _)| *a == account)
    }
}

/// A validated transaction ready for the ledger (before insertion)
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    pub category: Category,
    pub description: String,
    pub movement: Movement,
    pub confidence: f64,
    pub raw_text: String,
    pub occurred_at: NaiveDate,
}

/// A candidate that could not become a ledger row
///
/// Carries the best-known partial fields so the caller can ask the user to
/// clarify. Never written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedDraft {
    pub amount: Option<f64>,
    pub currency: String,
    pub category: Category,
    pub description: String,
    pub direction: Direction,
    pub account_label: Option<String>,
    pub confidence: f64,
    pub raw_text: String,
    pub reason: String,
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub home_currency: String,
    pub created_at: DateTime<Utc>,
}

/// Running balance of one account of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub user_id: i64,
    pub account: AccountName,
    /// Manually entered starting balance
    pub opening_balance: f64,
    /// opening_balance plus every ledger adjustment
    pub balance: f64,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

/// Sum and count for one category over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: f64,
    pub count: i64,
}

/// Income/expense overview for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub total_expenses: f64,
    pub total_income: f64,
    pub transfer_count: i64,
}

impl PeriodSummary {
    pub fn net(&self) -> f64 {
        self.total_income - self.total_expenses
    }
}

/// Stored balance that disagrees with a full ledger replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDiscrepancy {
    pub account: AccountName,
    pub stored: f64,
    pub expected: f64,
}

impl BalanceDiscrepancy {
    pub fn difference(&self) -> f64 {
        self.stored - self.expected
    }
}

/// Reporting window for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Today,
    /// Monday of the current week through today
    Week,
    /// First of the current month through today
    Month,
    /// The last `n` days including today
    LastDays(u32),
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl StatsPeriod {
    /// Resolve to an inclusive `(from, to)` date range relative to `today`
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            Self::Today => (today, today),
            Self::Week => {
                let offset = today.weekday().num_days_from_monday() as i64;
                (today - Duration::days(offset), today)
            }
            Self::Month => (today.with_day(1).unwrap_or(today), today),
            Self::LastDays(n) => {
                let span = Duration::days(n.max(1) as i64 - 1);
                let from = today.checked_sub_signed(span).unwrap_or(NaiveDate::MIN);
                (from, today)
            }
            Self::Day(day) => (day, day),
            Self::Range(from, to) if from <= to => (from, to),
            Self::Range(from, to) => (to, from),
        }
    }
}

impl std::str::FromStr for StatsPeriod {
    type Err = String;

    /// Parses `today`, `week`, `month`, `<n>d`, or an ISO date
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "today" | "day" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => {
                if let Some(days) = other.strip_suffix('d') {
                    return days
                        .parse::<u32>()
                        .map(Self::LastDays)
                        .map_err(|_| format!("Invalid period: {}", s));
                }
                NaiveDate::parse_from_str(other, "%Y-%m-%d")
                    .map(Self::Day)
                    .map_err(|_| {
                        format!(
                            "Invalid period: {} (expected today, week, month, <n>d, or YYYY-MM-DD)",
                            s
                        )
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_category_accepts_native_labels() {
        assert_eq!("еда".parse::<Category>().unwrap(), Category::Food);
        assert_eq!("Зарплата".parse::<Category>().unwrap(), Category::Salary);
        assert_eq!("жильё".parse::<Category>().unwrap(), Category::Housing);
        assert_eq!("side_job".parse::<Category>().unwrap(), Category::SideJob);
        assert!("coffee".parse::<Category>().is_err());
    }

    #[test]
    fn test_vocabularies_are_disjoint_except_other() {
        for c in Category::expense_vocabulary() {
            if *c != Category::Other {
                assert!(!c.is_valid_for(Direction::Income), "{} leaked", c);
            }
        }
        assert!(Category::Other.is_valid_for(Direction::Expense));
        assert!(Category::Other.is_valid_for(Direction::Income));
        assert!(!Category::Transfer.is_valid_for(Direction::Expense));
        assert!(Category::Transfer.is_valid_for(Direction::Transfer));
    }

    #[test]
    fn test_transfer_deltas_balance_out() {
        let movement = Movement::Transfer {
            source: AccountName::Kaspi,
            destination: AccountName::Halyk,
        };
        let deltas = movement.balance_deltas(50_000.0);
        assert_eq!(
            deltas,
            vec![(AccountName::Kaspi, -50_000.0), (AccountName::Halyk, 50_000.0)]
        );
        assert_eq!(movement.account_label().as_deref(), Some("kaspi → halyk"));
    }

    #[test]
    fn test_unspecified_account_has_no_deltas() {
        let movement = Movement::Expense { account: None };
        assert!(movement.balance_deltas(800.0).is_empty());
        assert!(movement.account_label().is_none());
    }

    #[test]
    fn test_movement_from_columns() {
        let m = Movement::from_columns(
            Direction::Transfer,
            Some(AccountName::Halyk),
            Some(AccountName::Cash),
        );
        assert_eq!(m.account(), Some(AccountName::Halyk));
        assert_eq!(m.destination(), Some(AccountName::Cash));

        let m = Movement::from_columns(Direction::Income, Some(AccountName::Kaspi), None);
        assert_eq!(m.balance_deltas(10.0), vec![(AccountName::Kaspi, 10.0)]);
    }

    #[test]
    fn test_stats_period_resolve() {
        // 2024-01-17 is a Wednesday
        let today = date(2024, 1, 17);
        assert_eq!(StatsPeriod::Today.resolve(today), (today, today));
        assert_eq!(StatsPeriod::Week.resolve(today), (date(2024, 1, 15), today));
        assert_eq!(StatsPeriod::Month.resolve(today), (date(2024, 1, 1), today));
        assert_eq!(
            StatsPeriod::LastDays(30).resolve(today),
            (date(2023, 12, 19), today)
        );
        assert_eq!(
            StatsPeriod::Range(today, date(2024, 1, 1)).resolve(today),
            (date(2024, 1, 1), today)
        );
    }

    #[test]
    fn test_long_last_days_clamps_to_earliest_date() {
        let today = date(2024, 1, 15);
        let period = "100000000d".parse::<StatsPeriod>().unwrap();
        assert_eq!(period.resolve(today), (NaiveDate::MIN, today));
        assert_eq!(
            StatsPeriod::LastDays(u32::MAX).resolve(today),
            (NaiveDate::MIN, today)
        );
    }

    #[test]
    fn test_stats_period_parse() {
        assert_eq!("week".parse::<StatsPeriod>().unwrap(), StatsPeriod::Week);
        assert_eq!(
            "30d".parse::<StatsPeriod>().unwrap(),
            StatsPeriod::LastDays(30)
        );
        assert_eq!(
            "2024-03-05".parse::<StatsPeriod>().unwrap(),
            StatsPeriod::Day(date(2024, 3, 5))
        );
        assert!("fortnight".parse::<StatsPeriod>().is_err());
    }
}

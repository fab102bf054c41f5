//! Core types for the expense ledger
//!
//! All types are designed for:
//! - Deterministic serialization (ordered maps, no floats)
//! - Exact arithmetic (integer cents for money, Decimal for percentages)
//! - Read-only use by the engine; records are created by the caller

use crate::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque participant identifier.
///
/// Ordering is lexicographic and doubles as the settlement tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create new participant ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identifier used everywhere in the engine
    pub id: ParticipantId,

    /// Display name, never interpreted
    pub display_name: String,
}

impl Participant {
    /// Create new participant
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            display_name: display_name.into(),
        }
    }
}

/// Group roster: every participant balances are computed for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl Roster {
    /// Build a roster; a repeated id keeps the last display name
    pub fn new(participants: impl IntoIterator<Item = Participant>) -> Self {
        Self {
            participants: participants
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    /// Roster from bare ids, using the id as display name
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(|id| {
            let id = id.into();
            Participant::new(id.clone(), id)
        }))
    }

    /// Membership check
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    /// Look up a participant
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Participant ids in id order
    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.participants.keys()
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// True when the roster is empty
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// ISO 4217 currency code.
///
/// Carried as metadata; amounts are never converted between currencies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    #[default]
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// UAE Dirham
    AED,
    /// Indian Rupee
    INR,
    /// Japanese Yen
    JPY,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::INR => "INR",
            Currency::JPY => "JPY",
        }
    }

    /// Number of minor-unit digits
    pub fn minor_units(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Minor units per major unit (100 for cents)
    pub fn minor_scale(&self) -> i64 {
        10i64.pow(self.minor_units())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AED" => Some(Currency::AED),
            "INR" => Some(Currency::INR),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Expense identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    /// Fresh time-ordered ID
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an expense total is divided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Same share for everyone, leftover cents to the first participants
    Equal,

    /// Caller-asserted amounts that must sum to the total
    ExactAmounts(BTreeMap<ParticipantId, Money>),

    /// Percentages (0-100) that must sum to 100
    Percentages(BTreeMap<ParticipantId, Decimal>),
}

impl SplitPolicy {
    /// Participants named by the policy itself (empty for `Equal`)
    pub fn referenced_participants(&self) -> Vec<&ParticipantId> {
        match self {
            SplitPolicy::Equal => Vec::new(),
            SplitPolicy::ExactAmounts(amounts) => amounts.keys().collect(),
            SplitPolicy::Percentages(percentages) => percentages.keys().collect(),
        }
    }
}

/// An expense as supplied by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Expense ID
    pub id: ExpenseId,

    /// Total amount
    pub total: Money,

    /// Currency (metadata only)
    #[serde(default)]
    pub currency: Currency,

    /// Who fronted the money, if recorded
    pub payer: Option<ParticipantId>,

    /// Split policy
    pub policy: SplitPolicy,

    /// Participants in supplied order; the order drives remainder fixup
    pub participants: Vec<ParticipantId>,
}

impl ExpenseRecord {
    /// Expense split equally
    pub fn equal(
        total: Money,
        payer: Option<ParticipantId>,
        participants: Vec<ParticipantId>,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            total,
            currency: Currency::default(),
            payer,
            policy: SplitPolicy::Equal,
            participants,
        }
    }

    /// Set the currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Set the split policy
    pub fn with_policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// True when a payer is recorded
    pub fn has_payer(&self) -> bool {
        self.payer.is_some()
    }
}

/// One participant's share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Participant
    pub participant: ParticipantId,

    /// Amount owed toward the expense
    pub amount: Money,
}

/// Per-participant shares, in the order participants were supplied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shares(Vec<Share>);

impl Shares {
    pub(crate) fn from_vec(shares: Vec<Share>) -> Self {
        Self(shares)
    }

    /// Share of one participant
    pub fn get(&self, id: &ParticipantId) -> Option<Money> {
        self.0
            .iter()
            .find(|share| &share.participant == id)
            .map(|share| share.amount)
    }

    /// Iterate shares in input order
    pub fn iter(&self) -> impl Iterator<Item = &Share> + '_ {
        self.0.iter()
    }

    /// Sum of all shares
    pub fn total(&self) -> crate::Result<Money> {
        Money::checked_sum(self.0.iter().map(|share| share.amount))
    }

    /// Number of shares
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no shares
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shares keyed by participant
    pub fn to_map(&self) -> BTreeMap<ParticipantId, Money> {
        self.0
            .iter()
            .map(|share| (share.participant.clone(), share.amount))
            .collect()
    }
}

/// Net position of one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Participant
    pub participant: ParticipantId,

    /// Positive = is owed, negative = owes
    pub net: Money,
}

impl Balance {
    /// Participant is owed money
    pub fn is_creditor(&self) -> bool {
        self.net.is_positive()
    }

    /// Participant owes money
    pub fn is_debtor(&self) -> bool {
        self.net.is_negative()
    }
}

/// Net balances of a whole group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSheet(BTreeMap<ParticipantId, Money>);

impl BalanceSheet {
    /// Empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheet with every roster member at zero
    pub fn zeroed(roster: &Roster) -> Self {
        Self(roster.ids().map(|id| (id.clone(), Money::ZERO)).collect())
    }

    /// Net balance of a participant
    pub fn get(&self, id: &ParticipantId) -> Option<Money> {
        self.0.get(id).copied()
    }

    /// Set a participant's balance
    pub fn set(&mut self, id: ParticipantId, net: Money) {
        self.0.insert(id, net);
    }

    /// Add a signed amount to a participant's balance
    pub fn adjust(&mut self, id: &ParticipantId, delta: Money) -> crate::Result<()> {
        let entry = self.0.entry(id.clone()).or_insert(Money::ZERO);
        *entry = entry.checked_add(delta).ok_or_else(|| {
            crate::Error::Overflow(format!("balance of {} overflowed", id))
        })?;
        Ok(())
    }

    /// Iterate balances in participant order
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, Money)> + '_ {
        self.0.iter().map(|(id, net)| (id, *net))
    }

    /// Balances as records, in participant order
    pub fn balances(&self) -> Vec<Balance> {
        self.iter()
            .map(|(id, net)| Balance {
                participant: id.clone(),
                net,
            })
            .collect()
    }

    /// Sum of all balances; zero for any conserved sheet
    pub fn total(&self) -> i128 {
        self.0.values().map(|net| i128::from(net.cents())).sum()
    }

    /// Participants whose balance is not zero
    pub fn nonzero_count(&self) -> usize {
        self.0.values().filter(|net| !net.is_zero()).count()
    }

    /// True when every balance is zero
    pub fn is_settled(&self) -> bool {
        self.nonzero_count() == 0
    }

    /// Number of participants on the sheet
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the sheet has no participants
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ParticipantId, Money)> for BalanceSheet {
    fn from_iter<I: IntoIterator<Item = (ParticipantId, Money)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A single point-to-point payment in a settlement plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debtor (pays)
    pub from: ParticipantId,

    /// Creditor (receives)
    pub to: ParticipantId,

    /// Amount, always positive
    pub amount: Money,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}

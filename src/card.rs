//! Card data model: the in-progress form entry, its per-field errors, and the
//! records persisted by the remote API.
//!
//! These are the types that cross the network boundary (`FormFields` going
//! out, `SavedCard` coming back) plus the `Field` enum used everywhere a
//! single form field needs to be named (key dispatch, error lookup, rendering).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

// ── Field ────────────────────────────────────────────────────────────────────

/// One of the four editable form fields.
///
/// `Ord` is derived so `Field` can key a `BTreeMap`; `FieldErrors` iterates
/// in declaration order, which keeps error output deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CardNumber,
    ExpiryDate,
    CardholderName,
    Cvv,
}

impl Field {
    /// Fields in the order the form displays them (CVV sits next to the
    /// expiry date, the holder name comes last).
    pub const FORM_ORDER: [Field; 4] = [
        Field::CardNumber,
        Field::ExpiryDate,
        Field::Cvv,
        Field::CardholderName,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::CardNumber => "Card number",
            Field::ExpiryDate => "Expiry date",
            Field::CardholderName => "Cardholder name",
            Field::Cvv => "CVV",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Field::CardNumber => "0000 0000 0000 0000",
            Field::ExpiryDate => "MM/YY",
            Field::CardholderName => "FULL NAME",
            Field::Cvv => "123",
        }
    }

    /// Whether the value is rendered masked (like a password input).
    pub fn is_secret(self) -> bool {
        self == Field::Cvv
    }

    /// Masked fields only hold digits plus separators inserted by the
    /// formatter; editing them works digit-by-digit.
    pub fn is_digit_mask(self) -> bool {
        self != Field::CardholderName
    }

    /// The next field in display order, wrapping around.
    pub fn next(self) -> Self {
        let i = Self::position(self);
        Self::FORM_ORDER[(i + 1) % Self::FORM_ORDER.len()]
    }

    /// The previous field in display order, wrapping around.
    pub fn prev(self) -> Self {
        let i = Self::position(self);
        let len = Self::FORM_ORDER.len();
        Self::FORM_ORDER[(i + len - 1) % len]
    }

    fn position(field: Field) -> usize {
        Self::FORM_ORDER
            .iter()
            .position(|f| *f == field)
            .unwrap_or(0)
    }
}

// ── FormFields ───────────────────────────────────────────────────────────────

/// The editable, not-yet-persisted card entry.
///
/// `#[serde(rename_all = "camelCase")]` maps `card_number` to `cardNumber`
/// and so on, matching the JSON body the create endpoint expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    pub card_number: String,
    pub expiry_date: String,
    pub cardholder_name: String,
    pub cvv: String,
}

impl FormFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::CardNumber => &self.card_number,
            Field::ExpiryDate => &self.expiry_date,
            Field::CardholderName => &self.cardholder_name,
            Field::Cvv => &self.cvv,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::CardNumber => &mut self.card_number,
            Field::ExpiryDate => &mut self.expiry_date,
            Field::CardholderName => &mut self.cardholder_name,
            Field::Cvv => &mut self.cvv,
        };
        *slot = value;
    }

    pub fn is_empty(&self) -> bool {
        Field::FORM_ORDER.iter().all(|f| self.get(*f).is_empty())
    }
}

// ── FieldErrors ──────────────────────────────────────────────────────────────

/// Human-readable messages for the fields currently failing validation.
///
/// Only failing fields have an entry. The map is rebuilt wholesale on every
/// validation pass, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

// ── SavedCard ────────────────────────────────────────────────────────────────

/// A persisted card record as returned by the API.
///
/// The client never invents an `id`; it always comes from a list or create
/// response. Some backends serialize ids as numbers, so deserialization
/// accepts either form and keeps a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCard {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cardholder_name: String,
}

impl SavedCard {
    /// The card number with its middle eight digits hidden.
    pub fn masked_number(&self) -> String {
        mask_card_number(&self.card_number)
    }
}

/// Hide the middle eight digits of a 16-digit card number:
/// `4111111111111111` becomes `4111********1111`.
///
/// Whitespace is ignored when counting digits. Anything that is not exactly
/// 16 digits is returned unchanged.
pub fn mask_card_number(number: &str) -> String {
    let digits: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() == 16 && digits.chars().all(|c| c.is_ascii_digit()) {
        format!("{}********{}", &digits[..4], &digits[12..])
    } else {
        number.to_string()
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────

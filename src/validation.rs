//! Keystroke normalization and submit-time validation.
//!
//! Everything here is a pure function of its input: formatting maps a raw
//! field value to its canonical display string, validation maps a complete
//! `FormFields` to a `FieldErrors` map. The controller applies formatting on
//! every edit, so validation only ever sees formatted values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::card::{Field, FieldErrors, FormFields};

/// Longest formatted card number: 16 digits plus 3 separators.
pub const CARD_NUMBER_MAX: usize = 19;
/// `MM/YY`
pub const EXPIRY_MAX: usize = 5;
pub const NAME_MAX: usize = 20;
pub const CVV_MAX: usize = 3;

pub const CARD_NUMBER_ERROR: &str = "Card number must have 16 digits";
pub const EXPIRY_ERROR: &str = "Invalid format (MM/YY)";
pub const NAME_ERROR: &str = "Invalid name (max. 20 characters, letters only)";
pub const CVV_ERROR: &str = "CVV must have 3 digits";

// `[0-9]` rather than `\d`: the regex crate's `\d` matches any Unicode digit.
static CARD_DIGITS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{16}$").expect("card number pattern"));

static EXPIRY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("expiry pattern"));

static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑ\s]{1,20}$").expect("name pattern"));

static CVV_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3}$").expect("cvv pattern"));

// ── Formatting ───────────────────────────────────────────────────────────────

/// Normalize a raw value typed into `field` into its display form.
pub fn format_field(field: Field, raw: &str) -> String {
    match field {
        Field::CardNumber => format_card_number(raw),
        Field::ExpiryDate => format_expiry_date(raw),
        Field::CardholderName => format_cardholder_name(raw),
        Field::Cvv => format_cvv(raw),
    }
}

/// Digits only, a single space after every fourth digit, at most 19 chars.
pub fn format_card_number(raw: &str) -> String {
    let mut out = String::with_capacity(CARD_NUMBER_MAX);
    for (i, d) in raw.chars().filter(char::is_ascii_digit).enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(d);
    }
    truncate_chars(out, CARD_NUMBER_MAX)
}

/// Digits only, `/` forced after the first two, at most 5 chars.
pub fn format_expiry_date(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 2 {
        return digits;
    }
    // ASCII digits, so byte offsets are char offsets.
    let (month, rest) = digits.split_at(2);
    let year = &rest[..rest.len().min(2)];
    truncate_chars(format!("{month}/{year}"), EXPIRY_MAX)
}

/// Letters (ASCII plus `áéíóúñ` and their capitals) and whitespace only,
/// at most 20 chars.
pub fn format_cardholder_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| is_name_char(*c))
        .take(NAME_MAX)
        .collect()
}

/// Digits only, at most 3.
pub fn format_cvv(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).take(CVV_MAX).collect()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_whitespace() || "áéíóúÁÉÍÓÚñÑ".contains(c)
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}

/// Remove one unit of input from the end of `value` and re-normalize.
///
/// For digit-masked fields a unit is one digit together with any trailing
/// separators the formatter inserted; otherwise backspacing `12/` would strip
/// the slash, the formatter would put it straight back, and the field could
/// never be emptied. For the name field a unit is one character.
pub fn backspace(field: Field, value: &str) -> String {
    let mut s = value.to_string();
    if field.is_digit_mask() {
        while s.ends_with(|c: char| !c.is_ascii_digit()) {
            s.pop();
        }
    }
    s.pop();
    format_field(field, &s)
}

// ── Validation ───────────────────────────────────────────────────────────────

/// Check every field of `fields` and collect the failures.
///
/// All four rules always run, so several errors can surface at once. The
/// form is valid exactly when the returned map is empty.
pub fn validate(fields: &FormFields) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let digits = strip_whitespace(&fields.card_number);
    if !CARD_DIGITS_REGEX.is_match(&digits) {
        errors.insert(Field::CardNumber, CARD_NUMBER_ERROR);
    }
    if !EXPIRY_REGEX.is_match(&fields.expiry_date) {
        errors.insert(Field::ExpiryDate, EXPIRY_ERROR);
    }
    if !NAME_REGEX.is_match(&fields.cardholder_name) {
        errors.insert(Field::CardholderName, NAME_ERROR);
    }
    if !CVV_REGEX.is_match(&fields.cvv) {
        errors.insert(Field::Cvv, CVV_ERROR);
    }

    errors
}

/// The body actually sent to the create endpoint: the card number loses all
/// of its whitespace, everything else goes out as displayed.
pub fn for_submission(fields: &FormFields) -> FormFields {
    FormFields {
        card_number: strip_whitespace(&fields.card_number),
        ..fields.clone()
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_fields() -> FormFields {
        FormFields {
            card_number: "4111 1111 1111 1111".into(),
            expiry_date: "12/25".into(),
            cardholder_name: "Jose Pérez".into(),
            cvv: "123".into(),
        }
    }

    // ── formatting ───────────────────────────────────────────────────────

    #[test]
    fn card_number_groups_digits_by_four() {
        assert_eq!(format_card_number(""), "");
        assert_eq!(format_card_number("4"), "4");
        assert_eq!(format_card_number("4111"), "4111");
        assert_eq!(format_card_number("41111"), "4111 1");
        assert_eq!(format_card_number("4111111111111111"), "4111 1111 1111 1111");
    }

    #[test]
    fn card_number_groups_hold_for_every_length() {
        let digits = "1234567890123456";
        for n in 0..=digits.len() {
            let formatted = format_card_number(&digits[..n]);
            assert!(formatted.len() <= CARD_NUMBER_MAX);
            assert!(!formatted.contains("  "));
            assert!(!formatted.ends_with(' '));
            for group in formatted.split(' ').filter(|g| !g.is_empty()) {
                assert!(group.len() <= 4);
            }
            let groups: Vec<&str> = formatted.split(' ').collect();
            for group in &groups[..groups.len().saturating_sub(1)] {
                assert_eq!(group.len(), 4, "{formatted:?}");
            }
        }
    }

    #[test]
    fn card_number_drops_junk_and_extra_digits() {
        assert_eq!(format_card_number("4111-1111 abc"), "4111 1111");
        assert_eq!(
            format_card_number("41111111111111112222"),
            "4111 1111 1111 1111"
        );
    }

    #[test]
    fn expiry_inserts_slash_after_month() {
        assert_eq!(format_expiry_date(""), "");
        assert_eq!(format_expiry_date("1"), "1");
        assert_eq!(format_expiry_date("12"), "12/");
        assert_eq!(format_expiry_date("122"), "12/2");
        assert_eq!(format_expiry_date("1225"), "12/25");
        assert_eq!(format_expiry_date("12/25"), "12/25");
    }

    #[test]
    fn expiry_never_exceeds_five_chars() {
        for raw in ["123456", "12/34/56", "99999999", "ab12cd34ef56"] {
            let formatted = format_expiry_date(raw);
            assert!(formatted.chars().count() <= EXPIRY_MAX, "{formatted:?}");
            assert_eq!(formatted.chars().nth(2), Some('/'));
        }
    }

    #[test]
    fn name_keeps_letters_accents_and_spaces() {
        assert_eq!(format_cardholder_name("José Núñez"), "José Núñez");
        assert_eq!(format_cardholder_name("Jose123 Perez!"), "Jose Perez");
        assert_eq!(
            format_cardholder_name("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
            "ABCDEFGHIJKLMNOPQRST"
        );
    }

    #[test]
    fn cvv_keeps_three_digits() {
        assert_eq!(format_cvv("1a2"), "12");
        assert_eq!(format_cvv("12345"), "123");
    }

    #[test]
    fn format_field_dispatches_by_field() {
        assert_eq!(format_field(Field::CardNumber, "12345"), "1234 5");
        assert_eq!(format_field(Field::ExpiryDate, "0130"), "01/30");
        assert_eq!(format_field(Field::CardholderName, "Ana9"), "Ana");
        assert_eq!(format_field(Field::Cvv, "9999"), "999");
    }

    // ── backspace ────────────────────────────────────────────────────────

    #[test]
    fn backspace_removes_expiry_slash_with_digit() {
        assert_eq!(backspace(Field::ExpiryDate, "12/"), "1");
        assert_eq!(backspace(Field::ExpiryDate, "12/3"), "12/");
        assert_eq!(backspace(Field::ExpiryDate, "1"), "");
        assert_eq!(backspace(Field::ExpiryDate, ""), "");
    }

    #[test]
    fn backspace_on_card_number_removes_one_digit() {
        assert_eq!(backspace(Field::CardNumber, "4111 1"), "4111");
        assert_eq!(backspace(Field::CardNumber, "4111"), "411");
    }

    #[test]
    fn backspace_on_name_removes_one_char() {
        assert_eq!(backspace(Field::CardholderName, "Jose "), "Jose");
        assert_eq!(backspace(Field::CardholderName, "Pérez"), "Pére");
    }

    // ── validation ───────────────────────────────────────────────────────

    #[test]
    fn valid_form_has_no_errors() {
        assert!(validate(&valid_fields()).is_empty());
    }

    #[test]
    fn card_number_needs_sixteen_digits() {
        let mut fields = valid_fields();
        fields.card_number = "4111 1111 1111".into();
        let errors = validate(&fields);
        assert_eq!(errors.get(Field::CardNumber), Some(CARD_NUMBER_ERROR));
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn expiry_month_must_be_in_range() {
        let mut fields = valid_fields();
        fields.expiry_date = "13/25".into();
        assert!(validate(&fields).contains(Field::ExpiryDate));
        fields.expiry_date = "00/25".into();
        assert!(validate(&fields).contains(Field::ExpiryDate));
        fields.expiry_date = "12/25".into();
        assert!(!validate(&fields).contains(Field::ExpiryDate));
    }

    #[test]
    fn name_rejects_digits_and_empty() {
        let mut fields = valid_fields();
        fields.cardholder_name = "Jose123".into();
        assert!(validate(&fields).contains(Field::CardholderName));
        fields.cardholder_name = String::new();
        assert!(validate(&fields).contains(Field::CardholderName));
        fields.cardholder_name = "Jose Pérez".into();
        assert!(!validate(&fields).contains(Field::CardholderName));
    }

    #[test]
    fn cvv_needs_exactly_three_digits() {
        let mut fields = valid_fields();
        fields.cvv = "12".into();
        assert_eq!(validate(&fields).get(Field::Cvv), Some(CVV_ERROR));
        fields.cvv = "123".into();
        assert!(validate(&fields).is_empty());
    }

    #[test]
    fn all_rules_run_on_an_empty_form() {
        let errors = validate(&FormFields::default());
        assert_eq!(errors.iter().count(), 4);
        for field in Field::FORM_ORDER {
            assert!(errors.contains(field), "{field:?}");
        }
    }

    #[test]
    fn submission_strips_card_number_spacing_only() {
        let out = for_submission(&valid_fields());
        assert_eq!(out.card_number, "4111111111111111");
        assert_eq!(out.cardholder_name, "Jose Pérez");
        assert_eq!(out.expiry_date, "12/25");
        assert_eq!(out.cvv, "123");
    }
}

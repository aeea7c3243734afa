//! Boundary validation shared by the public and admin surfaces. All input is
//! rejected here before any write is attempted.

use uuid::Uuid;

/// Unit labels accepted for materials.
pub const VALID_UNITS: &[&str] = &[
    "Bolsas", "Quintales", "Unidades", "Metros", "Libras", "Costales", "Sacos", "Varillas",
    "Cubetas", "Galones",
];

pub const MIN_AMOUNT: f64 = 1.0;
pub const MAX_AMOUNT: f64 = 1_000_000.0;
pub const MAX_REASON_LEN: usize = 500;

/// Strip HTML tags and the characters used for injection, trim, and cap at
/// 255 characters.
pub fn sanitize_string(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag => {}
            '\'' | '"' | '&' => {}
            _ => cleaned.push(c),
        }
    }
    cleaned.trim().chars().take(255).collect()
}

/// Sanitized, non-empty variant of an optional field.
pub fn sanitize_opt(input: Option<&str>) -> Option<String> {
    input.map(sanitize_string).filter(|s| !s.is_empty())
}

pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && (MIN_AMOUNT..=MAX_AMOUNT).contains(&amount)
}

/// Path ids must be hyphenated UUIDs; everything else is rejected before any
/// lookup.
pub fn is_valid_uuid(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

pub fn is_valid_unit(unit: &str) -> bool {
    VALID_UNITS.contains(&unit)
}

pub fn is_valid_material_name(name: &str) -> bool {
    let len = name.chars().count();
    (2..=100).contains(&len)
}

pub fn is_valid_quantity_needed(qty: i64) -> bool {
    (1..=100_000).contains(&qty)
}

pub fn is_valid_quantity_current(qty: i64) -> bool {
    (0..=100_000).contains(&qty)
}

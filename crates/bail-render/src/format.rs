//! Value formatting for the French contract
//!
//! Every function returns markup-safe text.

use bail_schema::{FieldKind, Unit, Value};
use rust_decimal::{Decimal, RoundingStrategy};

/// Escape text for inclusion in HTML content or attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `1500` → `1500,00 €`
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let units = rounded.abs().trunc().normalize();
    // rescale(2) cannot widen a value near Decimal::MAX
    let cents = (rounded.abs().fract() * Decimal::ONE_HUNDRED)
        .trunc()
        .normalize()
        .to_string();
    format!("{sign}{units},{cents:0>2} €")
}

/// Decimal with French comma and no trailing zeros
#[must_use]
pub fn format_number(value: Decimal) -> String {
    value.normalize().to_string().replace('.', ",")
}

/// `true` → `Oui`
#[must_use]
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "Oui"
    } else {
        "Non"
    }
}

/// Format a value according to its declaration, HTML-escaped
#[must_use]
pub fn format_value(value: &Value, kind: &FieldKind) -> String {
    match value {
        Value::Text(s) | Value::Choice(s) => escape_html(s),
        Value::Boolean(b) => format_bool(*b).to_string(),
        Value::Date(d) => d.format("%d/%m/%Y").to_string(),
        Value::Decimal(d) => {
            let unit = match kind {
                FieldKind::Decimal(rule) => rule.unit,
                _ => Unit::Plain,
            };
            match unit {
                Unit::Euro => format_money(*d),
                Unit::SquareMetre => format!("{} m²", format_number(*d)),
                Unit::Plain => format_number(*d),
            }
        }
    }
}

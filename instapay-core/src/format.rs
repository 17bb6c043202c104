use num_format::{Locale, ToFormattedString};

use crate::amount::Amount;

/// Formats an amount with Indian digit grouping and two fraction digits, e.g. `1,00,000.00`.
pub fn format_inr(amount: &Amount) -> String {
    format!(
        "{}.{:02}",
        amount.whole_rupees().to_formatted_string(&Locale::en_IN),
        amount.fraction_paise()
    )
}

/// Like [`format_inr`] but drops a zero fraction, the way share texts print amounts.
pub fn format_inr_compact(amount: &Amount) -> String {
    let whole = amount.whole_rupees().to_formatted_string(&Locale::en_IN);
    match amount.fraction_paise() {
        0 => whole,
        f if f % 10 == 0 => format!("{whole}.{}", f / 10),
        f => format!("{whole}.{f:02}"),
    }
}

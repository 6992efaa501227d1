//! Compact interval labels for rating buttons.

/// Format a projected interval given in fractional days.
///
/// Under an hour shows minutes (at least `1m`), under a day hours, under a
/// month days, under a year months, otherwise years with one decimal.
pub fn interval_label(days: f64) -> String {
    let days = days.max(0.0);
    if days < 1.0 / 24.0 {
        let minutes = (days * 24.0 * 60.0).round().max(1.0);
        format!("{minutes}m")
    } else if days < 1.0 {
        format!("{}h", (days * 24.0).round())
    } else if days < 30.0 {
        format!("{}d", days.round())
    } else if days < 365.0 {
        format!("{}mo", (days / 30.0).round())
    } else {
        let years = format!("{:.1}", days / 365.0);
        let years = years.strip_suffix(".0").unwrap_or(&years);
        format!("{years}y")
    }
}

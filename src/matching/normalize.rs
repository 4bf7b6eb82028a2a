//! Player name normalization.
//!
//! The fantasy site shows abbreviated names ("J. Smith") on player cards
//! while the sportsbook uses full names ("John Smith"). Both sides are
//! reduced to the abbreviated form before comparison.

/// Reduce a full name to `"{first initial}. {rest}"`.
///
/// Single-token names are returned unchanged. Suffixes such as "Jr." are
/// ordinary trailing tokens. Already-abbreviated names map to themselves.
pub fn normalize(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.as_slice() {
        [first, rest @ ..] if !rest.is_empty() => {
            let initial: String = first.chars().take(1).collect();
            format!("{initial}. {}", rest.join(" "))
        }
        _ => full_name.to_string(),
    }
}

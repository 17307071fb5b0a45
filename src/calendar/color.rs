use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::calendar::Event;

/// Pastel colours handed out to new events and calendars, in preference order.
pub const PALETTE: [&str; 12] = [
    "#FFB3BA", "#FFDFBA", "#FFFFBA", "#BAFFC9",
    "#BAE1FF", "#E0BBE4", "#FEC8D8", "#D4F0F0",
    "#CCE2CB", "#F6EAC2", "#B5EAD7", "#C7CEEA",
];

/// First palette colour not in `used`; once every colour is taken, a random
/// palette entry.
pub fn next_available_color<'a, R>(used: impl IntoIterator<Item = &'a str>, rng: &mut R) -> &'static str
where
    R: Rng + ?Sized,
{
    let used: HashSet<String> = used.into_iter().map(|c| c.to_ascii_uppercase()).collect();

    PALETTE
        .iter()
        .copied()
        .find(|color| !used.contains(*color))
        .unwrap_or_else(|| PALETTE[rng.random_range(0..PALETTE.len())])
}

pub fn pick_event_color(events: &[Event]) -> String {
    let mut rng = rand::rng();
    next_available_color(events.iter().map(|e| e.color.as_str()), &mut rng).to_string()
}

pub fn is_valid_hex_color(input: &str) -> bool {
    static HEX_RE: OnceLock<Regex> = OnceLock::new();
    HEX_RE
        .get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("invalid hex colour regex"))
        .is_match(input)
}

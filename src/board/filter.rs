use std::collections::BTreeSet;

use super::button::{Color, SoundButton};

/// Visibility of each button, in the order given.
///
/// Visible iff the trimmed query is empty or contained in the label
/// (case-insensitive), and the button's color is enabled.
pub fn apply<'a>(
    buttons: impl IntoIterator<Item = &'a SoundButton>,
    query: &str,
    enabled: &BTreeSet<Color>,
) -> Vec<bool> {
    let query = query.trim().to_lowercase();
    buttons
        .into_iter()
        .map(|b| {
            let matches_search = query.is_empty() || b.label.to_lowercase().contains(&query);
            matches_search && enabled.contains(&b.color())
        })
        .collect()
}

pub fn all_colors() -> BTreeSet<Color> {
    Color::ALL.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buttons() -> Vec<SoundButton> {
        vec![
            SoundButton::builtin("airhorn.mp3", "Airhorn", Some(Color::Green)),
            SoundButton::builtin("boing.mp3", "Boing", Some(Color::Red)),
        ]
    }

    #[test]
    fn query_and_color_both_apply() {
        let enabled: BTreeSet<Color> = [Color::Green].into_iter().collect();
        assert_eq!(apply(&buttons(), "air", &enabled), vec![true, false]);
        assert_eq!(apply(&buttons(), "  AIR ", &enabled), vec![true, false]);
        assert_eq!(apply(&buttons(), "boing", &enabled), vec![false, false]);
    }

    #[test]
    fn empty_query_shows_enabled_colors() {
        assert_eq!(apply(&buttons(), "", &all_colors()), vec![true, true]);
        assert_eq!(apply(&buttons(), "", &BTreeSet::new()), vec![false, false]);
    }
}

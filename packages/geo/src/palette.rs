//! Category color lookup tables for map point rendering.
//!
//! Palettes are process-wide configuration injected into the rendering
//! layer, so a palette change is a single-point edit. Lookups are
//! deterministic and total: every category maps to some color, with a
//! neutral fallback for anything unmapped.

use std::collections::BTreeMap;

/// Neutral color assigned to categories absent from a palette table.
pub const NEUTRAL: &str = "#9ca3af";

/// Default status palette.
const STATUS_COLORS: &[(&str, &str)] = &[("Open", "#f59e0b"), ("Closed", "#10b981")];

/// Default topic palette. Covers the highest-volume case topics; the
/// long tail falls back to [`NEUTRAL`].
const TOPIC_COLORS: &[(&str, &str)] = &[
    ("Enforcement & Abandoned Vehicles", "#06b6d4"),
    ("Street Cleaning", "#3b82f6"),
    ("Sanitation", "#8b5cf6"),
    ("Highway Maintenance", "#f97316"),
    ("Signs & Signals", "#ef4444"),
    ("Trees", "#22c55e"),
    ("Housing", "#ec4899"),
    ("Environmental Services", "#84cc16"),
    ("Animal Issues", "#14b8a6"),
    ("Employee & General Comments", "#eab308"),
];

/// Which categorical field drives point coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Color by case status.
    #[default]
    Status,
    /// Color by case topic (top categories only).
    Topic,
}

/// A category-to-color lookup table with a guaranteed fallback.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: BTreeMap<String, String>,
    fallback: String,
}

impl Palette {
    /// Builds a palette from a static table and fallback color.
    #[must_use]
    pub fn from_table(table: &[(&str, &str)], fallback: &str) -> Self {
        Self {
            colors: table
                .iter()
                .map(|&(category, color)| (category.to_owned(), color.to_owned()))
                .collect(),
            fallback: fallback.to_owned(),
        }
    }

    /// Default palette for the given color mode.
    #[must_use]
    pub fn for_mode(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Status => Self::from_table(STATUS_COLORS, NEUTRAL),
            ColorMode::Topic => Self::from_table(TOPIC_COLORS, NEUTRAL),
        }
    }

    /// Returns the color for a category. Total: unmapped categories get
    /// the fallback color.
    #[must_use]
    pub fn color_for(&self, category: &str) -> &str {
        self.colors
            .get(category)
            .map_or(self.fallback.as_str(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_categories_get_their_color() {
        let palette = Palette::for_mode(ColorMode::Status);
        assert_eq!(palette.color_for("Closed"), "#10b981");
    }

    #[test]
    fn unmapped_categories_get_the_fallback() {
        let palette = Palette::for_mode(ColorMode::Topic);
        assert_eq!(palette.color_for("Needle Program"), NEUTRAL);
    }

    #[test]
    fn custom_tables_are_injectable() {
        let palette = Palette::from_table(&[("Open", "#000000")], "#ffffff");
        assert_eq!(palette.color_for("Open"), "#000000");
        assert_eq!(palette.color_for("Closed"), "#ffffff");
    }
}

//! Per-session display colors for usernames.

use std::collections::HashMap;

use rand::Rng;

/// A display color, rendered as `hsl(<hue>, 100%, 75%)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    hue: u16,
}

impl Color {
    /// Create a color from a hue in degrees. Values wrap at 360.
    pub fn from_hue(hue: u16) -> Self {
        Self { hue: hue % 360 }
    }

    /// Pick a random hue.
    pub fn random() -> Self {
        Self::from_hue(rand::rng().random_range(0..360))
    }

    /// Hue in degrees (0..360).
    pub fn hue(&self) -> u16 {
        self.hue
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hsl({}, 100%, 75%)", self.hue)
    }
}

/// Username to color assignments for one session.
///
/// A username keeps its first color for the lifetime of the table. Tables are
/// never shared, so two sessions may show the same user in different colors.
pub struct ColorTable {
    colors: HashMap<String, Color>,
    generator: Box<dyn FnMut() -> Color + Send>,
}

impl ColorTable {
    /// Create a table that assigns random colors.
    pub fn new() -> Self {
        Self::with_generator(Color::random)
    }

    /// Create a table that draws new colors from `generator`.
    pub fn with_generator(generator: impl FnMut() -> Color + Send + 'static) -> Self {
        Self {
            colors: HashMap::new(),
            generator: Box::new(generator),
        }
    }

    /// Color for `username`, assigning one on first sight.
    pub fn resolve(&mut self, username: &str) -> Color {
        if let Some(color) = self.colors.get(username) {
            return *color;
        }
        let color = (self.generator)();
        self.colors.insert(username.to_string(), color);
        color
    }

    /// Color already assigned to `username`, if any.
    pub fn get(&self, username: &str) -> Option<Color> {
        self.colors.get(username).copied()
    }

    /// Number of usernames with an assigned color.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether no color has been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ColorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorTable")
            .field("colors", &self.colors)
            .finish_non_exhaustive()
    }
}

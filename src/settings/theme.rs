//! Reading themes

use serde::{Deserialize, Serialize};

use crate::compose::StyleConfig;
use crate::spans::Color;

/// Name of the user-editable theme slot
pub const CUSTOM_THEME: &str = "Custom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background_color: Color,
    pub text_color: Color,
    pub line_height_multiple: f32,
    #[serde(default)]
    pub use_page_layout: bool,
}

impl Theme {
    fn preset(font_size: f32, background: Color, text: Color) -> Self {
        Self {
            font_family: "System".to_string(),
            font_size,
            background_color: background,
            text_color: text,
            line_height_multiple: 1.2,
            use_page_layout: false,
        }
    }

    /// Follows the platform; renders like [`Theme::light`] here
    pub fn system() -> Self {
        Self::preset(17.0, Color::WHITE, Color::BLACK)
    }

    pub fn light() -> Self {
        Self::preset(17.0, Color::WHITE, Color::BLACK)
    }

    pub fn dark() -> Self {
        Self::preset(17.0, Color::rgb(0x1C, 0x1C, 0x1E), Color::WHITE)
    }

    pub fn sepia() -> Self {
        Self::preset(17.0, Color::rgb(0xF4, 0xEC, 0xD8), Color::rgb(0x5B, 0x46, 0x36))
    }

    pub fn high_contrast() -> Self {
        Self::preset(18.0, Color::BLACK, Color::rgb(0xFF, 0xFF, 0x00))
    }

    /// Built-in themes in display order
    pub fn presets() -> Vec<(&'static str, Theme)> {
        vec![
            ("System", Theme::system()),
            ("Light", Theme::light()),
            ("Dark", Theme::dark()),
            ("Sepia", Theme::sepia()),
            ("High Contrast", Theme::high_contrast()),
        ]
    }

    pub fn named(name: &str) -> Option<Theme> {
        Self::presets()
            .into_iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, theme)| theme)
    }

    /// Composer configuration for this theme
    pub fn style_config(&self, highlight_alpha: f32) -> StyleConfig {
        StyleConfig {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            text_color: self.text_color,
            background_color: self.background_color,
            line_height_multiple: self.line_height_multiple,
            highlight_alpha,
            ..StyleConfig::default()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::system()
    }
}

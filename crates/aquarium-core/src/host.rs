//! Narrow interfaces to the host collaborators.
//!
//! The core never draws, looks up colors or talks to other visuals directly;
//! it goes through these traits. Simple default implementations are provided
//! for shells and tests that have no richer host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{DatasetView, SelectionToken};
use crate::decoration::DecorationKind;
use crate::registry::{FishId, FishShape};
use crate::scaling::Viewport;

/// 24-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #rrggbb color, got {raw:?}"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|err| format!("{raw:?}: {err}"))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// One line of tooltip content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipItem {
    pub display_name: String,
    pub value: String,
}

/// Tooltip payload attached to a fish; opaque to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub items: Vec<TooltipItem>,
}

/// Deterministic per-row color lookup.
pub trait ColorPalette {
    fn color_by_index(&self, index: usize) -> Color;
}

/// Composes tooltip payloads for a dataset cell.
pub trait TooltipBuilder {
    fn build(
        &self,
        format: Option<&str>,
        dataset: &DatasetView,
        label: &str,
        value: f64,
        series: usize,
        row: usize,
    ) -> Tooltip;
}

/// Fire-and-forget notifications to visuals that share the selection.
pub trait SelectionChannel {
    fn select(&mut self, token: &SelectionToken);
    fn clear(&mut self);
}

/// Paint instructions for one fish in physical coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FishSprite<'a> {
    pub id: FishId,
    pub shape: FishShape,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// Drawn facing right (the shapes face left by default).
    pub mirrored: bool,
    pub color: Color,
    pub opacity: f32,
    pub tooltip: &'a Tooltip,
}

/// Paint instructions for one decoration in physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorationSprite {
    pub index: usize,
    pub kind: DecorationKind,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// The scene-graph collaborator that turns sprites into pixels.
///
/// Visual handles belong to the implementor. It is expected to create one
/// lazily the first time a fish is drawn and drop it in [`SceneSink::release_fish`].
pub trait SceneSink {
    /// Called once per repaint with the physical canvas size.
    fn begin_frame(&mut self, viewport: Viewport);

    fn draw_decoration(&mut self, sprite: &DecorationSprite);

    fn draw_fish(&mut self, sprite: &FishSprite<'_>);

    /// The fish was retired; its handle must be released before returning.
    fn release_fish(&mut self, id: FishId);

    fn end_frame(&mut self) {}
}

/// Palette cycling through a fixed list of colors.
#[derive(Debug, Clone)]
pub struct StaticPalette {
    colors: Vec<Color>,
}

impl StaticPalette {
    /// Builds a palette; an empty list falls back to the default colors.
    #[must_use]
    pub fn new(colors: Vec<Color>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }
}

impl Default for StaticPalette {
    fn default() -> Self {
        Self {
            colors: vec![
                Color::rgb(0x01, 0xb8, 0xaa),
                Color::rgb(0x37, 0x46, 0x49),
                Color::rgb(0xfd, 0x62, 0x5e),
                Color::rgb(0xf2, 0xc8, 0x0f),
                Color::rgb(0x5f, 0x6b, 0x6d),
                Color::rgb(0x8a, 0xd4, 0xeb),
                Color::rgb(0xfe, 0x96, 0x66),
                Color::rgb(0xa6, 0x69, 0x99),
                Color::rgb(0x35, 0x99, 0xb8),
                Color::rgb(0xdf, 0xbf, 0xbf),
            ],
        }
    }
}

impl ColorPalette for StaticPalette {
    fn color_by_index(&self, index: usize) -> Color {
        self.colors[index % self.colors.len()]
    }
}

/// Tooltip builder producing "category" and "series" lines.
///
/// Format strings understand a small numeric subset: the number of `0`s after
/// the decimal point sets the precision, a `,` enables thousands separators and
/// a trailing `%` renders the value as a percentage.
#[derive(Debug, Clone, Default)]
pub struct FormatTooltipBuilder;

impl TooltipBuilder for FormatTooltipBuilder {
    fn build(
        &self,
        format: Option<&str>,
        dataset: &DatasetView,
        label: &str,
        value: f64,
        series: usize,
        _row: usize,
    ) -> Tooltip {
        let series_name = dataset
            .series
            .as_ref()
            .and_then(|columns| columns.get(series))
            .and_then(|column| column.name.clone())
            .unwrap_or_else(|| format!("Series {}", series + 1));
        Tooltip {
            items: vec![
                TooltipItem {
                    display_name: "Fish".to_string(),
                    value: label.to_string(),
                },
                TooltipItem {
                    display_name: series_name,
                    value: format_value(value, format),
                },
            ],
        }
    }
}

/// Formats `value` according to the numeric subset described on [`FormatTooltipBuilder`].
#[must_use]
pub fn format_value(value: f64, format: Option<&str>) -> String {
    let Some(format) = format.map(str::trim).filter(|f| !f.is_empty()) else {
        return value.to_string();
    };
    let percent = format.ends_with('%');
    let body = format.trim_end_matches('%');
    let precision = body
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.chars().filter(|c| *c == '0' || *c == '#').count());
    let grouped = body.contains(',');
    let scaled = if percent { value * 100.0 } else { value };
    let mut rendered = format!("{scaled:.precision$}");
    if grouped {
        rendered = group_thousands(&rendered);
    }
    if percent {
        rendered.push('%');
    }
    rendered
}

fn group_thousands(rendered: &str) -> String {
    let (sign, unsigned) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, ch) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx).is_multiple_of(3) {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Selection channel with no listeners.
#[derive(Debug, Clone, Default)]
pub struct NullSelectionChannel;

impl SelectionChannel for NullSelectionChannel {
    fn select(&mut self, token: &SelectionToken) {
        debug!(token = token.as_str(), "selection raised with no listeners");
    }

    fn clear(&mut self) {
        debug!("selection cleared with no listeners");
    }
}

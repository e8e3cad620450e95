use std::{fmt, str::FromStr};

use color_eyre::eyre::{Result, bail, eyre};
use fontdb::{Family, Style};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Output raster size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
	pub width: u32,
	pub height: u32,
}

impl Resolution {
	pub const LANDSCAPE: Resolution = Resolution { width: 1920, height: 1080 };
	pub const PORTRAIT: Resolution = Resolution { width: 1080, height: 1920 };
	pub const SQUARE: Resolution = Resolution { width: 1024, height: 1024 };

	pub fn new(width: u32, height: u32) -> Result<Self> {
		if width == 0 || height == 0 {
			bail!("resolution must be non-zero, got {width}x{height}");
		}
		Ok(Self { width, height })
	}

	pub fn scaled(self, factor: f32) -> Result<Self> {
		if !factor.is_finite() || factor <= 0.0 {
			bail!("scale factor must be finite and > 0, got {factor}");
		}
		let w = (self.width as f32 * factor).round().max(1.0) as u32;
		let h = (self.height as f32 * factor).round().max(1.0) as u32;
		Self::new(w, h)
	}

	pub fn longest_side(&self) -> u32 {
		self.width.max(self.height)
	}
}

impl FromStr for Resolution {
	type Err = color_eyre::Report;

	/// Accepts the presets `square`, `portrait`, `landscape` or an explicit `WxH`.
	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"square" => Ok(Self::SQUARE),
			"portrait" => Ok(Self::PORTRAIT),
			"landscape" => Ok(Self::LANDSCAPE),
			other => {
				let (w, h) = other.split_once('x').ok_or_else(|| eyre!("expected a preset or WxH, got {s:?}"))?;
				Self::new(w.trim().parse()?, h.trim().parse()?)
			}
		}
	}
}

impl fmt::Display for Resolution {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
	#[default]
	Light,
	Dark,
}

impl Theme {
	/// Flat fill used when no background image is available.
	pub fn background_fill(self) -> Rgba {
		match self {
			Theme::Light => Rgba::rgb(0xF5, 0xF5, 0xF4),
			Theme::Dark => Rgba::rgb(0x12, 0x12, 0x12),
		}
	}

	/// Overlay alpha at the top/bottom edges and in the middle band.
	pub fn overlay_alpha(self) -> (f32, f32) {
		match self {
			Theme::Light => (0.30, 0.10),
			Theme::Dark => (0.60, 0.30),
		}
	}

	pub fn default_text_color(self) -> Rgba {
		match self {
			Theme::Light => Rgba::rgb(0x1C, 0x19, 0x17),
			Theme::Dark => Rgba::rgb(0xFA, 0xFA, 0xF9),
		}
	}

	pub fn default_reference_color(self) -> Rgba {
		match self {
			Theme::Light => Rgba::rgb(0x57, 0x53, 0x4E),
			Theme::Dark => Rgba::rgb(0xE7, 0xD3, 0xA1),
		}
	}
}

/// One entry of a font stack: ordered family fallbacks plus the face style to ask for.
#[derive(Clone, Copy, Debug)]
pub struct FaceRequest {
	pub families: &'static [Family<'static>],
	pub style: Style,
}

const CLASSIC_FAMILIES: &[Family<'static>] = &[Family::Name("Playfair Display"), Family::Name("Georgia"), Family::Name("DejaVu Serif"), Family::Serif];
const HANDWRITING_FAMILIES: &[Family<'static>] = &[
	Family::Name("Dancing Script"),
	Family::Name("Caveat"),
	Family::Name("Segoe Script"),
	Family::Cursive,
	Family::Name("DejaVu Sans"),
];
const WATERMARK_FAMILIES: &[Family<'static>] = &[Family::Name("Inter"), Family::Name("Helvetica Neue"), Family::Name("Arial"), Family::Name("DejaVu Sans"), Family::SansSerif];

pub const WATERMARK_FACE: FaceRequest = FaceRequest {
	families: WATERMARK_FAMILIES,
	style: Style::Normal,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
	#[default]
	Classic,
	Handwriting,
}

impl FontFamily {
	pub const ALL: [FontFamily; 2] = [FontFamily::Classic, FontFamily::Handwriting];

	pub fn body(self) -> FaceRequest {
		match self {
			FontFamily::Classic => FaceRequest {
				families: CLASSIC_FAMILIES,
				style: Style::Italic,
			},
			FontFamily::Handwriting => FaceRequest {
				families: HANDWRITING_FAMILIES,
				style: Style::Italic,
			},
		}
	}

	pub fn reference(self) -> FaceRequest {
		match self {
			FontFamily::Classic => FaceRequest {
				families: CLASSIC_FAMILIES,
				style: Style::Normal,
			},
			FontFamily::Handwriting => FaceRequest {
				families: HANDWRITING_FAMILIES,
				style: Style::Italic,
			},
		}
	}
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl Rgba {
	pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
	pub const WHITE: Rgba = Rgba::rgb(0xFF, 0xFF, 0xFF);

	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 0xFF }
	}

	pub fn with_alpha(self, alpha: f32) -> Self {
		Self {
			a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
			..self
		}
	}

	pub fn to_skia(self) -> tiny_skia::Color {
		tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
	}

	/// `#rrggbb` for SVG fill attributes; alpha goes separately into `*-opacity`.
	pub fn svg_hex(self) -> String {
		format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}

	pub fn opacity(self) -> f32 {
		self.a as f32 / 255.0
	}
}

impl FromStr for Rgba {
	type Err = color_eyre::Report;

	fn from_str(s: &str) -> Result<Self> {
		let hex = s.trim().strip_prefix('#').ok_or_else(|| eyre!("color must start with '#', got {s:?}"))?;
		if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
			bail!("invalid hex color {s:?}");
		}
		let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
		let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
		Ok(match hex.len() {
			3 => Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?),
			6 => Rgba::rgb(byte(0)?, byte(2)?, byte(4)?),
			8 => Rgba {
				r: byte(0)?,
				g: byte(2)?,
				b: byte(4)?,
				a: byte(6)?,
			},
			_ => bail!("hex color must have 3, 6 or 8 digits, got {s:?}"),
		})
	}
}

impl fmt::Display for Rgba {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.a {
			0xFF => write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
			a => write!(f, "#{:02x}{:02x}{:02x}{a:02x}", self.r, self.g, self.b),
		}
	}
}

impl Serialize for Rgba {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Rgba {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// How a background raster is mapped onto the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFit {
	/// Scale each axis independently to the exact output size.
	#[default]
	Stretch,
	/// Scale preserving aspect ratio until the output is covered, then center-crop.
	Cover,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
	pub resolution: Resolution,
	pub theme: Theme,
	pub font_family: FontFamily,
	pub text_color: Rgba,
	pub reference_color: Rgba,
	#[serde(default)]
	pub background_fit: BackgroundFit,
}

impl StyleConfig {
	/// Style with the theme's default colors.
	pub fn new(resolution: Resolution, theme: Theme, font_family: FontFamily) -> Self {
		Self {
			resolution,
			theme,
			font_family,
			text_color: theme.default_text_color(),
			reference_color: theme.default_reference_color(),
			background_fit: BackgroundFit::default(),
		}
	}

	/// Same style at `resolution × factor`, for hi-res export.
	pub fn scaled(&self, factor: f32) -> Result<Self> {
		Ok(Self {
			resolution: self.resolution.scaled(factor)?,
			..self.clone()
		})
	}
}

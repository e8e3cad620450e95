use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr as _};
use serde::Deserialize;

use crate::{
	fonts::FontBook,
	layout::LayoutMetrics,
	quote::Quote,
	style::{BackgroundFit, FontFamily, Resolution, Rgba, StyleConfig, Theme},
	watermark::WatermarkConfig,
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub quotes: Vec<Quote>,
	pub style: StyleDefaults,
	pub watermark: WatermarkConfig,
	pub fonts: FontsConfig,
	pub layout: LayoutMetrics,
}

/// Style settings from the config file. Anything unset falls back to the theme defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
	pub theme: Theme,
	pub font_family: FontFamily,
	pub width: u32,
	pub height: u32,
	pub text_color: Option<Rgba>,
	pub reference_color: Option<Rgba>,
	pub background_fit: BackgroundFit,
}

impl Default for StyleDefaults {
	fn default() -> Self {
		Self {
			theme: Theme::default(),
			font_family: FontFamily::default(),
			width: Resolution::SQUARE.width,
			height: Resolution::SQUARE.height,
			text_color: None,
			reference_color: None,
			background_fit: BackgroundFit::default(),
		}
	}
}

impl StyleDefaults {
	pub fn resolve(&self, resolution: Option<Resolution>, theme: Option<Theme>, font_family: Option<FontFamily>) -> Result<StyleConfig> {
		let resolution = match resolution {
			Some(r) => r,
			None => Resolution::new(self.width, self.height)?,
		};
		let mut style = StyleConfig::new(resolution, theme.unwrap_or(self.theme), font_family.unwrap_or(self.font_family));
		if let Some(c) = self.text_color {
			style.text_color = c;
		}
		if let Some(c) = self.reference_color {
			style.reference_color = c;
		}
		style.background_fit = self.background_fit;
		Ok(style)
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
	/// Also search installed system fonts. Off means byte-identical output on every machine.
	pub system_fonts: bool,
	pub extra: Vec<PathBuf>,
}

impl Default for FontsConfig {
	fn default() -> Self {
		Self { system_fonts: true, extra: Vec::new() }
	}
}

impl FontsConfig {
	pub fn build(&self) -> Result<FontBook> {
		FontBook::build(self.system_fonts, &self.extra)
	}
}

impl AppConfig {
	pub fn read(path: Option<&Path>) -> Result<Self> {
		let app_name = env!("CARGO_PKG_NAME");
		let mut builder = config::Config::builder().add_source(config::Environment::with_prefix("VERSE_CANVAS").separator("__"));

		match path {
			Some(path) => {
				let path_str = path.to_string_lossy();
				let builder = builder.add_source(config::File::with_name(&path_str).required(true));
				builder.build()?.try_deserialize().wrap_err_with(|| format!("invalid config {path_str}"))
			}
			None => {
				let xdg_dirs = xdg::BaseDirectories::with_prefix(app_name);
				let xdg_conf_dir = xdg_dirs.get_config_home().and_then(|p| p.parent().map(Path::to_path_buf));
				if let Some(dir) = xdg_conf_dir {
					let locations = [dir.join(app_name), dir.join(app_name).join("config")];
					for location in locations.iter() {
						builder = builder.add_source(config::File::with_name(&location.to_string_lossy()).required(false));
					}
				}
				let raw: config::Config = builder.build()?;

				raw.try_deserialize().wrap_err("Config file is invalid")
			}
		}
	}
}

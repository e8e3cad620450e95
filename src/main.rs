use std::path::PathBuf;

use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use rand::seq::IndexedRandom as _;
use tracing::info;
use tracing_subscriber::EnvFilter;
use verse_canvas::{
	Background, BackgroundFit, Compositor, FontFamily, Quote, Resolution, Theme,
	config::AppConfig,
	export::{ExportSink, export},
	watermark::{LogoCache, LogoSource},
};

#[derive(Debug, Parser)]
#[command(name = "verse_canvas", version)]
#[command(about = "Render a scripture quote onto background art")]
struct Args {
	/// Background image (jpg, png, ...). Without one the theme's flat fill is used.
	background: Option<PathBuf>,

	/// Citation, e.g. "John 3:16". Picks a random configured quote when omitted together with --content.
	#[arg(long, requires = "content")]
	reference: Option<String>,

	/// Verse text.
	#[arg(long, requires = "reference")]
	content: Option<String>,

	#[arg(long, value_enum)]
	theme: Option<Theme>,

	#[arg(long, value_enum)]
	font: Option<FontFamily>,

	/// square, portrait, landscape or WxH.
	#[arg(long)]
	size: Option<String>,

	/// Export at size × scale.
	#[arg(long, default_value_t = 1.0)]
	scale: f32,

	#[arg(long, value_enum)]
	fit: Option<BackgroundFit>,

	/// Watermark logo (raster or SVG). Overrides the config.
	#[arg(long)]
	logo: Option<PathBuf>,

	/// Draw the text-only watermark.
	#[arg(long)]
	no_logo: bool,

	/// Only search the bundled fonts; output is then identical on every machine.
	#[arg(long)]
	embedded_fonts: bool,

	#[arg(short, long, default_value = "verse.png")]
	output: PathBuf,

	/// Print the computed layout as JSON.
	#[arg(long)]
	layout_json: bool,

	/// Config file. Defaults to $XDG_CONFIG_HOME/verse_canvas.{toml,json,yaml,...}
	#[arg(long)]
	config: Option<PathBuf>,
}

fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).with_writer(std::io::stderr).init();
	run(Args::parse())
}

fn run(args: Args) -> Result<()> {
	let mut config = AppConfig::read(args.config.as_deref())?;

	let quote = match (args.reference, args.content) {
		(Some(reference), Some(content)) => Quote::new(reference, content).cleaned(),
		_ => config.quotes.choose(&mut rand::rng()).map(Quote::cleaned).ok_or_else(|| eyre!("No quote given and none configured"))?,
	};
	info!(reference = %quote.reference, "selected quote");

	let resolution = args.size.as_deref().map(str::parse::<Resolution>).transpose()?;
	let mut style = config.style.resolve(resolution, args.theme, args.font)?;
	if let Some(fit) = args.fit {
		style.background_fit = fit;
	}

	if args.embedded_fonts {
		config.fonts.system_fonts = false;
	}
	if let Some(logo) = args.logo {
		config.watermark.logo = Some(logo);
	}
	let fonts = config.fonts.build()?;
	let mut compositor = Compositor::new(fonts, config.layout, config.watermark);
	if args.no_logo {
		compositor = compositor.with_logo_cache(LogoCache::new(LogoSource::Disabled));
	}

	// An undecodable background is not fatal: the compositor falls back to the flat fill.
	let bytes = args.background.as_ref().map(std::fs::read).transpose()?;
	let background = bytes.as_deref().map_or(Background::None, Background::Encoded);

	let exported = export(&compositor, background, &quote, &style, args.scale, &ExportSink::File(args.output.clone()))?;
	if args.layout_json {
		println!("{}", serde_json::to_string_pretty(&exported.report)?);
	}
	info!(
		lines = exported.report.layout.lines.len(),
		font_size = exported.report.layout.font_size,
		resolution = %exported.resolution,
		"wrote {}",
		args.output.display()
	);

	Ok(())
}

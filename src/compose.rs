use color_eyre::eyre::{Result, bail, eyre};
use serde::Serialize;
use tiny_skia::{GradientStop, LinearGradient, Paint, Pixmap, Point, Rect, SpreadMode, Transform};
use tracing::{debug, instrument, warn};

use crate::{
	background::BackgroundImage,
	fonts::FontBook,
	layout::{self, LayoutMetrics, QuoteLayout},
	quote::Quote,
	style::{Rgba, StyleConfig, Theme},
	svg::{Shadow, TextLayer, TextPaint},
	watermark::{self, LogoCache, WatermarkConfig, WatermarkLayout},
};

/// Background handed to [`Compositor::compose`].
#[derive(Clone, Copy, Debug, Default)]
pub enum Background<'a> {
	#[default]
	None,
	Image(&'a BackgroundImage),
	/// Still-encoded bytes; decoded here, and an undecodable payload falls back to the flat fill.
	Encoded(&'a [u8]),
}

/// What a render ended up doing, for callers that want to inspect or log it.
#[derive(Clone, Debug, Serialize)]
pub struct RenderReport {
	pub layout: QuoteLayout,
	pub watermark: WatermarkLayout,
	pub used_background_image: bool,
	pub used_logo: bool,
}

/// Draws quote artwork. Holds only immutable configuration plus the logo cache, so one instance can
/// serve any number of concurrent renders.
#[derive(Debug)]
pub struct Compositor {
	fonts: FontBook,
	metrics: LayoutMetrics,
	watermark: WatermarkConfig,
	logo: LogoCache,
}

impl Compositor {
	pub fn new(fonts: FontBook, metrics: LayoutMetrics, watermark: WatermarkConfig) -> Self {
		let logo = LogoCache::new(watermark.logo_source());
		Self { fonts, metrics, watermark, logo }
	}

	/// Bundled fonts, default metrics and watermark.
	pub fn embedded() -> Result<Self> {
		Ok(Self::new(FontBook::embedded()?, LayoutMetrics::default(), WatermarkConfig::default()))
	}

	pub fn with_logo_cache(mut self, logo: LogoCache) -> Self {
		self.logo = logo;
		self
	}

	pub fn metrics(&self) -> &LayoutMetrics {
		&self.metrics
	}

	pub fn fonts(&self) -> &FontBook {
		&self.fonts
	}

	pub fn logo_cache(&self) -> &LogoCache {
		&self.logo
	}

	/// Layout only, no drawing.
	pub fn layout(&self, quote: &Quote, style: &StyleConfig) -> Result<QuoteLayout> {
		layout::layout(self.fonts.faces(style.font_family), quote, style.resolution, &self.metrics)
	}

	/// Fresh surface of the style's resolution.
	pub fn surface(style: &StyleConfig) -> Result<Pixmap> {
		let r = style.resolution;
		Pixmap::new(r.width, r.height).ok_or_else(|| eyre!("cannot allocate a {r} surface"))
	}

	/// Overwrite `surface` with the finished artwork.
	///
	/// The surface must already be `style.resolution` in size; it is never resized.
	#[instrument(skip_all, fields(reference = %quote.reference, resolution = %style.resolution, theme = ?style.theme))]
	pub fn compose(&self, surface: &mut Pixmap, background: Background<'_>, quote: &Quote, style: &StyleConfig) -> Result<RenderReport> {
		let r = style.resolution;
		if (surface.width(), surface.height()) != (r.width, r.height) {
			bail!("surface is {}x{} but style asks for {r}", surface.width(), surface.height());
		}

		let used_background_image = paint_background(surface, background, style);
		paint_overlay(surface, style.theme)?;

		let layout = self.layout(quote, style)?;
		if !layout.fits {
			warn!(font_size = layout.font_size, "quote does not fit even at the minimum font size");
		}

		let faces = self.fonts.faces(style.font_family);
		let mut text = TextLayer::new(r);
		let body = TextPaint {
			face: &faces.body,
			size: layout.font_size,
			fill: style.text_color,
			letter_spacing: 0.0,
		};
		text.push_centered(&layout.lines, &body, Some(Shadow::for_font_size(layout.font_size)));
		let reference = TextPaint {
			face: &faces.reference,
			size: layout.reference_font_size,
			fill: style.reference_color,
			letter_spacing: 0.0,
		};
		text.push_right_aligned(&layout.reference, &reference, Some(Shadow::for_font_size(layout.reference_font_size)));

		let wm = WatermarkLayout::new(r);
		let logo = self.logo.get();
		if let Some(logo) = &logo {
			watermark::paint_seal(surface, logo, &wm)?;
		}
		watermark::push_labels(&mut text, self.fonts.watermark(), &self.watermark, &wm, logo.is_some());

		text.render(self.fonts.database(), surface)?;
		debug!(lines = layout.lines.len(), font_size = layout.font_size, iterations = layout.iterations, "composed");

		Ok(RenderReport {
			layout,
			watermark: wm,
			used_background_image,
			used_logo: logo.is_some(),
		})
	}
}

/// Theme fill, then the image over it when there is a usable one. Returns whether an image was drawn.
fn paint_background(surface: &mut Pixmap, background: Background<'_>, style: &StyleConfig) -> bool {
	surface.fill(style.theme.background_fill().to_skia());
	let decoded;
	let image = match background {
		Background::None => None,
		Background::Image(img) => Some(img),
		Background::Encoded(bytes) => match BackgroundImage::decode(bytes) {
			Ok(img) => {
				decoded = img;
				Some(&decoded)
			}
			Err(e) => {
				warn!(error = %e, "background unusable, falling back to flat fill");
				None
			}
		},
	};

	match image.map(|img| img.to_pixmap(style.resolution, style.background_fit)) {
		Some(Ok(pixmap)) => {
			surface.draw_pixmap(0, 0, pixmap.as_ref(), &tiny_skia::PixmapPaint::default(), Transform::identity(), None);
			true
		}
		Some(Err(e)) => {
			warn!(error = %e, "background could not be resampled, falling back to flat fill");
			false
		}
		None => false,
	}
}

/// Dark at the top and bottom edges, lightest through the middle.
fn paint_overlay(surface: &mut Pixmap, theme: Theme) -> Result<()> {
	let (edge, mid) = theme.overlay_alpha();
	let (w, h) = (surface.width() as f32, surface.height() as f32);
	let shader = LinearGradient::new(
		Point::from_xy(0.0, 0.0),
		Point::from_xy(0.0, h),
		vec![
			GradientStop::new(0.0, Rgba::BLACK.with_alpha(edge).to_skia()),
			GradientStop::new(0.5, Rgba::BLACK.with_alpha(mid).to_skia()),
			GradientStop::new(1.0, Rgba::BLACK.with_alpha(edge).to_skia()),
		],
		SpreadMode::Pad,
		Transform::identity(),
	)
	.ok_or_else(|| eyre!("invalid overlay gradient"))?;
	let rect = Rect::from_xywh(0.0, 0.0, w, h).ok_or_else(|| eyre!("invalid overlay rect"))?;
	let paint = Paint {
		shader,
		anti_alias: false,
		..Default::default()
	};
	surface.fill_rect(rect, &paint, Transform::identity(), None);
	Ok(())
}

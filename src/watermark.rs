//! Brand seal in the bottom-left corner.
//!
//! Unlike everything else on the canvas, the watermark is positioned in absolute pixels: it sits
//! [`WATERMARK_OFFSET`] px from the left and bottom edges at every resolution.

use std::{
	path::PathBuf,
	sync::{
		Arc, OnceLock,
		atomic::{AtomicUsize, Ordering},
	},
};

use color_eyre::eyre::{Result, WrapErr as _, bail, eyre};
use image::imageops;
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, GradientStop, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Point, RadialGradient, SpreadMode, Transform};
use tracing::{debug, warn};

use crate::{
	background::rgba_to_pixmap,
	fonts::ResolvedFace,
	layout::BoxRect,
	style::{Resolution, Rgba},
	svg::{Anchor, Shadow, TextLayer, TextPaint},
};

pub const WATERMARK_OFFSET: f32 = 50.0;
pub const LOGO_DIAMETER: u32 = 64;
const LABEL_GAP: f32 = 14.0;
const LABEL_SIZE: f32 = 18.0;
const URL_SIZE: f32 = 14.0;
const FALLBACK_SIZE: f32 = 16.0;
const GLOW_SPREAD: f32 = 12.0;

static EMBEDDED_SEAL: &[u8] = include_bytes!("../assets/seal.svg");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
	pub brand_label: String,
	pub site_url: String,
	/// Logo file (raster or SVG). Unset means the bundled seal.
	pub logo: Option<PathBuf>,
}

impl Default for WatermarkConfig {
	fn default() -> Self {
		Self {
			brand_label: "Verse Canvas".to_owned(),
			site_url: "versecanvas.app".to_owned(),
			logo: None,
		}
	}
}

impl WatermarkConfig {
	pub fn logo_source(&self) -> LogoSource {
		match &self.logo {
			Some(path) => LogoSource::File(path.clone()),
			None => LogoSource::Embedded,
		}
	}

	/// Single-line text used when the logo is unavailable.
	pub fn fallback_text(&self) -> String {
		format!("{} \u{00B7} {}", self.brand_label.to_uppercase(), self.site_url)
	}
}

#[derive(Clone, Debug)]
pub enum LogoSource {
	Embedded,
	File(PathBuf),
	Bytes(Arc<[u8]>),
	/// Never loads; renders always take the text fallback.
	Disabled,
}

/// Load-once cache for the seal, rasterized at [`LOGO_DIAMETER`].
///
/// The first caller loads while concurrent callers block on it. The outcome is kept either way: a logo
/// that failed to load is not retried, and its warning is logged once.
#[derive(Debug)]
pub struct LogoCache {
	source: LogoSource,
	logo: OnceLock<Option<Arc<Pixmap>>>,
	loads: AtomicUsize,
}

impl LogoCache {
	pub fn new(source: LogoSource) -> Self {
		Self {
			source,
			logo: OnceLock::new(),
			loads: AtomicUsize::new(0),
		}
	}

	pub fn get(&self) -> Option<Arc<Pixmap>> {
		if matches!(self.source, LogoSource::Disabled) {
			return None;
		}
		self.logo
			.get_or_init(|| match self.load() {
				Ok(pixmap) => Some(Arc::new(pixmap)),
				Err(e) => {
					warn!(error = %e, "watermark logo unavailable, using text fallback");
					None
				}
			})
			.clone()
	}

	/// Load attempts so far, successful or not. At most 1.
	pub fn load_count(&self) -> usize {
		self.loads.load(Ordering::Relaxed)
	}

	fn load(&self) -> Result<Pixmap> {
		self.loads.fetch_add(1, Ordering::Relaxed);
		let pixmap = match &self.source {
			LogoSource::Embedded => decode_logo(EMBEDDED_SEAL, LOGO_DIAMETER)?,
			LogoSource::File(path) => {
				let bytes = std::fs::read(path).wrap_err_with(|| format!("failed to read logo {}", path.display()))?;
				decode_logo(&bytes, LOGO_DIAMETER)?
			}
			LogoSource::Bytes(bytes) => decode_logo(bytes, LOGO_DIAMETER)?,
			LogoSource::Disabled => bail!("logo disabled"),
		};
		debug!(source = ?self.source, "watermark logo loaded");
		Ok(pixmap)
	}
}

/// Raster formats go through `image`; anything else is tried as SVG.
fn decode_logo(bytes: &[u8], diameter: u32) -> Result<Pixmap> {
	if let Ok(img) = image::load_from_memory(bytes) {
		return rgba_to_pixmap(imageops::resize(&img.to_rgba8(), diameter, diameter, imageops::FilterType::Lanczos3));
	}
	let tree = usvg::Tree::from_data(bytes, &usvg::Options::default()).wrap_err("logo is neither a raster image nor SVG")?;
	let mut pixmap = Pixmap::new(diameter, diameter).ok_or_else(|| eyre!("failed to create logo pixmap"))?;
	let size = tree.size();
	let scale = diameter as f32 / size.width().max(size.height());
	resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
	Ok(pixmap)
}

/// Absolute-pixel geometry of the watermark for a given canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatermarkLayout {
	pub logo: BoxRect,
	pub label_x: f32,
	pub label_baseline: f32,
	pub url_baseline: f32,
	pub fallback_baseline: f32,
}

impl WatermarkLayout {
	pub fn new(resolution: Resolution) -> Self {
		let d = LOGO_DIAMETER as f32;
		let bottom = resolution.height as f32 - WATERMARK_OFFSET;
		let logo = BoxRect {
			x: WATERMARK_OFFSET,
			y: bottom - d,
			width: d,
			height: d,
		};
		Self {
			logo,
			label_x: logo.right() + LABEL_GAP,
			label_baseline: logo.y + d * 0.45,
			url_baseline: logo.y + d * 0.78,
			fallback_baseline: bottom,
		}
	}

	/// Distance of the logo from the left and bottom edges.
	pub fn corner_offset(&self, resolution: Resolution) -> (f32, f32) {
		(self.logo.x, resolution.height as f32 - self.logo.bottom())
	}
}

/// Glow plus the circularly clipped logo.
pub fn paint_seal(pixmap: &mut Pixmap, logo: &Pixmap, layout: &WatermarkLayout) -> Result<()> {
	let r = layout.logo.width / 2.0;
	let (cx, cy) = (layout.logo.x + r, layout.logo.y + r);
	let outer = r + GLOW_SPREAD;

	let glow = RadialGradient::new(
		Point::from_xy(cx, cy),
		Point::from_xy(cx, cy),
		outer,
		vec![
			GradientStop::new(0.0, Rgba::WHITE.with_alpha(0.45).to_skia()),
			GradientStop::new(r / outer, Rgba::WHITE.with_alpha(0.25).to_skia()),
			GradientStop::new(1.0, Rgba::WHITE.with_alpha(0.0).to_skia()),
		],
		SpreadMode::Pad,
		Transform::identity(),
	)
	.ok_or_else(|| eyre!("invalid glow gradient"))?;
	let glow_path = PathBuilder::from_circle(cx, cy, outer).ok_or_else(|| eyre!("invalid glow circle"))?;
	let paint = Paint {
		shader: glow,
		anti_alias: true,
		..Default::default()
	};
	pixmap.fill_path(&glow_path, &paint, FillRule::Winding, Transform::identity(), None);

	let clip = PathBuilder::from_circle(cx, cy, r).ok_or_else(|| eyre!("invalid logo circle"))?;
	let mut mask = Mask::new(pixmap.width(), pixmap.height()).ok_or_else(|| eyre!("failed to create logo mask"))?;
	mask.fill_path(&clip, FillRule::Winding, true, Transform::identity());

	let sx = layout.logo.width / logo.width() as f32;
	let sy = layout.logo.height / logo.height() as f32;
	let transform = Transform::from_scale(sx, sy).post_translate(layout.logo.x, layout.logo.y);
	pixmap.draw_pixmap(0, 0, logo.as_ref(), &PixmapPaint::default(), transform, Some(&mask));
	Ok(())
}

/// Brand label and URL beside the seal, or the single-line fallback when there is no seal.
pub fn push_labels(layer: &mut TextLayer, face: &ResolvedFace, config: &WatermarkConfig, layout: &WatermarkLayout, with_logo: bool) {
	let shadow = Some(Shadow { dy: 1.0, blur: 2.0, opacity: 0.4 });
	if with_logo {
		let label = config.brand_label.to_uppercase();
		let label_paint = TextPaint {
			face,
			size: LABEL_SIZE,
			fill: Rgba::WHITE,
			letter_spacing: 1.5,
		};
		layer.push_group(&[(label.as_str(), layout.label_x, layout.label_baseline)], Anchor::Start, &label_paint, shadow);
		let url_paint = TextPaint {
			face,
			size: URL_SIZE,
			fill: Rgba::WHITE.with_alpha(0.7),
			letter_spacing: 0.5,
		};
		layer.push_group(&[(config.site_url.as_str(), layout.label_x, layout.url_baseline)], Anchor::Start, &url_paint, shadow);
	} else {
		let text = config.fallback_text();
		let paint = TextPaint {
			face,
			size: FALLBACK_SIZE,
			fill: Rgba::WHITE.with_alpha(0.6),
			letter_spacing: 0.5,
		};
		layer.push_group(&[(text.as_str(), layout.logo.x, layout.fallback_baseline)], Anchor::Start, &paint, shadow);
	}
}

//! Text fitting: safe area, greedy word wrap and the shrink-until-it-fits font search.
//!
//! Everything here is pure geometry over [`ResolvedFace`] advance widths; nothing touches a pixmap.
//! All proportions derive from the output [`Resolution`], so the same quote lays out consistently
//! at any aspect ratio.

use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
	fonts::{FaceSet, ResolvedFace},
	quote::Quote,
	style::Resolution,
	watermark::{LOGO_DIAMETER, WATERMARK_OFFSET},
};

pub const OPEN_QUOTE: &str = "\"";
pub const CLOSE_QUOTE: &str = "\"";

/// Hard stop for the fit loop; the shrink factor and floor end it long before this.
const MAX_FIT_ITERATIONS: usize = 256;

/// Tunables of the layout. The defaults are the canonical set; see DESIGN.md for where they come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
	/// Left and right margin, fraction of width.
	pub side_margin: f32,
	/// Fraction of height.
	pub top_margin: f32,
	/// Fraction of height.
	pub bottom_margin: f32,
	/// Starting font size, fraction of the longest side.
	pub initial_font_scale: f32,
	/// Below this many px the fit loop gives up and renders best-effort.
	pub min_font_size: f32,
	/// Multiplier applied to the font size on every failed fit.
	pub shrink_factor: f32,
	/// Line box height as a multiple of font size, for both body and reference.
	pub line_height: f32,
	/// Reference font size as a multiple of body font size.
	pub reference_scale: f32,
	/// Gap between the last quote line and the reference, multiple of body font size.
	pub reference_spacing: f32,
	/// Where the block center sits inside the text column, 0 = top, 1 = bottom.
	pub vertical_bias: f32,
	/// Absolute px kept free above the bottom edge for the watermark. Only cuts into the column when
	/// the proportional bottom margin is smaller.
	pub watermark_clearance: f32,
}

impl Default for LayoutMetrics {
	fn default() -> Self {
		Self {
			side_margin: 0.10,
			top_margin: 0.13,
			bottom_margin: 0.10,
			initial_font_scale: 0.046,
			min_font_size: 18.0,
			shrink_factor: 0.95,
			line_height: 1.22,
			reference_scale: 0.64,
			reference_spacing: 0.6,
			vertical_bias: 0.44,
			watermark_clearance: WATERMARK_OFFSET + LOGO_DIAMETER as f32,
		}
	}
}

impl LayoutMetrics {
	pub fn safe_area(&self, resolution: Resolution) -> SafeArea {
		let (w, h) = (resolution.width as f32, resolution.height as f32);
		let x = w * self.side_margin;
		let y = h * self.top_margin;
		SafeArea {
			x,
			y,
			width: (w - 2.0 * x).max(0.0),
			height: (h - y - h * self.bottom_margin).max(0.0),
		}
	}

	/// Lowest y text may reach: the column bottom, raised above the watermark where the two would overlap.
	pub fn text_bottom(&self, resolution: Resolution) -> f32 {
		let area = self.safe_area(resolution);
		let above_watermark = (resolution.height as f32 - self.watermark_clearance).max(area.y);
		area.bottom().min(above_watermark)
	}

	pub fn initial_font_size(&self, resolution: Resolution) -> f32 {
		resolution.longest_side() as f32 * self.initial_font_scale
	}
}

/// The inset text column. Quote and reference are laid out strictly inside it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafeArea {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

impl SafeArea {
	pub fn right(&self) -> f32 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f32 {
		self.y + self.height
	}

	pub fn center_x(&self) -> f32 {
		self.x + self.width / 2.0
	}

	/// Containment with a small tolerance for float noise.
	pub fn contains(&self, rect: &BoxRect) -> bool {
		const EPS: f32 = 0.01;
		rect.x >= self.x - EPS && rect.y >= self.y - EPS && rect.right() <= self.right() + EPS && rect.bottom() <= self.bottom() + EPS
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxRect {
	pub x: f32,
	pub y: f32,
	pub width: f32,
	pub height: f32,
}

impl BoxRect {
	pub fn right(&self) -> f32 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f32 {
		self.y + self.height
	}
}

/// One line of text, positioned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedLine {
	pub text: String,
	/// Line box: advance width by line height.
	pub bounds: BoxRect,
	pub baseline: f32,
}

/// Result of the fit search, before placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fit {
	pub font_size: f32,
	/// Wrapped quote lines, quotation marks already attached.
	pub lines: Vec<String>,
	pub line_widths: Vec<f32>,
	pub reference_width: f32,
	pub block_height: f32,
	pub fits: bool,
	/// Every candidate size tried, in order. The last one is `font_size`.
	pub size_trace: Vec<f32>,
}

impl Fit {
	pub fn iterations(&self) -> usize {
		self.size_trace.len()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLayout {
	pub resolution: Resolution,
	pub safe_area: SafeArea,
	/// See [`LayoutMetrics::text_bottom`].
	pub text_bottom: f32,
	pub font_size: f32,
	pub line_height: f32,
	pub reference_font_size: f32,
	pub reference_line_height: f32,
	pub spacing: f32,
	pub lines: Vec<PlacedLine>,
	pub reference: PlacedLine,
	/// Union of the quote lines and the reference line.
	pub block: BoxRect,
	pub fits: bool,
	pub iterations: usize,
	pub size_trace: Vec<f32>,
}

/// Attach the opening mark to the first line and the closing mark to the last.
pub fn decorate_lines(lines: &[String]) -> Vec<String> {
	let last = lines.len().saturating_sub(1);
	lines.iter().enumerate().map(|(i, line)| decorate(line, i == 0, i == last)).collect()
}

fn decorate(line: &str, first: bool, last: bool) -> String {
	let mut out = String::with_capacity(line.len() + 2);
	if first {
		out.push_str(OPEN_QUOTE);
	}
	out.push_str(line);
	if last {
		out.push_str(CLOSE_QUOTE);
	}
	out
}

/// Greedy word wrap of `content` into lines no wider than `max_width`, counting the quotation marks
/// the first and last lines will carry. A single word wider than the column gets a line of its own;
/// the fit loop then shrinks the font. Returns undecorated lines.
pub fn wrap_words(face: &ResolvedFace, content: &str, size: f32, max_width: f32) -> Result<Vec<String>> {
	let mut lines: Vec<String> = Vec::new();
	let mut current = String::new();
	for word in content.split_whitespace() {
		if current.is_empty() {
			current.push_str(word);
			continue;
		}
		let candidate = format!("{current} {word}");
		if face.measure(&decorate(&candidate, lines.is_empty(), false), size)? <= max_width {
			current = candidate;
		} else {
			lines.push(std::mem::replace(&mut current, word.to_owned()));
		}
	}
	if !current.is_empty() {
		lines.push(current);
	}

	// The closing mark was not known while filling the last line; push its tail word down if it no longer fits.
	while let Some(last) = lines.last() {
		let first = lines.len() == 1;
		if face.measure(&decorate(last, first, true), size)? <= max_width {
			break;
		}
		let Some((head, tail)) = last.rsplit_once(' ') else { break };
		let (head, tail) = (head.to_owned(), tail.to_owned());
		let n = lines.len();
		lines[n - 1] = head;
		lines.push(tail);
	}
	Ok(lines)
}

/// Shrink-until-it-fits search for the body font size.
///
/// Monotone: each candidate is `shrink_factor` times the previous, clamped at `min_font_size`, and the
/// loop stops as soon as a candidate fits or the floor has been tried.
pub fn fit(faces: &FaceSet, quote: &Quote, resolution: Resolution, metrics: &LayoutMetrics) -> Result<Fit> {
	let area = metrics.safe_area(resolution);
	let usable_height = metrics.text_bottom(resolution) - area.y;
	let attribution = quote.attribution();
	let floor = metrics.min_font_size;
	let mut size = metrics.initial_font_size(resolution);
	let mut size_trace = Vec::new();

	loop {
		size_trace.push(size);
		let raw = wrap_words(&faces.body, &quote.content, size, area.width)?;
		let lines = decorate_lines(&raw);
		let line_widths = lines.iter().map(|l| faces.body.measure(l, size)).collect::<Result<Vec<_>>>()?;
		let ref_size = size * metrics.reference_scale;
		let reference_width = faces.reference.measure(&attribution, ref_size)?;

		let block_height = block_height(lines.len(), size, metrics);
		let widest = line_widths.iter().copied().fold(reference_width, f32::max);
		let fits = block_height <= usable_height && widest <= area.width;

		let at_floor = size <= floor;
		if fits || at_floor || size_trace.len() >= MAX_FIT_ITERATIONS {
			debug!(size, lines = lines.len(), iterations = size_trace.len(), fits, "font size settled");
			return Ok(Fit {
				font_size: size,
				lines,
				line_widths,
				reference_width,
				block_height,
				fits,
				size_trace,
			});
		}
		size = (size * metrics.shrink_factor).max(floor);
	}
}

/// `lines × lineHeight + spacing + referenceLineHeight`; no spacing when there are no quote lines.
pub fn block_height(line_count: usize, size: f32, metrics: &LayoutMetrics) -> f32 {
	let line_height = size * metrics.line_height;
	let reference_line_height = size * metrics.reference_scale * metrics.line_height;
	let spacing = if line_count == 0 { 0.0 } else { size * metrics.reference_spacing };
	line_count as f32 * line_height + spacing + reference_line_height
}

/// Fit the quote and position every line inside the safe area.
pub fn layout(faces: &FaceSet, quote: &Quote, resolution: Resolution, metrics: &LayoutMetrics) -> Result<QuoteLayout> {
	let area = metrics.safe_area(resolution);
	let text_bottom = metrics.text_bottom(resolution);
	let fit = fit(faces, quote, resolution, metrics)?;

	let size = fit.font_size;
	let line_height = size * metrics.line_height;
	let reference_font_size = size * metrics.reference_scale;
	let reference_line_height = reference_font_size * metrics.line_height;
	let spacing = if fit.lines.is_empty() { 0.0 } else { size * metrics.reference_spacing };

	// Biased toward the top, but never pushed out of the column (or into the watermark) while the block fits.
	let wanted_top = area.y + area.height * metrics.vertical_bias - fit.block_height / 2.0;
	let top = if fit.block_height <= text_bottom - area.y {
		wanted_top.clamp(area.y, text_bottom - fit.block_height)
	} else {
		area.y
	};

	let body_baseline = faces.body.baseline_in_line(size, line_height);
	let lines: Vec<PlacedLine> = fit
		.lines
		.iter()
		.zip(&fit.line_widths)
		.enumerate()
		.map(|(i, (text, &width))| {
			let y = top + i as f32 * line_height;
			PlacedLine {
				text: text.clone(),
				bounds: BoxRect {
					x: area.center_x() - width / 2.0,
					y,
					width,
					height: line_height,
				},
				baseline: y + body_baseline,
			}
		})
		.collect();

	let ref_y = top + fit.lines.len() as f32 * line_height + spacing;
	let reference = PlacedLine {
		text: quote.attribution(),
		bounds: BoxRect {
			x: area.right() - fit.reference_width,
			y: ref_y,
			width: fit.reference_width,
			height: reference_line_height,
		},
		baseline: ref_y + faces.reference.baseline_in_line(reference_font_size, reference_line_height),
	};

	let left = lines.iter().map(|l| l.bounds.x).fold(reference.bounds.x, f32::min);
	let right = lines.iter().map(|l| l.bounds.right()).fold(reference.bounds.right(), f32::max);
	let block = BoxRect {
		x: left,
		y: top,
		width: right - left,
		height: reference.bounds.bottom() - top,
	};

	Ok(QuoteLayout {
		resolution,
		safe_area: area,
		text_bottom,
		font_size: size,
		line_height,
		reference_font_size,
		reference_line_height,
		spacing,
		lines,
		reference,
		block,
		fits: fit.fits,
		iterations: fit.iterations(),
		size_trace: fit.size_trace,
	})
}

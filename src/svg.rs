//! The text layer: quote, reference and watermark labels are emitted as one SVG document and rasterized
//! by resvg straight onto the surface.

use std::{fmt::Write as _, sync::Arc};

use color_eyre::eyre::{Result, WrapErr as _};
use tiny_skia::{Pixmap, Transform};

use crate::{
	fonts::ResolvedFace,
	layout::PlacedLine,
	style::{Resolution, Rgba},
};

pub fn escape_xml(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&apos;")
}

fn css_style(style: fontdb::Style) -> &'static str {
	match style {
		fontdb::Style::Normal => "normal",
		fontdb::Style::Italic => "italic",
		fontdb::Style::Oblique => "oblique",
	}
}

#[derive(Clone, Copy, Debug)]
pub enum Anchor {
	Start,
	Middle,
	End,
}

impl Anchor {
	fn as_svg(self) -> &'static str {
		match self {
			Anchor::Start => "start",
			Anchor::Middle => "middle",
			Anchor::End => "end",
		}
	}
}

/// Soft drop shadow under a group of text, sized relative to its font.
#[derive(Clone, Copy, Debug)]
pub struct Shadow {
	pub dy: f32,
	pub blur: f32,
	pub opacity: f32,
}

impl Shadow {
	pub fn for_font_size(size: f32) -> Self {
		Self {
			dy: size * 0.03,
			blur: size * 0.06,
			opacity: 0.5,
		}
	}
}

/// Text paint: face, size, fill and optional letter spacing.
#[derive(Clone, Debug)]
pub struct TextPaint<'a> {
	pub face: &'a ResolvedFace,
	pub size: f32,
	pub fill: Rgba,
	pub letter_spacing: f32,
}

/// Accumulates text runs and renders them in one resvg pass.
#[derive(Debug)]
pub struct TextLayer {
	resolution: Resolution,
	defs: String,
	body: String,
	filters: usize,
}

impl TextLayer {
	pub fn new(resolution: Resolution) -> Self {
		Self {
			resolution,
			defs: String::new(),
			body: String::new(),
			filters: 0,
		}
	}

	fn add_shadow(&mut self, shadow: Shadow) -> String {
		let id = format!("shadow{}", self.filters);
		self.filters += 1;
		let _ = write!(
			self.defs,
			r##"
    <filter id="{id}" x="-20%" y="-50%" width="140%" height="200%">
      <feDropShadow dx="0" dy="{:.3}" stdDeviation="{:.3}" flood-color="#000000" flood-opacity="{:.3}"/>
    </filter>"##,
			shadow.dy, shadow.blur, shadow.opacity
		);
		id
	}

	/// A group of lines sharing one paint and one shadow.
	pub fn push_group(&mut self, lines: &[(&str, f32, f32)], anchor: Anchor, paint: &TextPaint<'_>, shadow: Option<Shadow>) {
		if lines.is_empty() {
			return;
		}
		let filter = shadow.map(|s| format!(r#" filter="url(#{})""#, self.add_shadow(s))).unwrap_or_default();
		let _ = write!(
			self.body,
			r#"
  <g{filter} font-family="'{}'" font-style="{}" font-size="{:.3}" fill="{}" fill-opacity="{:.3}" letter-spacing="{:.3}" text-anchor="{}">"#,
			escape_xml(&paint.face.family),
			css_style(paint.face.style),
			paint.size,
			paint.fill.svg_hex(),
			paint.fill.opacity(),
			paint.letter_spacing,
			anchor.as_svg(),
		);
		for (text, x, baseline) in lines {
			let _ = write!(self.body, r#"
    <text x="{x:.3}" y="{baseline:.3}">{}</text>"#, escape_xml(text));
		}
		self.body.push_str("\n  </g>");
	}

	/// Quote lines are laid out centered on their bounds.
	pub fn push_centered(&mut self, lines: &[PlacedLine], paint: &TextPaint<'_>, shadow: Option<Shadow>) {
		let runs: Vec<(&str, f32, f32)> = lines.iter().map(|l| (l.text.as_str(), l.bounds.x + l.bounds.width / 2.0, l.baseline)).collect();
		self.push_group(&runs, Anchor::Middle, paint, shadow);
	}

	pub fn push_right_aligned(&mut self, line: &PlacedLine, paint: &TextPaint<'_>, shadow: Option<Shadow>) {
		self.push_group(&[(line.text.as_str(), line.bounds.right(), line.baseline)], Anchor::End, paint, shadow);
	}

	pub fn is_empty(&self) -> bool {
		self.body.is_empty()
	}

	pub fn to_svg(&self) -> String {
		let Resolution { width, height } = self.resolution;
		format!(
			r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">
  <defs>{}
  </defs>{}
</svg>"#,
			self.defs, self.body
		)
	}

	/// Rasterize onto `pixmap`, compositing over what is already there.
	pub fn render(&self, fontdb: Arc<fontdb::Database>, pixmap: &mut Pixmap) -> Result<()> {
		if self.is_empty() {
			return Ok(());
		}
		let mut options = usvg::Options::default();
		options.fontdb = fontdb;
		let svg = self.to_svg();
		let tree = usvg::Tree::from_str(&svg, &options).wrap_err("text layer produced invalid SVG")?;
		resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{fonts::FontBook, style::FontFamily};

	#[test]
	fn escapes_markup() {
		assert_eq!(escape_xml(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
	}

	#[test]
	fn groups_carry_face_and_shadow() {
		let book = FontBook::embedded().unwrap();
		let paint = TextPaint {
			face: &book.faces(FontFamily::Classic).body,
			size: 40.0,
			fill: Rgba::WHITE,
			letter_spacing: 0.0,
		};
		let mut layer = TextLayer::new(Resolution::SQUARE);
		assert!(layer.is_empty());
		layer.push_group(&[("\"Be still\"", 512.0, 300.0)], Anchor::Middle, &paint, Some(Shadow::for_font_size(40.0)));
		let svg = layer.to_svg();
		assert!(svg.contains(r#"font-family="'DejaVu Serif'""#));
		assert!(svg.contains(r#"font-style="italic""#));
		assert!(svg.contains("feDropShadow"));
		assert!(svg.contains("&quot;Be still&quot;"));
		assert!(svg.contains(r#"filter="url(#shadow0)""#));
	}

	#[test]
	fn renders_ink_onto_pixmap() {
		let book = FontBook::embedded().unwrap();
		let paint = TextPaint {
			face: book.watermark(),
			size: 32.0,
			fill: Rgba::BLACK,
			letter_spacing: 0.0,
		};
		let mut layer = TextLayer::new(Resolution::new(200, 60).unwrap());
		layer.push_group(&[("Amen", 10.0, 40.0)], Anchor::Start, &paint, None);
		let mut pm = Pixmap::new(200, 60).unwrap();
		layer.render(book.database(), &mut pm).unwrap();
		assert!(pm.pixels().iter().any(|p| p.alpha() > 0));
	}
}

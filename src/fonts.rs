//! Font discovery and measurement.
//!
//! The database always contains the bundled DejaVu faces so every font stack resolves to something, and the two
//! families resolve to different faces even without system fonts;
//! system fonts are layered on top when requested. Each stack is resolved once, up front, to a single
//! face whose family name is then written into the SVG text layer, so that what we measure is what resvg draws.

use std::{path::PathBuf, sync::Arc};

use color_eyre::eyre::{Result, WrapErr as _, eyre};
use fontdb::{Database, Query, Stretch, Weight};
use tracing::{debug, warn};

use crate::style::{FaceRequest, FontFamily, WATERMARK_FACE};

static DEJAVU_SERIF: &[u8] = include_bytes!("../assets/fonts/DejaVuSerif.ttf");
static DEJAVU_SERIF_ITALIC: &[u8] = include_bytes!("../assets/fonts/DejaVuSerif-Italic.ttf");
static DEJAVU_SANS: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static DEJAVU_SANS_OBLIQUE: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Oblique.ttf");

/// A concrete face picked out of the database, with its bytes kept around for measuring.
#[derive(Clone)]
pub struct ResolvedFace {
	/// Family name as the database knows it; used verbatim as the SVG `font-family`.
	pub family: String,
	pub style: fontdb::Style,
	data: Arc<[u8]>,
	index: u32,
	units_per_em: f32,
	ascender: f32,
	descender: f32,
}

impl std::fmt::Debug for ResolvedFace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolvedFace").field("family", &self.family).field("style", &self.style).field("index", &self.index).finish()
	}
}

impl ResolvedFace {
	fn from_data(family: String, style: fontdb::Style, data: Arc<[u8]>, index: u32) -> Result<Self> {
		let face = ttf_parser::Face::parse(&data, index).map_err(|e| eyre!("failed to parse face {family:?}: {e}"))?;
		let (units_per_em, ascender, descender) = (face.units_per_em() as f32, face.ascender() as f32, face.descender() as f32);
		Ok(Self {
			family,
			style,
			data,
			index,
			units_per_em,
			ascender,
			descender,
		})
	}

	fn face(&self) -> Result<ttf_parser::Face<'_>> {
		ttf_parser::Face::parse(&self.data, self.index).map_err(|e| eyre!("failed to parse face {:?}: {e}", self.family))
	}

	/// Advance width of `text` at `size` px. Characters the face lacks count as its `.notdef` glyph.
	pub fn measure(&self, text: &str, size: f32) -> Result<f32> {
		let face = self.face()?;
		let notdef = face.glyph_hor_advance(ttf_parser::GlyphId(0)).unwrap_or(0);
		let units: u32 = text
			.chars()
			.map(|c| face.glyph_index(c).and_then(|g| face.glyph_hor_advance(g)).unwrap_or(notdef) as u32)
			.sum();
		Ok(units as f32 * size / self.units_per_em)
	}

	/// Ascent above the baseline at `size` px (positive).
	pub fn ascent(&self, size: f32) -> f32 {
		self.ascender * size / self.units_per_em
	}

	/// Descent below the baseline at `size` px (positive).
	pub fn descent(&self, size: f32) -> f32 {
		-self.descender * size / self.units_per_em
	}

	/// Baseline offset that vertically centers the glyph box inside a line box of `line_height`.
	pub fn baseline_in_line(&self, size: f32, line_height: f32) -> f32 {
		let glyph_box = self.ascent(size) + self.descent(size);
		(line_height - glyph_box) / 2.0 + self.ascent(size)
	}
}

/// Body and reference faces for one [`FontFamily`].
#[derive(Clone, Debug)]
pub struct FaceSet {
	pub body: ResolvedFace,
	pub reference: ResolvedFace,
}

/// Shared font database plus the faces resolved for every supported stack.
#[derive(Clone, Debug)]
pub struct FontBook {
	db: Arc<Database>,
	classic: FaceSet,
	handwriting: FaceSet,
	watermark: ResolvedFace,
}

impl FontBook {
	/// Bundled faces only. Output is identical on every machine.
	pub fn embedded() -> Result<Self> {
		Self::build(false, &[])
	}

	/// Bundled faces, optionally system fonts, plus any extra font files.
	pub fn build(system_fonts: bool, extra: &[PathBuf]) -> Result<Self> {
		let mut db = Database::new();
		db.load_font_data(DEJAVU_SERIF.to_vec());
		db.load_font_data(DEJAVU_SERIF_ITALIC.to_vec());
		db.load_font_data(DEJAVU_SANS.to_vec());
		db.load_font_data(DEJAVU_SANS_OBLIQUE.to_vec());
		if system_fonts {
			db.load_system_fonts();
		}
		for path in extra {
			if let Err(e) = db.load_font_file(path) {
				warn!(path = %path.display(), error = %e, "skipping unreadable font file");
			}
		}
		debug!(faces = db.len(), "font database ready");

		let classic = FaceSet {
			body: resolve(&db, FontFamily::Classic.body())?,
			reference: resolve(&db, FontFamily::Classic.reference())?,
		};
		let handwriting = FaceSet {
			body: resolve(&db, FontFamily::Handwriting.body())?,
			reference: resolve(&db, FontFamily::Handwriting.reference())?,
		};
		let watermark = resolve(&db, WATERMARK_FACE)?;

		Ok(Self {
			db: Arc::new(db),
			classic,
			handwriting,
			watermark,
		})
	}

	pub fn faces(&self, family: FontFamily) -> &FaceSet {
		match family {
			FontFamily::Classic => &self.classic,
			FontFamily::Handwriting => &self.handwriting,
		}
	}

	pub fn watermark(&self) -> &ResolvedFace {
		&self.watermark
	}

	pub fn database(&self) -> Arc<Database> {
		Arc::clone(&self.db)
	}
}

fn resolve(db: &Database, request: FaceRequest) -> Result<ResolvedFace> {
	let query = Query {
		families: request.families,
		weight: Weight::NORMAL,
		stretch: Stretch::Normal,
		style: request.style,
	};
	let id = db.query(&query).ok_or_else(|| eyre!("no font matches {:?}", request.families))?;
	let info = db.face(id).ok_or_else(|| eyre!("font database lost face {id:?}"))?;
	let family = info.families.first().map(|(name, _)| name.clone()).ok_or_else(|| eyre!("face {id:?} has no family name"))?;
	let style = info.style;
	let (data, index) = db
		.with_face_data(id, |data, index| (Arc::<[u8]>::from(data), index))
		.ok_or_else(|| eyre!("could not read data for {family:?}"))?;
	debug!(%family, ?style, "resolved font stack");
	ResolvedFace::from_data(family, style, data, index).wrap_err("font stack resolution")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embedded_book_resolves_every_stack() {
		let book = FontBook::embedded().unwrap();
		assert_eq!(book.faces(FontFamily::Classic).body.family, "DejaVu Serif");
		assert_eq!(book.faces(FontFamily::Classic).body.style, fontdb::Style::Italic);
		assert_eq!(book.faces(FontFamily::Classic).reference.style, fontdb::Style::Normal);
		assert_eq!(book.watermark().family, "DejaVu Sans");
		assert_eq!(book.watermark().style, fontdb::Style::Normal);
	}

	#[test]
	fn handwriting_differs_from_classic_without_system_fonts() {
		let book = FontBook::embedded().unwrap();
		let classic = &book.faces(FontFamily::Classic).body;
		let hand = &book.faces(FontFamily::Handwriting).body;
		assert_ne!((&classic.family, classic.style), (&hand.family, hand.style));
		assert_eq!(hand.family, "DejaVu Sans");
		assert_eq!(hand.style, fontdb::Style::Oblique);
		let text = "The Lord is my shepherd; I shall not want.";
		assert_ne!(classic.measure(text, 40.0).unwrap(), hand.measure(text, 40.0).unwrap());
	}

	#[test]
	fn measurement_is_linear_in_size() {
		let book = FontBook::embedded().unwrap();
		let face = &book.faces(FontFamily::Classic).body;
		let a = face.measure("In the beginning", 20.0).unwrap();
		let b = face.measure("In the beginning", 40.0).unwrap();
		assert!(a > 0.0);
		assert!((b - 2.0 * a).abs() < 1e-3);
		assert_eq!(face.measure("", 40.0).unwrap(), 0.0);
	}

	#[test]
	fn baseline_sits_inside_line_box() {
		let book = FontBook::embedded().unwrap();
		let face = &book.faces(FontFamily::Classic).body;
		let (size, lh) = (40.0, 40.0 * 1.22);
		let baseline = face.baseline_in_line(size, lh);
		assert!(baseline - face.ascent(size) >= 0.0);
		assert!(baseline + face.descent(size) <= lh + 1e-3);
	}
}

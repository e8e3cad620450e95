use std::io::Cursor;

use tiny_skia::Pixmap;
use verse_canvas::{
	Background, BackgroundImage, Compositor, FontFamily, LayoutMetrics, Quote, Resolution, StyleConfig, Theme,
	export::{ExportSink, export, render_many},
	fonts::FontBook,
	watermark::{LogoCache, LogoSource, WATERMARK_OFFSET, WatermarkConfig},
};

const JOHN_3_16: &str = "For God so loved the world, that he gave his only Son, that whoever believes in him should not perish but have eternal life.";

const PSALM_1: &str = "Blessed is the man who walks not in the counsel of the wicked, nor stands in the way of sinners, nor sits in the seat of scoffers; \
	but his delight is in the law of the Lord, and on his law he meditates day and night. He is like a tree planted by streams of water \
	that yields its fruit in its season, and its leaf does not wither. In all that he does, he prospers. The wicked are not so, but are \
	like chaff that the wind drives away. Therefore the wicked will not stand in the judgment, nor sinners in the congregation of the righteous.";

fn john() -> Quote {
	Quote::new("John 3:16", JOHN_3_16)
}

fn render(c: &Compositor, background: Background<'_>, quote: &Quote, style: &StyleConfig) -> (Pixmap, verse_canvas::RenderReport) {
	let mut pm = Compositor::surface(style).unwrap();
	let report = c.compose(&mut pm, background, quote, style).unwrap();
	(pm, report)
}

fn solid_png(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
	let img = image::RgbaImage::from_pixel(w, h, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
	let mut buf = Vec::new();
	image::DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
	buf
}

#[test]
fn same_inputs_give_identical_pixels() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(600, 600).unwrap(), Theme::Dark, FontFamily::Classic);
	let bg = BackgroundImage::decode(&solid_png(8, 8, [30, 90, 160])).unwrap();
	let (a, _) = render(&c, Background::Image(&bg), &john(), &style);
	let (b, _) = render(&c, Background::Image(&bg), &john(), &style);
	assert_eq!(a.data(), b.data());
}

#[test]
fn john_3_16_square_example() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::SQUARE, Theme::Light, FontFamily::Classic);
	let exported = export(&c, Background::None, &john(), &style, 1.0, &ExportSink::Memory).unwrap();
	let layout = &exported.report.layout;

	assert!((3..=4).contains(&layout.lines.len()), "{} lines", layout.lines.len());
	assert_eq!(layout.reference.text, "\u{2014} John 3:16");
	assert!((layout.reference.bounds.right() - layout.safe_area.right()).abs() < 1e-3);
	assert!(layout.reference.bounds.y >= layout.lines.last().unwrap().bounds.bottom());
	assert_eq!(exported.report.watermark.corner_offset(Resolution::SQUARE), (WATERMARK_OFFSET, WATERMARK_OFFSET));

	let png = image::load_from_memory(&exported.png).unwrap();
	assert_eq!((png.width(), png.height()), (1024, 1024));
}

#[test]
fn portrait_rewraps_and_keeps_watermark_offset() {
	let c = Compositor::embedded().unwrap();
	let square = c.layout(&john(), &StyleConfig::new(Resolution::SQUARE, Theme::Light, FontFamily::Classic)).unwrap();
	let style = StyleConfig::new(Resolution::PORTRAIT, Theme::Light, FontFamily::Classic);
	let (pm, report) = render(&c, Background::None, &john(), &style);

	assert_eq!((pm.width(), pm.height()), (1080, 1920));
	assert!(report.layout.lines.len() > square.lines.len());
	assert_ne!(report.layout.font_size, square.font_size);
	assert_eq!(report.watermark.corner_offset(Resolution::PORTRAIT), (WATERMARK_OFFSET, WATERMARK_OFFSET));
}

#[test]
fn quote_block_stays_inside_safe_area() {
	let c = Compositor::embedded().unwrap();
	let psalm: String = PSALM_1.chars().take(500).collect();
	for len in [1, 11, 40, 120, 250, 380, 500] {
		let content: String = psalm.chars().take(len).collect();
		let quote = Quote::new("Psalm 1:1-5", content);
		for res in [Resolution::SQUARE, Resolution::PORTRAIT, Resolution::LANDSCAPE] {
			for font in FontFamily::ALL {
				let layout = c.layout(&quote, &StyleConfig::new(res, Theme::Light, font)).unwrap();
				assert!(layout.fits, "{len} chars at {res} did not fit");
				for line in &layout.lines {
					assert!(layout.safe_area.contains(&line.bounds), "{len} chars at {res}: {line:?} escapes {:?}", layout.safe_area);
				}
				assert!(layout.safe_area.contains(&layout.reference.bounds));
				assert!(layout.safe_area.contains(&layout.block));
			}
		}
	}
}

#[test]
fn proportions_scale_but_watermark_does_not() {
	let c = Compositor::embedded().unwrap();
	let base = StyleConfig::new(Resolution::SQUARE, Theme::Dark, FontFamily::Classic);
	let double = base.scaled(2.0).unwrap();
	let a = c.layout(&john(), &base).unwrap();
	let b = c.layout(&john(), &double).unwrap();

	let close = |x: f32, y: f32| (x - y).abs() <= 1e-3 * y.abs().max(1.0);
	assert!(close(b.font_size, 2.0 * a.font_size));
	assert!(close(b.safe_area.x, 2.0 * a.safe_area.x));
	assert!(close(b.safe_area.height, 2.0 * a.safe_area.height));
	assert_eq!(a.lines.iter().map(|l| &l.text).collect::<Vec<_>>(), b.lines.iter().map(|l| &l.text).collect::<Vec<_>>());
	assert!(close(b.reference.bounds.x, 2.0 * a.reference.bounds.x));
	assert!(close(b.block.y, 2.0 * a.block.y));

	// The watermark is pinned in absolute pixels, not scaled with the canvas.
	let (_, ra) = render(&c, Background::None, &Quote::new("Micah 6:8", "Walk humbly with your God."), &base);
	let (_, rb) = render(&c, Background::None, &Quote::new("Micah 6:8", "Walk humbly with your God."), &double);
	assert_eq!(ra.watermark.corner_offset(base.resolution), rb.watermark.corner_offset(double.resolution));
	assert_eq!(ra.watermark.logo.width, rb.watermark.logo.width);
	assert_eq!(ra.watermark.label_x, rb.watermark.label_x);
}

#[test]
fn undecodable_background_falls_back_to_flat_fill() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(480, 640).unwrap(), Theme::Light, FontFamily::Handwriting);
	let quote = Quote::new("Isaiah 40:31", "They shall mount up with wings like eagles");
	let (broken, report) = render(&c, Background::Encoded(b"<html>404</html>"), &quote, &style);
	let (flat, _) = render(&c, Background::None, &quote, &style);
	assert!(!report.used_background_image);
	assert_eq!(broken.data(), flat.data());
}

#[test]
fn transparent_or_empty_background_shows_flat_fill() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(360, 360).unwrap(), Theme::Dark, FontFamily::Classic);
	let quote = Quote::new("Psalm 23:4", "I will fear no evil, for you are with me");
	let (flat, _) = render(&c, Background::None, &quote, &style);

	let clear = BackgroundImage::from(image::DynamicImage::ImageRgba8(image::RgbaImage::new(12, 12)));
	let (pm, report) = render(&c, Background::Image(&clear), &quote, &style);
	assert!(report.used_background_image);
	assert!(pm.pixels().iter().all(|p| p.alpha() == 255));
	assert_eq!(pm.data(), flat.data());

	let empty = BackgroundImage::from(image::DynamicImage::new_rgba8(0, 0));
	let (pm, report) = render(&c, Background::Image(&empty), &quote, &style);
	assert!(!report.used_background_image);
	assert_eq!(pm.data(), flat.data());
}

#[test]
fn background_image_is_drawn_edge_to_edge() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(320, 200).unwrap(), Theme::Light, FontFamily::Classic);
	let png = solid_png(7, 13, [220, 20, 20]);
	let (pm, report) = render(&c, Background::Encoded(&png), &Quote::new("Genesis 1:3", "Let there be light"), &style);
	assert!(report.used_background_image);
	for (x, y) in [(0, 0), (319, 0), (319, 100), (319, 199)] {
		let px = pm.pixel(x, y).unwrap();
		assert!(px.red() > px.green() && px.red() > px.blue(), "({x},{y}) = {px:?}");
		assert_eq!(px.alpha(), 255);
	}
}

#[test]
fn missing_logo_uses_text_watermark() {
	let fonts = FontBook::embedded().unwrap();
	let with_logo = Compositor::new(fonts.clone(), LayoutMetrics::default(), WatermarkConfig::default());
	let without = Compositor::new(fonts, LayoutMetrics::default(), WatermarkConfig::default()).with_logo_cache(LogoCache::new(LogoSource::Disabled));
	let style = StyleConfig::new(Resolution::new(500, 500).unwrap(), Theme::Dark, FontFamily::Classic);
	let quote = Quote::new("Joshua 1:9", "Be strong and courageous.");

	let (a, ra) = render(&with_logo, Background::None, &quote, &style);
	let (b, rb) = render(&without, Background::None, &quote, &style);
	assert!(ra.used_logo);
	assert!(!rb.used_logo);
	assert_eq!(with_logo.logo_cache().load_count(), 1);
	assert_eq!(without.logo_cache().load_count(), 0);

	// seal center: logo drawn only in the first render
	let (cx, cy) = ((ra.watermark.logo.x + 32.0) as u32, (ra.watermark.logo.y + 32.0) as u32);
	assert_ne!(a.pixel(cx, cy), b.pixel(cx, cy));
}

#[test]
fn logo_is_loaded_once_across_renders() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(300, 300).unwrap(), Theme::Light, FontFamily::Classic);
	for _ in 0..3 {
		render(&c, Background::None, &Quote::new("Psalm 118:24", "This is the day"), &style);
	}
	assert_eq!(c.logo_cache().load_count(), 1);
}

#[test]
fn empty_quote_renders_reference_only() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(600, 400).unwrap(), Theme::Light, FontFamily::Classic);
	let (pm, report) = render(&c, Background::None, &Quote::new("Psalm 46:10", ""), &style);
	assert!(report.layout.lines.is_empty());

	// Each row of the backdrop is uniform, so anything differing from the left edge pixel is ink.
	let r = report.layout.reference.bounds;
	let inked = (r.y as u32..r.bottom() as u32).any(|y| (r.x as u32..r.right() as u32).any(|x| pm.pixel(x, y) != pm.pixel(1, y)));
	assert!(inked);
}

#[test]
fn single_and_multi_line_quotation_marks() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::SQUARE, Theme::Light, FontFamily::Classic);

	let short = c.layout(&Quote::new("John 11:35", "Jesus wept."), &style).unwrap();
	assert_eq!(short.lines.len(), 1);
	assert_eq!(short.lines[0].text, "\"Jesus wept.\"");

	let long = c.layout(&john(), &style).unwrap();
	let n = long.lines.len();
	assert!(n > 1);
	for (i, line) in long.lines.iter().enumerate() {
		assert_eq!(line.text.starts_with('"'), i == 0, "line {i}: {}", line.text);
		assert_eq!(line.text.ends_with('"'), i == n - 1, "line {i}: {}", line.text);
	}
}

#[test]
fn overlong_quote_renders_at_floor_size() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(400, 400).unwrap(), Theme::Dark, FontFamily::Classic);
	let (pm, report) = render(&c, Background::None, &Quote::new("Psalm 119", PSALM_1.repeat(4)), &style);
	assert!(!report.layout.fits);
	assert_eq!(report.layout.font_size, c.metrics().min_font_size);
	assert!(report.layout.size_trace.windows(2).all(|w| w[1] <= w[0]));
	assert_eq!((pm.width(), pm.height()), (400, 400));
}

#[test]
fn scaled_export_writes_larger_png() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(300, 200).unwrap(), Theme::Light, FontFamily::Classic);
	let dir = std::env::temp_dir().join(format!("verse_canvas_export_{}", std::process::id()));
	let path = dir.join("out.png");
	let exported = export(&c, Background::None, &john(), &style, 2.0, &ExportSink::File(path.clone())).unwrap();
	assert_eq!((exported.resolution.width, exported.resolution.height), (600, 400));
	let on_disk = image::open(&path).unwrap();
	assert_eq!((on_disk.width(), on_disk.height()), (600, 400));
	std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn parallel_sizes_match_serial_renders() {
	let c = Compositor::embedded().unwrap();
	let style = StyleConfig::new(Resolution::new(240, 240).unwrap(), Theme::Dark, FontFamily::Handwriting);
	let sizes = [Resolution::new(240, 240).unwrap(), Resolution::new(180, 320).unwrap(), Resolution::new(320, 180).unwrap()];
	let rendered = render_many(&c, Background::None, &john(), &style, &sizes).unwrap();
	assert_eq!(rendered.len(), sizes.len());
	for ((pm, _), res) in rendered.iter().zip(sizes) {
		assert_eq!((pm.width(), pm.height()), (res.width, res.height));
		let (serial, _) = render(&c, Background::None, &john(), &StyleConfig { resolution: res, ..style.clone() });
		assert_eq!(pm.data(), serial.data());
	}
}

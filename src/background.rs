use color_eyre::eyre::{Result, WrapErr as _, bail, eyre};
use image::{DynamicImage, GenericImageView, RgbaImage, imageops};
use tiny_skia::{IntSize, Pixmap};

use crate::style::{BackgroundFit, Resolution};

/// Decoded background art. The compositor only reads it.
#[derive(Clone, Debug)]
pub struct BackgroundImage {
	image: DynamicImage,
}

impl BackgroundImage {
	pub fn decode(bytes: &[u8]) -> Result<Self> {
		let image = image::load_from_memory(bytes).wrap_err("failed to decode background image")?;
		Ok(Self { image })
	}

	pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
		let path = path.as_ref();
		let image = image::open(path).wrap_err_with(|| format!("failed to open background {}", path.display()))?;
		Ok(Self { image })
	}

	pub fn dimensions(&self) -> (u32, u32) {
		self.image.dimensions()
	}

	/// Resample to exactly `target`, then hand back as a premultiplied pixmap ready to blit.
	pub fn to_pixmap(&self, target: Resolution, fit: BackgroundFit) -> Result<Pixmap> {
		let (w, h) = self.dimensions();
		if w == 0 || h == 0 {
			bail!("background image is empty ({w}x{h})");
		}
		let rgba = match fit {
			BackgroundFit::Stretch => imageops::resize(&self.image.to_rgba8(), target.width, target.height, imageops::FilterType::Lanczos3),
			BackgroundFit::Cover => resize_cover(&self.image, target.width, target.height),
		};
		rgba_to_pixmap(rgba)
	}
}

impl From<DynamicImage> for BackgroundImage {
	fn from(image: DynamicImage) -> Self {
		Self { image }
	}
}

/// Scale to cover the target, preserving aspect ratio, then center-crop the excess.
fn resize_cover(img: &DynamicImage, target_width: u32, target_height: u32) -> RgbaImage {
	let (img_width, img_height) = img.dimensions();
	let img_ratio = img_width as f32 / img_height as f32;
	let target_ratio = target_width as f32 / target_height as f32;

	let (scaled_width, scaled_height) = if img_ratio > target_ratio {
		let scaled_width = ((target_height as f32 * img_ratio).round() as u32).max(target_width);
		(scaled_width, target_height)
	} else {
		let scaled_height = ((target_width as f32 / img_ratio).round() as u32).max(target_height);
		(target_width, scaled_height)
	};

	let resized = imageops::resize(&img.to_rgba8(), scaled_width, scaled_height, imageops::FilterType::Lanczos3);
	let x_offset = scaled_width.saturating_sub(target_width) / 2;
	let y_offset = scaled_height.saturating_sub(target_height) / 2;

	imageops::crop_imm(&resized, x_offset, y_offset, target_width, target_height).to_image()
}

pub(crate) fn rgba_to_pixmap(rgba: RgbaImage) -> Result<Pixmap> {
	let (w, h) = rgba.dimensions();
	let size = IntSize::from_wh(w, h).ok_or_else(|| eyre!("image has zero size"))?;
	let mut data = rgba.into_raw();
	for px in data.chunks_exact_mut(4) {
		let a = px[3] as u16;
		for c in &mut px[..3] {
			*c = ((*c as u16 * a + 127) / 255) as u8;
		}
	}
	Pixmap::from_vec(data, size).ok_or_else(|| eyre!("pixel buffer does not match {w}x{h}"))
}

/// Demultiply a pixmap back into a straight-alpha image for encoding.
pub(crate) fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage> {
	let data = pixmap
		.pixels()
		.iter()
		.flat_map(|p| {
			let c = p.demultiply();
			[c.red(), c.green(), c.blue(), c.alpha()]
		})
		.collect();
	RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or_else(|| eyre!("pixmap buffer has unexpected length"))
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;

	fn checker(w: u32, h: u32) -> DynamicImage {
		DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| if (x + y) % 2 == 0 { image::Rgba([200, 40, 40, 255]) } else { image::Rgba([40, 40, 200, 255]) }))
	}

	#[test]
	fn stretch_and_cover_hit_exact_size() {
		let bg = BackgroundImage::from(checker(40, 10));
		let target = Resolution::new(16, 32).unwrap();
		for fit in [BackgroundFit::Stretch, BackgroundFit::Cover] {
			let pm = bg.to_pixmap(target, fit).unwrap();
			assert_eq!((pm.width(), pm.height()), (16, 32));
		}
	}

	#[test]
	fn empty_image_is_unusable() {
		let bg = BackgroundImage::from(DynamicImage::new_rgba8(0, 0));
		for fit in [BackgroundFit::Stretch, BackgroundFit::Cover] {
			assert!(bg.to_pixmap(Resolution::SQUARE, fit).is_err());
		}
	}

	#[test]
	fn decode_roundtrips_png_and_rejects_garbage() {
		let mut buf = Vec::new();
		checker(3, 2).write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
		assert_eq!(BackgroundImage::decode(&buf).unwrap().dimensions(), (3, 2));
		assert!(BackgroundImage::decode(b"definitely not an image").is_err());
	}

	#[test]
	fn premultiplies_translucent_pixels() {
		let img = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 128]));
		let pm = rgba_to_pixmap(img).unwrap();
		let p = pm.pixels()[0];
		assert_eq!((p.red(), p.alpha()), (128, 128));
		let back = pixmap_to_rgba(&pm).unwrap();
		assert_eq!(back.get_pixel(0, 0)[3], 128);
	}
}

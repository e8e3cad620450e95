//! Turning a composed surface into something a user keeps: a PNG file, or PNG bytes for the clipboard or a
//! share sheet. Hi-res exports re-run the compositor at `resolution × scale` rather than upscaling pixels.

use std::{io::Cursor, path::PathBuf};

use color_eyre::eyre::{Result, WrapErr as _, eyre};
use tiny_skia::Pixmap;
use tracing::info;

use crate::{
	background::pixmap_to_rgba,
	compose::{Background, Compositor, RenderReport},
	quote::Quote,
	style::{Resolution, StyleConfig},
};

#[derive(Clone, Debug)]
pub enum ExportSink {
	File(PathBuf),
	/// Keep the encoded PNG in memory, e.g. for a clipboard or share payload.
	Memory,
}

#[derive(Debug)]
pub struct Exported {
	pub report: RenderReport,
	pub resolution: Resolution,
	/// Encoded PNG. Also present for file sinks.
	pub png: Vec<u8>,
}

pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
	let rgba = pixmap_to_rgba(pixmap)?;
	let mut buf = Vec::new();
	rgba.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).wrap_err("PNG encoding failed")?;
	Ok(buf)
}

/// Render at `style.resolution × scale` and hand the PNG to `sink`.
pub fn export(compositor: &Compositor, background: Background<'_>, quote: &Quote, style: &StyleConfig, scale: f32, sink: &ExportSink) -> Result<Exported> {
	let style = style.scaled(scale)?;
	let mut surface = Compositor::surface(&style)?;
	let report = compositor.compose(&mut surface, background, quote, &style)?;
	let png = encode_png(&surface)?;
	if let ExportSink::File(path) = sink {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, &png).wrap_err_with(|| format!("failed to write {}", path.display()))?;
		info!(path = %path.display(), resolution = %style.resolution, "artwork written");
	}
	Ok(Exported {
		report,
		resolution: style.resolution,
		png,
	})
}

/// Render one quote at several resolutions in parallel, one thread per size.
pub fn render_many(compositor: &Compositor, background: Background<'_>, quote: &Quote, style: &StyleConfig, resolutions: &[Resolution]) -> Result<Vec<(Pixmap, RenderReport)>> {
	std::thread::scope(|s| {
		let handles: Vec<_> = resolutions
			.iter()
			.map(|&resolution| {
				let style = StyleConfig { resolution, ..style.clone() };
				s.spawn(move || -> Result<(Pixmap, RenderReport)> {
					let mut surface = Compositor::surface(&style)?;
					let report = compositor.compose(&mut surface, background, quote, &style)?;
					Ok((surface, report))
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().map_err(|_| eyre!("render thread panicked"))?).collect()
	})
}

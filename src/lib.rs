//! Scripture quote artwork: lays a verse and its citation out on a background image, auto-sizing the text
//! to the canvas and stamping a brand seal in the corner.
//!
//! ```no_run
//! use verse_canvas::{Background, Compositor, FontFamily, Quote, Resolution, StyleConfig, Theme};
//!
//! # fn main() -> color_eyre::Result<()> {
//! let compositor = Compositor::embedded()?;
//! let style = StyleConfig::new(Resolution::SQUARE, Theme::Dark, FontFamily::Classic);
//! let mut surface = Compositor::surface(&style)?;
//! compositor.compose(&mut surface, Background::None, &Quote::new("Psalm 46:10", "Be still, and know that I am God."), &style)?;
//! std::fs::write("verse.png", verse_canvas::export::encode_png(&surface)?)?;
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod compose;
pub mod config;
pub mod export;
pub mod fonts;
pub mod layout;
pub mod quote;
pub mod style;
pub mod svg;
pub mod watermark;

pub use background::BackgroundImage;
pub use compose::{Background, Compositor, RenderReport};
pub use layout::{LayoutMetrics, QuoteLayout};
pub use quote::Quote;
pub use style::{BackgroundFit, FontFamily, Resolution, Rgba, StyleConfig, Theme};

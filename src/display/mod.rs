mod canvas;

use std::path::Path;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use image::imageops::FilterType;
use image::{DynamicImage, Rgba};

use log::warn;

use u8g2_fonts::fonts;
use u8g2_fonts::fonts::u8g2_font_profont17_mf as Profont17;
use u8g2_fonts::types::{FontColor, HorizontalAlignment, VerticalPosition};
use u8g2_fonts::FontRenderer;

use crate::config::KeyConfig;
use crate::device::KeyFormat;

use self::canvas::Canvas;

/// Background reserved for misconfigured keys (missing icon file, or a key
/// with nothing set at all). Never use it as an intentional key color.
pub const ERROR_COLOR: Rgb888 = Rgb888::RED;

/// Distance from the bottom edge to the top of a single-line label.
const LABEL_INSET: i32 = 20;

/// Fallback glyph metrics if the font cannot measure the probe string.
const FALLBACK_GLYPH_WIDTH: u32 = 8;
const FALLBACK_LINE_HEIGHT: i32 = 16;

#[derive(Clone, Copy)]
struct Margins {
    top: u32,
    right: u32,
    bottom: u32,
    left: u32,
}

/// Extra bottom margin reserves a band for the label under the icon.
const ICON_LABEL_MARGINS: Margins = Margins { top: 10, right: 0, bottom: 30, left: 0 };
const ICON_ONLY_MARGINS: Margins = Margins { top: 5, right: 5, bottom: 5, left: 5 };

/// Pure per-key bitmap composer.
///
/// Holds the font used for both text measurement and drawing, so wrap and
/// truncation math always agrees with the rendered glyphs. Rendering never
/// fails: bad assets degrade to [`ERROR_COLOR`] with a logged warning.
pub struct Renderer {
    font: FontRenderer,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer with the default built-in font.
    pub fn new() -> Self {
        Self { font: FontRenderer::new::<Profont17>() }
    }

    /// Renderer with a named built-in font. An unknown name warns and falls
    /// back to the default.
    pub fn with_font(name: &str) -> Self {
        match font_by_name(name) {
            Some(font) => Self { font },
            None => {
                warn!("unknown font {name:?}, falling back to the default font");
                Self::new()
            }
        }
    }

    /// Compose the native pixel buffer for one key.
    ///
    /// The display mode is picked from which of `label`/`icon` are present:
    /// icon with a label band, wrapped centered text, bare icon, or a solid
    /// fill (the error color if no background was configured either).
    pub fn render(&self, format: KeyFormat, config: &KeyConfig) -> Vec<u8> {
        let mut canvas = Canvas::new(format);

        match (config.label.as_deref(), config.icon.as_deref()) {
            (Some(label), Some(icon)) => {
                self.render_icon_with_label(&mut canvas, label, icon, config)
            }
            (Some(label), None) => self.render_label(&mut canvas, label, config),
            (None, Some(icon)) => self.render_icon(&mut canvas, icon, config),
            (None, None) => canvas.fill(config.background.unwrap_or(ERROR_COLOR)),
        }

        canvas.into_native()
    }

    fn render_icon_with_label(
        &self,
        canvas: &mut Canvas,
        label: &str,
        icon: &Path,
        config: &KeyConfig,
    ) {
        let background = config.background.unwrap_or(Rgb888::BLACK);

        match image::open(icon) {
            Ok(img) => {
                canvas.fill(background);
                blit_icon(canvas, &img, ICON_LABEL_MARGINS, background);
            }
            Err(err) => {
                warn!("icon {} failed to load, using error color: {err}", icon.display());
                canvas.fill(ERROR_COLOR);
            }
        }

        // One line only next to an icon; overflow is truncated with an
        // ellipsis rather than wrapped.
        let text = truncate_label(label, self.chars_per_line(canvas.width()));
        let position = Point::new(canvas.width() as i32 / 2, canvas.height() as i32 - LABEL_INSET);
        self.draw_text(canvas, &text, position, config.label_color);
    }

    fn render_label(&self, canvas: &mut Canvas, label: &str, config: &KeyConfig) {
        canvas.fill(config.background.unwrap_or(Rgb888::BLACK));

        let lines = wrap_label(label, self.chars_per_line(canvas.width()));
        let line_height = self.line_height();
        let top = block_top(canvas.height(), lines.len(), line_height);

        for (i, line) in lines.iter().enumerate() {
            let position = Point::new(canvas.width() as i32 / 2, top + i as i32 * line_height);
            self.draw_text(canvas, line, position, config.label_color);
        }
    }

    fn render_icon(&self, canvas: &mut Canvas, icon: &Path, config: &KeyConfig) {
        let background = config.background.unwrap_or(Rgb888::BLACK);

        match image::open(icon) {
            Ok(img) => {
                canvas.fill(background);
                blit_icon(canvas, &img, ICON_ONLY_MARGINS, background);
            }
            Err(err) => {
                warn!("icon {} failed to load, using error color: {err}", icon.display());
                canvas.fill(ERROR_COLOR);
            }
        }
    }

    /// How many glyphs of the active font fit on one canvas line, measured
    /// against a representative glyph.
    fn chars_per_line(&self, canvas_width: u32) -> usize {
        let glyph_width = self
            .font
            .get_rendered_dimensions("a", Point::zero(), VerticalPosition::Top)
            .ok()
            .and_then(|dims| dims.bounding_box)
            .map(|bb| bb.size.width)
            .unwrap_or(FALLBACK_GLYPH_WIDTH)
            .max(1);

        (canvas_width / glyph_width).max(1) as usize
    }

    /// Line advance covering both ascenders and descenders, from the
    /// bounding box of a tall glyph paired with a descender.
    fn line_height(&self) -> i32 {
        self.font
            .get_rendered_dimensions("Ay", Point::zero(), VerticalPosition::Top)
            .ok()
            .and_then(|dims| dims.bounding_box)
            .map(|bb| bb.size.height as i32)
            .unwrap_or(FALLBACK_LINE_HEIGHT)
            .max(1)
    }

    /// Draw one line centered on `position.x` with its top edge at
    /// `position.y`, so text grows downward from the anchor.
    fn draw_text(&self, canvas: &mut Canvas, text: &str, position: Point, color: Rgb888) {
        let mut frame = canvas.frame();

        if let Err(err) = self.font.render_aligned(
            text,
            position,
            VerticalPosition::Top,
            HorizontalAlignment::Center,
            FontColor::Transparent(color),
            &mut frame,
        ) {
            warn!("could not draw label {text:?}: {err:?}");
        }
    }
}

fn font_by_name(name: &str) -> Option<FontRenderer> {
    match name {
        "profont12" => Some(FontRenderer::new::<fonts::u8g2_font_profont12_mf>()),
        "profont17" => Some(FontRenderer::new::<fonts::u8g2_font_profont17_mf>()),
        "profont22" => Some(FontRenderer::new::<fonts::u8g2_font_profont22_mf>()),
        "profont29" => Some(FontRenderer::new::<fonts::u8g2_font_profont29_mf>()),
        _ => None,
    }
}

/// Scale the icon to fit inside the margin box, keeping its aspect ratio,
/// and composite it centered over the background.
fn blit_icon(canvas: &mut Canvas, icon: &DynamicImage, margins: Margins, background: Rgb888) {
    let box_w = canvas.width().saturating_sub(margins.left + margins.right);
    let box_h = canvas.height().saturating_sub(margins.top + margins.bottom);
    if box_w == 0 || box_h == 0 {
        return;
    }

    let scaled = icon.resize(box_w, box_h, FilterType::Triangle);
    let x0 = margins.left + (box_w - scaled.width()) / 2;
    let y0 = margins.top + (box_h - scaled.height()) / 2;

    for (x, y, pixel) in scaled.to_rgba8().enumerate_pixels() {
        canvas.put(x0 + x, y0 + y, over(*pixel, background));
    }
}

fn over(pixel: Rgba<u8>, under: Rgb888) -> Rgb888 {
    let [r, g, b, a] = pixel.0;
    let a = a as u16;
    let blend = |fg: u8, bg: u8| ((fg as u16 * a + bg as u16 * (255 - a)) / 255) as u8;
    Rgb888::new(blend(r, under.r()), blend(g, under.g()), blend(b, under.b()))
}

/// Truncate to `chars_per_line` glyphs, replacing the overflow with `...`.
fn truncate_label(label: &str, chars_per_line: usize) -> String {
    if label.chars().count() <= chars_per_line {
        return label.to_owned();
    }

    let keep = chars_per_line.saturating_sub(3);
    let mut out: String = label.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Greedy word wrap to at most `width` glyphs per line. Words longer than a
/// whole line are hard-split.
fn wrap_label(label: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in label.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();

        for chunk in chars.chunks(width.max(1)) {
            let chunk_len = chunk.len();

            if line_len == 0 {
                line = chunk.iter().collect();
                line_len = chunk_len;
            } else if line_len + 1 + chunk_len <= width {
                line.push(' ');
                line.extend(chunk);
                line_len += 1 + chunk_len;
            } else {
                lines.push(std::mem::take(&mut line));
                line = chunk.iter().collect();
                line_len = chunk_len;
            }
        }
    }

    if line_len > 0 {
        lines.push(line);
    }

    lines
}

/// Top edge of a vertically centered block of `line_count` lines.
fn block_top(canvas_height: u32, line_count: usize, line_height: i32) -> i32 {
    (canvas_height as i32 - line_count as i32 * line_height) / 2
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const FORMAT: KeyFormat = KeyFormat { width: 96, height: 96 };

    fn solid(buffer: &[u8], color: Rgb888) -> bool {
        buffer
            .chunks_exact(3)
            .all(|px| px == [color.r(), color.g(), color.b()])
    }

    fn contains(buffer: &[u8], color: Rgb888) -> bool {
        buffer
            .chunks_exact(3)
            .any(|px| px == [color.r(), color.g(), color.b()])
    }

    fn icon_fixture(dir: &tempfile::TempDir, color: [u8; 4]) -> PathBuf {
        let path = dir.path().join("icon.png");
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba(color));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn truncates_long_labels_with_ellipsis() {
        assert_eq!(truncate_label("terminal", 10), "terminal");
        assert_eq!(truncate_label("verylonglabel", 8), "veryl...");
        // Exactly at the limit passes through unmodified.
        assert_eq!(truncate_label("abcdefgh", 8), "abcdefgh");
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(wrap_label("hello world", 11), vec!["hello world"]);
        assert_eq!(wrap_label("hello world", 5), vec!["hello", "world"]);
        assert_eq!(wrap_label("open git tools", 8), vec!["open git", "tools"]);
        assert!(wrap_label("", 10).is_empty());
    }

    #[test]
    fn splits_words_longer_than_a_line() {
        assert_eq!(wrap_label("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn centers_the_wrapped_block() {
        assert_eq!(block_top(96, 2, 20), 28);
        assert_eq!(block_top(96, 1, 20), 38);
        // More lines than fit push the top above the canvas edge.
        assert_eq!(block_top(96, 7, 20), -22);
    }

    #[test]
    fn unconfigured_key_fills_error_color() {
        let renderer = Renderer::new();
        let buffer = renderer.render(FORMAT, &KeyConfig::new());

        assert_eq!(buffer.len(), FORMAT.byte_len());
        assert!(solid(&buffer, ERROR_COLOR));
    }

    #[test]
    fn bare_background_fills_configured_color() {
        let renderer = Renderer::new();
        let config = KeyConfig::new().background(Rgb888::new(0, 40, 120));
        let buffer = renderer.render(FORMAT, &config);

        assert!(solid(&buffer, Rgb888::new(0, 40, 120)));
    }

    #[test]
    fn missing_icon_degrades_to_error_color() {
        let renderer = Renderer::new();
        let config = KeyConfig::new().icon("/nonexistent/icon.png");
        let buffer = renderer.render(FORMAT, &config);

        assert!(solid(&buffer, ERROR_COLOR));
    }

    #[test]
    fn missing_icon_with_label_still_draws_the_label() {
        let renderer = Renderer::new();
        let config = KeyConfig::new().icon("/nonexistent/icon.png").label("Hi");
        let buffer = renderer.render(FORMAT, &config);

        // Error background, with white label glyphs drawn over it.
        assert_eq!(&buffer[0..3], &[255, 0, 0]);
        assert!(contains(&buffer, Rgb888::WHITE));
    }

    #[test]
    fn label_only_draws_text_over_background() {
        let renderer = Renderer::new();
        let config = KeyConfig::new()
            .label("Hi")
            .background(Rgb888::new(0, 0, 80));
        let buffer = renderer.render(FORMAT, &config);

        assert_eq!(&buffer[0..3], &[0, 0, 80]);
        assert!(contains(&buffer, Rgb888::WHITE));
    }

    #[test]
    fn icon_is_composited_into_the_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let icon = icon_fixture(&dir, [0, 255, 0, 255]);

        let renderer = Renderer::new();
        let config = KeyConfig::new().icon(icon);
        let buffer = renderer.render(FORMAT, &config);

        // Center of the canvas lands inside the scaled icon.
        let center = ((48 * 96 + 48) * 3) as usize;
        assert_eq!(&buffer[center..center + 3], &[0, 255, 0]);
        // Margins stay the background color.
        assert_eq!(&buffer[0..3], &[0, 0, 0]);
    }

    #[test]
    fn render_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let icon = icon_fixture(&dir, [10, 60, 200, 255]);

        let renderer = Renderer::new();
        let config = KeyConfig::new().icon(icon).label("deploy");

        let first = renderer.render(FORMAT, &config);
        let second = renderer.render(FORMAT, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_font_falls_back_to_default() {
        let fallback = Renderer::with_font("wingdings");
        let default = Renderer::new();

        let config = KeyConfig::new().label("abc");
        assert_eq!(
            fallback.render(FORMAT, &config),
            default.render(FORMAT, &config)
        );
    }
}

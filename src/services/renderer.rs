//! Styled QR-code rendering.
//!
//! The symbol itself comes from the `qrcode` crate; this module only paints
//! it: a flat background, gapped-square data modules, rounded finder markers
//! with separate ring and center colors, and an optional centered logo.

use crate::{
    models::qr_request::{
        BACKGROUND_COLOR, BORDER, BOX_SIZE, CONTENT, DOTS_COLOR, MARKER_BORDER_COLOR,
        MARKER_CENTER_COLOR, QrRequest,
    },
    services::color::{ColorError, hex_to_rgb},
};
use image::{
    ImageFormat, Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use qrcode::{Color, EcLevel, QrCode};
use serde_json::Value;
use std::{io::Cursor, path::Path};
use thiserror::Error;

/// Largest side length, in pixels, of a rendered image.
pub const MAX_IMAGE_SIDE: u64 = 8192;

/// Share of each module box covered by a data dot.
const MODULE_RATIO: f32 = 0.8;
/// Logo side relative to the full image side.
const LOGO_RATIO: f32 = 0.25;
/// Corner radius of finder shapes relative to one module. At most one half,
/// so the corner modules of each ring still read as dark.
const FINDER_ROUNDING: f32 = 0.5;
/// Finder patterns are 7x7 modules.
const FINDER_MODULES: u32 = 7;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("field `{field}`: {source}")]
    Color {
        field: &'static str,
        #[source]
        source: ColorError,
    },
    #[error("rendered image would be {0}px wide (limit {MAX_IMAGE_SIDE}px)")]
    TooLarge(u64),
    #[error("qr encoding failed: {0}")]
    Symbol(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Styling parameters pulled out of a [`QrRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct QrStyle {
    pub content: String,
    pub box_size: u32,
    pub border: u32,
    pub background: Rgba<u8>,
    pub dots: Rgba<u8>,
    pub marker_border: Rgba<u8>,
    pub marker_center: Rgba<u8>,
}

impl QrStyle {
    pub fn from_request(request: &QrRequest) -> Result<Self, RenderError> {
        let box_size = integer_field(request, BOX_SIZE)?;
        if box_size == 0 {
            return Err(RenderError::InvalidField {
                field: BOX_SIZE,
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            content: string_field(request, CONTENT)?.to_string(),
            box_size,
            border: integer_field(request, BORDER)?,
            background: color_field(request, BACKGROUND_COLOR)?,
            dots: color_field(request, DOTS_COLOR)?,
            marker_border: color_field(request, MARKER_BORDER_COLOR)?,
            marker_center: color_field(request, MARKER_CENTER_COLOR)?,
        })
    }
}

fn field<'a>(request: &'a QrRequest, name: &'static str) -> Result<&'a Value, RenderError> {
    request.get(name).ok_or(RenderError::MissingField(name))
}

fn string_field<'a>(request: &'a QrRequest, name: &'static str) -> Result<&'a str, RenderError> {
    field(request, name)?
        .as_str()
        .ok_or_else(|| RenderError::InvalidField {
            field: name,
            reason: "expected a string".into(),
        })
}

fn integer_field(request: &QrRequest, name: &'static str) -> Result<u32, RenderError> {
    field(request, name)?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RenderError::InvalidField {
            field: name,
            reason: "expected a non-negative integer".into(),
        })
}

fn color_field(request: &QrRequest, name: &'static str) -> Result<Rgba<u8>, RenderError> {
    let (r, g, b) = hex_to_rgb(string_field(request, name)?)
        .map_err(|source| RenderError::Color { field: name, source })?;
    Ok(Rgba([r, g, b, 255]))
}

/// Turns a request into a bitmap.
pub trait QrRenderer: Send + Sync {
    fn render(&self, request: &QrRequest) -> Result<RgbaImage, RenderError>;
}

/// Renderer producing the gapped-square / rounded-marker style.
#[derive(Clone, Default)]
pub struct StyledQrRenderer {
    logo: Option<RgbaImage>,
}

impl StyledQrRenderer {
    pub fn new(logo: Option<RgbaImage>) -> Self {
        Self { logo }
    }

    /// Load the logo embedded at the center of every code.
    ///
    /// Returns `Ok(None)` when the file does not exist, so deployments
    /// without the asset still render plain codes.
    pub fn load_logo(path: &Path) -> Result<Option<RgbaImage>, RenderError> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(image::open(path)?.to_rgba8()))
    }

    fn paint(&self, style: &QrStyle) -> Result<RgbaImage, RenderError> {
        // The logo hides the center modules; H recovers up to 30% damage.
        let ec_level = if self.logo.is_some() {
            EcLevel::H
        } else {
            EcLevel::M
        };
        let code = QrCode::with_error_correction_level(style.content.as_bytes(), ec_level)
            .map_err(|err| RenderError::Symbol(err.to_string()))?;

        let modules = code.width() as u32;
        let side = (u64::from(modules) + 2 * u64::from(style.border)) * u64::from(style.box_size);
        if side > MAX_IMAGE_SIDE {
            return Err(RenderError::TooLarge(side));
        }
        let side = side as u32;
        let unit = style.box_size;

        let mut img = RgbaImage::from_pixel(side, side, style.background);

        for (i, color) in code.to_colors().iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let x = (i as u32) % modules;
            let y = (i as u32) / modules;
            if in_finder(x, y, modules) {
                continue;
            }
            draw_gapped_square(
                &mut img,
                (x + style.border) * unit,
                (y + style.border) * unit,
                unit,
                style.dots,
            );
        }

        for (fx, fy) in finder_origins(modules) {
            draw_finder(
                &mut img,
                (fx + style.border) * unit,
                (fy + style.border) * unit,
                unit,
                style,
            );
        }

        if let Some(logo) = &self.logo {
            embed_logo(&mut img, logo);
        }

        Ok(img)
    }
}

impl QrRenderer for StyledQrRenderer {
    fn render(&self, request: &QrRequest) -> Result<RgbaImage, RenderError> {
        let style = QrStyle::from_request(request)?;
        self.paint(&style)
    }
}

/// Encode a rendered image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

fn in_finder(x: u32, y: u32, modules: u32) -> bool {
    let near = |v: u32| v < FINDER_MODULES;
    let far = |v: u32| v >= modules - FINDER_MODULES;
    (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y))
}

fn finder_origins(modules: u32) -> [(u32, u32); 3] {
    let far = modules - FINDER_MODULES;
    [(0, 0), (far, 0), (0, far)]
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    for y in y0..y1.min(img.height()) {
        for x in x0..x1.min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_gapped_square(img: &mut RgbaImage, x: u32, y: u32, unit: u32, color: Rgba<u8>) {
    let gap = (unit as f32 * (1.0 - MODULE_RATIO) / 2.0).round() as u32;
    fill_rect(img, x + gap, y + gap, x + unit - gap, y + unit - gap, color);
}

/// Fill a square of `size` pixels whose corners are rounded by `radius` pixels.
fn fill_rounded_square(
    img: &mut RgbaImage,
    x: u32,
    y: u32,
    size: u32,
    radius: f32,
    color: Rgba<u8>,
) {
    let max = size as f32 - radius;
    for dy in 0..size {
        for dx in 0..size {
            let fx = dx as f32 + 0.5;
            let fy = dy as f32 + 0.5;
            let cx = fx.clamp(radius, max);
            let cy = fy.clamp(radius, max);
            let (ex, ey) = (fx - cx, fy - cy);
            if ex * ex + ey * ey <= radius * radius {
                let (px, py) = (x + dx, y + dy);
                if px < img.width() && py < img.height() {
                    img.put_pixel(px, py, color);
                }
            }
        }
    }
}

fn draw_finder(img: &mut RgbaImage, x: u32, y: u32, unit: u32, style: &QrStyle) {
    let radius = unit as f32 * FINDER_ROUNDING;
    fill_rounded_square(img, x, y, 7 * unit, radius, style.marker_border);
    fill_rounded_square(img, x + unit, y + unit, 5 * unit, radius, style.background);
    fill_rounded_square(
        img,
        x + 2 * unit,
        y + 2 * unit,
        3 * unit,
        radius,
        style.marker_center,
    );
}

fn embed_logo(img: &mut RgbaImage, logo: &RgbaImage) {
    let side = img.width();
    let logo_side = (side as f32 * LOGO_RATIO) as u32;
    if logo_side == 0 {
        return;
    }
    let scaled = imageops::resize(logo, logo_side, logo_side, FilterType::Lanczos3);
    let offset = i64::from((side - logo_side) / 2);
    imageops::overlay(img, &scaled, offset, offset);
}

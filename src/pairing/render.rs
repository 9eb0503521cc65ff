// QR rendering for pairing payloads.

use base64::{engine::general_purpose, Engine as _};
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use thiserror::Error;

const SVG_DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("QR payload is empty")]
    Empty,

    #[error("QR encoding failed: {0}")]
    Encode(String),
}

/// A payload rendered for both the terminal and embedders
#[derive(Debug, Clone, PartialEq)]
pub struct QrImage {
    pub payload: String,
    /// Half-block art, two modules per character row
    pub text: String,
    /// `data:image/svg+xml;base64,...`
    pub data_url: String,
}

impl QrImage {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// Width in terminal cells of the widest line
    pub fn width(&self) -> usize {
        self.lines().map(|l| l.chars().count()).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.lines().count()
    }
}

/// Signature the pairing controller renders through
pub type QrRenderFn = fn(&str) -> Result<QrImage, RenderError>;

pub fn render_qr(payload: &str) -> Result<QrImage, RenderError> {
    if payload.trim().is_empty() {
        return Err(RenderError::Empty);
    }
    let code = QrCode::new(payload.as_bytes()).map_err(|e| RenderError::Encode(e.to_string()))?;

    // Light modules drawn dark so the code reads on a dark terminal
    let text = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build();

    let svg_image = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#FFFFFF"))
        .build();
    let data_url = format!("{}{}", SVG_DATA_URL_PREFIX, general_purpose::STANDARD.encode(svg_image));

    Ok(QrImage {
        payload: payload.to_string(),
        text,
        data_url,
    })
}

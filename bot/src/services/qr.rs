// src/services/qr.rs

//! eSIM activation QR codes (LPA `1$esim$...` payloads) rendered to PNG.

use image::{DynamicImage, ImageBuffer, ImageError, ImageFormat, Luma};
use qrcode::types::{Color, QrError};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;
use thiserror::Error;

pub const QR_IMAGE_SIZE: u32 = 300;
pub const QR_QUIET_ZONE: u32 = 4;

#[derive(Debug, Error)]
pub enum QrRenderError {
  #[error("{0} must not be empty")]
  MissingField(&'static str),

  #[error("failed to encode QR payload: {0}")]
  Encode(#[from] QrError),

  #[error("failed to write PNG: {0}")]
  Image(#[from] ImageError),

  #[error("QR code with {modules} modules does not fit a {size}px canvas")]
  TooDense { modules: u32, size: u32 },
}

pub fn activation_payload(activation_code: &str, smdp_address: &str) -> String {
  format!("1$esim${}${}", smdp_address, activation_code)
}

/// Pixel geometry of a rendered code: side of one module and the offset of
/// the first module (quiet zone included) from the canvas edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrLayout {
  pub modules: u32,
  pub scale: u32,
  pub offset: u32,
}

impl QrLayout {
  fn for_width(width: u32) -> Result<Self, QrRenderError> {
    let modules = width + QR_QUIET_ZONE * 2;
    let scale = QR_IMAGE_SIZE / modules;
    if scale == 0 {
      return Err(QrRenderError::TooDense {
        modules,
        size: QR_IMAGE_SIZE,
      });
    }
    Ok(Self {
      modules,
      scale,
      offset: (QR_IMAGE_SIZE - modules * scale) / 2,
    })
  }
}

/// Renders the activation QR for `activation_code` / `smdp_address`.
///
/// Error correction level H, a four-module quiet zone, black on white,
/// centred on a 300x300 grayscale canvas. Fields go into the payload exactly
/// as submitted; whitespace only counts when deciding a field is blank.
/// CPU bound; async callers should run it on the blocking pool.
pub fn render_activation_qr(activation_code: &str, smdp_address: &str) -> Result<Vec<u8>, QrRenderError> {
  if activation_code.trim().is_empty() {
    return Err(QrRenderError::MissingField("activation code"));
  }
  if smdp_address.trim().is_empty() {
    return Err(QrRenderError::MissingField("SM-DP+ address"));
  }

  let payload = activation_payload(activation_code, smdp_address);
  let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)?;
  let width = code.width() as u32;
  let layout = QrLayout::for_width(width)?;

  let mut img = ImageBuffer::from_pixel(QR_IMAGE_SIZE, QR_IMAGE_SIZE, Luma([255u8]));
  let colors = code.to_colors();
  for y in 0..width {
    for x in 0..width {
      if colors[(y * width + x) as usize] != Color::Dark {
        continue;
      }
      let x0 = layout.offset + (x + QR_QUIET_ZONE) * layout.scale;
      let y0 = layout.offset + (y + QR_QUIET_ZONE) * layout.scale;
      for dy in 0..layout.scale {
        for dx in 0..layout.scale {
          img.put_pixel(x0 + dx, y0 + dy, Luma([0u8]));
        }
      }
    }
  }

  let mut png = Cursor::new(Vec::new());
  DynamicImage::ImageLuma8(img).write_to(&mut png, ImageFormat::Png)?;
  Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn payload_puts_address_before_code() {
    assert_eq!(activation_payload("ABC123", "rsp.example.com"), "1$esim$rsp.example.com$ABC123");
  }

  #[test]
  fn rendered_png_matches_module_matrix() {
    let png = render_activation_qr("ABC123", "rsp.example.com").unwrap();
    let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (QR_IMAGE_SIZE, QR_IMAGE_SIZE));
    let gray = decoded.to_luma8();

    let code =
      QrCode::with_error_correction_level(activation_payload("ABC123", "rsp.example.com").as_bytes(), EcLevel::H)
        .unwrap();
    let width = code.width() as u32;
    let layout = QrLayout::for_width(width).unwrap();
    let colors = code.to_colors();

    let half = layout.scale / 2;
    for y in 0..width {
      for x in 0..width {
        let px = layout.offset + (x + QR_QUIET_ZONE) * layout.scale + half;
        let py = layout.offset + (y + QR_QUIET_ZONE) * layout.scale + half;
        let dark = gray.get_pixel(px, py).0[0] == 0;
        assert_eq!(dark, colors[(y * width + x) as usize] == Color::Dark, "module ({}, {})", x, y);
      }
    }

    // Quiet zone and margins stay white.
    let quiet_edge = layout.offset + QR_QUIET_ZONE * layout.scale;
    for i in 0..quiet_edge {
      assert_eq!(gray.get_pixel(i, i).0[0], 255);
      assert_eq!(gray.get_pixel(QR_IMAGE_SIZE - 1 - i, QR_IMAGE_SIZE - 1 - i).0[0], 255);
    }
  }

  fn decode_payload(png: &[u8]) -> String {
    let gray = image::load_from_memory_with_format(png, ImageFormat::Png)
      .unwrap()
      .to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(gray.width() as usize, gray.height() as usize, |x, y| {
      gray.get_pixel(x as u32, y as u32).0[0]
    });
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR code in the image");
    let (_, content) = grids[0].decode().unwrap();
    content
  }

  #[test]
  fn rendered_png_decodes_to_activation_payload() {
    let png = render_activation_qr("ABC123", "rsp.example.com").unwrap();
    assert_eq!(decode_payload(&png), "1$esim$rsp.example.com$ABC123");
  }

  #[test]
  fn rendering_is_deterministic() {
    let a = render_activation_qr("ABC123", "rsp.example.com").unwrap();
    let b = render_activation_qr("ABC123", "rsp.example.com").unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn fields_are_encoded_as_submitted() {
    let png = render_activation_qr(" ABC123 ", "rsp.example.com").unwrap();
    assert_eq!(decode_payload(&png), "1$esim$rsp.example.com$ ABC123 ");
  }

  #[test]
  fn blank_fields_are_rejected() {
    assert!(matches!(render_activation_qr("  ", "rsp.example.com"), Err(QrRenderError::MissingField(_))));
    assert!(matches!(render_activation_qr("ABC", ""), Err(QrRenderError::MissingField(_))));
  }

  #[test]
  fn oversized_payload_is_an_encode_error() {
    let code = "A".repeat(4000);
    assert!(matches!(
      render_activation_qr(&code, "rsp.example.com"),
      Err(QrRenderError::Encode(_))
    ));
  }

  #[test]
  fn layout_rejects_codes_wider_than_the_canvas() {
    assert!(matches!(QrLayout::for_width(300), Err(QrRenderError::TooDense { .. })));
  }
}

//! QR code rendering for the pairing flow.

use qrcode::{Color, EcLevel, QrCode};
use sable_core::error::SableError;
use std::path::Path;

fn encode(qr_data: &str) -> Result<QrCode, SableError> {
    QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| SableError::Channel(format!("QR generation failed: {e}")))
}

/// Generate a compact QR code for terminal display using Unicode half-block characters.
///
/// Packs two rows of modules into one line of text using `▀`, `▄`, `█`, and space.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, SableError> {
    let code = encode(qr_data)?;
    let width = code.width();
    let colors: Vec<Color> = code.into_colors();
    let is_dark = |row: usize, col: usize| row < width && colors[row * width + col] == Color::Dark;

    let mut out = String::with_capacity(width * (width / 2 + 1) * 3);
    for row in (0..width).step_by(2) {
        for col in 0..width {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}

/// Render a QR code as PNG bytes: 10 px modules, 2-module white border.
pub fn generate_qr_image(qr_data: &str) -> Result<Vec<u8>, SableError> {
    use image::{ImageBuffer, Luma};

    let code = encode(qr_data)?;
    let module_size: u32 = 10;
    let quiet_zone: u32 = 2;
    let modules = code.width() as u32;
    let img_size = (modules + quiet_zone * 2) * module_size;

    let img = ImageBuffer::from_fn(img_size, img_size, |x, y| {
        let (cx, cy) = (x / module_size, y / module_size);
        if cx < quiet_zone || cy < quiet_zone {
            return Luma([255u8]);
        }
        let (mx, my) = (cx - quiet_zone, cy - quiet_zone);
        if mx >= modules || my >= modules {
            return Luma([255u8]);
        }
        match code[(mx as usize, my as usize)] {
            Color::Dark => Luma([0u8]),
            Color::Light => Luma([255u8]),
        }
    });

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| SableError::Channel(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Print the code to the terminal and write the PNG to `png_path`.
pub(super) fn publish_qr(qr_data: &str, png_path: &Path) -> Result<(), SableError> {
    let terminal = generate_qr_terminal(qr_data)?;
    println!("\nScan this QR code with WhatsApp > Linked Devices:\n\n{terminal}");

    let png = generate_qr_image(qr_data)?;
    if let Some(parent) = png_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(png_path, png)?;
    Ok(())
}

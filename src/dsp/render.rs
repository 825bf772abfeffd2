//! Spectrogram visualisation
//!
//! Renders the magnitude spectrogram as a grayscale PNG, brightest where the
//! energy is, with detected peaks overdrawn in red. Useful for eyeballing
//! what the peak picker latched onto.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::dsp::peaks::Peak;
use crate::dsp::spectrogram::Spectrogram;
use crate::error::EngineError;

/// Render a spectrogram (and its peaks) to a PNG file
///
/// One pixel per cell: x is the frame index, y the frequency bin with low
/// frequencies at the bottom. Magnitudes are normalized by the RMS over the
/// whole matrix.
///
/// # Errors
///
/// Returns `EngineError::Render` if the matrix is empty or the image cannot
/// be written.
pub fn to_png(spectrogram: &Spectrogram, peaks: &[Peak], path: &Path) -> Result<(), EngineError> {
    let width = spectrogram.frames();
    let height = spectrogram.bins();
    if width == 0 || height == 0 {
        return Err(EngineError::Render(
            "cannot render an empty spectrogram".to_string(),
        ));
    }

    let rms = matrix_rms(spectrogram);
    let scale = if rms > 0.0 { 1.0 / rms } else { 0.0 };

    let mut img = RgbaImage::new(width as u32, height as u32);
    for (x, row) in spectrogram.rows.iter().enumerate() {
        for y in 0..height {
            let level = (255.0 * row[y].norm() * scale).min(255.0) as u8;
            // invert y so low bins sit at the bottom of the image
            img.put_pixel(x as u32, (height - 1 - y) as u32, Rgba([level, level, level, 255]));
        }
    }

    let peak_color = Rgba([255, 0, 0, 255]);
    for peak in peaks {
        if peak.frame < width && peak.bin < height {
            img.put_pixel(peak.frame as u32, (height - 1 - peak.bin) as u32, peak_color);
        }
    }

    img.save(path)
        .map_err(|e| EngineError::Render(format!("{}: {}", path.display(), e)))?;

    log::info!("Spectrogram image saved to {}", path.display());
    Ok(())
}

/// Root mean square of the magnitudes over the full matrix
fn matrix_rms(spectrogram: &Spectrogram) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for row in &spectrogram.rows {
        for c in row {
            let mag = c.norm() as f64;
            sum += mag * mag;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt() as f32
    }
}

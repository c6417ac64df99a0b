use std::path::Path;

use anyhow::{anyhow, Result};

use crate::types::PixelBuffer;

/// Write a BGRA capture to disk as an RGBA PNG, dropping row padding.
pub fn save_png(buf: &PixelBuffer, path: &Path) -> Result<()> {
    let row_bytes = (buf.width * 4) as usize;
    let mut rgba = Vec::with_capacity(row_bytes * buf.height as usize);
    for row in buf.data.chunks(buf.stride as usize).take(buf.height as usize) {
        for px in row[..row_bytes].chunks(4) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], 255]);
        }
    }
    let img = image::RgbaImage::from_raw(buf.width, buf.height, rgba)
        .ok_or_else(|| anyhow!("capture of {}x{} does not fill an image", buf.width, buf.height))?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    img.save(path)?;
    Ok(())
}

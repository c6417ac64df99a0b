use crate::pattern::MagicPattern;
use crate::types::PixelBuffer;

/// Like `memmem`, but only at pixel-aligned offsets and with every fourth
/// byte (alpha) matching anything.
fn find_pixels_ignoring_alpha(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .step_by(4)
        .find(|&i| {
            needle
                .iter()
                .enumerate()
                .all(|(j, b)| j % 4 == 3 || haystack[i + j] == *b)
        })
}

/// Locate the first (row-major) occurrence of `magic` in `buf` and return
/// its pixel coordinates as (x, y).
pub fn find_pattern(buf: &PixelBuffer, magic: &MagicPattern) -> Option<(u32, u32)> {
    if buf.stride == 0 {
        return None;
    }
    let len = (buf.stride as usize * buf.height as usize).min(buf.data.len());
    let offset = find_pixels_ignoring_alpha(&buf.data[..len], magic.as_bytes())?;
    let stride = buf.stride as usize;
    Some((((offset % stride) / 4) as u32, (offset / stride) as u32))
}

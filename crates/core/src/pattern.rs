use rand::Rng;

use crate::error::PatternError;
use crate::locate;
use crate::types::*;

/// The identifying first four pixels of a test pattern, BGRA with alpha 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicPattern([u8; MAGIC_BYTES]);

impl MagicPattern {
    /// Build from colour bytes; alpha positions are forced to 255.
    pub fn from_bytes(mut bytes: [u8; MAGIC_BYTES]) -> Self {
        for i in (3..MAGIC_BYTES).step_by(4) {
            bytes[i] = 255;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MAGIC_BYTES] {
        &self.0
    }

    /// A fresh random pattern that is not all-zero and differs from `avoid`.
    pub fn random_distinct(avoid: &MagicPattern) -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut bytes = [0u8; MAGIC_BYTES];
            rng.fill(&mut bytes[..]);
            let candidate = Self::from_bytes(bytes);
            let colour_is_zero = candidate
                .0
                .iter()
                .enumerate()
                .all(|(i, b)| i % 4 == 3 || *b == 0);
            if !colour_is_zero && candidate != *avoid {
                return candidate;
            }
        }
    }

    /// A pattern the way the test page picks one: a fixed six-byte prefix
    /// followed by six random bytes.
    pub fn for_page() -> Self {
        const PREFIX: [u8; 6] = [138, 54, 5, 45, 2, 197];
        let mut colour = [0u8; MAGIC_PIXELS * 3];
        colour[..PREFIX.len()].copy_from_slice(&PREFIX);
        rand::thread_rng().fill(&mut colour[PREFIX.len()..]);
        Self::from_colour(colour)
    }

    fn from_colour(colour: [u8; MAGIC_PIXELS * 3]) -> Self {
        let mut bytes = [255u8; MAGIC_BYTES];
        for (i, c) in colour.iter().enumerate() {
            bytes[i + i / 3] = *c;
        }
        Self(bytes)
    }

    /// Colour bytes in wire order (alpha skipped).
    fn colour_bytes(&self) -> [u8; MAGIC_PIXELS * 3] {
        let mut out = [0u8; MAGIC_PIXELS * 3];
        let mut j = 0;
        for (i, b) in self.0.iter().enumerate() {
            if i % 4 != 3 {
                out[j] = *b;
                j += 1;
            }
        }
        out
    }
}

/// Parse the 24-character hex form of a magic pattern. Case-insensitive.
pub fn decode_hex(text: &str) -> Result<MagicPattern, PatternError> {
    if text.len() != HEX_PATTERN_LEN {
        return Err(PatternError::Length {
            expected: HEX_PATTERN_LEN,
            actual: text.len(),
        });
    }
    let mut colour = [0u8; MAGIC_PIXELS * 3];
    hex::decode_to_slice(text, &mut colour)
        .map_err(|_| PatternError::InvalidHex(text.to_string()))?;

    Ok(MagicPattern::from_colour(colour))
}

/// Uppercase hex of the colour bytes, no separators.
pub fn encode_hex(pattern: &MagicPattern) -> String {
    hex::encode_upper(pattern.colour_bytes())
}

/// Full 8-pixel test pattern: magic followed by the data pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestPattern {
    pub magic: MagicPattern,
    pub javascript_frames: u8,
    pub key_down_events: u8,
    pub test_mode: TestMode,
    pub scroll_position: u8,
    pub css_frames: u8,
}

impl TestPattern {
    pub fn new(magic: MagicPattern, test_mode: TestMode) -> Self {
        Self {
            magic,
            javascript_frames: 0,
            key_down_events: 0,
            test_mode,
            scroll_position: 0,
            css_frames: 0,
        }
    }

    /// BGRA bytes of the whole pattern.
    pub fn to_bytes(&self) -> [u8; PATTERN_BYTES] {
        let mut out = [0u8; PATTERN_BYTES];
        out[..MAGIC_BYTES].copy_from_slice(self.magic.as_bytes());
        let data = &mut out[MAGIC_BYTES..];
        data[0] = self.javascript_frames;
        data[1] = self.key_down_events;
        data[2] = self.test_mode.to_byte();
        data[4] = self.scroll_position;
        data[8] = self.css_frames;
        for i in (3..data.len()).step_by(4) {
            data[i] = 255;
        }
        out
    }

    /// Paint the pattern into `buf` with its first pixel at (x, y), clipped
    /// to the buffer. Coordinates are relative to the buffer's origin and may
    /// be negative.
    pub fn paint(&self, buf: &mut PixelBuffer, x: i64, y: i64) {
        if y < 0 || y >= buf.height as i64 {
            return;
        }
        let bytes = self.to_bytes();
        for (i, px) in bytes.chunks(4).enumerate() {
            let px_x = x + i as i64;
            if px_x < 0 || px_x >= buf.width as i64 {
                continue;
            }
            let off = buf.offset(px_x as u32, y as u32);
            buf.data[off..off + 4].copy_from_slice(px);
        }
    }
}

/// Decode a measurement from an 8x1 capture of the pattern region. Fails when
/// the capture has the wrong size or the magic pattern is not exactly at its
/// first pixel.
pub fn decode_measurement(capture: &PixelBuffer, magic: &MagicPattern) -> Option<Measurement> {
    if capture.width as usize != PATTERN_PIXELS || capture.height != 1 || capture.data.len() < PATTERN_BYTES {
        return None;
    }
    if locate::find_pattern(capture, magic)? != (0, 0) {
        return None;
    }
    let data = &capture.data[MAGIC_BYTES..];
    Some(Measurement {
        screenshot_time: capture.time_ns,
        javascript_frames: data[0],
        key_down_events: data[1],
        test_mode: TestMode::from_byte(data[2]),
        scroll_position: data[4],
        css_frames: data[8],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HEX: &str = "8A36052D02C596DFA4C80711";

    fn strip(capture: &TestPattern, time_ns: i64) -> PixelBuffer {
        let mut buf = PixelBuffer::black(PATTERN_PIXELS as u32, 1, PATTERN_BYTES as u32, time_ns);
        capture.paint(&mut buf, 0, 0);
        buf
    }

    #[test]
    fn hex_round_trip() {
        let p = decode_hex(SAMPLE_HEX).unwrap();
        assert_eq!(encode_hex(&p), SAMPLE_HEX);
        assert_eq!(&p.as_bytes()[..4], &[0x8A, 0x36, 0x05, 255]);
        assert_eq!(&p.as_bytes()[12..], &[0xA4, 0xC8, 0x07, 255]);
    }

    #[test]
    fn hex_is_case_insensitive() {
        let lower = decode_hex(&SAMPLE_HEX.to_lowercase()).unwrap();
        assert_eq!(lower, decode_hex(SAMPLE_HEX).unwrap());
    }

    #[test]
    fn alpha_forced_opaque() {
        let p = MagicPattern::from_bytes([7; MAGIC_BYTES]);
        let decoded = decode_hex(&encode_hex(&p)).unwrap();
        assert_eq!(decoded, p);
        assert!(decoded.as_bytes().iter().skip(3).step_by(4).all(|a| *a == 255));
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert_eq!(
            decode_hex("8A36"),
            Err(PatternError::Length { expected: 24, actual: 4 })
        );
        assert!(decode_hex(&format!("{}0", SAMPLE_HEX)).is_err());
        assert!(matches!(
            decode_hex("8A36052D02C596DFA4C807zz"),
            Err(PatternError::InvalidHex(_))
        ));
        assert!(decode_hex("+A36052D02C596DFA4C80711").is_err());
    }

    #[test]
    fn random_pattern_is_fresh() {
        let input = decode_hex(SAMPLE_HEX).unwrap();
        let p = MagicPattern::random_distinct(&input);
        assert_ne!(p, input);
        assert!(p.as_bytes().iter().skip(3).step_by(4).all(|a| *a == 255));
    }

    #[test]
    fn page_pattern_prefix() {
        let p = MagicPattern::for_page();
        assert!(encode_hex(&p).starts_with("8A36052D02C5"));
    }

    #[test]
    fn measurement_from_strip() {
        let magic = decode_hex(SAMPLE_HEX).unwrap();
        let mut pattern = TestPattern::new(magic, TestMode::ScrollLatency);
        pattern.javascript_frames = 200;
        pattern.key_down_events = 3;
        pattern.scroll_position = 17;
        pattern.css_frames = 255;
        let m = decode_measurement(&strip(&pattern, 42), &magic).unwrap();
        assert_eq!(m.screenshot_time, 42);
        assert_eq!(m.javascript_frames, 200);
        assert_eq!(m.key_down_events, 3);
        assert_eq!(m.scroll_position, 17);
        assert_eq!(m.css_frames, 255);
        assert_eq!(m.test_mode, TestMode::ScrollLatency);
    }

    #[test]
    fn measurement_rejects_drift_and_size() {
        let magic = decode_hex(SAMPLE_HEX).unwrap();
        let pattern = TestPattern::new(magic, TestMode::JavascriptLatency);

        let mut shifted = PixelBuffer::black(PATTERN_PIXELS as u32, 1, PATTERN_BYTES as u32, 0);
        pattern.paint(&mut shifted, 1, 0);
        assert!(decode_measurement(&shifted, &magic).is_none());

        let mut wide = PixelBuffer::black(9, 1, 36, 0);
        pattern.paint(&mut wide, 0, 0);
        assert!(decode_measurement(&wide, &magic).is_none());

        let other = MagicPattern::random_distinct(&magic);
        assert!(decode_measurement(&strip(&pattern, 0), &other).is_none());
    }

    #[test]
    fn measurement_rejects_short_buffer() {
        let magic = decode_hex(SAMPLE_HEX).unwrap();
        let mut buf = strip(&TestPattern::new(magic, TestMode::JavascriptLatency), 0);
        // Magic intact, data pixels cut off.
        buf.data.truncate(MAGIC_BYTES + 4);
        assert!(decode_measurement(&buf, &magic).is_none());
        buf.data.clear();
        assert!(decode_measurement(&buf, &magic).is_none());
    }
}

//! Output targets for decoded text.

/// Growable text buffer the decoder appends scalar values to.
///
/// `len` counts output units in the sink's own encoding (bytes for
/// `String`, UTF-16 code units for `Vec<u16>`).
pub trait Utf8Sink {
    fn push_char(&mut self, c: char);

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push_char(c);
        }
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the buffered text.
    fn to_text(&self) -> String;

    fn clear(&mut self);
}

impl Utf8Sink for String {
    fn push_char(&mut self, c: char) {
        self.push(c);
    }

    fn push_str(&mut self, s: &str) {
        String::push_str(self, s);
    }

    fn len(&self) -> usize {
        String::len(self)
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn clear(&mut self) {
        String::clear(self);
    }
}

/// UTF-16 units; scalars above U+FFFF become a surrogate pair.
impl Utf8Sink for Vec<u16> {
    fn push_char(&mut self, c: char) {
        let mut units = [0u16; 2];
        self.extend_from_slice(c.encode_utf16(&mut units));
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn to_text(&self) -> String {
        String::from_utf16_lossy(self)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

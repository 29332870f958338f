//! Turns a binary model file into a C header so the bytes can be compiled
//! straight into a firmware image.
//!
//! The emitted header contains a single `const uint8_t` array with one hex
//! literal per input byte, plus a length constant, and nothing else. The
//! array decodes back to the input byte-for-byte.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Array name the firmware side expects.
pub const DEFAULT_ARRAY_NAME: &str = "g_model";

const BYTES_PER_LINE: usize = 12;

/// Writes the C header for `bytes` to `w`.
///
/// # Arguments
/// * `w` - Where the header text goes.
/// * `bytes` - The raw model blob.
/// * `array_name` - Identifier used for the array and its `_len` constant.
///
/// # Errors
/// Propagates any error from the underlying writer.
pub fn write_header<W: Write>(mut w: W, bytes: &[u8], array_name: &str) -> io::Result<()> {
    writeln!(w, "#include <stdint.h>")?;
    writeln!(w)?;
    writeln!(w, "const uint8_t {array_name}[] = {{")?;

    for chunk in bytes.chunks(BYTES_PER_LINE) {
        let literals: Vec<String> = chunk.iter().map(|b| format!("0x{b:02x}")).collect();
        writeln!(w, "    {},", literals.join(", "))?;
    }

    writeln!(w, "}};")?;
    writeln!(w, "const uint32_t {array_name}_len = {};", bytes.len())?;

    Ok(())
}

/// Reads `input` fully into memory and writes the header to `output`.
///
/// # Returns
/// The number of embedded bytes.
///
/// # Errors
/// Propagates the underlying I/O error untouched, e.g. when `input` is
/// missing. No partial-output cleanup is attempted.
pub fn generate<P, Q>(input: P, output: Q, array_name: &str) -> io::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let bytes = fs::read(input)?;

    let file = fs::File::create(output)?;
    let mut writer = io::BufWriter::new(file);
    write_header(&mut writer, &bytes, array_name)?;
    writer.flush()?;

    Ok(bytes.len())
}

#[cfg(test)]
mod test {
    use super::*;

    /// Parses the hex literals of the (single) array initializer back into bytes.
    fn decode_array(header: &str) -> Vec<u8> {
        let (_, body) = header.split_once('{').unwrap();
        let (body, _) = body.rsplit_once('}').unwrap();

        body.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                let t = t.strip_prefix("0x").unwrap();
                u8::from_str_radix(t, 16).unwrap()
            })
            .collect()
    }

    fn render(bytes: &[u8]) -> String {
        let mut out = Vec::new();
        write_header(&mut out, bytes, DEFAULT_ARRAY_NAME).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn array_decodes_back_to_input() {
        let bytes: Vec<u8> = (0..=255).collect();
        let header = render(&bytes);

        assert_eq!(decode_array(&header), bytes);
    }

    #[test]
    fn arbitrary_blob_roundtrips() {
        let bytes = [0x1c, 0x00, 0xff, 0x7f, 0x80, 0x0a, 0x0a, 0x2c];
        let header = render(&bytes);

        assert_eq!(decode_array(&header), bytes);
    }

    #[test]
    fn exactly_one_array_declaration() {
        let header = render(&[1, 2, 3]);

        assert_eq!(header.matches("[] = {").count(), 1);
        assert_eq!(decode_array(&header).len(), 3);
    }

    #[test]
    fn length_constant_matches_input() {
        let bytes = vec![0u8; 137];
        let header = render(&bytes);

        assert!(header.contains("const uint32_t g_model_len = 137;"));
    }

    #[test]
    fn includes_stdint() {
        let header = render(&[]);

        assert!(header.starts_with("#include <stdint.h>\n"));
    }

    #[test]
    fn empty_input_yields_empty_array() {
        let header = render(&[]);

        assert_eq!(decode_array(&header), Vec::<u8>::new());
        assert!(header.contains("const uint32_t g_model_len = 0;"));
    }

    #[test]
    fn literals_are_two_digit_lowercase_hex() {
        let header = render(&[0x0, 0xAB]);

        assert!(header.contains("0x00"));
        assert!(header.contains("0xab"));
        assert!(!header.contains("0xAB"));
    }
}

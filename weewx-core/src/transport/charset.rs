//! ISO-8859-15 (Latin-9) decoding.
//!
//! Latin-9 is Latin-1 with eight code points replaced, so the mapping is a
//! short override table on top of the identity byte-to-char conversion.

const OVERRIDES: [(u8, char); 8] = [
    (0xa4, '€'),
    (0xa6, 'Š'),
    (0xa8, 'š'),
    (0xb4, 'Ž'),
    (0xb8, 'ž'),
    (0xbc, 'Œ'),
    (0xbd, 'œ'),
    (0xbe, 'Ÿ'),
];

pub fn latin9_to_utf8(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| latin9_char(b)).collect()
}

fn latin9_char(byte: u8) -> char {
    OVERRIDES
        .iter()
        .find_map(|&(code, ch)| (code == byte).then_some(ch))
        .unwrap_or(char::from(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(latin9_to_utf8(b"Madrid 21C"), "Madrid 21C");
    }

    #[test]
    fn latin9_specific_code_points() {
        assert_eq!(latin9_to_utf8(&[0xa4, 0xbc, 0xbe]), "€ŒŸ");
    }

    #[test]
    fn shared_latin1_code_points() {
        assert_eq!(latin9_to_utf8(&[0xe1, 0xe9, 0xf1, 0xb0]), "áéñ°");
    }
}

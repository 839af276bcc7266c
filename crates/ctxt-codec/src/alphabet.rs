//! GSM 03.38 default alphabet, one `char` per septet value.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Septet value to symbol. Index 27 carries `|` where GSM has ESC.
#[rustfmt::skip]
pub const ALPHABET: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å',
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '|', 'Æ', 'æ', 'ß', 'É',
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§',
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

static REVERSE: LazyLock<HashMap<char, u8>> = LazyLock::new(|| {
    ALPHABET
        .iter()
        .enumerate()
        .map(|(septet, &symbol)| (symbol, septet as u8))
        .collect()
});

/// Symbol for a septet value. Only the low 7 bits are used.
#[inline]
pub fn symbol_for(septet: u8) -> char {
    ALPHABET[usize::from(septet & 0x7F)]
}

/// Septet value for a symbol, or `None` if it is not in the alphabet.
#[inline]
pub fn septet_for(symbol: char) -> Option<u8> {
    REVERSE.get(&symbol).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_a_bijection() {
        assert_eq!(REVERSE.len(), 128);
        for septet in 0..128u8 {
            assert_eq!(septet_for(symbol_for(septet)), Some(septet));
        }
    }

    #[test]
    fn landmarks() {
        assert_eq!(symbol_for(0), '@');
        assert_eq!(symbol_for(32), ' ');
        assert_eq!(symbol_for(48), '0');
        assert_eq!(symbol_for(65), 'A');
        assert_eq!(symbol_for(97), 'a');
        assert_eq!(symbol_for(127), 'à');
    }

    #[test]
    fn rejects_symbols_outside_the_table() {
        for symbol in ['~', '[', ']', '€', '^', '{', '\t', '\u{0}'] {
            assert_eq!(septet_for(symbol), None, "{symbol:?}");
        }
    }
}

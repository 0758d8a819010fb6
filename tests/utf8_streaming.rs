//! Streaming decoder properties.

use proptest::prelude::*;

use wsgate::utf8::{DecodeEvent, Utf8Decoder, Utf8Error, Utf8StringBuilder};

fn decode_bytewise(bytes: &[u8]) -> (String, bool) {
    let mut decoder = Utf8Decoder::lenient(String::new());
    for &b in bytes {
        decoder.decode_byte(b).unwrap();
    }
    let complete = decoder.is_sequence_complete();
    (decoder.into_sink(), complete)
}

proptest! {
    #[test]
    fn chunking_does_not_change_output(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let (expected, expected_complete) = decode_bytewise(&bytes);

        let mut cut_points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        cut_points.sort_unstable();
        let mut decoder = Utf8Decoder::lenient(String::new());
        let mut start = 0;
        for cut in cut_points.into_iter().chain(std::iter::once(bytes.len())) {
            decoder.feed(&bytes[start..cut]).unwrap();
            start = cut;
        }

        prop_assert_eq!(decoder.is_sequence_complete(), expected_complete);
        prop_assert_eq!(decoder.into_sink(), expected);
    }

    #[test]
    fn well_formed_text_round_trips(text in "\\PC*") {
        let mut decoder = Utf8StringBuilder::default();
        for &b in text.as_bytes() {
            let event = decoder.decode_byte(b).unwrap();
            prop_assert!(!matches!(event, DecodeEvent::Invalid(_)));
        }
        prop_assert!(decoder.finish().is_ok());
        prop_assert_eq!(decoder.take_partial_string(), text);
    }

    #[test]
    fn strict_matches_std_validation(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut decoder = Utf8StringBuilder::default();
        let decoded = decoder.feed(&bytes).and_then(|()| decoder.finish());
        prop_assert_eq!(decoded.is_ok(), std::str::from_utf8(&bytes).is_ok());
    }

    #[test]
    fn truncated_sequence_gives_one_placeholder(c in any::<char>().prop_filter("multi-byte", |c| c.len_utf8() > 1)) {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf).as_bytes();
        let truncated = &encoded[..encoded.len() - 1];

        let mut lenient = Utf8Decoder::lenient(String::new());
        lenient.feed(truncated).unwrap();
        prop_assert!(!lenient.is_sequence_complete());
        prop_assert!(lenient.finish().is_ok());
        prop_assert!(lenient.is_sequence_complete());
        prop_assert_eq!(lenient.into_sink(), "\u{FFFD}");

        let mut strict = Utf8StringBuilder::default();
        strict.feed(truncated).unwrap();
        let incomplete = matches!(strict.finish(), Err(Utf8Error::IncompleteSequence { .. }));
        prop_assert!(incomplete);
        prop_assert!(strict.is_sequence_complete());
        prop_assert_eq!(strict.partial_string(), "\u{FFFD}");
    }
}

#[test]
fn test_take_partial_string_across_boundary() {
    let mut decoder = Utf8StringBuilder::default();
    decoder.feed(&[b'a', 0xE2, 0x9C]).unwrap();
    assert_eq!(decoder.take_partial_string(), "a");
    assert!(!decoder.is_sequence_complete());

    decoder.feed(&[0x93]).unwrap();
    assert_eq!(decoder.take_partial_string(), "✓");
}

#[test]
fn test_reset_starts_fresh() {
    let mut decoder = Utf8StringBuilder::default();
    decoder.feed(&[0xF0, 0x9F]).unwrap();
    decoder.reset();
    decoder.feed(b"ok").unwrap();
    assert!(decoder.finish().is_ok());
    assert_eq!(decoder.partial_string(), "ok");
}

#[test]
fn test_utf16_sink_counts_code_units() {
    let mut decoder = Utf8Decoder::new(Vec::<u16>::new());
    decoder.feed("a😀".as_bytes()).unwrap();
    assert_eq!(decoder.len(), 3);
    assert_eq!(decoder.partial_string(), "a😀");
}

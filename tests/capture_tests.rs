// Tests for the capture frame codec: float-to-PCM scaling, clamping at the
// 16-bit range, and payload decoding.

use base64::Engine;
use dukaan_voice::{decode_pcm, encode_block};

#[test]
fn test_scaling_matches_16_bit_pcm() {
    let decoded = decode_pcm(&encode_block(&[0.0, 0.5, -0.5, 0.25])).unwrap();
    assert_eq!(decoded, vec![0, 16384, -16384, 8192]);
}

#[test]
fn test_full_scale_and_overdriven_samples_clamp() {
    // +1.0 scales to 32768, one past i16::MAX; it must clamp, not wrap.
    let decoded = decode_pcm(&encode_block(&[1.0, -1.0, 2.0, -3.0])).unwrap();
    assert_eq!(decoded, vec![i16::MAX, i16::MIN, i16::MAX, i16::MIN]);
}

#[test]
fn test_decode_rejects_invalid_base64() {
    assert!(decode_pcm("not base64!!!").is_err());
}

#[test]
fn test_decode_discards_trailing_odd_byte() {
    let payload = base64::engine::general_purpose::STANDARD.encode([0x34, 0x12, 0x7f]);
    assert_eq!(decode_pcm(&payload).unwrap(), vec![0x1234]);
}

#[test]
fn test_empty_block_encodes_to_empty_payload() {
    let payload = encode_block(&[]);
    assert!(payload.is_empty());
    assert!(decode_pcm(&payload).unwrap().is_empty());
}

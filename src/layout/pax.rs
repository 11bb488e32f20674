//! PAX extended-header record framing (spec §4.1 "PAX encoding"/"PAX
//! decoding").
//!
//! A record is one line `"<size> <key>=<value>\n"` where `<size>` is the
//! decimal byte length of the whole line, itself included. The size is
//! self-referential (it counts its own digits), so encoding needs a small
//! fixed-point iteration.

use crate::error::{Result, TarError};
use num_traits::Num;

/// Encodes one `key=value` pair as a complete, self-consistent PAX record.
pub fn encode_record(key: &str, value: &str) -> Vec<u8> {
    // Length of "<key>=<value>\n" plus the one space separating the size
    // field from the rest of the line.
    let base = key.len() + 1 + value.len() + 1 + 1;

    let mut size = base + digit_count(base as u64);
    loop {
        let candidate = base + digit_count(size as u64);
        if candidate == size {
            break;
        }
        size = candidate;
    }

    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(size.to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(key.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value.as_bytes());
    out.push(b'\n');
    debug_assert_eq!(out.len(), size, "PAX record size did not stabilize");
    out
}

/// Encodes a single `path` override, the only key this codec writes.
pub fn encode_path_record(path: &str) -> Vec<u8> {
    encode_record("path", path)
}

fn digit_count(mut n: u64) -> usize {
    if n == 0 {
        return 1;
    }
    let mut count = 0;
    while n > 0 {
        count += 1;
        n /= 10;
    }
    count
}

/// Decodes every `key=value` record out of a complete PAX payload,
/// preserving unrecognized keys (spec §4.1: "Unknown keys are retained as
/// strings").
pub fn decode_records(mut data: &[u8]) -> Result<Vec<(String, String)>> {
    let mut records = Vec::new();
    while !data.is_empty() {
        let space = memchr::memchr(b' ', data).ok_or_else(|| {
            TarError::InvalidHeader("malformed PAX record: missing size separator".into())
        })?;
        let size_text = core::str::from_utf8(&data[..space])
            .map_err(|_| TarError::InvalidHeader("non-UTF-8 PAX size field".into()))?;
        let size = <u64 as Num>::from_str_radix(size_text, 10)
            .map_err(|_| TarError::InvalidHeader(format!("malformed PAX size {size_text:?}")))?
            as usize;

        if size < space + 1 || size > data.len() {
            return Err(TarError::InvalidHeader(format!(
                "PAX record size {size} out of bounds"
            )));
        }

        let body = &data[space + 1..size];
        let body = body
            .strip_suffix(b"\n")
            .ok_or_else(|| TarError::InvalidHeader("PAX record missing newline".into()))?;
        let body_str = core::str::from_utf8(body)
            .map_err(|_| TarError::InvalidHeader("non-UTF-8 PAX record body".into()))?;
        let eq = body_str
            .find('=')
            .ok_or_else(|| TarError::InvalidHeader("PAX record missing '='".into()))?;
        records.push((body_str[..eq].to_string(), body_str[eq + 1..].to_string()));

        data = &data[size..];
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_size_is_self_consistent() {
        for (key, value) in [
            ("path", "short"),
            ("path", &"x".repeat(90)),
            ("path", &"y".repeat(300)),
            ("mtime", "1700000000"),
        ] {
            let record = encode_record(key, value);
            let text = core::str::from_utf8(&record).unwrap();
            let space = text.find(' ').unwrap();
            let declared: usize = text[..space].parse().unwrap();
            assert_eq!(declared, record.len(), "key={key} value_len={}", value.len());
        }
    }

    #[test]
    fn round_trips_single_record() {
        let record = encode_path_record("some/long/path.txt");
        let decoded = decode_records(&record).unwrap();
        assert_eq!(decoded, vec![("path".to_string(), "some/long/path.txt".to_string())]);
    }

    #[test]
    fn round_trips_multiple_records_back_to_back() {
        let mut data = encode_record("path", "a.txt");
        data.extend(encode_record("comment", "hello world"));
        let decoded = decode_records(&data).unwrap();
        assert_eq!(
            decoded,
            vec![
                ("path".to_string(), "a.txt".to_string()),
                ("comment".to_string(), "hello world".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_missing_newline() {
        let mut record = encode_path_record("x");
        record.pop();
        assert!(decode_records(&record).is_err());
    }
}

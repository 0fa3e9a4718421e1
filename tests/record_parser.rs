use srec_bootloader::protocol::{self, RecordKind, SrecError};

/// Builds an S1 record with a correct checksum.
fn s1(address: u16, data: &[u8]) -> String {
    let mut bytes = vec![(data.len() + 3) as u8];
    bytes.extend_from_slice(&address.to_be_bytes());
    bytes.extend_from_slice(data);
    let checksum = !bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
    bytes.push(checksum);

    let digits: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    format!("S1{}\n", digits)
}

#[test]
fn image_lines_decode_to_consecutive_words() {
    let image: Vec<u8> = (0u8..32).collect();
    let mut programmed = Vec::new();

    for (i, chunk) in image.chunks(16).enumerate() {
        let line = s1((i * 16) as u16, chunk);
        let record = protocol::parse(line.as_bytes()).unwrap();
        let base = record.load_address().unwrap();

        for (n, word) in record.words().enumerate() {
            programmed.push((base + 4 * n as u32, word.unwrap()));
        }
    }

    assert_eq!(programmed.len(), 8);
    assert_eq!(programmed[0], (0x00, [0, 1, 2, 3]));
    assert_eq!(programmed[7], (0x1C, [28, 29, 30, 31]));
}

#[test]
fn typical_toolchain_output_parses() {
    let lines: [&[u8]; 3] = [
        b"S00600004844521B\r\n",
        b"S10B0000AABBCCDD112233443C\r\n",
        b"S9030000FC\r\n",
    ];
    let kinds: Vec<_> = lines
        .iter()
        .map(|line| protocol::parse(line).unwrap().kind())
        .collect();

    assert_eq!(
        kinds,
        vec![RecordKind::Header, RecordKind::Data16, RecordKind::Start16]
    );
}

#[test]
fn every_single_digit_corruption_is_caught() {
    let line = s1(0x0100, &[0x0C, 0x94, 0x46, 0x00]);
    let original = line.as_bytes();

    // Count, address and data digits; the trailing checksum and LF are left alone
    for i in 2..original.len() - 3 {
        let mut corrupted = original.to_vec();
        corrupted[i] = if corrupted[i] == b'F' { b'E' } else { b'F' };
        assert!(
            protocol::parse(&corrupted).is_err(),
            "corruption at {} accepted",
            i
        );
    }
}

#[test]
fn failure_reasons_are_reported_by_name() {
    assert_eq!(SrecError::ChecksumMismatch.to_string(), "checksum mismatch");
    assert_eq!(SrecError::Syntax.to_string(), "syntax error");
}

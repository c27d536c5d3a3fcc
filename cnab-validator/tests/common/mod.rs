//! Fixture builders for 400-byte CNAB400 records

#![allow(dead_code)]

/// Builds one record by writing text at 1-based positions
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    chars: Vec<char>,
}

impl RecordBuilder {
    /// Blank record of the given type
    pub fn new(record_type: char) -> Self {
        let mut chars = vec![' '; 400];
        chars[0] = record_type;
        Self { chars }
    }

    /// Overwrite text starting at 1-based `start`
    pub fn put(mut self, start: usize, text: &str) -> Self {
        for (i, c) in text.chars().enumerate() {
            self.chars[start - 1 + i] = c;
        }
        self
    }

    /// Sequence number at 395-400
    pub fn sequence(self, n: u64) -> Self {
        self.put(395, &format!("{:06}", n))
    }

    pub fn build(self) -> String {
        self.chars.into_iter().collect()
    }
}

/// Well-formed header for bank 237
pub fn header(seq: u64) -> RecordBuilder {
    RecordBuilder::new('0')
        .put(2, "1")
        .put(3, "REMESSA")
        .put(10, "01")
        .put(12, "COBRANCA")
        .put(27, "00000000000000123456")
        .put(47, "EMPRESA TESTE LTDA")
        .put(77, "237")
        .put(80, "BRADESCO")
        .put(95, "150324")
        .put(111, "0000001")
        .sequence(seq)
}

/// Well-formed detail: R$ 100,00, issued 15/03/24, due 15/04/24, valid DV
pub fn detail(seq: u64) -> RecordBuilder {
    RecordBuilder::new('1')
        .put(21, "00090123400123456")
        .put(66, "0")
        .put(67, "0000")
        .put(71, "123456789018")
        .put(121, "150424")
        .put(127, "0000000010000")
        .put(143, "00000")
        .put(148, "01")
        .put(150, "N")
        .put(151, "150324")
        // valor_iof 214-226 shares 220-226 with the payer document
        .put(214, "0000000000000")
        .put(221, "00000012345678")
        .put(235, "FULANO DE TAL")
        .put(275, "RUA DAS FLORES 100")
        .put(315, "01001000")
        .sequence(seq)
}

/// Trailer declaring record count, detail count and principal in cents
pub fn trailer(seq: u64, total_records: u64, details: u64, principal_cents: u64) -> RecordBuilder {
    RecordBuilder::new('9')
        .put(2, &format!("{:06}", total_records))
        .put(8, &format!("{:06}", details))
        .put(14, &format!("{:013}", principal_cents))
        .sequence(seq)
}

/// Header, one detail and a matching trailer
pub fn well_formed() -> Vec<String> {
    vec![header(1).build(), detail(2).build(), trailer(3, 3, 1, 10000).build()]
}

/// Join records with CRLF terminators
pub fn file(lines: &[String]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend(line.chars().map(|c| c as u8));
        bytes.extend_from_slice(b"\r\n");
    }
    bytes
}

use crate::domain::transaction::TransactionRecord;
use crate::error::Result;
use std::io::Write;

const HEADER: [&str; 8] = [
    "id",
    "amount",
    "approved",
    "auth_code",
    "masked_pan",
    "rrn",
    "unix_timestamp",
    "nonce",
];

/// Writes ledger records as CSV.
///
/// The header row is always emitted, so an empty ledger still yields a
/// well-formed document.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        Self { writer }
    }

    pub fn write_records(&mut self, records: &[TransactionRecord]) -> Result<()> {
        self.writer.write_record(HEADER)?;
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::Amount;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_records() {
        let records = vec![
            TransactionRecord {
                id: 2,
                amount: Amount::new(dec!(99.99)),
                approved: false,
                auth_code: String::new(),
                masked_pan: String::new(),
                rrn: String::new(),
                unix_timestamp: 1_700_000_000,
                nonce: "A1B2C3D4".to_string(),
            },
            TransactionRecord {
                id: 1,
                amount: Amount::new(dec!(12.34)),
                approved: true,
                auth_code: "123456".to_string(),
                masked_pan: "************1111".to_string(),
                rrn: "000000000042".to_string(),
                unix_timestamp: 1_700_000_000,
                nonce: "A1B2C3D4".to_string(),
            },
        ];

        let mut out = Vec::new();
        RecordWriter::new(&mut out).write_records(&records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "id,amount,approved,auth_code,masked_pan,rrn,unix_timestamp,nonce"
        );
        assert_eq!(lines[1], "2,99.99,false,,,,1700000000,A1B2C3D4");
        assert_eq!(
            lines[2],
            "1,12.34,true,123456,************1111,000000000042,1700000000,A1B2C3D4"
        );
    }

    #[test]
    fn test_empty_ledger_has_header() {
        let mut out = Vec::new();
        RecordWriter::new(&mut out).write_records(&[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,amount,approved,auth_code,masked_pan,rrn,unix_timestamp,nonce\n"
        );
    }
}

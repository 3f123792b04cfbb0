use std::io::Write;
use tempfile::NamedTempFile;

pub const HEADER: &str = "command, transaction_id, customer_id, merchant_id, amount, billing_zip, shipping_zip, device_fingerprint, timestamp";

/// Writes `rows` under the standard header into a temporary CSV file.
pub fn requests_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// `count` daytime authorizations of a small amount for `customer`, which
/// build up velocity without adding risk of their own.
pub fn warm_up_rows(customer: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!("authorize, {customer}-warm-{i}, {customer}, merch_1, 10, , , , 2026-05-04T12:00:00Z")
        })
        .collect()
}

//! Reading measured execution time out of EXPLAIN ANALYZE text output.

/// Find the `Execution Time` line of an EXPLAIN ANALYZE report and return its value in
/// milliseconds.
///
/// The first number on the line is taken, so `"Execution Time: 12.345 ms"` yields
/// `12.345`. Returns `None` if there is no such line or it holds no number.
pub fn parse_execution_time(explain: &str) -> Option<f64> {
    explain
        .lines()
        .find(|line| line.contains("Execution Time"))
        .and_then(first_number)
}

fn first_number(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let is_sign = |b: u8| b == b'-' || b == b'+';
    let start = (0..bytes.len()).find(|&i| {
        bytes[i].is_ascii_digit()
            || (is_sign(bytes[i]) && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    })?;

    let mut end = start + 1;
    while let Some(&b) = bytes.get(end) {
        let exponent_sign = is_sign(b) && matches!(bytes[end - 1], b'e' | b'E');
        if !(b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || exponent_sign) {
            break;
        }
        end += 1;
    }
    line[start..end].parse().ok()
}

/// Formats bytes as uppercase hexadecimal pairs separated by spaces.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }

    let mut rendered = String::with_capacity(bytes.len().saturating_mul(3));
    for (index, value) in bytes.iter().enumerate() {
        if index > 0 {
            rendered.push(' ');
        }
        let high = value >> 4;
        let low = value & 0x0F;
        rendered.push(nibble_to_hex(high));
        rendered.push(nibble_to_hex(low));
    }
    rendered
}

/// Renders frame bytes as text with control characters escaped (`OK\r\r>`).
///
/// Bytes that are not valid UTF-8 are rendered as `\xNN`.
pub(crate) fn escape_frame(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        rendered.extend(chunk.valid().escape_debug());
        for invalid in chunk.invalid() {
            rendered.push_str("\\x");
            rendered.push(nibble_to_hex(invalid >> 4));
            rendered.push(nibble_to_hex(invalid & 0x0F));
        }
    }
    rendered
}

fn nibble_to_hex(value: u8) -> char {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    HEX[value as usize] as char
}

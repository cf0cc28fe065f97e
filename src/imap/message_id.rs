/// Extracts the Message-ID value from a header block as returned by
/// `BODY.PEEK[HEADER.FIELDS (MESSAGE-ID)]`.
///
/// Servers fold long header lines, so continuation lines starting with
/// whitespace belong to the value. Whitespace inside the folded value is
/// collapsed away because the id itself never contains any.
pub fn parse_message_id(header: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(header);
    let mut value = String::new();
    let mut in_field = false;
    for line in text.lines() {
        if in_field {
            if line.starts_with(' ') || line.starts_with('\t') {
                value.push_str(line.trim());
                continue;
            }
            break;
        }
        if let Some(rest) = strip_field_name(line) {
            value.push_str(rest.trim());
            in_field = true;
        }
    }
    let value: String = value.split_whitespace().collect();
    if value.is_empty() { None } else { Some(value) }
}

fn strip_field_name(line: &str) -> Option<&str> {
    let (name, rest) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case("message-id") {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::plain(b"Message-ID: <abc@example.com>\r\n\r\n", "<abc@example.com>")]
    #[case::lower_case(b"message-id: <abc@example.com>\r\n", "<abc@example.com>")]
    #[case::folded(
        b"Message-ID:\r\n <very-long-id@mail.example.com>\r\n\r\n",
        "<very-long-id@mail.example.com>"
    )]
    fn test_parse_message_id(#[case] header: &[u8], #[case] expected: &str) {
        let id = assert_some!(parse_message_id(header));
        assert_eq!(expected, id);
    }

    #[rstest]
    #[case::empty_block(b"" as &[u8])]
    #[case::other_field(b"Subject: hello\r\n\r\n" as &[u8])]
    #[case::empty_value(b"Message-ID:\r\n\r\n" as &[u8])]
    fn test_parse_message_id_absent(#[case] header: &[u8]) {
        assert_none!(parse_message_id(header));
    }
}

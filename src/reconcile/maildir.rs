use jiff::Zoned;

/// Separators skipped when picking the path segment characters.
const SEPARATORS: &[char] = &['.', '_', '-'];

/// Derive the nested maildir path for a mailbox local part, as
/// `seg1/seg2/seg3/<local>-<timestamp>/`. The timestamp is fixed at first
/// creation and never regenerated for later updates of the same user.
pub fn derive_maildir_path(local_part: &str, created: &Zoned) -> String {
    let (seg1, seg2, seg3) = path_segments(local_part);
    let timestamp = created.strftime("%Y.%m.%d.%H.%M.%S");
    format!("{seg1}/{seg2}/{seg3}/{local_part}-{timestamp}/")
}

/// Up to three significant characters of the local part, with short names
/// padded by repeating the last available character.
fn path_segments(local_part: &str) -> (char, char, char) {
    let mut significant = local_part.chars().filter(|c| !SEPARATORS.contains(c));
    let Some(first) = significant.next() else {
        // Degenerate local part made of separators only; fall back to the
        // raw first character.
        let c = local_part.chars().next().unwrap_or('_');
        return (c, c, c);
    };
    match (significant.next(), significant.next()) {
        (Some(second), Some(third)) => (first, second, third),
        (Some(second), None) => (first, second, second),
        (None, _) => (first, first, first),
    }
}

/// Storage attributes synthesized for a newly created user. `storage_base`
/// is the configured storage root whose last path component names the
/// storage node (e.g. `/var/vmail/vmail1`).
pub fn storage_attributes(
    storage_base: &str,
    local_part: &str,
    created: &Zoned,
) -> [(&'static str, String); 3] {
    let trimmed = storage_base.trim_end_matches('/');
    let (base, node) = trimmed
        .rsplit_once('/')
        .unwrap_or(("", trimmed));
    let maildir = derive_maildir_path(local_part, created);

    [
        ("homeDirectory", format!("{storage_base}/{maildir}")),
        ("mailMessageStore", format!("{node}/{maildir}")),
        ("storageBaseDirectory", base.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn creation_time() -> Zoned {
        assert_ok!("2024-05-04T03:02:01[UTC]".parse())
    }

    #[rstest]
    #[case("john", ('j', 'o', 'h'))]
    #[case("ab", ('a', 'b', 'b'))]
    #[case("a", ('a', 'a', 'a'))]
    #[case("j.doe", ('j', 'd', 'o'))]
    #[case("j_d", ('j', 'd', 'd'))]
    #[case("-x", ('x', 'x', 'x'))]
    #[case("...", ('.', '.', '.'))]
    fn test_path_segments(#[case] local: &str, #[case] expected: (char, char, char)) {
        assert_eq!(expected, path_segments(local));
    }

    #[rstest]
    fn test_derive_maildir_path_embeds_second_resolution_timestamp() {
        let path = derive_maildir_path("j.doe", &creation_time());
        assert_eq!("j/d/o/j.doe-2024.05.04.03.02.01/", path);
    }

    #[rstest]
    fn test_derivation_is_deterministic_for_fixed_timestamp() {
        let t = creation_time();
        assert_eq!(
            derive_maildir_path("john", &t),
            derive_maildir_path("john", &t)
        );
    }

    #[rstest]
    fn test_storage_attributes_split_base_and_node() {
        let attrs = storage_attributes("/var/vmail/vmail1", "ab", &creation_time());
        let maildir = "a/b/b/ab-2024.05.04.03.02.01/";
        assert_eq!(
            ("homeDirectory", format!("/var/vmail/vmail1/{maildir}")),
            attrs[0]
        );
        assert_eq!(("mailMessageStore", format!("vmail1/{maildir}")), attrs[1]);
        assert_eq!(("storageBaseDirectory", "/var/vmail".to_string()), attrs[2]);
    }
}

//! String helpers.

/// Strips one trailing `\n`, then one trailing `\r`.
fn trim_line_ending(s: &str) -> &str {
    let s = s.strip_suffix('\n').unwrap_or(s);
    s.strip_suffix('\r').unwrap_or(s)
}

/// Concatenates all parts, dropping a single trailing line ending from each.
///
/// Handy for gluing together command output, which usually ends in a newline.
pub fn concat<S: AsRef<str>>(parts: impl IntoIterator<Item = S>) -> String {
    parts.into_iter().fold(String::new(), |mut acc, part| {
        acc.push_str(trim_line_ending(part.as_ref()));
        acc
    })
}

/// Returns whether `s` consists only of the ASCII letters `a` to `z`.
pub fn is_all_lowercase(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_lowercase())
}

/// Calls `f` with each line of `s`. A single trailing newline does not
/// produce an extra empty line.
pub fn for_each_line(s: &str, f: impl FnMut(&str)) {
    s.strip_suffix('\n').unwrap_or(s).split('\n').for_each(f)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn concat_trims_each_part() {
        assert_eq!("abc", concat(["a\n", "b\r\n", "c"]));
        assert_eq!("a\n", concat(["a\n\n"]));
        assert_eq!("", concat(Vec::<String>::new()));
        assert_eq!(
            "10.1.0.0/16",
            concat(["10.".to_string(), 1.to_string(), ".0.0/16\n".to_string()])
        );
    }

    #[test]
    fn lowercase_check() {
        assert!(is_all_lowercase("infrakit"));
        assert!(is_all_lowercase(""));
        assert!(!is_all_lowercase("Infrakit"));
        assert!(!is_all_lowercase("infra-kit"));
        assert!(!is_all_lowercase("infrakit2"));
        assert!(!is_all_lowercase("ünï"));
    }

    #[test]
    fn lines() {
        let mut seen = vec![];
        for_each_line("one\ntwo\n\nfour\n", |line| seen.push(line.to_string()));
        assert_eq!(vec!["one", "two", "", "four"], seen);
    }
}

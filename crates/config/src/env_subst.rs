/// Expand `${NAME}` placeholders in raw config text from the process environment.
///
/// Placeholders naming an unset variable, and unterminated `${`, are kept verbatim.
pub fn substitute_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            },
            _ => {
                out.push_str(&rest[start..start + 2]);
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        (name == "CHROME_HOST").then(|| "chrome.internal".to_string())
    }

    #[test]
    fn expands_known_variable() {
        assert_eq!(
            expand_with(r#"host = "${CHROME_HOST}""#, lookup),
            r#"host = "chrome.internal""#
        );
    }

    #[test]
    fn keeps_unknown_and_empty_placeholders() {
        assert_eq!(expand_with("${NOPE} ${}", lookup), "${NOPE} ${}");
    }

    #[test]
    fn keeps_unterminated_placeholder() {
        assert_eq!(expand_with("a ${CHROME_HOST", lookup), "a ${CHROME_HOST");
    }

    #[test]
    fn text_without_placeholders_is_untouched() {
        assert_eq!(substitute_env("port = 9222"), "port = 9222");
    }
}

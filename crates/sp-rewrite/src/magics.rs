use std::sync::OnceLock;

use regex::Regex;

const MAGIC_MARKER: &str = "#_IPYTHON_MAGIC_";

fn magic_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?m)^(%+)([a-z])").expect("magic regex must compile"))
}

fn protected_magic_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?m)^#_IPYTHON_MAGIC_(%+)([a-z])").expect("protected magic regex must compile")
    })
}

fn magic_line_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?m)^(?:%+[a-z]|get_ipython)[^\r\n]*").expect("magic line regex must compile")
    })
}

/// Comments out IPython magics (`%matplotlib inline`, `%%time`) so the text
/// can go through the Python tokenizer.
pub fn protect_ipython_magics(code: &str) -> String {
    magic_regex()
        .replace_all(code, format!("{MAGIC_MARKER}${{1}}${{2}}").as_str())
        .into_owned()
}

pub fn deprotect_ipython_magics(code: &str) -> String {
    protected_magic_regex()
        .replace_all(code, "${1}${2}")
        .into_owned()
}

/// Empties magic lines and `get_ipython()` calls, leaving the line structure
/// intact.
pub fn blank_ipython_magics(code: &str) -> String {
    magic_line_regex().replace_all(code, "").into_owned()
}

#[cfg(test)]
mod magics_tests {
    use super::*;

    #[test]
    fn protect_then_deprotect_restores_text() {
        let code = "%matplotlib inline\n%%time\nx = 5 % 2\n";
        let protected = protect_ipython_magics(code);
        assert_eq!(
            protected,
            "#_IPYTHON_MAGIC_%matplotlib inline\n#_IPYTHON_MAGIC_%%time\nx = 5 % 2\n"
        );
        assert_eq!(deprotect_ipython_magics(&protected), code);
    }

    #[test]
    fn protected_magics_tokenize_as_comments() {
        let protected = protect_ipython_magics("%matplotlib notebook\nimport matplotlib\n");
        let stmts = sp_parser::parse_imports(&protected).expect("protected text should parse");
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].line(), 2);
    }

    #[test]
    fn blanking_keeps_line_count() {
        let code = "%matplotlib inline\nget_ipython().run_line_magic('x', '')\nx = 1\n";
        let blanked = blank_ipython_magics(code);
        assert_eq!(blanked, "\n\nx = 1\n");
        assert_eq!(blanked.lines().count(), code.lines().count());
    }

    #[test]
    fn modulo_and_format_operators_are_untouched() {
        let code = "y = a %b\nprint('%d' % 3)\n";
        assert_eq!(protect_ipython_magics(code), code);
        assert_eq!(blank_ipython_magics(code), code);
    }
}

/// Splits text into lines that keep their terminators, so joining them gives
/// back the input byte for byte.
pub(crate) fn split_lines(code: &str) -> Vec<String> {
    code.split_inclusive('\n').map(str::to_string).collect()
}

pub(crate) fn split_terminator(line: &str) -> (&str, &str) {
    let body = line
        .strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(line);
    (body, &line[body.len()..])
}

pub(crate) fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

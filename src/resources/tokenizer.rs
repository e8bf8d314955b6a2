//! Line and token splitting shared by the geometry and material parsers.

/// Split `line` at every `delimiter`.
///
/// Adjacent delimiters produce empty tokens, so `"1//3"` split at `'/'` is
/// `["1", "", "3"]`. An empty line yields a single empty token.
pub fn split(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).collect()
}

/// Take the next line off the front of `rest`.
///
/// The returned line excludes the newline and a trailing carriage return.
/// `rest` is advanced past the newline; the last line is returned even when
/// it has no trailing newline. Returns `None` once `rest` is empty.
pub fn next_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    if rest.is_empty() {
        return None;
    }
    let line = match rest.find('\n') {
        Some(end) => {
            let line = &rest[..end];
            *rest = &rest[end + 1..];
            line
        }
        None => {
            let line = *rest;
            *rest = "";
            line
        }
    };
    Some(line.strip_suffix('\r').unwrap_or(line))
}

/// Whitespace separated fields of a directive line, empty tokens dropped.
pub fn fields(line: &str) -> Vec<&str> {
    split(line, ' ')
        .into_iter()
        .flat_map(|token| split(token, '\t'))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Iterates the lines of a source text together with their 1-based number.
pub struct Lines<'a> {
    rest: &'a str,
    number: usize,
}

impl<'a> Lines<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            rest: source,
            number: 0,
        }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let line = next_line(&mut self.rest)?;
        self.number += 1;
        Some((self.number, line))
    }
}

use std::fmt::Display;

use camino::Utf8Path;

/// Helper to format a path in diagnostics.
///
/// Paths end up in one-line error messages that an operator may paste back
/// into a shell; quote anything that a default POSIX shell would mangle.
#[derive(Debug)]
pub struct PathQuotedDisplay<'a> {
    path: &'a Utf8Path,
}

impl<'a> Display for PathQuotedDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.path.as_str();
        if s.chars()
            .all(|c| matches!(c, '/' | '.' | '-' | '_') || c.is_alphanumeric())
        {
            return f.write_str(s);
        }
        match shlex::try_quote(s) {
            Ok(quoted) => f.write_str(&quoted),
            // Only happens on interior NUL, which Utf8Path can't contain
            Err(_) => Err(std::fmt::Error),
        }
    }
}

impl<'a> PathQuotedDisplay<'a> {
    /// Quote a path so it would be parsed as one word by a default POSIX
    /// shell. Plain UTF-8 paths without spaces or shell meta-characters are
    /// rendered unchanged.
    pub fn new<P: AsRef<Utf8Path> + ?Sized>(path: &'a P) -> PathQuotedDisplay<'a> {
        PathQuotedDisplay {
            path: path.as_ref(),
        }
    }
}

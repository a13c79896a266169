//! Source positions and the comment-stripping pre-pass.
//!
//! Comments are removed *before* scanning by overwriting them with spaces
//! (newlines are kept), so every byte offset in the stripped text is the same
//! offset in the original text. A [`LineIndex`] built once per script maps
//! those offsets back to 1-based line/column pairs for diagnostics.

use std::fmt;
use std::rc::Rc;

use log::{debug, info};
use memchr::memchr_iter;

use crate::error::{Result, ShnapError};

/// Where an instruction or token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 1-based line.
    pub line: usize,

    /// 1-based column, counted in bytes.
    pub column: usize,

    /// Name of the owning script.
    pub script: Rc<str>,
}

impl Location {
    pub fn new(line: usize, column: usize, script: Rc<str>) -> Self {
        Self {
            line,
            column,
            script,
        }
    }

    /// Location used for values and results created by native code.
    pub fn native() -> Self {
        Self::new(0, 0, Rc::from("<native>"))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.script, self.line, self.column)
    }
}

/// Maps byte offsets to line/column pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    script: Rc<str>,
}

impl LineIndex {
    pub fn new(src: &[u8], script: Rc<str>) -> Self {
        let mut line_starts = Vec::with_capacity(src.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(memchr_iter(b'\n', src).map(|pos| pos + 1));

        debug!("Indexed {} line(s) of '{}'", line_starts.len(), script);

        Self {
            line_starts,
            script,
        }
    }

    /// Resolve a byte offset into a [`Location`].
    pub fn locate(&self, offset: usize) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };

        Location::new(
            line + 1,
            offset - self.line_starts[line] + 1,
            self.script.clone(),
        )
    }

    pub fn script(&self) -> &Rc<str> {
        &self.script
    }
}

/// Blank out `//` and `/* */` comments while leaving string and character
/// literals untouched.
pub fn strip_comments(src: &str, index: &LineIndex) -> Result<String> {
    info!("Stripping comments from {} bytes", src.len());

    let bytes = src.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' if bytes[i..].starts_with(b"\"\"\"") => {
                i += 3;
                while i < bytes.len() && !bytes[i..].starts_with(b"\"\"\"") {
                    i += 1;
                }
                i = (i + 3).min(bytes.len());
            }

            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }

            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }

            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;

                loop {
                    if i + 1 >= bytes.len() {
                        return Err(ShnapError::lex(
                            index.locate(start),
                            "Unterminated block comment.",
                        ));
                    }

                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }

                    i += 1;
                }

                for b in &mut out[start..i] {
                    if *b != b'\n' {
                        *b = b' ';
                    }
                }
            }

            _ => i += 1,
        }
    }

    // Whole UTF-8 sequences are blanked, so the buffer stays valid UTF-8.
    Ok(String::from_utf8(out)?)
}

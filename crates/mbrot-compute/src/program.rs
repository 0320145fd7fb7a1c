//! Device program source.
//!
//! The source is read from disk once per run and handed to the backend's
//! compiler. No compiled-program cache is kept between runs.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ComputeError, ComputeResult};

/// Default program resource.
pub const DEFAULT_PROGRAM: &str = "mandelbrot.cl";

/// Default entry point.
pub const DEFAULT_ENTRY_POINT: &str = "render";

/// Text of the Mandelbrot program shipped in `kernels/`.
pub const MANDELBROT_SOURCE: &str = include_str!("../../../kernels/mandelbrot.cl");

/// Full text of a device program.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    path: PathBuf,
    text: String,
}

/// A `__kernel` function declared in a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDecl {
    /// Entry point name.
    pub name: String,
    /// Declared parameter count.
    pub params: usize,
}

impl ProgramSource {
    /// Reads the whole program text at `path`.
    pub fn load(path: impl AsRef<Path>) -> ComputeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            ComputeError::ProgramSourceNotFound { path: path.to_path_buf(), source }
        })?;
        debug!(path = %path.display(), bytes = text.len(), "program source loaded");
        Ok(Self { path: path.to_path_buf(), text })
    }

    /// Wraps in-memory text. `origin` is used in diagnostics only.
    pub fn from_text(origin: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self { path: origin.into(), text: text.into() }
    }

    /// The shipped Mandelbrot program.
    pub fn bundled() -> Self {
        Self::from_text(DEFAULT_PROGRAM, MANDELBROT_SOURCE)
    }

    /// True if both programs have the same tokens once comments and
    /// whitespace are removed.
    pub fn same_code(&self, other: &ProgramSource) -> bool {
        let a = strip_comments(&self.text);
        let b = strip_comments(&other.text);
        tokenize(&a) == tokenize(&b)
    }

    /// Where the text came from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Program text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Scans the text for `__kernel void name(...)` declarations.
    ///
    /// Comments are skipped. Unbalanced brackets are reported as an `Err`
    /// holding a build-log style message.
    pub fn kernels(&self) -> Result<Vec<KernelDecl>, String> {
        let code = strip_comments(&self.text);
        check_balanced(&code).map_err(|msg| format!("{}: {msg}", self.path.display()))?;

        let tokens = tokenize(&code);
        let mut kernels = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let is_qualifier = tokens[i] == "__kernel" || tokens[i] == "kernel";
            if is_qualifier
                && tokens.get(i + 1) == Some(&"void")
                && tokens.get(i + 3) == Some(&"(")
            {
                let name = tokens[i + 2].to_string();
                let params = count_params(&tokens[i + 4..]);
                kernels.push(KernelDecl { name, params });
                i += 4;
            } else {
                i += 1;
            }
        }
        Ok(kernels)
    }
}

fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn check_balanced(code: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    for (line_no, line) in code.lines().enumerate() {
        for c in line.chars() {
            match c {
                '(' | '{' | '[' => stack.push((c, line_no + 1)),
                ')' | '}' | ']' => {
                    let open = match c {
                        ')' => '(',
                        '}' => '{',
                        _ => '[',
                    };
                    match stack.pop() {
                        Some((o, _)) if o == open => {}
                        _ => return Err(format!("{}: error: unexpected '{c}'", line_no + 1)),
                    }
                }
                _ => {}
            }
        }
    }
    match stack.pop() {
        Some((c, line)) => Err(format!("{line}: error: unclosed '{c}'")),
        None => Ok(()),
    }
}

fn tokenize(code: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in code.char_indices() {
        let ident = c.is_ascii_alphanumeric() || c == '_';
        match (ident, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(&code[s..i]);
                start = None;
            }
            _ => {}
        }
        if !ident && !c.is_whitespace() {
            tokens.push(&code[i..i + c.len_utf8()]);
        }
    }
    if let Some(s) = start {
        tokens.push(&code[s..]);
    }
    tokens
}

/// Counts top-level commas up to the closing parenthesis.
fn count_params(tokens: &[&str]) -> usize {
    let mut depth = 0usize;
    let mut commas = 0;
    let mut any = false;
    for tok in tokens {
        match *tok {
            "(" => depth += 1,
            ")" if depth == 0 => break,
            ")" => depth -= 1,
            "," if depth == 0 => commas += 1,
            "void" if !any => {}
            _ => any = true,
        }
    }
    if any { commas + 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(text: &str) -> ProgramSource {
        ProgramSource::from_text("test.cl", text)
    }

    #[test]
    fn finds_kernels_and_arity() {
        let p = src(
            "// helper\nint sq(int a) { return a * a; }\n\
             __kernel void render(__global uchar *out, int depth, double x0, double y0, double k) {}\n\
             kernel void clear(__global uchar *out) { out[get_global_id(0)] = 0; }\n\
             __kernel void nop(void) {}\n",
        );
        let kernels = p.kernels().unwrap();
        assert_eq!(
            kernels,
            vec![
                KernelDecl { name: "render".into(), params: 5 },
                KernelDecl { name: "clear".into(), params: 1 },
                KernelDecl { name: "nop".into(), params: 0 },
            ]
        );
    }

    #[test]
    fn commented_kernels_are_ignored() {
        let p = src("/* __kernel void hidden(int a) {} */\n// __kernel void gone() {}\n");
        assert!(p.kernels().unwrap().is_empty());
    }

    #[test]
    fn unbalanced_source_is_a_build_error() {
        let err = src("__kernel void render(int a) {\n").kernels().unwrap_err();
        assert!(err.contains("unclosed '{'"), "{err}");
        let err = src("__kernel void render(int a)) {}").kernels().unwrap_err();
        assert!(err.contains("unexpected ')'"), "{err}");
    }

    #[test]
    fn bundled_program_declares_render() {
        let kernels = ProgramSource::bundled().kernels().unwrap();
        assert_eq!(kernels, vec![KernelDecl { name: DEFAULT_ENTRY_POINT.into(), params: 5 }]);
    }

    #[test]
    fn code_comparison_ignores_layout() {
        let a = src("__kernel void f(int a) { a = 1; }");
        let b = src("// note\n__kernel  void f( int a )\n{\n  a = 1; /* set */\n}\n");
        let c = src("__kernel void f(int a) { a = 2; }");
        assert!(a.same_code(&b));
        assert!(!a.same_code(&c));
        assert!(ProgramSource::bundled().same_code(&ProgramSource::bundled()));
    }

    #[test]
    fn missing_file() {
        let err = ProgramSource::load("/nonexistent/dir/mandelbrot.cl").unwrap_err();
        assert!(matches!(err, ComputeError::ProgramSourceNotFound { .. }));
        assert_eq!(err.step(), "load program");
    }
}

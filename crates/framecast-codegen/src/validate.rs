//! Structural checks on generated code

use serde::Serialize;
use std::iter::Peekable;
use std::str::Chars;

use crate::stage::{Stage, StageFailure};
use crate::state::{GenerationState, SourceFile, StateField, StateUpdate};

/// Problems found in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiagnostics {
    /// File path
    pub path: String,
    /// Problems, empty when the file passed
    pub problems: Vec<String>,
}

/// Checks every generated file for obvious structural defects
pub struct ValidateCode;

impl ValidateCode {
    /// Stage name
    pub const NAME: &'static str = "validate";

    /// Artifact holding per-file diagnostics
    pub const ARTIFACT: &'static str = "diagnostics";

    /// Check one file
    pub fn check(file: &SourceFile) -> FileDiagnostics {
        let mut problems = Vec::new();
        if file.contents.trim().is_empty() {
            problems.push("file is empty".to_string());
        } else {
            if let Err(problem) = check_brackets(&file.contents) {
                problems.push(problem);
            }
            if file.language == "tsx" && !file.contents.contains("export default") {
                problems.push("missing default export".to_string());
            }
        }
        FileDiagnostics {
            path: file.path.clone(),
            problems,
        }
    }
}

impl Stage for ValidateCode {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires(&self) -> &[StateField] {
        &[StateField::Code]
    }

    fn produces(&self) -> &[StateField] {
        &[StateField::Artifact(Self::ARTIFACT)]
    }

    fn run(&self, state: &GenerationState) -> Result<StateUpdate, StageFailure> {
        let code = state
            .code()
            .ok_or_else(|| StageFailure::recoverable("no code to validate"))?;

        let diagnostics: Vec<FileDiagnostics> = code.files.iter().map(Self::check).collect();
        let problems: Vec<String> = diagnostics
            .iter()
            .flat_map(|d| d.problems.iter().map(move |p| format!("{}: {}", d.path, p)))
            .collect();

        let value = serde_json::to_value(&diagnostics)
            .map_err(|e| StageFailure::fatal(format!("could not encode diagnostics: {}", e)))?;
        let update = StateUpdate::new().with_artifact(Self::ARTIFACT, value);

        if problems.is_empty() {
            Ok(update)
        } else {
            Err(StageFailure::recoverable(problems.join("; ")).with_partial(update))
        }
    }
}

/// Where the scanner is in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Script code: brackets count, strings and comments are skipped
    Code,
    /// Inside a JSX tag, between `<` and `>`
    Tag { closing: bool },
    /// JSX text between elements; only `<` and `{` matter
    Text,
}

/// An unclosed bracket, with the scanner state to restore when it closes
struct Open {
    bracket: char,
    line: usize,
    resume: Mode,
    depth: usize,
}

/// Bracket balance in script code. String literals, comments and JSX text
/// content are skipped; `{...}` expressions inside JSX are checked.
fn check_brackets(source: &str) -> Result<(), String> {
    let mut stack: Vec<Open> = Vec::new();
    let mut mode = Mode::Code;
    // open JSX elements in the current expression
    let mut depth = 0usize;
    let mut line = 1;
    let mut prev: Option<char> = None;
    let mut word = String::new();
    let mut last = ' ';
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        match mode {
            Mode::Text => match c {
                '<' if starts_tag(chars.peek()) => mode = enter_tag(&mut chars),
                '{' => {
                    stack.push(Open {
                        bracket: c,
                        line,
                        resume: Mode::Text,
                        depth,
                    });
                    depth = 0;
                    mode = Mode::Code;
                    prev = Some(c);
                    word.clear();
                }
                _ => {}
            },
            Mode::Tag { closing } => match c {
                '"' | '\'' => skip_string(c, &mut chars, &mut line),
                '{' => {
                    stack.push(Open {
                        bracket: c,
                        line,
                        resume: mode,
                        depth,
                    });
                    depth = 0;
                    mode = Mode::Code;
                    prev = Some(c);
                    word.clear();
                }
                '/' if chars.peek() == Some(&'>') => {
                    chars.next();
                    mode = after_tag(depth);
                    prev = Some('>');
                    word.clear();
                    last = ' ';
                }
                '>' => {
                    if closing {
                        depth = depth.saturating_sub(1);
                    } else {
                        depth += 1;
                    }
                    mode = after_tag(depth);
                    prev = Some('>');
                    word.clear();
                    last = ' ';
                }
                _ => {}
            },
            Mode::Code => {
                match c {
                    '\'' | '"' | '`' => {
                        skip_string(c, &mut chars, &mut line);
                        word.clear();
                        prev = Some(c);
                    }
                    '/' if chars.peek() == Some(&'/') => {
                        while chars.peek().is_some_and(|n| *n != '\n') {
                            chars.next();
                        }
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        while let Some(n) = chars.next() {
                            if n == '\n' {
                                line += 1;
                            } else if n == '*' && chars.peek() == Some(&'/') {
                                chars.next();
                                break;
                            }
                        }
                    }
                    '<' if starts_tag(chars.peek()) && jsx_position(prev, &word) => {
                        mode = enter_tag(&mut chars);
                    }
                    '(' | '[' | '{' => {
                        stack.push(Open {
                            bracket: c,
                            line,
                            resume: Mode::Code,
                            depth,
                        });
                        word.clear();
                        prev = Some(c);
                    }
                    ')' | ']' | '}' => {
                        let expected = match c {
                            ')' => '(',
                            ']' => '[',
                            _ => '{',
                        };
                        match stack.pop() {
                            Some(open) if open.bracket == expected => {
                                mode = open.resume;
                                depth = open.depth;
                            }
                            Some(open) => {
                                return Err(format!(
                                    "line {}: '{}' closes '{}' from line {}",
                                    line, c, open.bracket, open.line
                                ));
                            }
                            None => return Err(format!("line {}: unmatched '{}'", line, c)),
                        }
                        word.clear();
                        prev = Some(c);
                    }
                    c if is_ident(c) => {
                        if !is_ident(last) {
                            word.clear();
                        }
                        word.push(c);
                        prev = Some(c);
                    }
                    c if c.is_whitespace() => {}
                    other => {
                        word.clear();
                        prev = Some(other);
                    }
                }
                last = c;
            }
        }
    }

    match stack.pop() {
        Some(open) => Err(format!(
            "line {}: '{}' is never closed",
            open.line, open.bracket
        )),
        None => Ok(()),
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn starts_tag(next: Option<&char>) -> bool {
    next.is_some_and(|c| c.is_ascii_alphabetic() || *c == '/' || *c == '>')
}

/// Whether a `<` here opens a JSX element rather than a comparison or a
/// type argument list
fn jsx_position(prev: Option<char>, word: &str) -> bool {
    match prev {
        None => true,
        Some(p) if is_ident(p) => word == "return",
        Some(')') | Some(']') => false,
        Some(_) => true,
    }
}

fn enter_tag(chars: &mut Peekable<Chars<'_>>) -> Mode {
    let closing = chars.peek() == Some(&'/');
    if closing {
        chars.next();
    }
    Mode::Tag { closing }
}

fn after_tag(depth: usize) -> Mode {
    if depth > 0 { Mode::Text } else { Mode::Code }
}

/// Skip a string literal; quotes other than backticks end at the line end
fn skip_string(quote: char, chars: &mut Peekable<Chars<'_>>, line: &mut usize) {
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next() == Some('\n') {
                    *line += 1;
                }
            }
            '\n' => {
                *line += 1;
                if quote != '`' {
                    return;
                }
            }
            c if c == quote => return,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tsx(contents: &str) -> SourceFile {
        SourceFile {
            path: "Card.tsx".to_string(),
            language: "tsx".to_string(),
            contents: contents.to_string(),
        }
    }

    #[rstest]
    #[case("export default function A() { return (<div />) }")]
    #[case("export default function A() { return <p>{'('}</p> }")]
    #[case("// TODO (\nexport default function A() {}")]
    #[case("export default function A() { const s = \"}\\\"\"; }")]
    #[case("export default function A() { const ok = a < b && (c > d); return ok }")]
    #[case("export default function A() { const xs = Array<string>(); return xs }")]
    #[case("export default function A() { return <div style={{ width: (1 + 2) }}>x)</div> }")]
    #[case("/* ( */ export default function A() { return <p>a</p> }")]
    fn test_balanced(#[case] source: &str) {
        assert!(ValidateCode::check(&tsx(source)).problems.is_empty());
    }

    #[rstest]
    #[case("export default function A() { return (<div /> }", "closes")]
    #[case("export default function A() {", "never closed")]
    #[case("export default function A() }", "unmatched")]
    #[case("export default function A() { return <p>{(</p> }", "closes")]
    #[case("function A() {}", "default export")]
    #[case("  \n", "empty")]
    fn test_problems(#[case] source: &str, #[case] fragment: &str) {
        let diagnostics = ValidateCode::check(&tsx(source));
        assert_eq!(diagnostics.problems.len(), 1);
        assert!(diagnostics.problems[0].contains(fragment));
    }

    #[test]
    fn test_jsx_text_is_not_code() {
        let source = "export default function A() {\n  return (\n    <div data-node-id=\"1:1\">\n      \
                      <p>1) Open the app</p>\n      \
                      <p>Hi :) see https://x.com)</p>\n      \
                      <Text>Don't {'\\n'} [draft</Text>\n    \
                      </div>\n  )\n}\n";
        let diagnostics = ValidateCode::check(&tsx(source));
        assert!(diagnostics.problems.is_empty(), "{:?}", diagnostics.problems);
    }

    #[test]
    fn test_problem_reports_line_of_unclosed_expression() {
        let source = "export default function A() {\n  return (\n    <p>\n      {items.map((i) => i}\n    </p>\n  )\n}\n";
        let diagnostics = ValidateCode::check(&tsx(source));
        assert_eq!(diagnostics.problems, vec!["line 4: '}' closes '(' from line 4"]);
    }

    #[test]
    fn test_css_needs_no_export() {
        let css = SourceFile {
            path: "Card.module.css".to_string(),
            language: "css".to_string(),
            contents: ".card {\n  gap: 8px;\n}\n".to_string(),
        };
        assert!(ValidateCode::check(&css).problems.is_empty());
    }
}

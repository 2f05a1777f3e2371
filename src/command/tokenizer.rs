//! Shell-command tokenizer.
//!
//! Classifies a command line into its components (command word, flags,
//! quoted strings, paths, variables, operators) so the REPL can print a
//! per-token breakdown of what a generated command is made of.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Command,
    LongOption,
    Flag,
    Quoted,
    Number,
    Path,
    Variable,
    Comment,
    Operator,
    Punctuation,
    Argument,
}

impl TokenKind {
    /// One-line description for the command breakdown view.
    pub fn explanation(&self) -> Option<&'static str> {
        match self {
            TokenKind::Command => Some("Main command or executable"),
            TokenKind::LongOption => Some("Long option (usually descriptive)"),
            TokenKind::Flag => Some("Short flag or option"),
            TokenKind::Quoted => Some("Quoted text argument or pattern"),
            TokenKind::Number => Some("Numeric value"),
            TokenKind::Path => Some("File or directory path"),
            TokenKind::Variable => Some("Environment variable or substitution"),
            TokenKind::Comment => Some("Comment (ignored by shell)"),
            TokenKind::Operator => Some("Control operator (pipes, redirection)"),
            TokenKind::Argument => Some("Text argument or value"),
            TokenKind::Punctuation => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

fn token(kind: TokenKind, text: impl Into<String>) -> Token {
    Token { kind, text: text.into() }
}

/// Break a command line into classified tokens. The concatenation of all
/// token texts reproduces the input exactly.
pub fn tokenize_command(command: &str) -> Vec<Token> {
    let chars: Vec<char> = command.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut seen_command_word = false;

    while pos < chars.len() {
        let c = chars[pos];

        if c == ' ' {
            let run: String = chars[pos..].iter().take_while(|&&ch| ch == ' ').collect();
            pos += run.chars().count();
            tokens.push(token(TokenKind::Punctuation, run));
            continue;
        }

        if c == '#' {
            let rest: String = chars[pos..].iter().collect();
            tokens.push(token(TokenKind::Comment, rest));
            break;
        }

        if c == '"' || c == '\'' {
            let text = take_quoted(&chars[pos..]);
            pos += text.chars().count();
            tokens.push(token(TokenKind::Quoted, text));
            continue;
        }

        if c == '$' {
            let text = take_variable(&chars[pos..]);
            pos += text.chars().count();
            tokens.push(token(TokenKind::Variable, text));
            continue;
        }

        if is_path_start(&chars[pos..]) {
            let text = take_until_delimiter(&chars[pos..]);
            pos += text.chars().count();
            tokens.push(token(TokenKind::Path, text));
            continue;
        }

        if c == '-' {
            let text = take_flag(&chars[pos..]);
            pos += text.chars().count();
            let kind =
                if text.starts_with("--") { TokenKind::LongOption } else { TokenKind::Flag };
            tokens.push(token(kind, text));
            continue;
        }

        if c.is_ascii_digit() {
            let text = take_number(&chars[pos..]);
            pos += text.chars().count();
            tokens.push(token(TokenKind::Number, text));
            continue;
        }

        if matches!(c, '|' | '&' | '>' | '<') {
            let text = take_operator(&chars[pos..]);
            pos += text.chars().count();
            tokens.push(token(TokenKind::Operator, text));
            // An operator starts a new simple command.
            seen_command_word = false;
            continue;
        }

        if matches!(c, ';' | '(' | ')' | '{' | '}' | '=') {
            tokens.push(token(TokenKind::Punctuation, c.to_string()));
            pos += 1;
            if c == ';' {
                seen_command_word = false;
            }
            continue;
        }

        let text = take_until_delimiter(&chars[pos..]);
        pos += text.chars().count();
        let kind = if seen_command_word { TokenKind::Argument } else { TokenKind::Command };
        seen_command_word = true;
        tokens.push(token(kind, text));
    }

    tokens
}

/// Breakdown lines for the REPL: every meaningful token with its
/// explanation, whitespace skipped.
pub fn component_breakdown(command: &str) -> Vec<(Token, &'static str)> {
    tokenize_command(command)
        .into_iter()
        .filter(|t| !t.text.trim().is_empty())
        .filter_map(|t| t.kind.explanation().map(|e| (t, e)))
        .collect()
}

fn take_quoted(input: &[char]) -> String {
    let quote = input[0];
    let mut out = String::new();
    out.push(quote);
    let mut escaped = false;

    for &c in &input[1..] {
        out.push(c);
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == quote {
            break;
        }
    }
    out
}

fn take_variable(input: &[char]) -> String {
    if input.len() > 1 && input[1] == '{' {
        if let Some(end) = input.iter().position(|&c| c == '}') {
            return input[..=end].iter().collect();
        }
    } else if input.len() > 1 && input[1] == '(' {
        if let Some(end) = input.iter().position(|&c| c == ')') {
            return input[..=end].iter().collect();
        }
    } else {
        for (i, &c) in input.iter().enumerate().skip(1) {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                return input[..i].iter().collect();
            }
        }
    }
    input.iter().collect()
}

fn is_path_start(input: &[char]) -> bool {
    match input[0] {
        '/' | '~' => true,
        '.' => {
            (input.len() > 1 && input[1] == '/')
                || (input.len() > 2 && input[1] == '.' && input[2] == '/')
        }
        _ => false,
    }
}

fn take_until_delimiter(input: &[char]) -> String {
    input
        .iter()
        .take_while(|&&c| !matches!(c, ' ' | ';' | '&' | '|' | '>' | '<'))
        .collect()
}

fn take_flag(input: &[char]) -> String {
    input.iter().take_while(|&&c| !matches!(c, ' ' | '=' | ';' | '&')).collect()
}

fn take_number(input: &[char]) -> String {
    let mut seen_decimal = false;
    let mut out = String::new();
    for &c in input {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '.' && !seen_decimal {
            seen_decimal = true;
            out.push(c);
        } else {
            break;
        }
    }
    out
}

fn take_operator(input: &[char]) -> String {
    if input.len() >= 2 {
        let two: String = input[..2].iter().collect();
        if matches!(two.as_str(), "&&" | "||" | ">>" | "<<") {
            return two;
        }
    }
    input[0].to_string()
}

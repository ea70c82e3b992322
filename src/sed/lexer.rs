//! Tokenizer for sed scripts.
//!
//! Sed's grammar is context-sensitive: what a character means depends on
//! whether the lexer is reading an address, a command letter, or the body
//! of a multi-delimiter command like `s` or `y`. Each of those bodies gets
//! its own read function rather than a single generic scanner.

#[derive(Debug, Clone, PartialEq)]
pub enum SedToken {
    Number(u64),
    Dollar,
    Pattern(String),
    Step { first: u64, step: u64 },
    RelativeOffset(u64),
    Multiple(u64),

    LBrace,
    RBrace,
    Semicolon,
    Newline,
    Comma,
    Negation,

    Command(char),

    Substitute { pattern: String, replacement: String, flags: String, wfile: Option<String> },
    Transliterate { source: String, dest: String },
    Cut(String),
    LabelDef(String),
    Branch { label: Option<String> },
    BranchOnSubst { label: Option<String> },
    BranchOnNoSubst { label: Option<String> },
    TextCmd { cmd: char, text: String },
    FileRead(String),
    FileReadLine(String),
    FileWrite(String),
    FileWriteLine(String),
    Execute(Option<String>),
    Version(Option<String>),
    List(Option<u32>),

    Eof,
    Error(String),
}

pub struct SedLexer {
    input: Vec<char>,
    pos: usize,
}

impl SedLexer {
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(), pos: 0 }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn read_escaped_string(&mut self, delimiter: char) -> Option<String> {
        let mut result = String::new();
        while !self.is_at_end() && self.peek(0) != Some(delimiter) {
            if self.peek(0) == Some('\\') {
                self.advance();
                if let Some(escaped) = self.advance() {
                    match escaped {
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        other => result.push(other),
                    }
                }
            } else if self.peek(0) == Some('\n') {
                return None;
            } else if let Some(ch) = self.advance() {
                result.push(ch);
            }
        }
        Some(result)
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek(0) {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while !self.is_at_end() && self.peek(0) != Some('\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_digit(ch: char) -> bool {
        ch.is_ascii_digit()
    }

    pub fn next_token(&mut self) -> Option<SedToken> {
        self.skip_whitespace();

        if self.is_at_end() {
            return None;
        }

        let ch = self.peek(0)?;

        if ch == '\n' {
            self.advance();
            return Some(SedToken::Newline);
        }
        if ch == ';' {
            self.advance();
            return Some(SedToken::Semicolon);
        }
        if ch == '{' {
            self.advance();
            return Some(SedToken::LBrace);
        }
        if ch == '}' {
            self.advance();
            return Some(SedToken::RBrace);
        }
        if ch == ',' {
            self.advance();
            return Some(SedToken::Comma);
        }
        if ch == '!' {
            self.advance();
            return Some(SedToken::Negation);
        }
        if ch == '$' {
            self.advance();
            return Some(SedToken::Dollar);
        }
        if Self::is_digit(ch) {
            return Some(self.read_number());
        }
        if ch == '+' && self.peek(1).map_or(false, Self::is_digit) {
            return Some(self.read_relative_offset());
        }
        if ch == '~' && self.peek(1).map_or(false, Self::is_digit) {
            return Some(self.read_multiple());
        }
        if ch == '/' {
            return Some(self.read_pattern());
        }
        if ch == ':' {
            return Some(self.read_label_def());
        }

        Some(self.read_command())
    }

    fn read_number(&mut self) -> SedToken {
        let mut num_str = String::new();
        while let Some(ch) = self.peek(0) {
            if Self::is_digit(ch) {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.peek(0) == Some('~') {
            self.advance();
            let mut step_str = String::new();
            while let Some(ch) = self.peek(0) {
                if Self::is_digit(ch) {
                    step_str.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let first = num_str.parse::<u64>().unwrap_or(0);
            let step = step_str.parse::<u64>().unwrap_or(0);
            return SedToken::Step { first, step };
        }

        SedToken::Number(num_str.parse::<u64>().unwrap_or(0))
    }

    fn read_relative_offset(&mut self) -> SedToken {
        self.advance();
        let mut num_str = String::new();
        while let Some(ch) = self.peek(0) {
            if Self::is_digit(ch) {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        SedToken::RelativeOffset(num_str.parse::<u64>().unwrap_or(0))
    }

    fn read_multiple(&mut self) -> SedToken {
        self.advance();
        let mut num_str = String::new();
        while let Some(ch) = self.peek(0) {
            if Self::is_digit(ch) {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        SedToken::Multiple(num_str.parse::<u64>().unwrap_or(0))
    }

    fn read_pattern(&mut self) -> SedToken {
        self.advance();
        let mut pattern = String::new();
        let mut in_bracket = false;

        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();

            if ch == '/' && !in_bracket {
                break;
            }

            if ch == '\\' {
                pattern.push(self.advance().unwrap());
                if !self.is_at_end() && self.peek(0) != Some('\n') {
                    pattern.push(self.advance().unwrap());
                }
            } else if ch == '\n' {
                break;
            } else if ch == '[' && !in_bracket {
                in_bracket = true;
                pattern.push(self.advance().unwrap());
                if self.peek(0) == Some('^') {
                    pattern.push(self.advance().unwrap());
                }
                if self.peek(0) == Some(']') {
                    pattern.push(self.advance().unwrap());
                }
            } else if ch == ']' && in_bracket {
                in_bracket = false;
                pattern.push(self.advance().unwrap());
            } else {
                pattern.push(self.advance().unwrap());
            }
        }

        if self.peek(0) == Some('/') {
            self.advance();
        }

        SedToken::Pattern(pattern)
    }

    fn read_label_def(&mut self) -> SedToken {
        self.advance();
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut label = String::new();
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if matches!(ch, ' ' | '\t' | '\n' | ';' | '}' | '{') {
                break;
            }
            label.push(self.advance().unwrap());
        }
        SedToken::LabelDef(label)
    }

    fn read_command(&mut self) -> SedToken {
        let ch = self.advance().unwrap();

        match ch {
            's' => self.read_substitute(),
            'y' => self.read_transliterate(),
            'C' => self.read_cut(),
            'a' | 'i' | 'c' => self.read_text_command(ch),
            'b' => self.read_branch_command(|label| SedToken::Branch { label }),
            't' => self.read_branch_command(|label| SedToken::BranchOnSubst { label }),
            'T' => self.read_branch_command(|label| SedToken::BranchOnNoSubst { label }),
            'r' => self.read_file_command(SedToken::FileRead),
            'R' => self.read_file_command(SedToken::FileReadLine),
            'w' => self.read_file_command(SedToken::FileWrite),
            'W' => self.read_file_command(SedToken::FileWriteLine),
            'e' => self.read_execute(),
            'v' => self.read_version(),
            'l' => self.read_list(),
            'p' | 'P' | 'd' | 'D' | 'h' | 'H' | 'g' | 'G' | 'x' | 'n' | 'N' | 'q' | 'Q' | 'z'
            | '=' | 'F' => SedToken::Command(ch),
            _ => SedToken::Error(format!("unknown command: {}", ch)),
        }
    }

    fn read_substitute(&mut self) -> SedToken {
        let delimiter = match self.advance() {
            Some(d) if d != '\n' && d != '\\' => d,
            _ => return SedToken::Error("a backslash cannot be used as a delimiter".to_string()),
        };

        let mut pattern = String::new();
        let mut in_bracket = false;
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if ch == delimiter && !in_bracket {
                break;
            }

            if ch == '\\' {
                self.advance();
                if !self.is_at_end() && self.peek(0) != Some('\n') {
                    let escaped = self.peek(0).unwrap();
                    if escaped == delimiter && !in_bracket {
                        pattern.push(self.advance().unwrap());
                    } else {
                        pattern.push('\\');
                        pattern.push(self.advance().unwrap());
                    }
                } else {
                    pattern.push('\\');
                }
            } else if ch == '\n' {
                break;
            } else if ch == '[' && !in_bracket {
                in_bracket = true;
                pattern.push(self.advance().unwrap());
                if self.peek(0) == Some('^') {
                    pattern.push(self.advance().unwrap());
                }
                if self.peek(0) == Some(']') {
                    pattern.push(self.advance().unwrap());
                }
            } else if ch == ']' && in_bracket {
                in_bracket = false;
                pattern.push(self.advance().unwrap());
            } else {
                pattern.push(self.advance().unwrap());
            }
        }

        if self.peek(0) != Some(delimiter) {
            return SedToken::Error("a regular expression is not terminated".to_string());
        }
        self.advance();

        let mut replacement = String::new();
        while !self.is_at_end() && self.peek(0) != Some(delimiter) {
            if self.peek(0) == Some('\\') {
                self.advance();
                if !self.is_at_end() {
                    let next = self.peek(0).unwrap();
                    if next == '\\' {
                        self.advance();
                        if !self.is_at_end() && self.peek(0) == Some('\n') {
                            replacement.push('\n');
                            self.advance();
                        } else {
                            replacement.push('\\');
                        }
                    } else if next == '\n' {
                        replacement.push('\n');
                        self.advance();
                    } else {
                        replacement.push('\\');
                        replacement.push(self.advance().unwrap());
                    }
                } else {
                    replacement.push('\\');
                }
            } else if self.peek(0) == Some('\n') {
                break;
            } else {
                replacement.push(self.advance().unwrap());
            }
        }

        if self.peek(0) == Some(delimiter) {
            self.advance();
        }

        let mut flags = String::new();
        let mut wfile = None;
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if matches!(ch, 'g' | 'i' | 'p' | 'I' | 'e') || Self::is_digit(ch) {
                flags.push(self.advance().unwrap());
            } else if ch == 'w' {
                self.advance();
                while matches!(self.peek(0), Some(' ') | Some('\t')) {
                    self.advance();
                }
                let mut filename = String::new();
                while !self.is_at_end() {
                    let c = self.peek(0).unwrap();
                    if matches!(c, '\n' | ';') {
                        break;
                    }
                    filename.push(self.advance().unwrap());
                }
                wfile = Some(filename.trim().to_string());
                break;
            } else {
                break;
            }
        }

        SedToken::Substitute { pattern, replacement, flags, wfile }
    }

    fn read_transliterate(&mut self) -> SedToken {
        let delimiter = match self.advance() {
            Some(d) if d != '\n' => d,
            _ => return SedToken::Error("missing delimiter for y command".to_string()),
        };

        let source = match self.read_escaped_string(delimiter) {
            Some(s) => s,
            None => return SedToken::Error("unterminated transliteration source".to_string()),
        };
        if self.peek(0) != Some(delimiter) {
            return SedToken::Error("unterminated transliteration source".to_string());
        }
        self.advance();

        let dest = match self.read_escaped_string(delimiter) {
            Some(d) => d,
            None => return SedToken::Error("unterminated transliteration dest".to_string()),
        };
        if self.peek(0) != Some(delimiter) {
            return SedToken::Error("unterminated transliteration dest".to_string());
        }
        self.advance();

        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        if let Some(next_char) = self.peek(0) {
            if !matches!(next_char, ';' | '\n' | '}') {
                return SedToken::Error("extra text at the end of a transform command".to_string());
            }
        }

        SedToken::Transliterate { source, dest }
    }

    /// Reads a `C` command body: `<delim>selectors<delim>[options]`, where
    /// the first character is the list delimiter, entries are comma
    /// separated, `d<c>`/`D<c>` set the input/output delimiter in place,
    /// and the list closes on an unescaped occurrence of the delimiter.
    /// The returned string is the exact span consumed - delimiter,
    /// selector list, closing delimiter, and trailing option letters -
    /// left for `cut::parse_cut_spec` to interpret structurally.
    fn read_cut(&mut self) -> SedToken {
        let delimiter = match self.advance() {
            Some(d) if d != '\n' && d != '\\' => d,
            _ => return SedToken::Error("a backslash cannot be used as a delimiter".to_string()),
        };

        let mut body = String::new();
        body.push(delimiter);

        loop {
            while matches!(self.peek(0), Some(' ') | Some('\t')) {
                body.push(self.advance().unwrap());
            }
            if matches!(self.peek(0), None | Some('\n')) {
                return SedToken::Error("a cut selector list is not terminated".to_string());
            }

            if matches!(self.peek(0), Some('d') | Some('D')) {
                body.push(self.advance().unwrap());
                match self.peek(0) {
                    Some(c) if c != '\n' => {
                        body.push(c);
                        self.advance();
                    }
                    _ => return SedToken::Error("a cut selector list is not terminated".to_string()),
                }
            } else {
                if matches!(self.peek(0), Some('c') | Some('f')) {
                    body.push(self.advance().unwrap());
                    while matches!(self.peek(0), Some(' ') | Some('\t')) {
                        body.push(self.advance().unwrap());
                    }
                }
                while matches!(self.peek(0), Some(c) if c.is_ascii_digit()) {
                    body.push(self.advance().unwrap());
                }
                while matches!(self.peek(0), Some(' ') | Some('\t')) {
                    body.push(self.advance().unwrap());
                }
                if self.peek(0) == Some('-') {
                    body.push(self.advance().unwrap());
                    while matches!(self.peek(0), Some(' ') | Some('\t')) {
                        body.push(self.advance().unwrap());
                    }
                    while matches!(self.peek(0), Some(c) if c.is_ascii_digit()) {
                        body.push(self.advance().unwrap());
                    }
                    while matches!(self.peek(0), Some(' ') | Some('\t')) {
                        body.push(self.advance().unwrap());
                    }
                }
            }

            while matches!(self.peek(0), Some(' ') | Some('\t')) {
                body.push(self.advance().unwrap());
            }
            match self.peek(0) {
                Some(c) if c == delimiter => {
                    body.push(self.advance().unwrap());
                    break;
                }
                Some(',') => {
                    body.push(self.advance().unwrap());
                }
                _ => return SedToken::Error("a cut selector is invalid".to_string()),
            }
        }

        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        while matches!(self.peek(0), Some('f') | Some('w') | Some('d')) {
            body.push(self.advance().unwrap());
        }

        SedToken::Cut(body)
    }

    fn read_text_command(&mut self, cmd: char) -> SedToken {
        let mut has_backslash = false;
        if self.peek(0) == Some('\\') {
            if let Some(next) = self.peek(1) {
                if matches!(next, '\n' | ' ' | '\t') {
                    has_backslash = true;
                    self.advance();
                }
            }
        }

        if matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }

        if self.peek(0) == Some('\\') {
            if let Some(next) = self.peek(1) {
                if matches!(next, ' ' | '\t') {
                    self.advance();
                }
            }
        }

        if has_backslash && self.peek(0) == Some('\n') {
            self.advance();
        }

        let mut text = String::new();
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();

            if ch == '\n' {
                if text.ends_with('\\') {
                    text.pop();
                    text.push('\n');
                    self.advance();
                    continue;
                }
                break;
            }

            if ch == '\\' {
                if let Some(next) = self.peek(1) {
                    match next {
                        'n' => {
                            text.push('\n');
                            self.advance();
                            self.advance();
                            continue;
                        }
                        't' => {
                            text.push('\t');
                            self.advance();
                            self.advance();
                            continue;
                        }
                        'r' => {
                            text.push('\r');
                            self.advance();
                            self.advance();
                            continue;
                        }
                        _ => {}
                    }
                }
            }

            text.push(self.advance().unwrap());
        }

        SedToken::TextCmd { cmd, text }
    }

    fn read_branch_command<F>(&mut self, make_token: F) -> SedToken
    where
        F: FnOnce(Option<String>) -> SedToken,
    {
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut label = String::new();
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if matches!(ch, ' ' | '\t' | '\n' | ';' | '}' | '{') {
                break;
            }
            label.push(self.advance().unwrap());
        }
        make_token(if label.is_empty() { None } else { Some(label) })
    }

    fn read_file_command<F>(&mut self, make_token: F) -> SedToken
    where
        F: FnOnce(String) -> SedToken,
    {
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut filename = String::new();
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if matches!(ch, '\n' | ';') {
                break;
            }
            filename.push(self.advance().unwrap());
        }
        make_token(filename.trim().to_string())
    }

    fn read_execute(&mut self) -> SedToken {
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut command = String::new();
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if matches!(ch, '\n' | ';') {
                break;
            }
            command.push(self.advance().unwrap());
        }
        let trimmed = command.trim().to_string();
        SedToken::Execute(if trimmed.is_empty() { None } else { Some(trimmed) })
    }

    fn read_version(&mut self) -> SedToken {
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut version = String::new();
        while !self.is_at_end() {
            let ch = self.peek(0).unwrap();
            if matches!(ch, ' ' | '\t' | '\n' | ';' | '}' | '{') {
                break;
            }
            version.push(self.advance().unwrap());
        }
        SedToken::Version(if version.is_empty() { None } else { Some(version) })
    }

    fn read_list(&mut self) -> SedToken {
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut width = String::new();
        while let Some(ch) = self.peek(0) {
            if Self::is_digit(ch) {
                width.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        SedToken::List(width.parse::<u32>().ok())
    }
}

pub fn tokenize(input: &str) -> Vec<SedToken> {
    let mut lexer = SedLexer::new(input);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }

    tokens.push(SedToken::Eof);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_substitute() {
        let tokens = tokenize("s/foo/bar/g");
        assert!(matches!(&tokens[0], SedToken::Substitute { pattern, replacement, flags, .. }
            if pattern == "foo" && replacement == "bar" && flags == "g"));
    }

    #[test]
    fn tokenize_substitute_write_flag() {
        let tokens = tokenize("s/foo/bar/w out.txt");
        assert!(matches!(&tokens[0], SedToken::Substitute { wfile: Some(f), .. } if f == "out.txt"));
    }

    #[test]
    fn tokenize_custom_delimiter() {
        let tokens = tokenize("s#foo#bar#");
        assert!(matches!(&tokens[0], SedToken::Substitute { pattern, .. } if pattern == "foo"));
    }

    #[test]
    fn backslash_delimiter_is_rejected() {
        let tokens = tokenize("s\\foo\\bar\\");
        assert!(matches!(&tokens[0], SedToken::Error(_)));
    }

    #[test]
    fn tokenize_address_range() {
        let tokens = tokenize("1,3d");
        assert!(matches!(&tokens[0], SedToken::Number(1)));
        assert!(matches!(&tokens[1], SedToken::Comma));
        assert!(matches!(&tokens[2], SedToken::Number(3)));
        assert!(matches!(&tokens[3], SedToken::Command('d')));
    }

    #[test]
    fn tokenize_pattern_address() {
        let tokens = tokenize("/foo/d");
        assert!(matches!(&tokens[0], SedToken::Pattern(p) if p == "foo"));
        assert!(matches!(&tokens[1], SedToken::Command('d')));
    }

    #[test]
    fn tokenize_step_address() {
        let tokens = tokenize("0~2p");
        assert!(matches!(&tokens[0], SedToken::Step { first: 0, step: 2 }));
    }

    #[test]
    fn tokenize_relative_offset() {
        let tokens = tokenize("1,+3d");
        assert!(matches!(&tokens[2], SedToken::RelativeOffset(3)));
    }

    #[test]
    fn tokenize_multiple_offset() {
        let tokens = tokenize("1,~3d");
        assert!(matches!(&tokens[2], SedToken::Multiple(3)));
    }

    #[test]
    fn tokenize_cut_subcommand() {
        let tokens = tokenize("C/f1,f3-5/");
        assert!(matches!(&tokens[0], SedToken::Cut(s) if s == "/f1,f3-5/"));
    }

    #[test]
    fn tokenize_text_command() {
        let tokens = tokenize("a\\ text");
        assert!(matches!(&tokens[0], SedToken::TextCmd { cmd: 'a', text } if text == "text"));
    }

    #[test]
    fn tokenize_branch_with_and_without_label() {
        let tokens = tokenize("b loop");
        assert!(matches!(&tokens[0], SedToken::Branch { label: Some(l) } if l == "loop"));
        let tokens = tokenize("b");
        assert!(matches!(&tokens[0], SedToken::Branch { label: None }));
    }

    #[test]
    fn tokenize_label() {
        let tokens = tokenize(":loop");
        assert!(matches!(&tokens[0], SedToken::LabelDef(l) if l == "loop"));
    }

    #[test]
    fn tokenize_transliterate() {
        let tokens = tokenize("y/abc/xyz/");
        assert!(matches!(&tokens[0], SedToken::Transliterate { source, dest }
            if source == "abc" && dest == "xyz"));
    }

    #[test]
    fn tokenize_grouped() {
        let tokens = tokenize("{ p; d }");
        assert!(matches!(&tokens[0], SedToken::LBrace));
        assert!(matches!(&tokens[1], SedToken::Command('p')));
        assert!(matches!(&tokens[2], SedToken::Semicolon));
        assert!(matches!(&tokens[3], SedToken::Command('d')));
        assert!(matches!(&tokens[4], SedToken::RBrace));
    }

    #[test]
    fn tokenize_negation_and_dollar() {
        let tokens = tokenize("2!d");
        assert!(matches!(&tokens[0], SedToken::Number(2)));
        assert!(matches!(&tokens[1], SedToken::Negation));
        assert!(matches!(&tokens[2], SedToken::Command('d')));

        let tokens = tokenize("$d");
        assert!(matches!(&tokens[0], SedToken::Dollar));
    }

    #[test]
    fn tokenize_list_with_width() {
        let tokens = tokenize("l 40");
        assert!(matches!(&tokens[0], SedToken::List(Some(40))));
    }
}

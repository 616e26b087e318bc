//! Line and token scanning for score text.
//!
//! Splits the source into lines and each line into whitespace-delimited
//! tokens, remembering where every token starts so the parser can report
//! dropped tokens precisely.

/// A token with its position in the source (1-based line and column)
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken<'a> {
    pub text: &'a str,
    pub line: usize,
    pub column: usize,
}

/// A non-blank source line
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine<'a> {
    pub text: &'a str,
    pub number: usize,
}

/// Lexer for score text
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// All lines that contain something other than whitespace.
    pub fn lines(&self) -> Vec<SourceLine<'a>> {
        self.input
            .lines()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| SourceLine { text, number: i + 1 })
            .collect()
    }

    /// Split one line into tokens on runs of whitespace.
    pub fn tokenize(line: &SourceLine<'a>) -> Vec<LocatedToken<'a>> {
        let mut tokens = Vec::new();
        let mut start: Option<(usize, usize)> = None; // (byte offset, column)
        let mut column = 1;

        for (offset, c) in line.text.char_indices() {
            if c.is_whitespace() {
                if let Some((begin, begin_column)) = start.take() {
                    tokens.push(LocatedToken {
                        text: &line.text[begin..offset],
                        line: line.number,
                        column: begin_column,
                    });
                }
            } else if start.is_none() {
                start = Some((offset, column));
            }
            column += 1;
        }

        if let Some((begin, begin_column)) = start {
            tokens.push(LocatedToken {
                text: &line.text[begin..],
                line: line.number,
                column: begin_column,
            });
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_are_skipped() {
        let lexer = Lexer::new("\n1-1\n   \n2-1\n");
        let lines = lexer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 2);
        assert_eq!(lines[1].number, 4);
    }

    #[test]
    fn test_token_columns() {
        let line = SourceLine {
            text: "  1-1\t\t·2-0.5   3-1\\5-1",
            number: 3,
        };
        let tokens = Lexer::tokenize(&line);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["1-1", "·2-0.5", "3-1\\5-1"]);
        assert_eq!(tokens[0].column, 3);
        assert_eq!(tokens[1].column, 8);
        assert_eq!(tokens[2].column, 17);
        assert!(tokens.iter().all(|t| t.line == 3));
    }
}

use std::fmt::{self, Display};

use super::lexer::{TokenIter, TokenKind};

/// A RINF command, the leading `.` token of a line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `.HEA`
    Header,
    /// `.APP`
    App,
    /// `.ADD_COM`
    AddComponent,
    /// `.ATT_COM`
    AttachComponent,
    /// `.ADD_TER`
    AddTerminal,
    /// `.TER`
    Terminal,
    /// `.END`
    End,
    Other(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::Header => ".HEA",
            Command::App => ".APP",
            Command::AddComponent => ".ADD_COM",
            Command::AttachComponent => ".ATT_COM",
            Command::AddTerminal => ".ADD_TER",
            Command::Terminal => ".TER",
            Command::End => ".END",
            Command::Other(s) => s,
        }
    }
}

impl From<&str> for Command {
    fn from(value: &str) -> Self {
        match value {
            ".HEA" => Command::Header,
            ".APP" => Command::App,
            ".ADD_COM" => Command::AddComponent,
            ".ATT_COM" => Command::AttachComponent,
            ".ADD_TER" => Command::AddTerminal,
            ".TER" => Command::Terminal,
            ".END" => Command::End,
            s => Command::Other(s.to_owned()),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tokenized line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub command: Option<Command>,
    pub params: Vec<String>,
}

impl Line {
    /// Split a line on spaces, keeping quoted text together.
    ///
    /// Quotes are dropped from the output and an unterminated quote runs to
    /// the end of the line. The last token is always kept, even when empty.
    pub fn tokenize(input: &str) -> Self {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut quoted = false;

        for token in TokenIter::new(input) {
            let text = &input[token.span];
            match token.kind {
                TokenKind::Quote => quoted = !quoted,
                TokenKind::Separator if quoted => current.push_str(text),
                TokenKind::Separator => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                TokenKind::Text => current.push_str(text),
            }
        }
        tokens.push(current);

        let command = if tokens.first().is_some_and(|t| t.starts_with('.')) {
            Some(Command::from(tokens.remove(0).as_str()))
        } else {
            None
        };
        Line {
            command,
            params: tokens,
        }
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl From<&str> for Line {
    fn from(input: &str) -> Self {
        Line::tokenize(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(
        r#".ADD_COM  "Resistor   Network" "Resistor   Network""#,
        Some(".ADD_COM"),
        &["Resistor   Network", "Resistor   Network"]
    )]
    #[case(r#".ADD_COM RN22C "RN4" "RN4""#, Some(".ADD_COM"), &["RN22C", "RN4", "RN4"])]
    #[case(
        r#".ATT_COM RN22C "Comment" "Resistors Network""#,
        Some(".ATT_COM"),
        &["RN22C", "Comment", "Resistors Network"]
    )]
    #[case(r#".ADD_TER U10 D4 "NetU10_D4""#, Some(".ADD_TER"), &["U10", "D4", "NetU10_D4"])]
    #[case(".TER U11 D4", Some(".TER"), &["U11", "D4"])]
    #[case(
        r#".ADD_COM     C11     "100nF/50V/5%/X7R/C0603"     "C_0603""#,
        Some(".ADD_COM"),
        &["C11", "100nF/50V/5%/X7R/C0603", "C_0603"]
    )]
    #[case(
        r#".ADD_TER   C11   2     "Net-(C11-Pad2)""#,
        Some(".ADD_TER"),
        &["C11", "2", "Net-(C11-Pad2)"]
    )]
    #[case(".TER       C28   2", Some(".TER"), &["C28", "2"])]
    #[case("           R5   1", None, &["R5", "1"])]
    #[case(".APP Protel 2004", Some(".APP"), &["Protel", "2004"])]
    #[case(".HEA", Some(".HEA"), &[])]
    #[case("", None, &[""])]
    #[case("a ", None, &["a", ""])]
    #[case(r#".ATT_COM R1 "open quote"#, Some(".ATT_COM"), &["R1", "open quote"])]
    #[case(r#"x"y z"w"#, None, &["xy zw"])]
    fn tokenize(#[case] input: &str, #[case] command: Option<&str>, #[case] params: &[&str]) {
        let line = Line::tokenize(input);
        assert_eq!(line.command.as_ref().map(Command::as_str), command);
        assert_eq!(line.params, params);
    }

    #[test]
    fn command_only_line_has_no_params() {
        let line = Line::tokenize(".END");
        assert_eq!(line.command, Some(Command::End));
        assert!(line.params.is_empty());
    }

    #[test]
    fn unknown_command_is_kept() {
        let line = Line::from(".TIM 2024 01 15");
        assert_eq!(line.command, Some(Command::Other(".TIM".to_owned())));
        assert_eq!(line.param(0), Some("2024"));
        assert_eq!(line.param(3), None);
    }
}

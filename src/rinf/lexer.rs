use logos::{Logos, SpannedIter};

pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) span: logos::Span,
}

pub(super) struct TokenIter<'a> {
    iter: SpannedIter<'a, LogosTokenKind>,
}

impl<'a> TokenIter<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            iter: LogosTokenKind::lexer(input).spanned(),
        }
    }
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let (kind, span) = self.iter.next()?;
        let kind = match kind {
            Ok(LogosTokenKind::Quote) => TokenKind::Quote,
            Ok(LogosTokenKind::Separator) => TokenKind::Separator,
            Ok(LogosTokenKind::Text) => TokenKind::Text,
            // Anything the lexer does not know is kept verbatim
            Err(_) => TokenKind::Text,
        };
        Some(Token { kind, span })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TokenKind {
    Quote,
    Separator,
    Text,
}

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
enum LogosTokenKind {
    #[token("\"")]
    Quote,
    #[token(" ")]
    Separator,
    #[regex(r#"[^" ]+"#)]
    Text,
}

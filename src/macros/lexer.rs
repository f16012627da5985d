use logos::Logos;

#[derive(Logos, Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Piece {
    #[regex(r"@[A-Za-z0-9_]+")]
    Macro,
    #[regex(r"[^@]+")]
    Text,
    // an '@' with nothing macro-like after it
    #[token("@")]
    At,

    #[error]
    Error,
}

/// Splits `s` into macro tokens and the text between them, in order.
pub(crate) fn pieces(s: &str) -> impl Iterator<Item = (Piece, &str)> + '_ {
    Piece::lexer(s)
        .spanned()
        .map(move |(piece, span)| (piece, &s[span]))
}

pub(crate) fn has_macro(s: &str) -> bool {
    pieces(s).any(|(piece, _)| piece == Piece::Macro)
}

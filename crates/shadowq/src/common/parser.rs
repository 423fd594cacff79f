use std::fmt::{Debug, Display, Formatter};

use nom::character::complete::{char, digit0, digit1, multispace0};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::error::{ErrorKind, FromExternalError, ParseError};
use nom::sequence::{pair, terminated};
use nom::{IResult, Parser};

pub enum ParserError<I> {
    Custom(anyhow::Error),
    Nom(I, ErrorKind),
}

impl<I: Debug> Debug for ParserError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(error) => f.write_fmt(format_args!("{error}")),
            Self::Nom(input, error) => f.write_fmt(format_args!(
                "unexpected input {input:?}, expected {}",
                error.description()
            )),
        }
    }
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserError::Nom(input, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I: Display, E: Into<anyhow::Error>> FromExternalError<I, E> for ParserError<I> {
    fn from_external_error(input: I, _: ErrorKind, error: E) -> Self {
        ParserError::Custom(anyhow::anyhow!("'{}': {}", input, error.into()))
    }
}

pub fn format_parse_error<I: Debug>(error: nom::Err<ParserError<I>>) -> anyhow::Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => anyhow::anyhow!("{:?}", e),
        nom::Err::Incomplete(_) => anyhow::anyhow!("incomplete input"),
    }
}

pub type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<&'a str>>;

pub fn p_u32(input: &str) -> NomResult<u32> {
    map_res(digit1, |number: &str| number.parse::<u32>())(input)
}

/// Unsigned decimal number with an optional fractional part (`12`, `12.`, `12.5`).
pub fn p_decimal(input: &str) -> NomResult<f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        |number: &str| number.parse::<f64>(),
    )(input)
}

/// Runs `parser` on the whole input, surrounding whitespace is allowed.
pub fn consume_all<'a, T>(
    parser: impl Parser<&'a str, T, ParserError<&'a str>>,
    input: &'a str,
) -> anyhow::Result<T> {
    all_consuming(terminated(parser, multispace0))(input.trim_start())
        .map(|(_, value)| value)
        .map_err(format_parse_error)
}

#[cfg(test)]
mod tests {
    use super::{consume_all, p_decimal, p_u32};

    #[test]
    fn test_parse_u32() {
        assert_eq!(consume_all(p_u32, "0").unwrap(), 0);
        assert_eq!(consume_all(p_u32, " 42 ").unwrap(), 42);
        assert!(consume_all(p_u32, "4x").is_err());
        assert!(consume_all(p_u32, "99999999999").is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(consume_all(p_decimal, "1700000000").unwrap(), 1_700_000_000.0);
        assert_eq!(consume_all(p_decimal, "12.25").unwrap(), 12.25);
        assert_eq!(consume_all(p_decimal, "12.").unwrap(), 12.0);
        assert!(consume_all(p_decimal, ".5").is_err());
        assert!(consume_all(p_decimal, "-1").is_err());
    }
}

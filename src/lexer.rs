// Whitespace tokenizer for table lines

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_till},
    character::complete::{char, multispace1, one_of},
    combinator::recognize,
    multi::{many1, separated_list0},
    sequence::delimited,
    IResult,
};

/// A quoted run including its quotes, e.g. `"a b"`
fn quoted(q: char) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| recognize(delimited(char(q), take_till(move |c| c == q), char(q)))(input)
}

/// One field: any mix of quoted runs and bare characters up to unquoted whitespace.
/// A stray (unterminated) quote is taken as an ordinary character.
fn token(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((
        quoted('"'),
        quoted('\''),
        is_not(" \t\r\n\"'"),
        recognize(one_of("\"'")),
    ))))(input)
}

/// Split a line on whitespace runs that are not inside quotes.
///
/// Quotes are kept on the tokens; coercion strips them later.
pub fn tokenize(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match separated_list0(multispace1, token)(trimmed) {
        Ok((_, tokens)) => tokens.into_iter().map(String::from).collect(),
        Err(_) => trimmed.split_whitespace().map(String::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        assert_eq!(tokenize("a  b\tc\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quoted_fields_stay_whole() {
        assert_eq!(
            tokenize("1 \"two words\" 'x y' 3"),
            vec!["1", "\"two words\"", "'x y'", "3"]
        );
    }

    #[test]
    fn test_quote_inside_token() {
        assert_eq!(tokenize("name=\"a b\" c"), vec!["name=\"a b\"", "c"]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(tokenize("\"a b"), vec!["\"a", "b"]);
    }

    #[test]
    fn test_empty_line() {
        assert!(tokenize("   \n").is_empty());
    }
}

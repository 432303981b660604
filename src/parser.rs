use std::collections::BTreeMap;
use std::error;
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::CharIndices;

use crate::utils::get_line_col_char;
use crate::value::{Key, Value};

/// A malformed document. Parsing never panics; every structural, literal,
/// numeric-format, and key-kind violation surfaces as one of these.
#[derive(Debug, PartialEq)]
pub struct ParsingError {
    pub index: usize, // byte offset
    pub message: String,
    pub lineno: usize,
    pub colno: usize,
    pub char_index: usize, // character offset
}

impl Display for ParsingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ParsingError: {}: line {} column {} (char {})",
            self.message, self.lineno, self.colno, self.char_index
        )
    }
}

impl error::Error for ParsingError {}

/// One parse call owns one of these; there is no shared scan state, so
/// separate documents parse independently (including reentrantly).
struct Parser<'input> {
    text: &'input str,
    chars: Peekable<CharIndices<'input>>,
}

impl<'input> Parser<'input> {
    fn new(text: &'input str) -> Self {
        Parser { text, chars: text.char_indices().peekable() }
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn position(&mut self) -> usize {
        match self.peek() {
            Some((idx, _)) => idx,
            None => self.text.len(),
        }
    }

    fn make_error(&self, message: String, index: usize) -> ParsingError {
        let (lineno, colno, char_index) = get_line_col_char(self.text, index);
        ParsingError { index, message, lineno, colno, char_index }
    }

    /// Only the space character is skippable; the ingestion step removes
    /// line breaks before text reaches the parser, and any other
    /// whitespace byte is a parse error at the next dispatch.
    fn skip_spaces(&mut self) {
        while let Some((_, ' ')) = self.peek() {
            self.advance();
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParsingError> {
        match self.peek() {
            None => {
                let idx = self.text.len();
                Err(self.make_error("unexpected end of input, was expecting a value".to_string(), idx))
            }
            Some((_, '[')) => self.parse_array(),
            Some((_, '{')) => self.parse_dictionary(),
            Some((_, '"')) => Ok(Value::String(self.parse_string()?)),
            Some((_, 'n')) => self.parse_literal("null", Value::Null),
            Some((_, 't')) => self.parse_literal("true", Value::Bool(true)),
            Some((_, 'f')) => self.parse_literal("false", Value::Bool(false)),
            Some((_, c)) if c.is_ascii_digit() => Ok(Value::Number(self.parse_number()?)),
            Some((idx, c)) => {
                Err(self.make_error(format!("unexpected character {:?}, was expecting a value", c), idx))
            }
        }
    }

    fn parse_literal(&mut self, literal: &'static str, value: Value) -> Result<Value, ParsingError> {
        for expected in literal.chars() {
            match self.advance() {
                Some((_, c)) if c == expected => {}
                Some((idx, c)) => {
                    return Err(self.make_error(
                        format!("invalid literal, expected {:?} but found {:?}", literal, c),
                        idx,
                    ));
                }
                None => {
                    let idx = self.text.len();
                    return Err(self.make_error(
                        format!("unexpected end of input in literal {:?}", literal),
                        idx,
                    ));
                }
            }
        }
        Ok(value)
    }

    fn parse_string(&mut self) -> Result<String, ParsingError> {
        let start_idx = match self.advance() {
            Some((idx, '"')) => idx,
            Some((idx, c)) => {
                return Err(self.make_error(format!("expected '\"', got {:?}", c), idx));
            }
            None => {
                let idx = self.text.len();
                return Err(self.make_error("unexpected end of input, was expecting a string".to_string(), idx));
            }
        };
        let mut text = String::new();
        loop {
            match self.advance() {
                None => {
                    break Err(self.make_error("unterminated string starting at".to_string(), start_idx));
                }
                Some((_, '"')) => break Ok(text),
                Some((_, '\\')) => {
                    // backslash copies the next character verbatim; \" and
                    // \\ work, \n or \uXXXX pass through undecoded
                    match self.advance() {
                        Some((_, escaped)) => text.push(escaped),
                        None => {
                            break Err(self.make_error(
                                "unterminated string starting at".to_string(),
                                start_idx,
                            ));
                        }
                    }
                }
                Some((_, c)) => text.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParsingError> {
        let first = match self.advance() {
            Some((_, c)) if c.is_ascii_digit() => c,
            Some((idx, c)) => {
                return Err(self.make_error(
                    format!("expected a digit to start a number, got {:?}", c),
                    idx,
                ));
            }
            None => {
                let idx = self.text.len();
                return Err(self.make_error("unexpected end of input, was expecting a number".to_string(), idx));
            }
        };
        // digits accumulate left to right; a counter tracks how many came
        // after the decimal point and the result is divided back down at
        // the end (no exponents, no signs)
        let mut value = f64::from(first as u8 - b'0');
        let mut since_decimal: i32 = -1;
        while let Some((idx, c)) = self.peek() {
            if c.is_ascii_digit() {
                if since_decimal != -1 {
                    since_decimal += 1;
                }
                value = value * 10.0 + f64::from(c as u8 - b'0');
                self.advance();
            } else if c == '.' {
                if since_decimal != -1 {
                    return Err(self.make_error("more than one decimal point in number".to_string(), idx));
                }
                since_decimal = 0;
                self.advance();
            } else {
                break;
            }
        }
        for _ in 0..since_decimal {
            value /= 10.0;
        }
        Ok(value)
    }

    fn parse_array(&mut self) -> Result<Value, ParsingError> {
        match self.advance() {
            Some((_, '[')) => {}
            _ => {
                let idx = self.position();
                return Err(self.make_error("expected '[' at start of array".to_string(), idx));
            }
        }
        let mut values: Vec<Value> = Vec::new();
        self.skip_spaces();
        if let Some((_, ']')) = self.peek() {
            self.advance();
            return Ok(Value::Array(values));
        }
        loop {
            self.skip_spaces();
            values.push(self.parse_value()?);
            self.skip_spaces();
            match self.advance() {
                Some((_, ']')) => break Ok(Value::Array(values)),
                Some((_, ',')) => continue,
                Some((idx, c)) => {
                    break Err(self.make_error(
                        format!("expected ',' or ']' after array element, got {:?}", c),
                        idx,
                    ));
                }
                None => {
                    let idx = self.text.len();
                    break Err(self.make_error("unexpected end of input inside array".to_string(), idx));
                }
            }
        }
    }

    /// Keys parse permissively (any non-literal production), then anything
    /// that is not String- or Number-kinded is rejected: the grammar is a
    /// superset of standard JSON, the data model is not.
    fn parse_key(&mut self) -> Result<Key, ParsingError> {
        match self.peek() {
            Some((_, '"')) => Ok(Key::string(self.parse_string()?)),
            Some((idx, '[')) | Some((idx, '{')) => {
                let value = self.parse_value()?;
                Err(self.make_error(
                    format!("dictionary keys must be strings or numbers, got {}", value.kind()),
                    idx,
                ))
            }
            _ => Ok(Key::number(self.parse_number()?)),
        }
    }

    fn parse_dictionary(&mut self) -> Result<Value, ParsingError> {
        match self.advance() {
            Some((_, '{')) => {}
            _ => {
                let idx = self.position();
                return Err(self.make_error("expected '{' at start of dictionary".to_string(), idx));
            }
        }
        let mut entries: BTreeMap<Key, Value> = BTreeMap::new();
        self.skip_spaces();
        if let Some((_, '}')) = self.peek() {
            self.advance();
            return Ok(Value::Dictionary(entries));
        }
        loop {
            self.skip_spaces();
            let key = self.parse_key()?;
            self.skip_spaces();
            match self.advance() {
                Some((_, ':')) => {}
                Some((idx, c)) => {
                    break Err(self.make_error(
                        format!("expected ':' after dictionary key, got {:?}", c),
                        idx,
                    ));
                }
                None => {
                    let idx = self.text.len();
                    break Err(self.make_error("unexpected end of input inside dictionary".to_string(), idx));
                }
            }
            self.skip_spaces();
            let value = self.parse_value()?;
            // a later key with the same encoding replaces the value only;
            // the first key's kind is retained
            entries.insert(key, value);
            self.skip_spaces();
            match self.advance() {
                Some((_, '}')) => break Ok(Value::Dictionary(entries)),
                Some((_, ',')) => continue,
                Some((idx, c)) => {
                    break Err(self.make_error(
                        format!("expected ',' or '}}' after dictionary entry, got {:?}", c),
                        idx,
                    ));
                }
                None => {
                    let idx = self.text.len();
                    break Err(self.make_error("unexpected end of input inside dictionary".to_string(), idx));
                }
            }
        }
    }

    /// A document is one value production with optional surrounding spaces;
    /// bare scalars at top level are accepted the same as containers.
    /// Trailing content after the value is an error rather than being
    /// silently dropped.
    fn parse_document(&mut self) -> Result<Value, ParsingError> {
        self.skip_spaces();
        if self.peek().is_none() {
            let idx = self.text.len();
            return Err(self.make_error("input contains no value".to_string(), idx));
        }
        let value = self.parse_value()?;
        self.skip_spaces();
        match self.peek() {
            None => Ok(value),
            Some((idx, c)) => {
                Err(self.make_error(format!("unexpected trailing content starting with {:?}", c), idx))
            }
        }
    }
}

pub fn from_str(text: &str) -> Result<Value, ParsingError> {
    Parser::new(text).parse_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Kind;

    #[test]
    fn test_empty_object() {
        let res = from_str("{}").unwrap();
        assert_eq!(res, Value::new_dictionary());
    }

    #[test]
    fn test_empty_array() {
        let res = from_str("[]").unwrap();
        assert_eq!(res, Value::new_array());
    }

    #[test]
    fn test_object() {
        let res = from_str("{\"foo\": \"bar\"}").unwrap();
        let mut expected = Value::new_dictionary();
        expected.insert("foo", "bar").unwrap();
        assert_eq!(res, expected);
    }

    #[test]
    fn test_array() {
        let res = from_str("[1,2,3]").unwrap();
        let mut expected = Value::new_array();
        expected.append(1.0).unwrap();
        expected.append(2.0).unwrap();
        expected.append(3.0).unwrap();
        assert_eq!(res, expected);
    }

    #[test]
    fn test_top_level_scalars() {
        assert_eq!(from_str("1").unwrap(), Value::Number(1.0));
        assert_eq!(from_str("\"foo\"").unwrap(), Value::from("foo"));
        assert_eq!(from_str("null").unwrap(), Value::Null);
        assert_eq!(from_str("true").unwrap(), Value::Bool(true));
        assert_eq!(from_str("false").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_literals_inside_array() {
        let res = from_str("[true,false,null]").unwrap();
        let mut expected = Value::new_array();
        expected.append(true).unwrap();
        expected.append(false).unwrap();
        expected.append(Value::Null).unwrap();
        assert_eq!(res, expected);
    }

    #[test]
    fn test_misspelled_literal() {
        from_str("nul").unwrap_err();
        from_str("[tru]").unwrap_err();
        from_str("flase").unwrap_err();
    }

    #[test]
    fn test_number_with_decimal() {
        assert_eq!(from_str("3.25").unwrap(), Value::Number(3.25));
        assert_eq!(from_str("12.5").unwrap(), Value::Number(12.5));
    }

    #[test]
    fn test_number_two_decimal_points() {
        let err = from_str("1.2.3").unwrap_err();
        assert!(err.message.contains("more than one decimal point"));
    }

    #[test]
    fn test_number_no_sign_or_exponent() {
        from_str("-1").unwrap_err();
        from_str("+1").unwrap_err();
        // 'e' ends the digit run and then fails as trailing content
        from_str("1e5").unwrap_err();
    }

    #[test]
    fn test_string_escapes_copy_verbatim() {
        assert_eq!(from_str(r#""a\"b""#).unwrap(), Value::from("a\"b"));
        assert_eq!(from_str(r#""a\\b""#).unwrap(), Value::from("a\\b"));
        // \n is not decoded; the backslash copies the 'n' through
        assert_eq!(from_str(r#""a\nb""#).unwrap(), Value::from("anb"));
    }

    #[test]
    fn test_string_preserves_raw_line_break() {
        assert_eq!(from_str("\"a\nb\"").unwrap(), Value::from("a\nb"));
    }

    #[test]
    fn test_unterminated_string() {
        from_str("\"abc").unwrap_err();
        from_str("\"abc\\").unwrap_err();
    }

    #[test]
    fn test_spaces_are_the_only_whitespace() {
        let res = from_str("{ \"a\" : 1 , \"b\" : [ 2 , 3 ] }").unwrap();
        assert_eq!(res.serialize_compact(), "{\"a\":1,\"b\":[2,3]}");
        from_str("\t1").unwrap_err();
        from_str("[1,\t2]").unwrap_err();
        from_str("{\"a\":\n1}").unwrap_err();
    }

    #[test]
    fn test_number_keys() {
        let res = from_str("{1:\"a\",2.5:\"b\"}").unwrap();
        assert_eq!(res.serialize_compact(), "{1:\"a\",2.5:\"b\"}");
        let keys: Vec<Kind> = res.keys().unwrap().iter().map(|k| k.kind()).collect();
        assert_eq!(keys, vec![Kind::Number, Kind::Number]);
    }

    #[test]
    fn test_container_keys_are_kind_violations() {
        let err = from_str("{[1]:2}").unwrap_err();
        assert!(err.message.contains("keys must be strings or numbers"));
        let err = from_str("{{}:2}").unwrap_err();
        assert!(err.message.contains("keys must be strings or numbers"));
    }

    #[test]
    fn test_duplicate_keys_last_value_wins() {
        let res = from_str("{\"a\":1,\"a\":2}").unwrap();
        assert_eq!(res.size().unwrap(), 1);
        assert_eq!(res.get("a").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn test_colliding_key_kinds_first_kind_wins() {
        let res = from_str("{1:\"x\",\"1\":\"y\"}").unwrap();
        assert_eq!(res.size().unwrap(), 1);
        assert_eq!(res.serialize_compact(), "{1:\"y\"}");
    }

    #[test]
    fn test_missing_value() {
        let err = from_str("{\"a\":}").unwrap_err();
        assert!(err.message.contains("was expecting a value"));
    }

    #[test]
    fn test_missing_colon() {
        let err = from_str("{\"a\" 1}").unwrap_err();
        assert!(err.message.contains("expected ':'"));
    }

    #[test]
    fn test_missing_comma() {
        from_str("[1 2]").unwrap_err();
        from_str("{\"a\":1 \"b\":2}").unwrap_err();
    }

    #[test]
    fn test_unclosed_containers() {
        from_str("[1,2").unwrap_err();
        from_str("{\"a\":1").unwrap_err();
        from_str("{\"a\"").unwrap_err();
    }

    #[test]
    fn test_trailing_comma_rejected() {
        from_str("[1,]").unwrap_err();
        from_str("{\"a\":1,}").unwrap_err();
    }

    #[test]
    fn test_empty_input() {
        let err = from_str("").unwrap_err();
        assert!(err.message.contains("no value"));
        from_str("   ").unwrap_err();
    }

    #[test]
    fn test_trailing_content() {
        let err = from_str("1,2").unwrap_err();
        assert!(err.message.contains("trailing content"));
        from_str("1]").unwrap_err();
        from_str("{} {}").unwrap_err();
    }

    #[test]
    fn test_error_position() {
        let err = from_str("[1,x]").unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.lineno, 1);
        assert_eq!(err.colno, 4);
    }

    #[test]
    fn test_nested_structures() {
        let res = from_str("{\"a\":{\"b\":[1,{\"c\":null}]}}").unwrap();
        let inner = res.get("a").unwrap().get("b").unwrap();
        assert_eq!(inner.size().unwrap(), 2);
        assert_eq!(inner.get(1.0).unwrap().get("c"), Some(&Value::Null));
    }

    #[test]
    fn test_compact_round_trip() {
        let docs = [
            "{\"a\":1,\"b\":[2,3],\"c\":{\"d\":\"e\"}}",
            "[0,1,2,3,4,5,6,7,8,9,10]",
            "[[],{},null,true,false,\"\"]",
            "{1:\"a\",\"b\":2.5}",
        ];
        for doc in docs {
            let first = from_str(doc).unwrap().serialize_compact();
            let second = from_str(&first).unwrap().serialize_compact();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_number_stability() {
        let parsed = from_str("3.25").unwrap();
        let text = parsed.serialize_compact();
        assert_eq!(from_str(&text).unwrap().as_number(), Some(3.25));
    }

    #[test]
    fn test_escaping_round_trip() {
        let original = "say \"hi\" \\ bye";
        let value = Value::from(original);
        let text = value.serialize_compact();
        assert_eq!(from_str(&text).unwrap().as_str(), Some(original));
    }

    #[test]
    fn test_eleven_element_array_keeps_positional_order() {
        let text = "[0,1,2,3,4,5,6,7,8,9,10]";
        assert_eq!(from_str(text).unwrap().serialize_compact(), text);
    }

    #[test]
    fn test_dictionary_serializes_in_key_order_not_source_order() {
        let res = from_str("{\"b\":1,\"a\":2,\"10\":3,\"2\":4}").unwrap();
        assert_eq!(res.serialize_compact(), "{\"10\":3,\"2\":4,\"a\":2,\"b\":1}");
    }

    #[test]
    fn test_parses_are_independent() {
        // no shared cursor: an inner parse does not disturb an outer one
        let outer = from_str("[1,2,3]").unwrap();
        let inner = from_str("{\"a\":true}").unwrap();
        assert_eq!(outer.serialize_compact(), "[1,2,3]");
        assert_eq!(inner.serialize_compact(), "{\"a\":true}");
    }

    #[test]
    fn test_leading_zeros_accumulate() {
        assert_eq!(from_str("007").unwrap(), Value::Number(7.0));
    }
}

//! Readers installed by [`ReaderRegistry::with_defaults`](super::ReaderRegistry::with_defaults).

use std::any::type_name;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use super::{ReadContext, Reader};
use crate::error::ParseError;
use crate::types::{short_type_name, Value, ValueType};

/// Reads every consumed token as one space-joined `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringReader;

impl Reader for StringReader {
    fn parse(&self, _ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, ParseError> {
        Ok(Value::new(ctx.text()))
    }
}

// (language, yes words, no words)
const YES_NO: &[(&str, &[&str], &[&str])] = &[
    ("en", &["yes", "y", "on"], &["no", "n", "off"]),
    ("de", &["ja", "j"], &["nein", "n"]),
    ("fr", &["oui", "o"], &["non", "n"]),
    ("es", &["si", "sí", "s"], &["no", "n"]),
    ("nl", &["ja", "j"], &["nee", "n"]),
];

/// Reads `true`/`false` plus the source locale's yes/no words.
///
/// The locale tag is reduced to its language (`de-AT` → `de`). Unknown
/// languages fall back to English words.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolReader;

impl BoolReader {
    fn words(locale: &str) -> (&'static [&'static str], &'static [&'static str]) {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        YES_NO
            .iter()
            .find(|(lang, _, _)| *lang == language)
            .or_else(|| YES_NO.first())
            .map(|(_, yes, no)| (*yes, *no))
            .unwrap_or((&[], &[]))
    }
}

impl Reader for BoolReader {
    fn parse(&self, _ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, ParseError> {
        let literal = ctx.text();
        let lowered = literal.to_lowercase();
        let (yes, no) = Self::words(ctx.source().locale());

        if lowered == "true" || yes.contains(&lowered.as_str()) {
            Ok(Value::new(true))
        } else if lowered == "false" || no.contains(&lowered.as_str()) {
            Ok(Value::new(false))
        } else {
            Err(ParseError::new(literal, "bool"))
        }
    }

    fn suggest(&self, _ty: &ValueType, ctx: &ReadContext<'_>) -> Vec<String> {
        let (yes, no) = Self::words(ctx.source().locale());
        let prefix = ctx.prefix().to_lowercase();
        ["true", "false"]
            .iter()
            .chain(yes.first())
            .chain(no.first())
            .filter(|w| w.starts_with(&prefix))
            .map(|w| w.to_string())
            .collect()
    }
}

/// Reads a single token through the type's [`FromStr`] implementation.
pub struct FromStrReader<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrReader<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FromStrReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Reader for FromStrReader<T>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: Display,
{
    fn parse(&self, _ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, ParseError> {
        let literal = ctx.text();
        literal
            .parse::<T>()
            .map(Value::new)
            .map_err(|e| {
                ParseError::new(&literal, short_type_name(type_name::<T>()))
                    .with_reason(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::test_support::TestSource;
    use crate::invocation::CommandSource;
    use crate::token::{tokenize, Token};
    use std::sync::Arc;

    fn source_with_locale(locale: &str) -> Arc<dyn CommandSource> {
        let mut source = TestSource::of(crate::invocation::test_support::PLAYER);
        source.locale = locale.into();
        Arc::new(source)
    }

    fn read_bool(locale: &str, text: &str) -> Result<bool, ParseError> {
        let source = source_with_locale(locale);
        let tokens = tokenize(text);
        let ctx = ReadContext::new(&tokens, source.as_ref(), "confirm");
        BoolReader
            .parse(&ValueType::of::<bool>(), &ctx)
            .map(|v| *v.downcast_ref::<bool>().unwrap())
    }

    #[test]
    fn bool_accepts_literal_and_locale_words() {
        assert!(read_bool("en", "TRUE").unwrap());
        assert!(read_bool("en", "yes").unwrap());
        assert!(!read_bool("en", "off").unwrap());
        assert!(read_bool("de-AT", "Ja").unwrap());
        assert!(!read_bool("de", "nein").unwrap());
        assert!(read_bool("fr_CA", "oui").unwrap());
    }

    #[test]
    fn bool_words_do_not_leak_across_locales() {
        assert!(read_bool("en", "ja").is_err());
        let err = read_bool("de", "oui").unwrap_err();
        assert_eq!(err.literal, "oui");
    }

    #[test]
    fn unknown_locale_uses_english() {
        assert!(read_bool("xx", "yes").unwrap());
    }

    #[test]
    fn bool_suggestions_follow_locale() {
        let source = source_with_locale("de");
        let tokens = vec![Token::plain("")];
        let ctx = ReadContext::new(&tokens, source.as_ref(), "confirm");
        assert_eq!(
            BoolReader.suggest(&ValueType::of::<bool>(), &ctx),
            vec!["true", "false", "ja", "nein"]
        );

        let tokens = vec![Token::plain("f")];
        let ctx = ReadContext::new(&tokens, source.as_ref(), "confirm");
        assert_eq!(BoolReader.suggest(&ValueType::of::<bool>(), &ctx), vec!["false"]);
    }

    #[test]
    fn from_str_reports_reason() {
        let source = source_with_locale("en");
        let tokens = tokenize("12x");
        let ctx = ReadContext::new(&tokens, source.as_ref(), "count");
        let err = FromStrReader::<u32>::new()
            .parse(&ValueType::of::<u32>(), &ctx)
            .unwrap_err();
        assert_eq!(err.literal, "12x");
        assert_eq!(err.target, "u32");
        assert!(err.reason.is_some());
    }
}

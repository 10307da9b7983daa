//! Query parser for the case-addressing micro-language.

use crate::params::{
    is_valid_name_part, param_key_is_public, percent_decode, CaseParams, ParamValue,
    BAD_PARAM_VALUE_CHARS,
};
use crate::{Error, Result};

use super::{Query, BIG_SEPARATOR, PARAM_KV_SEPARATOR, PARAM_SEPARATOR, PATH_SEPARATOR, WILDCARD};

type ParseResult<T> = std::result::Result<T, String>;

const EXAMPLE_QUERIES: &str = "suite:a,b,* or suite:a,b:c,*";

/// Parse a query string into a [`Query`].
///
/// The input may be percent-encoded (as it is when it arrives through a URL).
pub fn parse_query(input: &str) -> Result<Query> {
    let decoded = percent_decode(input)
        .ok_or_else(|| Error::malformed(input, "invalid percent-encoding"))?;
    parse_decoded(&decoded).map_err(|reason| Error::malformed(input, reason))
}

fn parse_decoded(s: &str) -> ParseResult<Query> {
    // suite, group, test, params
    let big_parts: Vec<&str> = s.splitn(4, BIG_SEPARATOR).collect();
    if big_parts.len() < 2 {
        return Err(format!(
            "query must contain at least one `{}` after the suite name",
            BIG_SEPARATOR
        ));
    }

    let suite = big_parts[0];
    if suite.is_empty() || !is_valid_name_part(suite) {
        return Err(format!("invalid suite name `{}`", suite));
    }

    let (group, group_wildcard) = try_parse_path(big_parts[1])?;
    if big_parts.len() == 2 {
        if !group_wildcard {
            return Err(format!(
                "group-level query without wildcard; append `{p}{w}` for a group-level \
                 query or `{b}{w}` for a test-level query",
                p = PATH_SEPARATOR,
                b = BIG_SEPARATOR,
                w = WILDCARD,
            ));
        }
        return Ok(Query::multi_file(suite, group));
    }
    if group_wildcard {
        return Err(format!("wildcard `{}` must be at the end of the query", WILDCARD));
    }
    if group.is_empty() {
        return Err("group part of a test-level query must not be empty".to_string());
    }

    let (test, test_wildcard) = try_parse_path(big_parts[2])?;
    if big_parts.len() == 3 {
        if !test_wildcard {
            return Err(format!(
                "test-level query without wildcard; append `{p}{w}` for a test-level \
                 query or `{b}{w}` for a case-level query",
                p = PATH_SEPARATOR,
                b = BIG_SEPARATOR,
                w = WILDCARD,
            ));
        }
        return Ok(Query::multi_test(suite, group, test));
    }
    if test_wildcard {
        return Err(format!("wildcard `{}` must be at the end of the query", WILDCARD));
    }
    if test.is_empty() {
        return Err("test part of a case-level query must not be empty".to_string());
    }

    let (param_parts, params_wildcard) = split_big_part(big_parts[3], PARAM_SEPARATOR)?;
    let mut params = CaseParams::new();
    for part in param_parts {
        let (key, value) = try_parse_single_param(part)?;
        if params.contains_key(&key) {
            return Err(format!("duplicate param key `{}`", key));
        }
        params.insert(key, value);
    }

    if params_wildcard {
        Ok(Query::multi_case(suite, group, test, params))
    } else {
        Ok(Query::single_case(suite, group, test, params))
    }
}

/// Split one section, stripping a trailing wildcard element.
fn split_big_part(s: &str, separator: char) -> ParseResult<(Vec<&str>, bool)> {
    if s.is_empty() {
        return Ok((Vec::new(), false));
    }

    let mut parts: Vec<&str> = s.split(separator).collect();
    let ends_with_wildcard = parts.last().is_some_and(|p| is_wildcard(p));
    if ends_with_wildcard {
        parts.pop();
    }
    if parts.iter().any(|p| p.contains(WILDCARD)) {
        return Err(format!(
            "wildcard `{}` must be the complete last part of a path (e.g. {})",
            WILDCARD, EXAMPLE_QUERIES
        ));
    }
    Ok((parts, ends_with_wildcard))
}

fn is_wildcard(part: &str) -> bool {
    part.strip_prefix(WILDCARD) == Some("")
}

/// Parse a group or test path section.
fn try_parse_path(s: &str) -> ParseResult<(Vec<String>, bool)> {
    let (parts, wildcard) = split_big_part(s, PATH_SEPARATOR)?;
    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("empty path segment in `{}`", s));
    }
    Ok((parts.into_iter().map(String::from).collect(), wildcard))
}

/// Parse a single `key=value` param.
fn try_parse_single_param(part: &str) -> ParseResult<(String, ParamValue)> {
    if part.is_empty() {
        return Err(
            "param in a query must not be blank (is there a trailing separator?)".to_string(),
        );
    }
    let Some((key, value)) = part.split_once(PARAM_KV_SEPARATOR) else {
        return Err(format!("param `{}` must be of the form key=value", part));
    };
    if !param_key_is_public(key) {
        return Err(format!("param `{}` in a query must not be private", key));
    }
    if !is_valid_name_part(key) {
        return Err(format!("param key `{}` must match [a-zA-Z0-9_]+", key));
    }
    if value.contains(BAD_PARAM_VALUE_CHARS) {
        return Err(format!(
            "param value must not contain any of {:?}, was `{}`",
            BAD_PARAM_VALUE_CHARS, value
        ));
    }
    let value = ParamValue::decode(key, value).map_err(|e| e.to_string())?;
    Ok((key.to_string(), value))
}

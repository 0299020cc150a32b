/// parse task documents with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4":
/// every title opens a section, every section holds pairs key - list of values. Lines starting with //, #, % or ;
/// are comments.
///
/// ```rust, ignore
/// let doc = TaskDocument::parse("plate poisson_ratio: 0.3 harmonic: 1\nsearch kappa_max: 12")?;
/// assert_eq!(doc.float("plate", "poisson_ratio")?, Some(0.3));
/// ```
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// integers are accepted where a float is expected
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// word characters without spaces, starting with a letter or underscore
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = parse_identifier(input)?;
    Ok((input.trim(), result))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    // integer first, so that "53" does not become a float
    let mut parser = map(value_parser, |s: &str| {
        if let Ok(val) = s.parse::<i64>() {
            Value::Integer(val)
        } else if let Ok(val) = s.parse::<f64>() {
            Value::Float(val)
        } else if let Ok(val) = s.parse::<bool>() {
            Value::Boolean(val)
        } else {
            Value::String(s.to_string())
        }
    });
    parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = multispace0(input)?;
    let separator = delimited(space0, tag(","), space0);
    separated_list0(separator, parse_value).parse(input)
}

fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon = delimited(space0, tag(":"), space0);
    let (input, result) = separated_pair(parse_identifier, colon, parse_value_list).parse(input)?;
    Ok((input.trim(), result))
}

fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, space0)).parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

/// drops comment lines and empty lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.is_empty()
                || trimmed.starts_with("//")
                || trimmed.starts_with('#')
                || trimmed.starts_with('%')
                || trimmed.starts_with(';'))
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let (input, _) = multispace0(input)?;
    let (input, sections) = many1(delimited(space0, parse_section, multispace0)).parse(input)?;
    let mut result: DocumentMap = HashMap::new();
    for (title, section) in sections {
        // a repeated title extends the earlier section
        result.entry(title).or_default().extend(section);
    }
    Ok((input, result))
}

/// Parsed task document with typed access to the first value of a key.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDocument {
    sections: DocumentMap,
}

impl TaskDocument {
    pub fn parse(input: &str) -> Result<Self, String> {
        let filtered = filter_comments(input);
        match parse_document(&filtered) {
            Ok((remaining, sections)) => {
                if !remaining.trim().is_empty() {
                    return Err(format!(
                        "Failed to parse entire document. Remaining: '{}'",
                        remaining
                    ));
                }
                Ok(TaskDocument { sections })
            }
            Err(e) => Err(format!("Parsing error: {:?}", e)),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("cannot read task file {}: {}", path.display(), e))?;
        Self::parse(&contents)
    }

    pub fn sections(&self) -> &DocumentMap {
        &self.sections
    }

    pub fn values(&self, section: &str, key: &str) -> Option<&Vec<Value>> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    fn first(&self, section: &str, key: &str) -> Option<&Value> {
        self.values(section, key).and_then(|v| v.first())
    }

    pub fn float(&self, section: &str, key: &str) -> Result<Option<f64>, String> {
        self.typed(section, key, "a number", Value::as_float)
    }

    pub fn integer(&self, section: &str, key: &str) -> Result<Option<i64>, String> {
        self.typed(section, key, "an integer", Value::as_integer)
    }

    pub fn boolean(&self, section: &str, key: &str) -> Result<Option<bool>, String> {
        self.typed(section, key, "true or false", Value::as_boolean)
    }

    /// any value, rendered as text
    pub fn string(&self, section: &str, key: &str) -> Option<String> {
        self.first(section, key).map(|v| v.to_string())
    }

    fn typed<T>(
        &self,
        section: &str,
        key: &str,
        expected: &str,
        convert: fn(&Value) -> Option<T>,
    ) -> Result<Option<T>, String> {
        match self.first(section, key) {
            None => Ok(None),
            Some(value) => convert(value)
                .map(Some)
                .ok_or_else(|| format!("{}.{}: expected {}, found '{}'", section, key, expected, value)),
        }
    }

    /// fails on sections or keys that are not listed in `known`
    pub fn check_keys(&self, known: &[(&str, &[&str])]) -> Result<(), String> {
        for (title, section) in &self.sections {
            let Some((_, keys)) = known.iter().find(|(t, _)| *t == title.as_str()) else {
                return Err(format!("unknown section '{}'", title));
            };
            for key in section.keys() {
                if !keys.contains(&key.as_str()) {
                    return Err(format!("unknown key '{}' in section '{}'", key, title));
                }
            }
        }
        Ok(())
    }
}

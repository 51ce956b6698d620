//! INI key/value storage.
//!
//! Lines are `key = value`; `#` starts a comment; repeated keys
//! accumulate into a list; quotes around values are stripped. Malformed
//! lines are skipped with a warning on the error sink.

use std::{
    collections::HashMap,
    fmt,
    io::{self, BufRead},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A key holds several values where exactly one is expected.
    AmbiguousKey(String),
    /// A value cannot be read at the requested type.
    InvalidValue(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AmbiguousKey(key) => {
                write!(f, "Key \"{}\" has more than one value", key)
            }
            Error::InvalidValue(key, value) => {
                write!(f, "Key \"{}\" has invalid value \"{}\"", key, value)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Default)]
pub struct IniValues {
    values: HashMap<String, Vec<String>>,
}

impl IniValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(stream: impl BufRead) -> io::Result<Self> {
        let mut values = Self::new();

        for line in stream.lines() {
            let line = line?;

            if line.trim().is_empty() || is_comment(&line) {
                continue;
            }

            values.insert_line(&line);
        }

        Ok(values)
    }

    fn insert_line(&mut self, line: &str) {
        let (key, value) = match line.split_once('=') {
            Some(pair) => pair,
            None => {
                eprintln!("Skipping line \"{}\" from *.ini file", line);
                return;
            }
        };

        let key = key.trim();
        let value = remove_quotes(value.trim());

        if key.is_empty() {
            eprintln!("Found empty key in *.ini file");
        }

        if value.is_empty() {
            eprintln!("Found empty value in *.ini file");
        }

        self.values
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn single(&self, key: &str) -> Result<Option<&str>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(values) if values.len() == 1 => Ok(Some(&values[0])),
            Some(_) => Err(Error::AmbiguousKey(key.to_string())),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.single(key)? {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(value) => Err(Error::InvalidValue(key.to_string(), value.to_string())),
        }
    }

    pub fn get_int(&self, key: &str, default: isize) -> Result<isize> {
        match self.single(key)? {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| Error::InvalidValue(key.to_string(), value.to_string())),
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.single(key)?.unwrap_or(default).to_string())
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn remove_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> IniValues {
        IniValues::parse(source.as_bytes()).unwrap()
    }

    #[test]
    fn key_value_lines() {
        let values = parse(
            "work-mode = general-synthesis\n\
             # a comment\n\
             \n\
             results-file = \"results.txt\"\n",
        );

        assert_eq!(
            values.get_string("work-mode", "").unwrap(),
            "general-synthesis"
        );
        assert_eq!(values.get_string("results-file", "").unwrap(), "results.txt");
        assert!(!values.has("comment"));
    }

    #[test]
    fn repeated_keys_accumulate() {
        let values = parse("input = a.txt\ninput = b.txt\n");

        assert_eq!(values.all("input"), ["a.txt", "b.txt"]);
        assert!(matches!(
            values.get_string("input", ""),
            Err(Error::AmbiguousKey(_))
        ));
    }

    #[test]
    fn typed_getters() {
        let values = parse("flag = true\nother = 0\nnumber = 42\n");

        assert_eq!(values.get_bool("flag", false).unwrap(), true);
        assert_eq!(values.get_bool("other", true).unwrap(), false);
        assert_eq!(values.get_bool("missing", true).unwrap(), true);
        assert_eq!(values.get_int("number", 0).unwrap(), 42);

        assert!(values.get_bool("number", false).is_err());
    }
}

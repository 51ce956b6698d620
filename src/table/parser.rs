//! Text format for truth tables.
//!
//! The first line is `NxMxB` (input count, output count, numeric base);
//! every following non-empty line maps one input to one output:
//!
//! ```text
//! 3x3x10
//! 0\t=>\t7
//! 1\t=>\t0
//! ...
//! ```

use std::{
    fmt,
    io::{self, BufRead},
};

use super::TruthTable;
use crate::math::{N, Word};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    message: String,
    line: String,
}

impl ParseError {
    fn new(message: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: line.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line.is_empty() {
            write!(f, "Invalid truth table: {}", self.message)
        } else {
            write!(
                f,
                "Invalid truth table: {} in line \"{}\"",
                self.message, self.line
            )
        }
    }
}

impl std::error::Error for ParseError {}

impl From<io::Error> for ParseError {
    fn from(error: io::Error) -> Self {
        Self::new(error.to_string(), "")
    }
}

pub struct ParsedTable {
    pub table: TruthTable,
    pub input_count: N,
    pub output_count: N,
}

#[derive(Default)]
pub struct TruthTableParser;

impl TruthTableParser {
    const DELIMITER: &'static str = "\t=>\t";

    pub fn parse(stream: impl BufRead) -> Result<ParsedTable, ParseError> {
        let mut lines = stream.lines();

        let first_line = lines
            .next()
            .ok_or_else(|| ParseError::new("empty input", ""))??;

        let (input_count, output_count, base) = Self::parse_first_line(&first_line)?;

        let size = 1usize << input_count;
        let mut table: Vec<Option<Word>> = vec![None; size];
        let mut count = 0;

        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let (x, y) = Self::parse_entry(&line, base)?;

            if x >= size as Word || y >= (1 as Word) << output_count {
                return Err(ParseError::new("value out of range", line));
            }

            if table[x as usize].is_some() {
                return Err(ParseError::new("duplicate input", line));
            }

            table[x as usize] = Some(y);
            count += 1;
        }

        if count != size {
            return Err(ParseError::new("truth table is incomplete", ""));
        }

        let table = table.into_iter().map(|y| y.unwrap_or(0)).collect();

        Ok(ParsedTable {
            table,
            input_count,
            output_count,
        })
    }

    fn parse_first_line(line: &str) -> Result<(N, N, u32), ParseError> {
        let invalid = || {
            ParseError::new(
                "valid format is NxMxB, where N - input count, \
                 M <= N - output count, B - base",
                line,
            )
        };

        let mut parts = line.trim().split('x');

        let input_count: N = parts
            .next()
            .and_then(|part| part.parse().ok())
            .ok_or_else(invalid)?;

        let output_count: N = parts
            .next()
            .and_then(|part| part.parse().ok())
            .ok_or_else(invalid)?;

        let base: u32 = parts
            .next()
            .and_then(|part| part.parse().ok())
            .filter(|&base| (2..=36).contains(&base))
            .ok_or_else(invalid)?;

        if parts.next().is_some() || output_count > input_count {
            return Err(invalid());
        }

        Ok((input_count, output_count, base))
    }

    fn parse_entry(line: &str, base: u32) -> Result<(Word, Word), ParseError> {
        let (x, y) = line
            .split_once(Self::DELIMITER)
            .ok_or_else(|| ParseError::new("missing \"=>\" delimiter", line))?;

        let x = Word::from_str_radix(x.trim(), base)
            .map_err(|_| ParseError::new("invalid input value", line))?;

        let y = Word::from_str_radix(y.trim(), base)
            .map_err(|_| ParseError::new("invalid output value", line))?;

        Ok((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<ParsedTable, ParseError> {
        TruthTableParser::parse(source.as_bytes())
    }

    #[test]
    fn complete_table() {
        let parsed = parse("2x2x10\n0\t=>\t0\n1\t=>\t1\n2\t=>\t3\n3\t=>\t2\n").unwrap();

        assert_eq!(parsed.input_count, 2);
        assert_eq!(parsed.output_count, 2);
        assert_eq!(parsed.table, vec![0, 1, 3, 2]);
    }

    #[test]
    fn hexadecimal_base() {
        let parsed = parse("2x2x16\n0\t=>\t3\n1\t=>\t2\n2\t=>\t1\n3\t=>\t0\n").unwrap();
        assert_eq!(parsed.table, vec![3, 2, 1, 0]);
    }

    #[test]
    fn rejections() {
        assert!(parse("garbage\n").is_err());
        assert!(parse("2x3x10\n").is_err());
        assert!(parse("2x2x10\n0\t=>\t0\n").is_err());
        assert!(parse("2x2x10\n0\t=>\t0\n0\t=>\t1\n1\t=>\t2\n2\t=>\t3\n").is_err());
        assert!(parse("2x2x10\n0\t=>\t7\n1\t=>\t0\n2\t=>\t1\n3\t=>\t2\n").is_err());
    }
}

//! TFC circuit text format.
//!
//! ```text
//! .v a,b,c
//! .i a,b,c
//! .o a,b,c
//! BEGIN
//! t1 a
//! t2 b',c
//! t3 a,b,c
//! END
//! ```
//!
//! `.v` declares the line names in order; `.i`/`.o`/`.c` declare inputs,
//! outputs and constants; an apostrophe marks an inverted control; `#`
//! starts a comment. A single gate line without BEGIN/END is accepted.
//! Repeated header lines are format errors.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    io::{self, BufRead, Write},
};

use crate::{
    gate::Gate,
    math::{count_bits, N, Word},
    scheme::Scheme,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    message: String,
    line: String,
}

impl Error {
    fn new(message: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: line.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line.is_empty() {
            write!(f, "Invalid TFC file: {}", self.message)
        } else {
            write!(f, "Error: invalid line in TFC file:\n{}", self.line)
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::new(error.to_string(), "")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MarkerType {
    Variables,
    Inputs,
    Outputs,
    Constants,
    Begin,
    End,
    ToffoliElement,
    Unknown,
}

#[derive(Default)]
struct Markers {
    variables_parsed: bool,
    inputs_parsed: bool,
    outputs_parsed: bool,
    constants_parsed: bool,
    begin_parsed: bool,
    end_parsed: bool,
    single_element: bool,
}

#[derive(Default)]
pub struct TfcFormatter {
    variable_to_index: HashMap<String, N>,
    index_to_variable: BTreeMap<N, String>,

    inputs_line: String,
    outputs_line: String,
    constants_line: String,

    has_specific_inputs_outputs: bool,
    input_count: N,
    output_count: N,
    output_variables_order: HashMap<N, N>,

    sort_output_variables: bool,
    reordering_subscheme: String,
}

const VARIABLES_PREFIX: &str = ".v ";
const INPUTS_PREFIX: &str = ".i ";
const OUTPUTS_PREFIX: &str = ".o ";
const CONSTANTS_PREFIX: &str = ".c ";
const BEGIN_KEYWORD: &str = "BEGIN";
const END_KEYWORD: &str = "END";

impl TfcFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter for a circuit with `n` proper inputs, `m` proper outputs
    /// and a placement map of the output variables over the lines.
    pub fn with_counts(n: N, m: N, output_variables_order: HashMap<N, N>) -> Self {
        debug_assert_eq!(output_variables_order.len(), m);

        Self {
            has_specific_inputs_outputs: true,
            input_count: n,
            output_count: m,
            output_variables_order,
            ..Self::default()
        }
    }

    pub fn set_sort_output_variables(&mut self, value: bool) {
        self.sort_output_variables = value;
    }

    pub fn variables_count(&self) -> N {
        self.variable_to_index.len()
    }

    pub fn parse(&mut self, stream: impl BufRead) -> Result<Scheme> {
        let mut scheme = Scheme::new();
        let mut markers = Markers::default();

        for line in stream.lines() {
            let line = line?;

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let marker = marker_type(&line);
            check_marker(&mut markers, marker, &line)?;

            match marker {
                MarkerType::Variables => self.parse_variables(&line)?,
                MarkerType::Inputs => self.inputs_line = line,
                MarkerType::Outputs => self.outputs_line = line,
                MarkerType::Constants => self.constants_line = line,
                MarkerType::Begin => {}
                MarkerType::End => break,
                MarkerType::ToffoliElement => self.parse_element(&line, &mut scheme)?,
                MarkerType::Unknown => unreachable!(),
            }
        }

        Ok(scheme)
    }

    fn parse_variables(&mut self, line: &str) -> Result<()> {
        let variables = &line[VARIABLES_PREFIX.len()..];

        for (index, name) in variables.split(',').map(str::trim).enumerate() {
            if name.is_empty() || self.variable_to_index.contains_key(name) {
                return Err(Error::new("bad variable declaration", line));
            }

            self.variable_to_index.insert(name.to_string(), index);
        }

        Ok(())
    }

    fn parse_element(&self, line: &str, scheme: &mut Scheme) -> Result<()> {
        let invalid = || Error::new("bad gate line", line);

        let rest = line.strip_prefix('t').ok_or_else(invalid)?;

        let space = rest.find(char::is_whitespace).ok_or_else(invalid)?;
        let count: N = rest[..space].parse().map_err(|_| invalid())?;

        let parts: Vec<&str> = rest[space..].trim().split(',').map(str::trim).collect();
        if parts.len() != count || count == 0 {
            return Err(invalid());
        }

        let mut control_mask: Word = 0;
        let mut inversion_mask: Word = 0;

        for control in &parts[..count - 1] {
            let (name, with_inversion) = match control.strip_suffix('\'') {
                Some(name) => (name, true),
                None => (*control, false),
            };

            let index = *self.variable_to_index.get(name).ok_or_else(invalid)?;
            let mask = (1 as Word) << index;

            control_mask |= mask;
            if with_inversion {
                inversion_mask |= mask;
            }
        }

        let target = parts[count - 1];
        if target.ends_with('\'') {
            return Err(invalid());
        }

        let index = *self.variable_to_index.get(target).ok_or_else(invalid)?;
        let target_mask = (1 as Word) << index;

        if target_mask & control_mask != 0 {
            return Err(invalid());
        }

        scheme.push_back(Gate::new(
            self.variable_to_index.len(),
            target_mask,
            control_mask,
            inversion_mask,
        ));

        Ok(())
    }

    pub fn format(&mut self, out: &mut dyn Write, scheme: &Scheme) -> io::Result<()> {
        let n = scheme
            .iter()
            .map(Gate::input_count)
            .max()
            .unwrap_or(0)
            .max(self.variables_count())
            .max(self.input_count);

        self.fill_index_to_variable_map(n);

        self.write_variables_line(out)?;
        self.write_input_line(out)?;
        self.write_output_line(out)?;
        self.write_constants_line(out)?;

        writeln!(out, "{}", BEGIN_KEYWORD)?;

        for gate in scheme.iter() {
            self.write_element(out, gate)?;
        }

        if !self.reordering_subscheme.is_empty() {
            write!(out, "{}", self.reordering_subscheme)?;
        }

        writeln!(out, "{}", END_KEYWORD)
    }

    fn fill_index_to_variable_map(&mut self, n: N) {
        // lines added by the synthesizer (parity completion) get fresh
        // names next to the declared ones
        let mut candidates = (0..26).map(variable_name);

        for index in self.variable_to_index.len()..n {
            let name = candidates
                .by_ref()
                .find(|name| !self.variable_to_index.contains_key(name))
                .unwrap_or_else(|| format!("v{}", index));

            self.variable_to_index.insert(name, index);
        }

        self.index_to_variable = self
            .variable_to_index
            .iter()
            .map(|(name, &index)| (index, name.clone()))
            .collect();
    }

    fn write_element(&self, out: &mut dyn Write, gate: &Gate) -> io::Result<()> {
        let count = count_bits(gate.control_mask()) + 1;
        write!(out, "t{} ", count)?;

        for (&index, name) in &self.index_to_variable {
            let mask = (1 as Word) << index;
            if gate.control_mask() & mask != 0 {
                write!(out, "{}", name)?;
                if gate.inversion_mask() & mask != 0 {
                    write!(out, "'")?;
                }
                write!(out, ",")?;
            }
        }

        let target_index = gate.target_mask().trailing_zeros() as N;
        writeln!(out, "{}", self.index_to_variable[&target_index])
    }

    fn write_variables_line(&self, out: &mut dyn Write) -> io::Result<()> {
        self.write_header_line(out, VARIABLES_PREFIX)
    }

    fn write_input_line(&self, out: &mut dyn Write) -> io::Result<()> {
        if !self.inputs_line.is_empty() {
            return writeln!(out, "{}", self.inputs_line);
        }

        if !self.has_specific_inputs_outputs {
            return self.write_header_line(out, INPUTS_PREFIX);
        }

        let names: Vec<&str> = (0..self.input_count)
            .map(|index| self.index_to_variable[&index].as_str())
            .collect();

        writeln!(out, "{}{}", INPUTS_PREFIX, names.join(","))
    }

    fn write_output_line(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if !self.outputs_line.is_empty() {
            return writeln!(out, "{}", self.outputs_line);
        }

        if !self.has_specific_inputs_outputs {
            return self.write_header_line(out, OUTPUTS_PREFIX);
        }

        if self.sort_output_variables {
            self.sort_output_variables_order();
        }

        let names: Vec<&str> = (0..self.output_count)
            .map(|index| self.index_to_variable[&self.output_variables_order[&index]].as_str())
            .collect();

        writeln!(out, "{}{}", OUTPUTS_PREFIX, names.join(","))
    }

    /// Selection-sort the output placement; every exchange becomes a
    /// 3-CNOT swap appended to the circuit.
    fn sort_output_variables_order(&mut self) {
        let count = self.output_variables_order.len();

        let mut order_map: HashMap<N, N> = HashMap::with_capacity(count);
        for (&variable, &line) in &self.output_variables_order {
            order_map.insert(line, variable);
        }

        let mut indices: Vec<N> = (0..count).map(|index| order_map[&index]).collect();

        let mut subscheme = String::new();
        for i in 0..count.saturating_sub(1) {
            let mut min_index = i;
            for j in i + 1..count {
                if indices[j] < indices[min_index] {
                    min_index = j;
                }
            }

            if min_index == i {
                continue;
            }

            indices.swap(i, min_index);

            let left = &self.index_to_variable[&i];
            let right = &self.index_to_variable[&min_index];

            subscheme += &format!("t2 {},{}\n", left, right);
            subscheme += &format!("t2 {},{}\n", right, left);
            subscheme += &format!("t2 {},{}\n", left, right);
        }

        self.reordering_subscheme = subscheme;

        for (position, &variable) in indices.iter().enumerate() {
            self.output_variables_order.insert(variable, position);
        }
    }

    fn write_constants_line(&self, out: &mut dyn Write) -> io::Result<()> {
        if !self.constants_line.is_empty() {
            return writeln!(out, "{}", self.constants_line);
        }

        if self.has_specific_inputs_outputs {
            let count = self.index_to_variable.len().saturating_sub(self.input_count);
            if count > 0 {
                let zeros = vec!["0"; count];
                return writeln!(out, "{}{}", CONSTANTS_PREFIX, zeros.join(","));
            }
        }

        Ok(())
    }

    fn write_header_line(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        let names: Vec<&str> = self
            .index_to_variable
            .values()
            .map(String::as_str)
            .collect();

        writeln!(out, "{}{}", prefix, names.join(","))
    }
}

fn variable_name(index: N) -> String {
    debug_assert!(index < 26);
    char::from(b'a' + index as u8).to_string()
}

fn marker_type(line: &str) -> MarkerType {
    if line.starts_with(VARIABLES_PREFIX) {
        MarkerType::Variables
    } else if line.starts_with(INPUTS_PREFIX) {
        MarkerType::Inputs
    } else if line.starts_with(OUTPUTS_PREFIX) {
        MarkerType::Outputs
    } else if line.starts_with(CONSTANTS_PREFIX) {
        MarkerType::Constants
    } else if line == BEGIN_KEYWORD {
        MarkerType::Begin
    } else if line == END_KEYWORD {
        MarkerType::End
    } else if line.len() > 3 && line.starts_with('t') {
        MarkerType::ToffoliElement
    } else {
        MarkerType::Unknown
    }
}

fn check_marker(markers: &mut Markers, marker: MarkerType, line: &str) -> Result<()> {
    let result = match marker {
        MarkerType::Variables => {
            let ok = !markers.variables_parsed;
            markers.variables_parsed = true;
            ok
        }
        MarkerType::Inputs => {
            let ok = !markers.inputs_parsed;
            markers.inputs_parsed = true;
            ok
        }
        MarkerType::Outputs => {
            let ok = !markers.outputs_parsed;
            markers.outputs_parsed = true;
            ok
        }
        MarkerType::Constants => {
            let ok = !markers.constants_parsed;
            markers.constants_parsed = true;
            ok
        }
        MarkerType::Begin => {
            let ok = markers.variables_parsed && !markers.single_element;
            markers.begin_parsed = true;
            ok
        }
        MarkerType::End => {
            let ok = markers.begin_parsed;
            markers.end_parsed = true;
            ok
        }
        MarkerType::ToffoliElement => {
            if markers.begin_parsed {
                true
            } else if !markers.single_element {
                markers.single_element = true;
                true
            } else {
                false
            }
        }
        MarkerType::Unknown => false,
    };

    if result {
        Ok(())
    } else {
        Err(Error::new("unexpected line", line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<(TfcFormatter, Scheme)> {
        let mut formatter = TfcFormatter::new();
        let scheme = formatter.parse(source.as_bytes())?;

        Ok((formatter, scheme))
    }

    const SAMPLE: &str = "\
# a sample circuit\n\
.v a,b,c\n\
.i a,b,c\n\
.o a,b,c\n\
BEGIN\n\
t1 a\n\
t2 b',c\n\
t3 a,b,c\n\
END\n";

    #[test]
    fn parses_gates() {
        let (formatter, scheme) = parse(SAMPLE).unwrap();

        assert_eq!(formatter.variables_count(), 3);
        assert_eq!(scheme.len(), 3);

        assert_eq!(scheme[0], Gate::not(3, 0b001));
        assert_eq!(scheme[1], Gate::new(3, 0b100, 0b010, 0b010));
        assert_eq!(scheme[2], Gate::cnot(3, 0b100, 0b011));
    }

    #[test]
    fn single_element_without_begin() {
        let (_, scheme) = parse(".v a,b\nt2 a,b\n").unwrap();

        assert_eq!(scheme.len(), 1);
        assert_eq!(scheme[0], Gate::cnot(2, 0b10, 0b01));
    }

    #[test]
    fn rejections() {
        // repeated header
        assert!(parse(".v a,b\n.v a,b\nBEGIN\nEND\n").is_err());
        // BEGIN before variables
        assert!(parse("BEGIN\nEND\n").is_err());
        // unknown control name
        assert!(parse(".v a,b\nBEGIN\nt2 x,b\nEND\n").is_err());
        // inverted target
        assert!(parse(".v a,b\nBEGIN\nt2 a,b'\nEND\n").is_err());
        // wrong control count
        assert!(parse(".v a,b\nBEGIN\nt3 a,b\nEND\n").is_err());
    }

    #[test]
    fn round_trip() {
        let (mut formatter, scheme) = parse(SAMPLE).unwrap();

        let mut output = Vec::new();
        formatter.format(&mut output, &scheme).unwrap();

        let text = String::from_utf8(output).unwrap();
        let (_, reparsed) = parse(&text).unwrap();

        assert_eq!(scheme, reparsed);
    }

    #[test]
    fn formats_generated_names() {
        let scheme: Scheme = vec![Gate::cnot(2, 0b10, 0b01)].into();

        let mut formatter = TfcFormatter::new();
        let mut output = Vec::new();
        formatter.format(&mut output, &scheme).unwrap();

        let text = String::from_utf8(output).unwrap();

        assert!(text.contains(".v a,b"));
        assert!(text.contains("t2 a,b"));
        assert!(text.ends_with("END\n"));
    }
}

//! Compile-time kernel specialization via symbolic defines.
//!
//! Each compute task carries a table of named numeric constants that gets
//! rendered into a WGSL `const` header and prepended to the kernel source
//! before compilation. Baking constants into the kernel (instead of reading
//! them from a uniform every invocation) is the point: values like the
//! gravity dividend are computed once on the host and become literals on the
//! device.
//!
//! Float formatting is a precision-preserving serialization contract:
//! `parse(format(x)) == x` for every representable f32, so kernel-side
//! constants reproduce the host-side computation exactly. Rust's `Display`
//! for floats already emits the shortest round-trip representation.

use std::collections::BTreeMap;
use std::fmt;

/// A single define value; typed so the WGSL header can declare it correctly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefineValue {
    F32(f32),
    U32(u32),
}

impl fmt::Display for DefineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineValue::F32(v) => write!(f, "{}", v),
            DefineValue::U32(v) => write!(f, "{}", v),
        }
    }
}

/// Mapping from symbolic name to a canonically formatted numeric value.
///
/// Keys are unique; inserting an existing key overwrites it. The owning task
/// freezes the table once its kernel is built.
#[derive(Debug, Clone, Default)]
pub struct DefineTable {
    entries: BTreeMap<String, DefineValue>,
}

impl DefineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry.
    pub fn set(&mut self, name: &str, value: DefineValue) {
        self.entries.insert(name.to_string(), value);
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.set(name, DefineValue::F32(value));
    }

    pub fn set_u32(&mut self, name: &str, value: u32) {
        self.set(name, DefineValue::U32(value));
    }

    pub fn get(&self, name: &str) -> Option<DefineValue> {
        self.entries.get(name).copied()
    }

    /// The stringified form of an entry, as it will appear in kernel source.
    pub fn value_str(&self, name: &str) -> Option<String> {
        self.entries.get(name).map(|v| v.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the table as WGSL module-scope constants, one per line.
    ///
    /// Float values keep their full round-trip precision and are always
    /// emitted in float form: an integer-shaped string would be typed as an
    /// AbstractInt by WGSL and can overflow it (e.g. 1e30) even though the
    /// declaration targets f32.
    pub fn to_wgsl_header(&self) -> String {
        let mut header = String::new();
        for (name, value) in &self.entries {
            match value {
                DefineValue::F32(v) => {
                    header.push_str(&format!(
                        "const {}: f32 = {};\n",
                        name,
                        wgsl_f32_literal(*v)
                    ));
                }
                DefineValue::U32(v) => {
                    header.push_str(&format!("const {}: u32 = {}u;\n", name, v));
                }
            }
        }
        header
    }
}

/// Shortest round-trip representation, forced into float form for WGSL.
fn wgsl_f32_literal(value: f32) -> String {
    let mut literal = value.to_string();
    if !literal.contains('.') && !literal.contains('e') {
        literal.push_str(".0");
    }
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_overwrite() {
        let mut table = DefineTable::new();
        table.set_u32("NB_PARTICLES", 1000);
        table.set_u32("NB_PARTICLES", 100_000);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("NB_PARTICLES"), Some(DefineValue::U32(100_000)));
    }

    #[test]
    fn float_formatting_round_trips() {
        let values = [
            6.674e-11f32,
            6.674e-8,
            0.005,
            1.0 / 3.0,
            std::f32::consts::PI,
            1.0e30,
            -273.15,
            f32::MIN_POSITIVE,
        ];
        for &x in &values {
            let formatted = DefineValue::F32(x).to_string();
            let parsed: f32 = formatted.parse().unwrap();
            assert_eq!(parsed, x, "round-trip failed for {}", formatted);
        }
    }

    #[test]
    fn wgsl_header_declares_typed_constants() {
        let mut table = DefineTable::new();
        table.set_f32("G_CONST", 6.674e-11);
        table.set_u32("NB_PARTICLES", 100_000);
        let header = table.to_wgsl_header();
        assert!(header.contains("const NB_PARTICLES: u32 = 100000u;"));
        assert!(header.contains("const G_CONST: f32 = "));
        // Every emitted float parses back to the original value
        let line = header
            .lines()
            .find(|l| l.contains("G_CONST"))
            .unwrap();
        let literal = line
            .split('=')
            .nth(1)
            .unwrap()
            .trim()
            .trim_end_matches(';');
        assert_eq!(literal.parse::<f32>().unwrap(), 6.674e-11f32);
    }

    #[test]
    fn integer_valued_floats_are_emitted_in_float_form() {
        let mut table = DefineTable::new();
        table.set_f32("MASS_POINT", 1000.0);
        table.set_f32("BIG", 1.0e30);
        for name in ["MASS_POINT", "BIG"] {
            let line = table
                .to_wgsl_header()
                .lines()
                .find(|l| l.contains(name))
                .unwrap()
                .to_string();
            let literal = line
                .split('=')
                .nth(1)
                .unwrap()
                .trim()
                .trim_end_matches(';')
                .to_string();
            assert!(
                literal.contains('.') || literal.contains('e'),
                "`{}` would be typed as an AbstractInt",
                literal
            );
            // Float form must not cost round-trip precision
            let original = match name {
                "MASS_POINT" => 1000.0f32,
                _ => 1.0e30f32,
            };
            assert_eq!(literal.parse::<f32>().unwrap(), original);
        }
    }
}

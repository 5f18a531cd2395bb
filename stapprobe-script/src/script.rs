use std::fmt;

use crate::prefix::quote_string_literal;

/// What a functional `stap` prints for [`trivial_script`]
pub const TRIVIAL_EXPECTED_STDOUT: &str = "hello world\n";

/// A complete script in the SystemTap probe language.
///
/// The bytes are fixed at construction; the harness only ever reads them to
/// feed the tracer's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerScript {
    bytes: Vec<u8>,
}

impl TracerScript {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for TracerScript {
    fn from(source: &str) -> Self {
        Self::new(source.as_bytes())
    }
}

impl From<String> for TracerScript {
    fn from(source: String) -> Self {
        Self::new(source.into_bytes())
    }
}

impl fmt::Display for TracerScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

/// `probe begin { println("<message>") exit () }`
pub fn println_on_begin(message: &str) -> TracerScript {
    TracerScript::from(format!(
        "probe begin {{ println({}) exit () }}",
        quote_string_literal(message)
    ))
}

/// The smoke-test script: prints `hello world` and exits before the traced
/// command does anything interesting.
pub fn trivial_script() -> TracerScript {
    println_on_begin("hello world")
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ScriptError;

/// How the traced runtime was linked, which decides where its markers live.
///
/// `Auto` defers to the runtime's own build configuration. That detection is
/// known to be wrong on some builds, so `Shared` and `Static` exist to pin
/// the answer from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Auto,
    Shared,
    Static,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkMode::Auto => write!(f, "auto"),
            LinkMode::Shared => write!(f, "shared"),
            LinkMode::Static => write!(f, "static"),
        }
    }
}

impl FromStr for LinkMode {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LinkMode::Auto),
            "shared" => Ok(LinkMode::Shared),
            "static" => Ok(LinkMode::Static),
            _ => Err(ScriptError::InvalidLinkMode(s.to_string())),
        }
    }
}

/// Dotted probe-point prefix that addresses a marker inside a process image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbePrefix {
    /// Markers compiled into the executable: `process("<exe>")`
    Executable { executable: PathBuf },
    /// Markers inside a shared library loaded by the executable:
    /// `process("<exe>").library("<soname>")`
    SharedLibrary { executable: PathBuf, soname: String },
}

impl ProbePrefix {
    pub fn executable<P: AsRef<Path>>(executable: P) -> Self {
        ProbePrefix::Executable {
            executable: executable.as_ref().to_path_buf(),
        }
    }

    pub fn shared_library<P: AsRef<Path>>(executable: P, soname: impl Into<String>) -> Self {
        ProbePrefix::SharedLibrary {
            executable: executable.as_ref().to_path_buf(),
            soname: soname.into(),
        }
    }

    pub fn link_mode(&self) -> LinkMode {
        match self {
            ProbePrefix::Executable { .. } => LinkMode::Static,
            ProbePrefix::SharedLibrary { .. } => LinkMode::Shared,
        }
    }

    pub fn render(&self) -> String {
        match self {
            ProbePrefix::Executable { executable } => format!(
                "process({})",
                quote_string_literal(&executable.to_string_lossy())
            ),
            ProbePrefix::SharedLibrary { executable, soname } => format!(
                "process({}).library({})",
                quote_string_literal(&executable.to_string_lossy()),
                quote_string_literal(soname)
            ),
        }
    }
}

impl fmt::Display for ProbePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Render `value` as a double-quoted SystemTap string literal.
pub fn quote_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_prefix() {
        let prefix = ProbePrefix::executable("/usr/bin/python3");
        assert_eq!(prefix.render(), r#"process("/usr/bin/python3")"#);
        assert_eq!(prefix.link_mode(), LinkMode::Static);
    }

    #[test]
    fn shared_library_prefix() {
        let prefix = ProbePrefix::shared_library("/opt/py/bin/python3", "libpython3.12.so.1.0");
        assert_eq!(
            prefix.to_string(),
            r#"process("/opt/py/bin/python3").library("libpython3.12.so.1.0")"#
        );
        assert_eq!(prefix.link_mode(), LinkMode::Shared);
    }

    #[test]
    fn quoting_escapes_backslash_and_quote() {
        assert_eq!(quote_string_literal(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(quote_string_literal("文字化け"), "\"文字化け\"");
    }

    #[test]
    fn link_mode_parsing() {
        assert_eq!("Shared".parse::<LinkMode>().unwrap(), LinkMode::Shared);
        assert_eq!("static".parse::<LinkMode>().unwrap(), LinkMode::Static);
        assert_eq!("auto".parse::<LinkMode>().unwrap(), LinkMode::Auto);
        assert!("dynamic".parse::<LinkMode>().is_err());
        assert_eq!(LinkMode::default(), LinkMode::Auto);
    }
}

use crate::error::{Result, ScriptError};
use crate::prefix::ProbePrefix;
use crate::script::TracerScript;

/// Token replaced by the rendered [`ProbePrefix`]
pub const PREFIX_PLACEHOLDER: &str = "@PROBE_PREFIX@";

/// A script body with one substitution point, the probe-point prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptTemplate {
    body: &'static str,
}

impl ScriptTemplate {
    pub const fn new(body: &'static str) -> Self {
        Self { body }
    }

    pub fn render(&self, prefix: &ProbePrefix) -> Result<TracerScript> {
        if !self.body.contains(PREFIX_PLACEHOLDER) {
            return Err(ScriptError::MissingPlaceholder {
                placeholder: PREFIX_PLACEHOLDER,
            });
        }
        let rendered = self.body.replace(PREFIX_PLACEHOLDER, &prefix.render());
        Ok(TracerScript::from(rendered))
    }
}

/// Prints one indented line per function entry and return:
///
/// ```text
///      0 python3(8274):  => <module> in <string>:1
///      5 python3(8274): <= <module> in <string>:1
/// ```
///
/// Columns are microseconds since the thread's first probe hit, executable
/// name and thread id, followed by the call depth as indentation.
pub const HIERARCHY_TEMPLATE: ScriptTemplate = ScriptTemplate::new(
    r#"
probe @PROBE_PREFIX@.mark("function__entry") {
    filename = user_string($arg1);
    funcname = user_string($arg2);
    lineno = $arg3;

    printf("%s => %s in %s:%d\n", thread_indent(1), funcname, filename, lineno);
}

probe @PROBE_PREFIX@.mark("function__return") {
    filename = user_string($arg1);
    funcname = user_string($arg2);
    lineno = $arg3;

    printf("%s <= %s in %s:%d\n", thread_indent(-1), funcname, filename, lineno);
}
"#,
);

pub fn hierarchy_script(prefix: &ProbePrefix) -> Result<TracerScript> {
    HIERARCHY_TEMPLATE.render(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_substitutes_both_probes() {
        let prefix = ProbePrefix::executable("/usr/bin/python3");
        let script = hierarchy_script(&prefix).unwrap().to_string();

        assert!(!script.contains(PREFIX_PLACEHOLDER));
        assert!(script
            .contains(r#"probe process("/usr/bin/python3").mark("function__entry") {"#));
        assert!(script
            .contains(r#"probe process("/usr/bin/python3").mark("function__return") {"#));
        assert!(script.contains("thread_indent(1)"));
        assert!(script.contains("thread_indent(-1)"));
    }

    #[test]
    fn hierarchy_uses_library_prefix() {
        let prefix = ProbePrefix::shared_library("/opt/bin/python3", "libpython3.so");
        let script = hierarchy_script(&prefix).unwrap().to_string();
        assert_eq!(
            script
                .matches(r#"process("/opt/bin/python3").library("libpython3.so").mark("#)
                .count(),
            2
        );
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let template = ScriptTemplate::new("probe begin { exit () }");
        let err = template
            .render(&ProbePrefix::executable("/bin/true"))
            .unwrap_err();
        assert!(matches!(err, ScriptError::MissingPlaceholder { .. }));
    }
}

/// Quote `value` for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:,+@%".contains(&b));
    if is_plain {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Explain the usual reason `stap` refuses to run for unprivileged users.
pub fn privilege_hint() -> Option<&'static str> {
    if is_root() {
        None
    } else {
        Some(
            "not running as root; a non-root user needs to be in the \
             'stapdev' (or 'stapusr') group, and kernel headers/debuginfo \
             must be installed",
        )
    }
}

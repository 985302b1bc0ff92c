use std::path::{Path, PathBuf};
use std::process::Command;

use crate::core::paths::PATH_LIST_SEPARATOR;

/// Single command line for `program` and `args`, in copy/paste form.
pub fn build_command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(quote_arg(&program.to_string_lossy()))
        .chain(args.iter().map(|arg| quote_arg(arg)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote an argument holding whitespace (or nothing at all).
pub fn quote_arg(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }
    if !raw.chars().any(char::is_whitespace) {
        return raw.to_string();
    }
    format!("\"{}\"", raw.replace('"', "\\\""))
}

/// Environment variable the host's dynamic loader searches.
pub fn library_path_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// `value` prefixed to the current contents of `var_name`.
pub fn append_env_path(var_name: &str, value: &str) -> String {
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, PATH_LIST_SEPARATOR, existing)
        }
        _ => value.to_string(),
    }
}

/// Prefix the child's library search variable with `library_path`.
pub fn configure_library_env(cmd: &mut Command, library_path: &[PathBuf]) {
    if library_path.is_empty() {
        return;
    }
    let joined = library_path
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(&PATH_LIST_SEPARATOR.to_string());
    let var = library_path_var();
    cmd.env(var, append_env_path(var, &joined));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_arguments_are_quoted() {
        let line = build_command_line(
            Path::new("/opt/My Runtime/bin/java"),
            &["-Xmx1g".to_string(), "a b".to_string(), String::new()],
        );
        assert_eq!(line, "\"/opt/My Runtime/bin/java\" -Xmx1g \"a b\" \"\"");
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        assert_eq!(quote_arg("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_arg("-Dx=\"y\""), "-Dx=\"y\"");
    }

    #[test]
    fn append_env_path_prefixes_new_value() {
        let var = "RUNTIME_LAUNCHER_TEST_APPEND_PATH";
        std::env::set_var(var, "/existing");
        assert_eq!(
            append_env_path(var, "/new"),
            format!("/new{}/existing", PATH_LIST_SEPARATOR)
        );
        std::env::remove_var(var);
        assert_eq!(append_env_path(var, "/new"), "/new");
    }

    #[test]
    fn library_env_is_set_on_the_command() {
        let mut cmd = Command::new("java");
        configure_library_env(&mut cmd, &[PathBuf::from("/opt/native")]);
        let value = cmd
            .get_envs()
            .find(|(key, _)| *key == library_path_var())
            .and_then(|(_, value)| value)
            .map(|value| value.to_string_lossy().into_owned())
            .unwrap();
        assert!(value.starts_with("/opt/native"));
    }
}

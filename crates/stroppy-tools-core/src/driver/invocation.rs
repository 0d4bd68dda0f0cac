//! Argument and environment contract for one driver call.

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde::{Deserialize, Serialize};

/// Token after which arguments go to k6 untouched.
pub const PASSTHROUGH_SEPARATOR: &str = "--";

/// Arguments and environment overlay for a single driver run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Subcommand, positionals and flags, in order.
    pub args: Vec<String>,
    /// Variables layered over the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    /// Start an invocation of `subcommand`.
    pub fn new(subcommand: impl Into<String>) -> Self {
        Invocation {
            args: vec![subcommand.into()],
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `arg` when present.
    pub fn arg_opt(self, arg: Option<impl Into<String>>) -> Self {
        match arg {
            Some(arg) => self.arg(arg),
            None => self,
        }
    }

    /// Append the separator followed by `args`; nothing when `args` is empty.
    pub fn passthrough<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::<String>::into).peekable();
        if args.peek().is_some() {
            self.args.push(PASSTHROUGH_SEPARATOR.to_string());
            self.args.extend(args);
        }
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Full child environment: `inherited` with `overlay` applied on top.
pub fn merged_environment<I>(
    inherited: I,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env: BTreeMap<OsString, OsString> = inherited.into_iter().collect();
    for (key, value) in overlay {
        env.insert(OsString::from(key), OsString::from(value));
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_pair(k: &str, v: &str) -> (OsString, OsString) {
        (OsString::from(k), OsString::from(v))
    }

    #[test]
    fn test_passthrough_only_with_args() {
        let bare = Invocation::new("run")
            .arg("bench.ts")
            .passthrough(Vec::<String>::new());
        assert_eq!(bare.args, vec!["run", "bench.ts"]);

        let with_k6 = Invocation::new("run")
            .arg("bench.ts")
            .passthrough(["--iterations", "100"]);
        assert_eq!(
            with_k6.args,
            vec!["run", "bench.ts", "--", "--iterations", "100"]
        );
    }

    #[test]
    fn test_arg_opt() {
        let inv = Invocation::new("run")
            .arg("bench.ts")
            .arg_opt(None::<String>)
            .arg_opt(Some("schema.sql"));
        assert_eq!(inv.args, vec!["run", "bench.ts", "schema.sql"]);
    }

    #[test]
    fn test_overlay_wins_on_collision() {
        let inherited = vec![os_pair("DURATION", "1h"), os_pair("HOME", "/root")];
        let overlay = BTreeMap::from([
            ("DURATION".to_string(), "30s".to_string()),
            ("DRIVER_URL".to_string(), "postgres://localhost".to_string()),
        ]);

        let env = merged_environment(inherited, &overlay);
        assert_eq!(env[&OsString::from("DURATION")], "30s");
        assert_eq!(env[&OsString::from("HOME")], "/root");
        assert_eq!(env[&OsString::from("DRIVER_URL")], "postgres://localhost");
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_empty_overlay_keeps_inherited() {
        let inherited = vec![os_pair("PATH", "/usr/bin")];
        let env = merged_environment(inherited, &BTreeMap::new());
        assert_eq!(env.len(), 1);
    }
}

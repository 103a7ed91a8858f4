//! Built-in `log` plugin: generates the `storm:log` runtime module

use tracing::debug;

use super::{Plugin, string_option};
use crate::codegen::{generated_header, string_literal};
use crate::error::{Error, Result};
use crate::hooks::PhaseHooks;
use crate::phase::Phase;

pub const NAME: &str = "log";
pub const RUNTIME_ID: &str = "storm:log";

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPlugin {
    /// Threshold baked into the runtime; the project log level when unset
    pub level: Option<String>,
}

impl LogPlugin {
    pub fn from_options(options: &serde_json::Value) -> Result<Box<dyn Plugin>> {
        let level = string_option(NAME, options, "level")?.map(|level| level.to_lowercase());
        if let Some(ref level) = level {
            if !LEVELS.contains(&level.as_str()) {
                return Err(Error::Config(format!(
                    "Plugin 'log' option 'level' must be one of {}, got '{level}'",
                    LEVELS.join(", ")
                )));
            }
        }
        Ok(Box::new(LogPlugin { level }))
    }
}

impl Plugin for LogPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn package_name(&self) -> Option<&str> {
        Some("@storm-stack/plugin-log")
    }

    fn add_hooks(&self, hooks: &mut PhaseHooks) -> Result<()> {
        let level = self.level.clone();

        hooks
            .on(Phase::PrepareTypes, |ctx| {
                ctx.write_types("log.d.ts", types_source())?;
                Ok(())
            })
            .on(Phase::PrepareRuntime, move |ctx| {
                let level = level.clone().unwrap_or_else(|| ctx.options().log_level.clone());
                debug!("Generating {} with threshold '{}'", RUNTIME_ID, level);
                ctx.write_runtime(RUNTIME_ID, runtime_source(&level))?;
                ctx.add_runtime_import(RUNTIME_ID, &["StormLog"]);
                Ok(())
            });
        Ok(())
    }
}

fn types_source() -> String {
    let mut out = generated_header(NAME);
    out.push_str(
        r#"declare module "storm:log" {
  export type LogLevel = "trace" | "debug" | "info" | "warn" | "error";

  export class StormLog {
    static trace(...args: unknown[]): void;
    static debug(...args: unknown[]): void;
    static info(...args: unknown[]): void;
    static warn(...args: unknown[]): void;
    static error(...args: unknown[]): void;
  }
}
"#,
    );
    out
}

fn runtime_source(level: &str) -> String {
    let mut out = generated_header(NAME);
    out.push_str(&format!(
        "export type LogLevel = \"trace\" | \"debug\" | \"info\" | \"warn\" | \"error\";\n\n\
         const LEVELS: LogLevel[] = [\"trace\", \"debug\", \"info\", \"warn\", \"error\"];\n\
         const THRESHOLD = LEVELS.indexOf({} as LogLevel);\n\n",
        string_literal(level)
    ));
    out.push_str(
        r#"export class StormLog {
  static trace(...args: unknown[]) {
    StormLog.write("trace", args);
  }

  static debug(...args: unknown[]) {
    StormLog.write("debug", args);
  }

  static info(...args: unknown[]) {
    StormLog.write("info", args);
  }

  static warn(...args: unknown[]) {
    StormLog.write("warn", args);
  }

  static error(...args: unknown[]) {
    StormLog.write("error", args);
  }

  private static write(level: LogLevel, args: unknown[]) {
    if (THRESHOLD < 0 || LEVELS.indexOf(level) < THRESHOLD) {
      return;
    }
    const sink = level === "error" ? console.error : level === "warn" ? console.warn : console.log;
    sink(`[${level}]`, ...args);
  }
}
"#,
    );
    out
}

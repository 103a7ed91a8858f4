//! Built-in `error` plugin: the error-code table and the `storm:error` runtime
//!
//! The table is created in `init:context` so workers can rely on it. Each
//! configured message is registered in `build:pre`, after which the runtime
//! module is regenerated so it embeds every assigned code.

use std::path::Path;

use tracing::info;

use super::{Plugin, string_option};
use crate::codegen::generated_header;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::hooks::PhaseHooks;
use crate::phase::Phase;
use crate::workers::error_lookup::{self, ErrorTable, FindRequest};

pub const NAME: &str = "error";
pub const RUNTIME_ID: &str = "storm:error";
pub const DEFAULT_ERROR_TYPE: &str = "general";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPlugin {
    /// Type used by `new StormError({ code })` when none is given
    pub default_type: String,
}

impl Default for ErrorPlugin {
    fn default() -> Self {
        Self {
            default_type: DEFAULT_ERROR_TYPE.to_string(),
        }
    }
}

impl ErrorPlugin {
    pub fn from_options(options: &serde_json::Value) -> Result<Box<dyn Plugin>> {
        let default_type = string_option(NAME, options, "defaultType")?
            .unwrap_or_else(|| DEFAULT_ERROR_TYPE.to_string());
        if default_type.trim().is_empty() {
            return Err(Error::Config(
                "Plugin 'error' option 'defaultType' must not be empty".to_string(),
            ));
        }
        Ok(Box::new(ErrorPlugin { default_type }))
    }
}

impl Plugin for ErrorPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn package_name(&self) -> Option<&str> {
        Some("@storm-stack/plugin-error")
    }

    fn add_hooks(&self, hooks: &mut PhaseHooks) -> Result<()> {
        let runtime_type = self.default_type.clone();
        let rebuild_type = self.default_type.clone();

        hooks
            .on(Phase::InitContext, |ctx| {
                error_lookup::ensure_table(&ctx.options().error_codes_file)?;
                Ok(())
            })
            .on(Phase::PrepareTypes, |ctx| {
                ctx.write_types("error.d.ts", types_source())?;
                Ok(())
            })
            .on(Phase::PrepareRuntime, move |ctx| {
                write_runtime(ctx, &runtime_type)?;
                ctx.add_runtime_import(RUNTIME_ID, &["StormError"]);
                Ok(())
            })
            .on(Phase::BuildPre, move |ctx| {
                let registered = register_messages(ctx)?;
                if registered > 0 {
                    write_runtime(ctx, &rebuild_type)?;
                }
                Ok(())
            });
        Ok(())
    }
}

/// Look up (and assign when new) a code for every configured message
fn register_messages(ctx: &Context) -> Result<usize> {
    let options = ctx.options();
    let mut registered = 0;
    for (error_type, messages) in &options.error_messages {
        for message in messages {
            let request = FindRequest::new(message, error_type, &options.error_codes_file);
            let code = error_lookup::find(&request)?;
            info!("Error '{}' is {} code {}", message, error_type, code);
            registered += 1;
        }
    }
    Ok(registered)
}

fn write_runtime(ctx: &mut Context, default_type: &str) -> Result<()> {
    let table = read_table(&ctx.options().error_codes_file)?;
    ctx.write_runtime(RUNTIME_ID, runtime_source(&table, default_type)?)?;
    Ok(())
}

/// The persisted table, or an empty one when it has not been created yet
fn read_table(path: &Path) -> Result<ErrorTable> {
    match error_lookup::load_table(path) {
        Ok(table) => Ok(table),
        Err(e) if e.is_not_found() => Ok(ErrorTable::new()),
        Err(e) => Err(e),
    }
}

fn types_source() -> String {
    let mut out = generated_header(NAME);
    out.push_str(
        r#"declare module "storm:error" {
  export interface StormErrorOptions {
    type?: string;
    code: number;
    params?: string[];
  }

  export class StormError extends Error {
    readonly type: string;
    readonly code: number;
    constructor(options: StormErrorOptions);
  }
}
"#,
    );
    out
}

fn runtime_source(table: &ErrorTable, default_type: &str) -> Result<String> {
    let codes = serde_json::to_string_pretty(table)?;
    let default_type = serde_json::to_string(default_type)?;

    let mut out = generated_header(NAME);
    out.push_str(&format!(
        "const CODES: Record<string, Record<string, string>> = {codes};\n\n\
         const DEFAULT_TYPE = {default_type};\n\n"
    ));
    out.push_str(
        r#"export interface StormErrorOptions {
  type?: string;
  code: number;
  params?: string[];
}

export class StormError extends Error {
  readonly type: string;
  readonly code: number;

  constructor(options: StormErrorOptions) {
    const type = options.type ?? DEFAULT_TYPE;
    super(StormError.format(CODES[type]?.[String(options.code)], options.params ?? []));
    this.name = "StormError";
    this.type = type;
    this.code = options.code;
  }

  private static format(template: string | undefined, params: string[]) {
    if (template === undefined) {
      return "An unknown error occurred";
    }
    return params.reduce((message, param, index) => message.split(`{${index}}`).join(param), template);
  }
}
"#,
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigMerger, ErrorsConfig, StormConfig};
    use crate::hooks::HookRegistry;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn registry() -> HookRegistry {
        let mut hooks = PhaseHooks::new();
        ErrorPlugin::default().add_hooks(&mut hooks).unwrap();
        let mut registry = HookRegistry::new();
        registry.add_hooks(NAME, hooks).unwrap();
        registry
    }

    fn context_with_messages(root: &Path, messages: &[&str]) -> Context {
        let mut by_type = BTreeMap::new();
        by_type.insert(
            "general".to_string(),
            messages.iter().map(|m| m.to_string()).collect(),
        );
        let options = ConfigMerger::new(root)
            .with_file_config(StormConfig {
                errors: Some(ErrorsConfig {
                    messages: Some(by_type),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .resolve()
            .unwrap();
        Context::new(options)
    }

    #[test]
    fn test_init_creates_empty_table() {
        let temp_dir = TempDir::new().unwrap();
        let mut ctx = context_with_messages(temp_dir.path(), &[]);
        registry().call_hook(Phase::InitContext, &mut ctx).unwrap();

        let table = error_lookup::load_table(&ctx.options().error_codes_file).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_build_pre_registers_messages_and_refreshes_runtime() {
        let temp_dir = TempDir::new().unwrap();
        let mut ctx = context_with_messages(temp_dir.path(), &["Missing value", "Bad input"]);
        let mut registry = registry();

        registry.call_hook(Phase::InitContext, &mut ctx).unwrap();
        registry.call_hook(Phase::PrepareRuntime, &mut ctx).unwrap();
        assert!(ctx.vfs.resolve_runtime(RUNTIME_ID).unwrap().contents.contains("= {};"));

        registry.call_hook(Phase::BuildPre, &mut ctx).unwrap();
        let table = error_lookup::load_table(&ctx.options().error_codes_file).unwrap();
        assert_eq!(table["general"]["1"], "Missing value");
        assert_eq!(table["general"]["2"], "Bad input");

        let runtime = &ctx.vfs.resolve_runtime(RUNTIME_ID).unwrap().contents;
        assert!(runtime.contains("\"1\": \"Missing value\""));

        // A second build reuses the same codes
        registry.call_hook(Phase::BuildPre, &mut ctx).unwrap();
        let again = error_lookup::load_table(&ctx.options().error_codes_file).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn test_runtime_embeds_table() {
        let mut table = ErrorTable::new();
        table
            .entry("general".to_string())
            .or_default()
            .insert("1".to_string(), "Missing value".to_string());
        let source = runtime_source(&table, "general").unwrap();

        insta::assert_snapshot!(source.lines().skip(3).take(9).collect::<Vec<_>>().join("\n"), @r#"
        const CODES: Record<string, Record<string, string>> = {
          "general": {
            "1": "Missing value"
          }
        };

        const DEFAULT_TYPE = "general";

        export interface StormErrorOptions {
        "#);
    }
}

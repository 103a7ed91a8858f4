//! Built-in `dotenv` plugin: reflects `.env` variables into a typed `storm:env`
//!
//! The variables reflection is merged with the one committed by earlier
//! builds, so variables missing from the current `.env` files keep their
//! declarations. At `finalize` the reflections go through the commit
//! workers and the values are persisted to the binary stores.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::{Plugin, string_option};
use crate::codegen::{generated_header, interface_declaration, property_key, string_literal};
use crate::config::ResolvedOptions;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::hooks::PhaseHooks;
use crate::phase::Phase;
use crate::reflection::values::{CONFIG_SECRETS_FILE, CONFIG_VALUES_FILE};
use crate::reflection::{ConfigValues, SerializedProperty, SerializedType, merge};
use crate::workers::commit::{self, CommitRequest};

pub const NAME: &str = "dotenv";
pub const RUNTIME_ID: &str = "storm:env";

/// Keys of [`Context::reflections`] this plugin owns
pub const VARS_REFLECTION: &str = "vars";
pub const CONFIG_REFLECTION: &str = "config";

pub const CONFIG_TYPE_NAME: &str = "StormConfig";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotenvPlugin {
    /// Prefix a variable must carry to be reflected; all variables when unset
    pub prefix: Option<String>,
}

impl DotenvPlugin {
    pub fn from_options(options: &serde_json::Value) -> Result<Box<dyn Plugin>> {
        let prefix = string_option(NAME, options, "prefix")?;
        Ok(Box::new(DotenvPlugin { prefix }))
    }
}

impl Plugin for DotenvPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn package_name(&self) -> Option<&str> {
        Some("@storm-stack/plugin-dotenv")
    }

    fn add_hooks(&self, hooks: &mut PhaseHooks) -> Result<()> {
        let prefix = self.prefix.clone();

        hooks
            .on(Phase::InitContext, move |ctx| {
                let vars = reflect_vars(ctx, prefix.as_deref())?;
                let config = reflect_config(ctx.options());
                debug!("Reflected {} variables into '{}'", vars.properties.len(), vars.name);
                ctx.reflections.insert(VARS_REFLECTION.to_string(), vars);
                ctx.reflections.insert(CONFIG_REFLECTION.to_string(), config);
                Ok(())
            })
            .on(Phase::PrepareTypes, |ctx| {
                let source = types_source(vars_reflection(ctx)?);
                ctx.write_types("vars.d.ts", source)?;
                Ok(())
            })
            .on(Phase::PrepareRuntime, |ctx| {
                let source = runtime_source(vars_reflection(ctx)?);
                ctx.write_runtime(RUNTIME_ID, source)?;
                ctx.add_runtime_import(RUNTIME_ID, &["env"]);
                Ok(())
            })
            .on(Phase::Finalize, |ctx| commit_reflections(ctx));
        Ok(())
    }
}

fn vars_reflection(ctx: &Context) -> Result<&SerializedType> {
    ctx.reflections.get(VARS_REFLECTION).ok_or_else(|| {
        Error::plugin(NAME, "the variables reflection is missing; 'init:context' did not run")
    })
}

/// TypeScript type of a variable's value
fn infer_type(value: &str) -> &'static str {
    match value {
        "true" | "false" => "boolean",
        v if !v.is_empty() && v.parse::<f64>().is_ok() => "number",
        _ => "string",
    }
}

fn reflect_vars(ctx: &Context, prefix: Option<&str>) -> Result<SerializedType> {
    let options = ctx.options();
    let mut vars = SerializedType::new(&options.vars_type_name)
        .with_description("Environment variables available through storm:env");

    for (key, value) in &ctx.resolved_dotenv.values {
        if prefix.is_some_and(|prefix| !key.starts_with(prefix)) {
            continue;
        }
        let property = if options.secrets.contains(key) {
            SerializedProperty::new(key, "string").optional().secret()
        } else {
            SerializedProperty::new(key, infer_type(value)).with_default(value)
        };
        vars.insert(property);
    }

    let persisted = options.reflections_dir().join(format!("{VARS_REFLECTION}.json"));
    match commit::load_reflection(&persisted)? {
        Some(existing) => Ok(merge(existing, vars)),
        None => Ok(vars),
    }
}

/// Shape of the project options exposed to generated code
fn reflect_config(options: &ResolvedOptions) -> SerializedType {
    SerializedType::new(CONFIG_TYPE_NAME)
        .with_description("Resolved Storm project options")
        .with_property(SerializedProperty::new("name", "string").with_default(&options.name))
        .with_property(
            SerializedProperty::new("mode", "\"production\" | \"development\" | \"test\"")
                .with_default(options.mode.as_str()),
        )
        .with_property(
            SerializedProperty::new("projectType", "\"library\" | \"application\"")
                .with_default(options.project_type.as_str()),
        )
        .with_property(SerializedProperty::new("logLevel", "string").with_default(&options.log_level))
}

fn types_source(vars: &SerializedType) -> String {
    let mut out = generated_header(NAME);
    out.push_str("declare module \"storm:env\" {\n");
    for line in interface_declaration(vars).lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out.push_str(&format!("\n  export const env: {};\n}}\n", vars.name));
    out
}

fn runtime_value(property: &SerializedProperty) -> String {
    let read = format!("read({})", string_literal(&property.name));
    let Some(default) = property.default_value.as_ref().filter(|_| !property.secret) else {
        return read;
    };
    let fallback = format!("{read} ?? {}", string_literal(default));
    match property.type_name.as_str() {
        "number" => format!("Number({fallback})"),
        "boolean" => format!("({fallback}) === \"true\""),
        _ => fallback,
    }
}

fn runtime_source(vars: &SerializedType) -> String {
    let mut out = generated_header(NAME);
    out.push_str(
        "const read = (key: string): string | undefined =>\n  \
         typeof process === \"undefined\" ? undefined : process.env[key];\n\n",
    );
    out.push_str("export const env = {\n");
    for property in vars.properties.values() {
        out.push_str(&format!(
            "  {}: {},\n",
            property_key(&property.name),
            runtime_value(property)
        ));
    }
    out.push_str("};\n");
    out
}

/// Persist both reflections and split the values into the public and secret stores
fn commit_reflections(ctx: &mut Context) -> Result<()> {
    let options = ctx.options_arc();
    let dir = options.reflections_dir();

    for (key, path) in [
        (VARS_REFLECTION, dir.join("vars.json")),
        (CONFIG_REFLECTION, dir.join("config.json")),
    ] {
        let Some(reflection) = ctx.reflections.get(key) else {
            continue;
        };
        let request = CommitRequest::new(reflection.clone(), path);
        let outcome = if key == VARS_REFLECTION {
            commit::commit_vars(request)?
        } else {
            commit::commit_config(request)?
        };
        ctx.reflections.insert(key.to_string(), outcome.reflection);
    }

    let (secrets, values): (BTreeMap<_, _>, BTreeMap<_, _>) = ctx
        .resolved_dotenv
        .values
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .partition(|(key, _)| options.secrets.contains(key));

    ConfigValues { values }.commit(&dir.join(CONFIG_VALUES_FILE))?;
    if !secrets.is_empty() {
        ConfigValues { values: secrets }.commit(&dir.join(CONFIG_SECRETS_FILE))?;
    }
    info!("Committed reflections to {}", dir.display());
    Ok(())
}

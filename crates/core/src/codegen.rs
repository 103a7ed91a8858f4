//! TypeScript emit helpers shared by the built-in plugins

use crate::context::RuntimeImport;
use crate::reflection::{SerializedProperty, SerializedType};

/// Banner placed at the top of every generated file
pub fn generated_header(plugin: &str) -> String {
    format!(
        "/* eslint-disable */\n// Generated by the Storm Stack \"{plugin}\" plugin. Do not edit this file directly.\n\n"
    )
}

/// Quote `value` as a double-quoted TypeScript string literal
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `name` can be used as a bare property key
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Property key, quoted when it is not an identifier
pub fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        string_literal(name)
    }
}

/// `import { A, B } from "module";`
pub fn import_statement(import: &RuntimeImport) -> String {
    format!(
        "import {{ {} }} from {};\n",
        import.imports.join(", "),
        string_literal(&import.module)
    )
}

/// Text safe to place inside a `/** ... */` block
pub fn doc_text(text: &str) -> String {
    text.replace("*/", "*\\/")
}

fn doc_line(property: &SerializedProperty) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(ref description) = property.description {
        parts.push(doc_text(description));
    }
    if let Some(ref default) = property.default_value {
        if !property.secret {
            parts.push(format!("@defaultValue {}", doc_text(default)));
        }
    }
    if property.secret {
        parts.push("@secret".to_string());
    }
    (!parts.is_empty()).then(|| format!("/** {} */", parts.join(" ")))
}

/// `export interface <Name> { ... }` for a reflection, properties in sorted order
pub fn interface_declaration(reflection: &SerializedType) -> String {
    let mut out = String::new();
    if let Some(ref description) = reflection.description {
        out.push_str(&format!("/** {} */\n", doc_text(description)));
    }
    out.push_str(&format!("export interface {} {{\n", reflection.name));
    for property in reflection.properties.values() {
        if let Some(doc) = doc_line(property) {
            out.push_str(&format!("  {doc}\n"));
        }
        out.push_str(&format!(
            "  {}{}: {};\n",
            property_key(&property.name),
            if property.optional { "?" } else { "" },
            property.type_name
        ));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("plain"), "\"plain\"");
        assert_eq!(string_literal("a \"b\"\n"), "\"a \\\"b\\\"\\n\"");
        assert_eq!(string_literal("c:\\x"), "\"c:\\\\x\"");
    }

    #[test]
    fn test_property_keys() {
        assert_eq!(property_key("PORT"), "PORT");
        assert_eq!(property_key("$ok_1"), "$ok_1");
        assert_eq!(property_key("app.name"), "\"app.name\"");
        assert_eq!(property_key("1st"), "\"1st\"");
    }

    #[test]
    fn test_import_statement() {
        let import = RuntimeImport {
            module: "storm:log".to_string(),
            imports: vec!["StormLog".to_string(), "LogLevel".to_string()],
        };
        assert_eq!(
            import_statement(&import),
            "import { StormLog, LogLevel } from \"storm:log\";\n"
        );
    }

    #[test]
    fn test_interface_declaration() {
        let reflection = SerializedType::new("StormVariables")
            .with_description("Environment variables")
            .with_property(
                SerializedProperty::new("PORT", "number")
                    .with_description("Listen port")
                    .with_default("3000"),
            )
            .with_property(SerializedProperty::new("API_KEY", "string").with_default("x").secret())
            .with_property(SerializedProperty::new("app.name", "string").optional());

        insta::assert_snapshot!(interface_declaration(&reflection), @r#"
        /** Environment variables */
        export interface StormVariables {
          /** @secret */
          API_KEY: string;
          /** Listen port @defaultValue 3000 */
          PORT: number;
          "app.name"?: string;
        }
        "#);
    }

    #[test]
    fn test_doc_comments_cannot_be_closed_early() {
        let reflection = SerializedType::new("Vars")
            .with_description("a */ b")
            .with_property(
                SerializedProperty::new("TOKEN", "string")
                    .with_default("x*/ export const pwn = 1; /*"),
            );
        let source = interface_declaration(&reflection);

        assert_eq!(source.matches("*/").count(), 2);
        assert!(source.contains("/** @defaultValue x*\\/ export const pwn = 1; /* */"));
        assert!(source.starts_with("/** a *\\/ b */\n"));
    }
}

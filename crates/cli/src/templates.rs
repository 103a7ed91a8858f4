//! File templates written by `storm new`

use storm_core::ProjectType;

/// `src/index.ts` for a fresh project
pub fn index_ts(project_type: ProjectType, name: &str) -> String {
    match project_type {
        ProjectType::Library => format!(
            r#"import {{ StormLog }} from "storm:log";

/** Entry point of the {name} library */
export function greet(who: string): string {{
  StormLog.debug("greet", who);
  return `Hello, ${{who}}!`;
}}
"#
        ),
        ProjectType::Application => format!(
            r#"import {{ env }} from "storm:env";
import {{ StormLog }} from "storm:log";

StormLog.info("Starting {name}", env);
"#
        ),
    }
}

/// `tsconfig.json` mapping `storm:*` imports onto the generated runtime
pub fn tsconfig_json(runtime_dir: &str, types_dir: &str) -> String {
    format!(
        r#"{{
  "compilerOptions": {{
    "target": "ES2022",
    "module": "ESNext",
    "moduleResolution": "Bundler",
    "strict": true,
    "paths": {{
      "storm:*": ["./{runtime_dir}/*"]
    }}
  }},
  "include": ["src", "{types_dir}"]
}}
"#
    )
}

/// `.env` with the variables the application template reads
pub fn dotenv(name: &str) -> String {
    format!("APP_NAME={name}\nPORT=3000\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsconfig_is_valid_json() {
        let value: serde_json::Value =
            serde_json::from_str(&tsconfig_json(".storm/runtime", ".storm/types")).unwrap();
        assert_eq!(
            value["compilerOptions"]["paths"]["storm:*"][0],
            "./.storm/runtime/*"
        );
    }

    #[test]
    fn test_index_templates() {
        assert!(index_ts(ProjectType::Library, "utils").contains("export function greet"));
        assert!(index_ts(ProjectType::Application, "api").contains("from \"storm:env\""));
    }
}

//! Build script for mwait-runtime
//!
//! Handles configuration merging:
//! 1. Start with library defaults
//! 2. If MW_CONFIG_RS env var is set, parse the user's config file
//! 3. Merge user values over defaults (user wins)
//! 4. Generate OUT_DIR/mw_merged_config.rs
//!
//! The user file only lists the values it changes.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration parameter definition
struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

/// All configuration parameters with their defaults
const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "MONITOR_CPU",
        rust_type: "usize",
        default_value: "0",
    },
    ConfigParam {
        name: "WORKER_CPU",
        rust_type: "usize",
        default_value: "2",
    },
    ConfigParam {
        name: "POLL_INTERVAL_MS",
        rust_type: "u64",
        default_value: "100",
    },
    ConfigParam {
        name: "WRITE_MASK",
        rust_type: "u64",
        default_value: "0xff",
    },
    ConfigParam {
        name: "REPORT_QUEUE_CAPACITY",
        rust_type: "usize",
        default_value: "1024",
    },
    ConfigParam {
        name: "SPIN_WAIT_BUDGET_US",
        rust_type: "u64",
        default_value: "1000",
    },
    ConfigParam {
        name: "PIN_THREADS",
        rust_type: "bool",
        default_value: "true",
    },
    ConfigParam {
        name: "DEVICE_NAME",
        rust_type: "&str",
        default_value: "\"Mwait\"",
    },
];

fn main() {
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => dir,
        Err(_) => panic!("OUT_DIR not set"),
    };
    let dest_path = Path::new(&out_dir).join("mw_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("MW_CONFIG_RS").ok();
    if let Some(path) = &user_path {
        println!("cargo:rerun-if-changed={}", path);

        match fs::read_to_string(path) {
            Ok(content) => {
                parse_and_merge(&content, &mut config);
                println!("cargo:warning=Using custom config: {}", path);
            }
            Err(e) => {
                println!("cargo:warning=Failed to read MW_CONFIG_RS ({}): {}", path, e);
            }
        }
    }

    println!("cargo:rerun-if-env-changed=MW_CONFIG_RS");

    let output = generate_config(&config, user_path.is_some());
    if let Err(e) = fs::write(&dest_path, output) {
        panic!("failed to write merged config: {}", e);
    }
}

/// Parse the user's config file and merge known values into `config`
fn parse_and_merge(content: &str, config: &mut HashMap<&str, String>) {
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("//") || !line.starts_with("pub const ") {
            continue;
        }

        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };

        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => println!("cargo:warning=Unknown config parameter: {}", name),
        }
    }
}

/// Parse `pub const NAME: TYPE = VALUE;` into (NAME, VALUE)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();

    let colon_pos = rest.find(':')?;
    let name = rest[..colon_pos].trim().to_string();

    let eq_pos = rest.find('=')?;
    let semi_pos = rest.rfind(';').unwrap_or(rest.len());
    let value = rest[eq_pos + 1..semi_pos].trim().to_string();

    Some((name, value))
}

/// Generate the merged config Rust file
fn generate_config(config: &HashMap<&str, String>, custom: bool) -> String {
    let mut output = String::new();

    output.push_str("// Auto-generated by build.rs - do not edit\n");
    output.push_str("// Configuration merged from library defaults");
    if custom {
        output.push_str(" and the user's MW_CONFIG_RS file");
    }
    output.push_str("\n\n");

    for param in CONFIG_PARAMS {
        let value = config
            .get(param.name)
            .map(String::as_str)
            .unwrap_or(param.default_value);
        output.push_str(&format!(
            "pub const {}: {} = {};\n",
            param.name, param.rust_type, value
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_const_line() {
        let result = parse_const_line("pub const MONITOR_CPU: usize = 1;");
        assert_eq!(result, Some(("MONITOR_CPU".into(), "1".into())));

        let result = parse_const_line("pub const WRITE_MASK: u64 = 0xfff;");
        assert_eq!(result, Some(("WRITE_MASK".into(), "0xfff".into())));
    }

    #[test]
    fn test_parse_and_merge_ignores_unknown() {
        let mut config: HashMap<&str, String> = HashMap::new();
        config.insert("WORKER_CPU", "2".into());

        let user_config = r#"
            // Custom config
            pub const WORKER_CPU: usize = 3;
            pub const NOT_A_PARAM: u8 = 1;
        "#;

        parse_and_merge(user_config, &mut config);

        assert_eq!(config.get("WORKER_CPU"), Some(&"3".to_string()));
        assert!(!config.contains_key("NOT_A_PARAM"));
    }
}

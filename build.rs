use std::env;
use std::fs;
use std::path::Path;

/// Embedded when no config.toml is present at build time; mirrors the
/// optional-file behavior of the runtime loader.
const FALLBACK_CONFIG: &str = r#"
model = "gpt-4o"
image_model = "dall-e-3"
title_model = "gpt-3.5-turbo-instruct"
language = "en"
data_dir = ".config"
max_image_prompt_chars = 4000
"#;

fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_content =
        fs::read_to_string("config.toml").unwrap_or_else(|_| FALLBACK_CONFIG.to_string());
    assert!(
        !config_content.contains("\"#"),
        "config.toml cannot contain `\"#`; it is embedded in a raw string"
    );

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("config_embedded.rs");
    fs::write(
        dest_path,
        format!("pub const DEFAULT_CONFIG: &str = r#\"{config_content}\"#;"),
    )
    .expect("Failed to write embedded config");
}

use std::fs;

const DEFAULT_CONFIG: &str = "src/default_config.toml";

fn main() {
    println!("cargo:rerun-if-changed={DEFAULT_CONFIG}");

    let content = fs::read_to_string(DEFAULT_CONFIG)
        .unwrap_or_else(|e| panic!("Failed to read {DEFAULT_CONFIG}: {e}"));
    let table: toml::Table = content
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {DEFAULT_CONFIG}: {e}"));

    // The bundled defaults must deserialize into HtmlConfig, or the
    // compiled-in fallback would silently drop them
    let Some(html) = table.get("html").and_then(|v| v.as_table()) else {
        panic!("{DEFAULT_CONFIG} needs an [html] table");
    };
    for (key, value) in html {
        let valid = match key.as_str() {
            "title" | "custom_css" => value.is_str(),
            "include_styles" => value.is_bool(),
            _ => panic!("{DEFAULT_CONFIG}: unknown key html.{key}"),
        };
        if !valid {
            panic!("{DEFAULT_CONFIG}: html.{key} has the wrong type");
        }
    }
    if !html.contains_key("title") {
        panic!("{DEFAULT_CONFIG}: html.title is required");
    }
}

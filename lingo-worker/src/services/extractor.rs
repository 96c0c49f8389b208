//! Translatable string extraction from mod artifacts
//!
//! Scans a downloaded jar for per-namespace source-language string tables at
//! `assets/<namespace>/lang/<source>.json`. The base game's own `minecraft`
//! namespace is excluded. Extracted keys are prefixed with their namespace
//! (`namespace:key`) so items from different mods never collide.

use lingo_common::Result;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

const EXCLUDED_NAMESPACE: &str = "minecraft";

/// Extracted (namespaced key → source value) pairs
pub type TranslationStrings = BTreeMap<String, String>;

/// Extract source-language strings from a jar's bytes.
///
/// Entries that are not valid JSON string tables are skipped with a warning
/// rather than failing the whole artifact.
pub fn extract_strings(data: &[u8], source_language: &str) -> Result<TranslationStrings> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut strings = TranslationStrings::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let namespace = match lang_table_namespace(entry.name(), source_language) {
            Some(ns) => ns.to_string(),
            None => continue,
        };

        let mut contents = String::new();
        if let Err(e) = entry.read_to_string(&mut contents) {
            warn!(entry = %entry.name(), error = %e, "Failed to read lang table entry");
            continue;
        }

        let table: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&contents) {
            Ok(table) => table,
            Err(e) => {
                warn!(entry = %entry.name(), error = %e, "Skipping unparseable lang table");
                continue;
            }
        };

        for (key, value) in table {
            if let serde_json::Value::String(value) = value {
                strings.insert(format!("{}:{}", namespace, key), value);
            }
        }
    }

    debug!(count = strings.len(), "Extracted strings from artifact");
    Ok(strings)
}

/// If `path` is a source-language string table, return its namespace.
///
/// Matches exactly `assets/<namespace>/lang/<source_language>.json` and
/// rejects the excluded base-game namespace.
fn lang_table_namespace<'a>(path: &'a str, source_language: &str) -> Option<&'a str> {
    let mut parts = path.split('/');

    if parts.next() != Some("assets") {
        return None;
    }
    let namespace = parts.next()?;
    if namespace.is_empty() || namespace == EXCLUDED_NAMESPACE {
        return None;
    }
    if parts.next() != Some("lang") {
        return None;
    }
    let file = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let expected = format!("{}.json", source_language);
    (file == expected).then_some(namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_jar(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_namespaced_keys() {
        let jar = build_jar(&[(
            "assets/examplemod/lang/en_us.json",
            r#"{"item.widget": "Widget", "block.gadget": "Gadget"}"#,
        )]);

        let strings = extract_strings(&jar, "en_us").unwrap();
        assert_eq!(strings.len(), 2);
        assert_eq!(strings["examplemod:item.widget"], "Widget");
        assert_eq!(strings["examplemod:block.gadget"], "Gadget");
    }

    #[test]
    fn excludes_base_game_namespace() {
        let jar = build_jar(&[
            ("assets/minecraft/lang/en_us.json", r#"{"key": "value"}"#),
            ("assets/mymod/lang/en_us.json", r#"{"key": "value"}"#),
        ]);

        let strings = extract_strings(&jar, "en_us").unwrap();
        assert_eq!(strings.len(), 1);
        assert!(strings.contains_key("mymod:key"));
    }

    #[test]
    fn ignores_non_matching_entries() {
        let jar = build_jar(&[
            ("assets/mymod/lang/de_de.json", r#"{"key": "wert"}"#),
            ("assets/mymod/models/item.json", r#"{"parent": "x"}"#),
            ("data/mymod/lang/en_us.json", r#"{"key": "value"}"#),
            ("assets/mymod/lang/extra/en_us.json", r#"{"key": "value"}"#),
            ("README.md", "hello"),
        ]);

        let strings = extract_strings(&jar, "en_us").unwrap();
        assert!(strings.is_empty());
    }

    #[test]
    fn bad_json_entry_is_skipped_not_fatal() {
        let jar = build_jar(&[
            ("assets/broken/lang/en_us.json", "not json at all"),
            ("assets/good/lang/en_us.json", r#"{"key": "value"}"#),
        ]);

        let strings = extract_strings(&jar, "en_us").unwrap();
        assert_eq!(strings.len(), 1);
        assert_eq!(strings["good:key"], "value");
    }

    #[test]
    fn non_string_values_are_dropped() {
        let jar = build_jar(&[(
            "assets/mymod/lang/en_us.json",
            r#"{"key": "value", "count": 3, "nested": {"a": 1}}"#,
        )]);

        let strings = extract_strings(&jar, "en_us").unwrap();
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn garbage_bytes_are_an_archive_error() {
        assert!(extract_strings(b"definitely not a zip", "en_us").is_err());
    }
}

//! Loading pipeline: finds the data files in a directory, parses them and
//! resolves item names into a frozen [`Registry`] plus a validated
//! [`StationConfig`].
//!
//! A data directory holds `items`, `rules` and an optional `config` file,
//! each in RON, TOML or JSON (picked by extension, one format per file).

use crate::schema::{ConfigData, IngredientData, ItemData, PatternData, RuleData, RuleKindData};
use pedestal_core::config::{ConfigError, StationConfig};
use pedestal_core::fixed::f64_to_fixed64;
use pedestal_core::id::{AdvancementId, ItemTypeId, RuleId, SoundId};
use pedestal_core::item::ItemStack;
use pedestal_core::registry::{ItemDef, Registry, RegistryBuilder, RegistryError};
use pedestal_core::rule::{FallbackRule, Ingredient, Pattern, PrimaryRule};
use pedestal_core::slots::{Catalyst, GRID_SLOTS, GRID_WIDTH};
use pedestal_core::station::StationTier;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files share a base name but differ in format.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// Well-formed but semantically unusable data.
    #[error("invalid data in {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid station config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn invalid(file: &Path, detail: impl Into<String>) -> DataLoadError {
    DataLoadError::Invalid {
        file: file.to_path_buf(),
        detail: detail.into(),
    }
}

// ===========================================================================
// Format detection and discovery
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| Some(f.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

/// Find `{base_name}.{ron,toml,json}` in `dir`. `Ok(None)` when absent,
/// `ConflictingFormats` when more than one exists.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for format in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{}", format.extension()));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. RON and JSON files hold the list itself; TOML files
/// hold it under `toml_key` as an array of tables.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let mut table: toml::Table = deserialize_file(path)?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array.try_into().map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution
// ===========================================================================

pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything a host needs to run stations of one kind.
#[derive(Debug)]
pub struct StationData {
    pub registry: Registry,
    pub config: StationConfig,
}

/// Load `items`, `rules` and the optional `config` file from `dir`.
///
/// Rules register in file order, which is also their scan order.
pub fn load_station_data(dir: &Path) -> Result<StationData, DataLoadError> {
    let items_path = require_data_file(dir, "items")?;
    let rules_path = require_data_file(dir, "rules")?;
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    let rules: Vec<RuleData> = deserialize_list(&rules_path, "rules")?;

    let config = match find_data_file(dir, "config")? {
        Some(path) => deserialize_file::<ConfigData>(&path)?.into_config(),
        None => StationConfig::default(),
    };
    config.validate()?;

    let mut builder = RegistryBuilder::new();
    let item_ids = register_items(&mut builder, &items, &items_path)?;
    let mut rule_ids: HashMap<String, RuleId> = HashMap::new();
    for rule in &rules {
        check_duplicate(&rule_ids, &rule.name, &rules_path)?;
        let id = register_rule(&mut builder, rule, &item_ids, &rules_path)?;
        rule_ids.insert(rule.name.clone(), id);
    }

    let registry = builder.build()?;
    tracing::info!(
        dir = %dir.display(),
        items = registry.item_count(),
        rules = registry.rule_count(),
        "loaded station data"
    );
    Ok(StationData { registry, config })
}

fn register_items(
    builder: &mut RegistryBuilder,
    items: &[ItemData],
    file: &Path,
) -> Result<HashMap<String, ItemTypeId>, DataLoadError> {
    let mut ids = HashMap::new();
    for item in items {
        check_duplicate(&ids, &item.name, file)?;
        let mut def = ItemDef::new(&item.name).with_max_stack(item.max_stack);
        if let Some(tier) = item.tier {
            def = def.with_tier(StationTier(tier));
        }
        if item.template {
            def = def.as_template();
        }
        ids.insert(item.name.clone(), builder.register_item(def));
    }

    // Remainders and catalysts may name items declared later in the file.
    let mut catalysts: HashMap<Catalyst, &str> = HashMap::new();
    for item in items {
        if let Some(remainder) = &item.remainder {
            let remainder = *resolve_name(&ids, remainder, file, "item")?;
            builder.mutate_item(&item.name, |def| def.remainder = Some(remainder))?;
        }
        if let Some(catalyst) = item.catalyst {
            if let Some(previous) = catalysts.insert(catalyst, &item.name) {
                return Err(invalid(
                    file,
                    format!("{catalyst:?} catalyst claimed by both '{previous}' and '{}'", item.name),
                ));
            }
            builder.set_catalyst(catalyst, *resolve_name(&ids, &item.name, file, "item")?);
        }
    }
    Ok(ids)
}

fn register_rule(
    builder: &mut RegistryBuilder,
    rule: &RuleData,
    items: &HashMap<String, ItemTypeId>,
    file: &Path,
) -> Result<RuleId, DataLoadError> {
    let pattern = build_pattern(&rule.pattern, items, file, &rule.name)?;
    if rule.output.count() == 0 {
        return Err(invalid(file, format!("rule '{}' outputs zero items", rule.name)));
    }
    let output = ItemStack::new(
        *resolve_name(items, rule.output.item(), file, "item")?,
        rule.output.count(),
    );

    let id = match rule.kind {
        RuleKindData::Primary => {
            let duration = rule
                .duration
                .ok_or_else(|| invalid(file, format!("primary rule '{}' has no duration", rule.name)))?;
            let mut primary = PrimaryRule::new(&rule.name, pattern, output, duration)
                .with_reward(f64_to_fixed64(rule.reward));
            for (catalyst, amount) in rule.catalysts.amounts() {
                primary = primary.with_catalyst(catalyst, amount);
            }
            if let Some(gate) = rule.gate {
                primary = primary.with_gate(AdvancementId(gate));
            }
            if let Some(sound) = rule.sound {
                primary = primary.with_sound(SoundId(sound));
            }
            builder.register_primary(primary)
        }
        RuleKindData::Fallback => {
            let extras = rule.duration.is_some()
                || !rule.catalysts.is_free()
                || rule.reward != 0.0
                || rule.gate.is_some()
                || rule.sound.is_some();
            if extras {
                tracing::warn!(
                    rule = %rule.name,
                    "fallback rule ignores duration, catalysts, reward, gate and sound"
                );
            }
            builder.register_fallback(FallbackRule::new(&rule.name, pattern, output))
        }
    };
    Ok(id)
}

fn build_ingredient(
    data: &IngredientData,
    items: &HashMap<String, ItemTypeId>,
    file: &Path,
    rule: &str,
) -> Result<Ingredient, DataLoadError> {
    if data.names().is_empty() {
        return Err(invalid(file, format!("rule '{rule}' has an ingredient with no items")));
    }
    let ids = data
        .names()
        .iter()
        .map(|name| resolve_name(items, name, file, "item").copied())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Ingredient::any_of(ids))
}

fn build_pattern(
    data: &PatternData,
    items: &HashMap<String, ItemTypeId>,
    file: &Path,
    rule: &str,
) -> Result<Pattern, DataLoadError> {
    match data {
        PatternData::Shapeless { ingredients } => {
            if ingredients.is_empty() || ingredients.len() > GRID_SLOTS {
                return Err(invalid(
                    file,
                    format!("rule '{rule}' needs 1 to {GRID_SLOTS} ingredients"),
                ));
            }
            let ingredients = ingredients
                .iter()
                .map(|i| build_ingredient(i, items, file, rule))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Pattern::shapeless(ingredients))
        }
        PatternData::Shaped { rows, key } => {
            let height = rows.len();
            let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
            if !(1..=GRID_WIDTH).contains(&height) || !(1..=GRID_WIDTH).contains(&width) {
                return Err(invalid(
                    file,
                    format!("rule '{rule}' pattern is {width}x{height}, max is {GRID_WIDTH}x{GRID_WIDTH}"),
                ));
            }
            let mut cells = Vec::with_capacity(width * height);
            for row in rows {
                let mut chars = row.chars();
                for _ in 0..width {
                    match chars.next() {
                        None | Some(' ') => cells.push(Ingredient::empty()),
                        Some(c) => {
                            let symbol = c.to_string();
                            let entry = key.get(&symbol).ok_or_else(|| DataLoadError::UnresolvedRef {
                                file: file.to_path_buf(),
                                name: symbol.clone(),
                                expected_kind: "pattern key",
                            })?;
                            cells.push(build_ingredient(entry, items, file, rule)?);
                        }
                    }
                }
            }
            Ok(Pattern::shaped(width as u8, height as u8, cells))
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pedestal_core::config::RewardRounding;
    use pedestal_core::fixed::Fixed64;
    use pedestal_core::rule::Rule;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pedestal_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const ITEMS_RON: &str = r#"[
        (name: "log"),
        (name: "plank"),
        (name: "stone"),
        (name: "cyan_powder", catalyst: Some(cyan)),
        (name: "milk_bucket", max_stack: 1, remainder: Some("bucket")),
        (name: "bucket", max_stack: 16),
        (name: "template", max_stack: 1, template: true),
    ]"#;

    const RULES_RON: &str = r#"[
        (
            name: "infused_planks",
            pattern: shapeless(ingredients: ["log"]),
            output: ("plank", 8),
            duration: Some(40),
            catalysts: (cyan: 2),
            reward: 1.5,
            gate: Some(3),
        ),
        (
            name: "planks",
            kind: fallback,
            pattern: shaped(rows: ["l"], key: {"l": "log"}),
            output: ("plank", 4),
        ),
    ]"#;

    fn write_ron_set(dir: &Path) {
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(dir.join("rules.ron"), RULES_RON).unwrap();
    }

    // -----------------------------------------------------------------------
    // Format detection and discovery
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("items.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("items.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("items.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("items")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_cases() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "items").unwrap(), None);
        assert!(matches!(
            require_data_file(&dir, "items"),
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "items"
        ));

        fs::write(dir.join("items.toml"), "").unwrap();
        assert_eq!(find_data_file(&dir, "items").unwrap(), Some(dir.join("items.toml")));

        fs::write(dir.join("items.json"), "[]").unwrap();
        assert!(matches!(
            find_data_file(&dir, "items"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_reads_every_format() {
        let dir = make_test_dir("list_formats");
        fs::write(dir.join("a.ron"), r#"[(name: "log"), (name: "plank")]"#).unwrap();
        fs::write(dir.join("b.json"), r#"[{"name": "log"}, {"name": "plank"}]"#).unwrap();
        fs::write(dir.join("c.toml"), "[[items]]\nname = \"log\"\n\n[[items]]\nname = \"plank\"\n")
            .unwrap();

        for file in ["a.ron", "b.json", "c.toml"] {
            let items: Vec<ItemData> = deserialize_list(&dir.join(file), "items").unwrap();
            assert_eq!(items.len(), 2, "{file}");
            assert_eq!(items[1].name, "plank", "{file}");
        }
        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("items.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(
            result,
            Err(DataLoadError::Parse { ref detail, .. }) if detail.contains("items")
        ));
        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn resolve_and_duplicate_helpers() {
        let mut map = HashMap::new();
        map.insert("log".to_string(), 7u32);
        let file = Path::new("rules.ron");

        assert_eq!(*resolve_name(&map, "log", file, "item").unwrap(), 7);
        assert!(matches!(
            resolve_name(&map, "stick", file, "item"),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "item", .. }) if name == "stick"
        ));
        assert!(check_duplicate(&map, "stick", file).is_ok());
        assert!(matches!(
            check_duplicate(&map, "log", file),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "log"
        ));
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    #[test]
    fn load_ron_station_data() {
        let dir = make_test_dir("load_ron");
        write_ron_set(&dir);

        let data = load_station_data(&dir).unwrap();
        let reg = &data.registry;
        assert_eq!(reg.item_count(), 7);
        assert_eq!(reg.primaries().len(), 1);
        assert_eq!(reg.fallbacks().len(), 1);
        assert_eq!(data.config, StationConfig::default());

        let milk = reg.get_item(reg.item_id("milk_bucket").unwrap()).unwrap();
        assert_eq!(milk.remainder, reg.item_id("bucket"));

        let infused = &reg.primaries()[0];
        assert_eq!(infused.name, "infused_planks");
        assert_eq!(infused.duration, 40);
        assert_eq!(infused.catalysts.get(Catalyst::Cyan), 2);
        assert_eq!(infused.reward, Fixed64::from_num(1.5));
        assert_eq!(infused.gate.map(|g| g.advancement), Some(AdvancementId(3)));
        assert_eq!(infused.output.count, 8);

        match reg.rule_by_name("planks") {
            Some(Rule::Fallback(planks)) => {
                assert_eq!(planks.pattern, Pattern::shaped(1, 1, vec![Ingredient::of(reg.item_id("log").unwrap())]));
            }
            other => panic!("expected fallback rule, got {other:?}"),
        }
        cleanup(&dir);
    }

    #[test]
    fn load_toml_station_data_with_config() {
        let dir = make_test_dir("load_toml");
        fs::write(
            dir.join("items.toml"),
            r#"
[[items]]
name = "stone"

[[items]]
name = "polished_stone"

[[items]]
name = "black_powder"
catalyst = "black"
"#,
        )
        .unwrap();
        fs::write(
            dir.join("rules.toml"),
            r#"
[[rules]]
name = "polished_stone"
duration = 30
sound = 7
output = ["polished_stone", 2]
catalysts = { black = 1 }
pattern = { shaped = { rows = ["s s"], key = { s = "stone" } } }
"#,
        )
        .unwrap();
        fs::write(dir.join("config.toml"), "max_per_slot = 16\nreward_rounding = \"half_up\"\n").unwrap();

        let data = load_station_data(&dir).unwrap();
        assert_eq!(data.config.max_per_slot, 16);
        assert_eq!(data.config.reward_rounding, RewardRounding::HalfUp);

        let stone = Ingredient::of(data.registry.item_id("stone").unwrap());
        let rule = &data.registry.primaries()[0];
        assert_eq!(rule.sound, Some(SoundId(7)));
        assert_eq!(
            rule.pattern,
            Pattern::shaped(3, 1, vec![stone.clone(), Ingredient::empty(), stone])
        );
        cleanup(&dir);
    }

    #[test]
    fn load_json_station_data() {
        let dir = make_test_dir("load_json");
        fs::write(
            dir.join("items.json"),
            r#"[{"name": "milk_bucket", "max_stack": 1}, {"name": "plank"}, {"name": "cake", "max_stack": 1}]"#,
        )
        .unwrap();
        fs::write(
            dir.join("rules.json"),
            r#"[{
                "name": "cake",
                "kind": "fallback",
                "pattern": {"shapeless": {"ingredients": ["milk_bucket", ["plank"]]}},
                "output": {"item": "cake"}
            }]"#,
        )
        .unwrap();

        let data = load_station_data(&dir).unwrap();
        assert!(data.registry.primaries().is_empty());
        let cake = &data.registry.fallbacks()[0];
        assert_eq!(cake.pattern.ingredients().len(), 2);
        assert_eq!(cake.output.count, 1);
        cleanup(&dir);
    }

    #[test]
    fn missing_rules_file_is_reported() {
        let dir = make_test_dir("load_missing");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();

        let err = load_station_data(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingRequired { ref file, .. } if file == "rules"));
        cleanup(&dir);
    }

    #[test]
    fn unknown_item_in_rule_is_unresolved() {
        let dir = make_test_dir("load_unresolved");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(
            dir.join("rules.ron"),
            r#"[(name: "sticks", kind: fallback, pattern: shapeless(ingredients: ["plank"]), output: ("stick", 4))]"#,
        )
        .unwrap();

        let err = load_station_data(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::UnresolvedRef { ref name, .. } if name == "stick"));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = make_test_dir("load_dup");
        fs::write(dir.join("items.ron"), r#"[(name: "log"), (name: "log")]"#).unwrap();
        fs::write(dir.join("rules.ron"), "[]").unwrap();
        assert!(matches!(
            load_station_data(&dir),
            Err(DataLoadError::DuplicateName { .. })
        ));

        write_ron_set(&dir);
        let doubled = RULES_RON.replace("\"infused_planks\"", "\"planks\"");
        fs::write(dir.join("rules.ron"), doubled).unwrap();
        assert!(matches!(
            load_station_data(&dir),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "planks"
        ));
        cleanup(&dir);
    }

    #[test]
    fn semantic_errors_are_invalid() {
        let dir = make_test_dir("load_invalid");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();

        let cases = [
            r#"[(name: "wide", kind: fallback, pattern: shaped(rows: ["llll"], key: {"l": "log"}), output: ("plank", 1))]"#,
            r#"[(name: "slow", pattern: shapeless(ingredients: ["log"]), output: ("plank", 1))]"#,
            r#"[(name: "none", kind: fallback, pattern: shapeless(ingredients: ["log"]), output: ("plank", 0))]"#,
            r#"[(name: "empty", kind: fallback, pattern: shapeless(ingredients: []), output: ("plank", 1))]"#,
        ];
        for rules in cases {
            fs::write(dir.join("rules.ron"), rules).unwrap();
            assert!(
                matches!(load_station_data(&dir), Err(DataLoadError::Invalid { .. })),
                "{rules}"
            );
        }
        cleanup(&dir);
    }

    #[test]
    fn unknown_pattern_key_is_unresolved() {
        let dir = make_test_dir("load_key");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(
            dir.join("rules.ron"),
            r#"[(name: "p", kind: fallback, pattern: shaped(rows: ["lx"], key: {"l": "log"}), output: ("plank", 1))]"#,
        )
        .unwrap();
        assert!(matches!(
            load_station_data(&dir),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "pattern key", .. }) if name == "x"
        ));
        cleanup(&dir);
    }

    #[test]
    fn catalyst_claimed_twice_is_invalid() {
        let dir = make_test_dir("load_catalyst");
        fs::write(
            dir.join("items.ron"),
            r#"[(name: "a", catalyst: Some(cyan)), (name: "b", catalyst: Some(cyan))]"#,
        )
        .unwrap();
        fs::write(dir.join("rules.ron"), "[]").unwrap();
        assert!(matches!(load_station_data(&dir), Err(DataLoadError::Invalid { .. })));
        cleanup(&dir);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = make_test_dir("load_config");
        write_ron_set(&dir);
        fs::write(dir.join("config.json"), r#"{"fallback_duration": 0}"#).unwrap();
        assert!(matches!(
            load_station_data(&dir),
            Err(DataLoadError::Config(ConfigError::ZeroFallbackDuration))
        ));
        cleanup(&dir);
    }

    #[test]
    fn template_catalyst_is_a_registry_error() {
        let dir = make_test_dir("load_registry");
        fs::write(
            dir.join("items.ron"),
            r#"[(name: "template", template: true, catalyst: Some(white))]"#,
        )
        .unwrap();
        fs::write(dir.join("rules.ron"), "[]").unwrap();
        assert!(matches!(
            load_station_data(&dir),
            Err(DataLoadError::Registry(RegistryError::TemplateAsCatalyst(Catalyst::White)))
        ));
        cleanup(&dir);
    }

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: "items".to_string(),
            dir: PathBuf::from("/data"),
        };
        assert!(e.to_string().contains("items"));
        assert!(e.to_string().contains("/data"));

        let e = DataLoadError::Invalid {
            file: PathBuf::from("rules.ron"),
            detail: "no duration".to_string(),
        };
        assert!(e.to_string().contains("rules.ron"));
        assert!(e.to_string().contains("no duration"));

        let e: DataLoadError = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found").into();
        assert!(matches!(e, DataLoadError::Io(_)));
        assert!(e.to_string().contains("file not found"));
    }
}

//! Package catalogue and presets.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Package {
    pub name: String,
    pub description: String,
    pub category: String,
    /// apt packages cloud-init installs for this entry
    #[serde(default)]
    pub apt: Vec<String>,
    #[serde(default)]
    pub default_selected: bool,
}

/// A named, reusable list of package identifiers applicable in one action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackagePreset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub packages: Vec<String>,
}

/// Read-only view of the installable packages.
pub trait PackageRegistry: Send + Sync {
    /// All package names, sorted.
    fn names(&self) -> Vec<String>;

    fn get(&self, name: &str) -> Option<&Package>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default, rename = "package")]
    packages: Vec<Package>,
    #[serde(default, rename = "preset")]
    presets: Vec<PackagePreset>,
}

/// In-memory registry plus the presets shipped alongside it.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    packages: BTreeMap<String, Package>,
    presets: Vec<PackagePreset>,
}

static BUILTIN: Lazy<Catalogue> = Lazy::new(|| {
    let raw = include_str!("../catalogue/packages.toml");
    Catalogue::from_toml(raw).unwrap_or_else(|err| {
        log::error!("built-in package catalogue is invalid: {:#}", err);
        Catalogue::default()
    })
});

impl Catalogue {
    pub fn builtin() -> Catalogue {
        BUILTIN.clone()
    }

    pub fn from_toml(raw: &str) -> Result<Catalogue> {
        let file: CatalogueFile = toml::from_str(raw).context("Failed to parse package catalogue")?;
        let packages = file
            .packages
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Ok(Catalogue {
            packages,
            presets: file.presets,
        })
    }

    pub fn from_packages(packages: Vec<Package>, presets: Vec<PackagePreset>) -> Catalogue {
        Catalogue {
            packages: packages.into_iter().map(|p| (p.name.clone(), p)).collect(),
            presets,
        }
    }

    pub fn presets(&self) -> &[PackagePreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageRegistry for Catalogue {
    fn names(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }
}

/// What applying a preset did to the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetOutcome {
    pub applied: usize,
    pub skipped: usize,
    pub skipped_names: Vec<String>,
}

/// Replace `selection` with the preset's packages that exist in `registry`.
///
/// Preset entries missing from the registry are counted and reported but never
/// selected.
pub fn apply_preset(
    preset: &PackagePreset,
    registry: &dyn PackageRegistry,
    selection: &mut BTreeMap<String, bool>,
) -> PresetOutcome {
    for selected in selection.values_mut() {
        *selected = false;
    }

    let mut outcome = PresetOutcome::default();
    for name in &preset.packages {
        if registry.contains(name) {
            selection.insert(name.clone(), true);
            outcome.applied += 1;
        } else {
            outcome.skipped += 1;
            outcome.skipped_names.push(name.clone());
        }
    }
    outcome
}

/// Names in `registry` that are not in `selected` (the disabled complement).
pub fn disabled_packages(registry: &dyn PackageRegistry, selected: &[String]) -> Vec<String> {
    registry
        .names()
        .into_iter()
        .filter(|name| !selected.contains(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str) -> Package {
        Package {
            name: name.to_string(),
            description: String::new(),
            category: "test".to_string(),
            apt: vec![name.to_string()],
            default_selected: false,
        }
    }

    #[test]
    fn builtin_catalogue_parses_and_presets_reference_known_packages() {
        let catalogue = Catalogue::builtin();
        assert!(!catalogue.is_empty());
        for preset in catalogue.presets() {
            for name in &preset.packages {
                assert!(catalogue.contains(name), "{} in {}", name, preset.name);
            }
        }
    }

    #[test]
    fn names_are_sorted() {
        let catalogue = Catalogue::from_packages(vec![pkg("zsh"), pkg("curl"), pkg("git")], vec![]);
        assert_eq!(catalogue.names(), vec!["curl", "git", "zsh"]);
    }

    #[test]
    fn preset_skips_unknown_packages() {
        let catalogue = Catalogue::from_packages(vec![pkg("a"), pkg("b"), pkg("c")], vec![]);
        let preset = PackagePreset {
            name: "p".to_string(),
            description: String::new(),
            packages: vec!["a".to_string(), "gone".to_string(), "c".to_string()],
        };
        let mut selection = BTreeMap::new();
        selection.insert("b".to_string(), true);

        let outcome = apply_preset(&preset, &catalogue, &mut selection);

        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.skipped_names, vec!["gone"]);
        assert_eq!(outcome.applied + outcome.skipped, preset.packages.len());
        assert_eq!(selection.get("b"), Some(&false));
        assert_eq!(selection.get("a"), Some(&true));
        assert!(!selection.contains_key("gone"));
    }

    #[test]
    fn disabled_is_the_complement_of_selected() {
        let catalogue = Catalogue::from_packages(vec![pkg("a"), pkg("b"), pkg("c")], vec![]);
        let disabled = disabled_packages(&catalogue, &["a".to_string()]);
        assert_eq!(disabled, vec!["b", "c"]);
    }
}

//! Boot-time catalog of troop, tower, and avatar templates.
//!
//! Templates are loaded once from JSON files under a data directory (§4.1),
//! then held read-only for the life of the process. A missing or malformed
//! file is a `ConfigError` — fatal at boot, per §7.

mod error;

pub use error::CatalogError;

use std::collections::HashMap;
use std::path::Path;

use rk_types::state::{AvatarTemplate, TowerTemplate, TroopTemplate};
use rk_types::TowerKind;

/// The full set of static templates, indexed by name for O(1) lookup.
#[derive(Debug, Clone)]
pub struct Catalog {
    troops: HashMap<String, TroopTemplate>,
    towers: HashMap<TowerKind, TowerTemplate>,
    avatars: HashMap<String, AvatarTemplate>,
}

impl Catalog {
    /// Load `troops.json`, `towers.json`, and `avatars.json` from `data_dir`.
    /// Fails closed: any missing file or parse error aborts loading entirely
    /// rather than starting with a partial catalog.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data_dir = data_dir.as_ref();

        let troop_templates: Vec<TroopTemplate> = read_json(&data_dir.join("troops.json"))?;
        let tower_templates: Vec<TowerTemplate> = read_json(&data_dir.join("towers.json"))?;
        let avatar_templates: Vec<AvatarTemplate> = read_json(&data_dir.join("avatars.json"))?;

        if troop_templates.is_empty() {
            return Err(CatalogError::Empty { file: "troops.json".into() });
        }
        if tower_templates.is_empty() {
            return Err(CatalogError::Empty { file: "towers.json".into() });
        }

        let troops = troop_templates
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        let mut towers = HashMap::new();
        for t in tower_templates {
            towers.insert(t.kind, t);
        }
        if !towers.contains_key(&TowerKind::King) {
            return Err(CatalogError::MissingTowerKind { kind: "king" });
        }
        if !towers.contains_key(&TowerKind::Guard) {
            return Err(CatalogError::MissingTowerKind { kind: "guard" });
        }

        let avatars = avatar_templates
            .into_iter()
            .map(|a| (a.name.clone(), a))
            .collect();

        Ok(Self { troops, towers, avatars })
    }

    pub fn troop(&self, name: &str) -> Option<&TroopTemplate> {
        self.troops.get(name)
    }

    pub fn tower(&self, kind: TowerKind) -> Option<&TowerTemplate> {
        self.towers.get(&kind)
    }

    pub fn avatar(&self, name: &str) -> Option<&AvatarTemplate> {
        self.avatars.get(name)
    }

    pub fn all_troops(&self) -> impl Iterator<Item = &TroopTemplate> {
        self.troops.values()
    }

    pub fn troop_count(&self) -> usize {
        self.troops.len()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
        file: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse {
        file: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn seed(dir: &Path) {
        write(
            dir,
            "troops.json",
            r#"[{"name":"knight","max_hp":100.0,"atk":20.0,"dmg":0.0,"def":5.0,"mana_cost":3,
                "crit_percent":10.0,"exp_reward":5,"speed":1.0,"range":1.0,"attack_speed":1.0,
                "kind":"melee","aggro_priority":"tower","rarity":"common"}]"#,
        );
        write(
            dir,
            "towers.json",
            r#"[{"kind":"king","max_hp":500.0,"atk":30.0,"def":10.0,"crit_percent":5.0,
                "exp_reward":30,"range":3.0,"attack_speed":1.0},
               {"kind":"guard","max_hp":300.0,"atk":20.0,"def":8.0,"crit_percent":5.0,
                "exp_reward":15,"range":3.0,"attack_speed":1.0}]"#,
        );
        write(dir, "avatars.json", r#"[{"name":"default","icon":"default.png"}]"#);
    }

    #[test]
    fn loads_a_well_formed_catalog() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());

        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.troop_count(), 1);
        assert!(catalog.troop("knight").is_some());
        assert!(catalog.tower(TowerKind::King).is_some());
        assert!(catalog.tower(TowerKind::Guard).is_some());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn empty_troop_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "troops.json", "[]");
        write(
            dir.path(),
            "towers.json",
            r#"[{"kind":"king","max_hp":500.0,"atk":30.0,"def":10.0,"crit_percent":5.0,
                "exp_reward":30,"range":3.0,"attack_speed":1.0},
               {"kind":"guard","max_hp":300.0,"atk":20.0,"def":8.0,"crit_percent":5.0,
                "exp_reward":15,"range":3.0,"attack_speed":1.0}]"#,
        );
        write(dir.path(), "avatars.json", "[]");

        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Empty { .. }));
    }
}

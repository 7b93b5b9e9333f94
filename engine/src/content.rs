use indexmap::IndexMap;

use crate::error::DocumentError;
use crate::records::{Armor, CharacterRecord, Weapon};

pub fn builtin_weapons() -> IndexMap<&'static str, &'static str> {
    IndexMap::from([("default", include_str!("../content/weapons/default.json"))])
}

pub fn builtin_armor() -> IndexMap<&'static str, &'static str> {
    IndexMap::from([("default", include_str!("../content/armor/default.json"))])
}

pub fn builtin_characters() -> IndexMap<&'static str, &'static str> {
    IndexMap::from([(
        "donut_steele",
        include_str!("../content/characters/default.json"),
    )])
}

/// Standard EDF and ILR weapons plus the melee basics.
pub fn default_weapons() -> Result<Vec<Weapon>, DocumentError> {
    let list: Vec<Weapon> = serde_json::from_str(builtin_weapons()["default"])?;
    for (i, w) in list.iter().enumerate() {
        w.validate().map_err(|e| e.within(format!("weapon[{}]", i)))?;
    }
    Ok(list)
}

pub fn default_armor() -> Result<Vec<Armor>, DocumentError> {
    Ok(serde_json::from_str(builtin_armor()["default"])?)
}

pub fn default_character() -> Result<CharacterRecord, DocumentError> {
    Ok(serde_json::from_str(builtin_characters()["donut_steele"])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse() {
        let weapons = default_weapons().unwrap();
        assert_eq!(weapons.len(), 19);
        assert_eq!(weapons.iter().filter(|w| w.is_explosive()).count(), 2);
        assert_eq!(default_armor().unwrap().len(), 6);
        assert_eq!(default_character().unwrap(), CharacterRecord::default());
    }
}

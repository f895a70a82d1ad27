// Static descriptive data for the zoo's biomes and resident enemies.
// Lookups never fail: unknown names get a neutral placeholder record.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Biome {
    #[serde(skip)]
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub lighting: &'static str,
    pub hazards: &'static [&'static str],
    pub atmosphere: &'static str,
    pub enemies: &'static [&'static str],
    pub color_palette: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyProfile {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
    pub health: u32,
    pub speed: &'static str,
    pub attack_pattern: &'static str,
    pub weakness: &'static str,
    pub abilities: &'static [&'static str],
    pub aggression: u8,
    pub intelligence: u8,
}

pub const UNKNOWN_BIOME: Biome = Biome {
    key: "Unknown",
    name: "Unknown",
    description: "Uncharted territory",
    lighting: "normal",
    hazards: &[],
    atmosphere: "neutral",
    enemies: &[],
    color_palette: &["#333333", "#444444", "#555555"],
};

pub const UNKNOWN_ENEMY: EnemyProfile = EnemyProfile {
    kind: "Unknown",
    description: "Unknown creature",
    health: 100,
    speed: "medium",
    attack_pattern: "Unpredictable",
    weakness: "Unknown",
    abilities: &[],
    aggression: 50,
    intelligence: 50,
};

const BIOMES: &[Biome] = &[
    Biome {
        key: "LanternAviary",
        name: "Lantern Aviary",
        description: "Moonlit rafters and suspended cages shimmering with drifting feathers.",
        lighting: "dusklit",
        hazards: &["shifting rafters", "falling lantern glass"],
        atmosphere: "hushed",
        enemies: &["Nyx, Owl Warden"],
        color_palette: &["#05060f", "#1b2440", "#3c5e7f"],
    },
    Biome {
        key: "Serpentarium",
        name: "Shattered Serpentarium",
        description: "Cracked terrarium panes leak fog where serpents once basked.",
        lighting: "veiled",
        hazards: &["venom pools", "lash traps"],
        atmosphere: "tense",
        enemies: &["Vey, Serpent Matron"],
        color_palette: &["#090c13", "#1d2a2a", "#35534b"],
    },
    Biome {
        key: "TidePens",
        name: "Tideworn Pens",
        description: "Flooded walkways echo with the crash of distant waves.",
        lighting: "misty",
        hazards: &["tidal surges", "slippery grates"],
        atmosphere: "brumal",
        enemies: &["Oran, Leviathan Seal"],
        color_palette: &["#04070e", "#14253f", "#1e3f61"],
    },
    Biome {
        key: "ThornSanctum",
        name: "Thornbound Conservatory",
        description: "Vines knot around shattered glass, choking moonbeams to a murmur.",
        lighting: "dappled",
        hazards: &["snaring vines", "spore clouds"],
        atmosphere: "foreboding",
        enemies: &["Maul, Briar Bear"],
        color_palette: &["#06060b", "#1f2421", "#3c4a30"],
    },
    Biome {
        key: "CrownChamber",
        name: "Crown of Bars",
        description: "The final menagerie dais crowned by iron bars and spectral fire.",
        lighting: "auroral",
        hazards: &["cracking pillars", "resonant roars"],
        atmosphere: "imperious",
        enemies: &["Rex, Lion Regent"],
        color_palette: &["#08060a", "#241830", "#3d2748"],
    },
];

const ENEMIES: &[EnemyProfile] = &[
    EnemyProfile {
        kind: "Nyx, Owl Warden",
        description: "A spectral owl whose lantern talons test fledgling tacticians.",
        health: 65,
        speed: "measured",
        attack_pattern: "Lantern dive followed by sweeping talon arcs",
        weakness: "Tires after prolonged air time",
        abilities: &["Lantern Dive", "Echo Sweep", "Feather Flare"],
        aggression: 42,
        intelligence: 71,
    },
    EnemyProfile {
        kind: "Vey, Serpent Matron",
        description: "Keeper of the shattered terrarium who lashes with venomous precision.",
        health: 110,
        speed: "coiled bursts",
        attack_pattern: "Venom spray, tail sweep, constrict",
        weakness: "Recovery frames after tail slams",
        abilities: &["Venom Spray", "Glass Lash", "Constrict"],
        aggression: 58,
        intelligence: 68,
    },
    EnemyProfile {
        kind: "Oran, Leviathan Seal",
        description: "A colossal seal who surges across the flooded pens in rhythmic waves.",
        health: 145,
        speed: "surging",
        attack_pattern: "Wave crash and rolling maul",
        weakness: "Exposed belly after rolling charge",
        abilities: &["Wave Crash", "Tidal Roar", "Rolling Maul"],
        aggression: 66,
        intelligence: 54,
    },
    EnemyProfile {
        kind: "Maul, Briar Bear",
        description: "An armored bear woven with thorned vines that lash on command.",
        health: 190,
        speed: "stalking",
        attack_pattern: "Vine snare, armored slam, pollen roar",
        weakness: "Slow to pivot mid-charge",
        abilities: &["Vine Snare", "Armored Slam", "Pollen Roar"],
        aggression: 74,
        intelligence: 61,
    },
    EnemyProfile {
        kind: "Rex, Lion Regent",
        description: "The final sovereign whose roar fractures stone and morale alike.",
        health: 250,
        speed: "regal pounce",
        attack_pattern: "Roar shockwave, claw combo, aerial maul",
        weakness: "Briefly exposed after roar crescendos",
        abilities: &["Crown Roar", "Imperial Maul", "Celestial Pounce"],
        aggression: 86,
        intelligence: 79,
    },
];

/// Read-only view over the biome and enemy tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldCatalog;

impl WorldCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn biome(&self, key: &str) -> &'static Biome {
        BIOMES.iter().find(|b| b.key == key).unwrap_or(&UNKNOWN_BIOME)
    }

    pub fn enemy(&self, kind: &str) -> &'static EnemyProfile {
        ENEMIES.iter().find(|e| e.kind == kind).unwrap_or(&UNKNOWN_ENEMY)
    }

    /// Every enemy keyed by its type name.
    pub fn enemies(&self) -> BTreeMap<&'static str, &'static EnemyProfile> {
        ENEMIES.iter().map(|e| (e.kind, e)).collect()
    }

    /// Enemies listed in a biome's roster.
    pub fn biome_enemies(&self, key: &str) -> Vec<&'static EnemyProfile> {
        self.biome(key).enemies.iter().map(|name| self.enemy(name)).collect()
    }
}

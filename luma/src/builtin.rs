// Captured tuning blocks. These are copied byte-for-byte from dumps of the
// camera's config; we don't know what most of the fixed bytes mean, so don't
// "tidy" them. Slots are written `@FIELD`.

use crate::registry::{FamilyFile, LevelFile, RegistryFile};

pub const VERSION: &str = "2020.11";

struct FamilyDef {
    name: &'static str,
    fields: &'static [&'static str],
    header: &'static str,
    footer: &'static str,
    levels: &'static [LevelDef],
}

struct LevelDef {
    name: &'static str,
    defaults: &'static [f32],
    template: &'static str,
}

const SHARP_FIELDS: &[&str] = &["L1", "L1A", "L2", "L2A", "L3", "L3A"];

const BAYER_FIELDS: &[&str] = &[
    "L1", "L1A", "L1B", "L2", "L2A", "L2B", "L3", "L3A", "L3B", "L4", "L4A", "L4B", "L5", "L5A",
];

const TONE_FIELDS: &[&str] = &[
    "P0", "P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "P10", "P11", "P12", "P13", "P14",
    "P15", "P16",
];

// Pairs are `0d <L> 1d <LA>`; the first two pairs share the 0a14 wrapper.
const SHARP_LEVELS: &[LevelDef] = &[
    LevelDef {
        name: "Sharp very low",
        defaults: &[7.0, 0.060, 3.075, 0.040, 1.875, 0.058],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2801",
    },
    LevelDef {
        name: "Sharp low",
        defaults: &[8.5, 0.062, 3.45, 0.040, 3.1, 0.045],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2802",
    },
    LevelDef {
        name: "Sharp medium",
        defaults: &[10.0, 0.066, 3.87, 0.040, 4.62, 0.0224],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2803 3001",
    },
    LevelDef {
        name: "Sharp high",
        defaults: &[12.0, 0.07, 4.3, 0.045, 5.8, 0.018],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2804 3001",
    },
    LevelDef {
        name: "Sharp very high",
        defaults: &[14.0, 0.075, 4.9, 0.05, 7.2, 0.015],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2805 3002",
    },
];

// Same pair layout as Sharp, but the trailer carries an extra 3a02 block.
const SHARP_BENTO_LEVELS: &[LevelDef] = &[
    LevelDef {
        name: "Sharp bento low",
        defaults: &[6.0, 0.055, 2.8, 0.035, 1.6, 0.06],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2801 3a020801",
    },
    LevelDef {
        name: "Sharp bento medium",
        defaults: &[9.0, 0.064, 3.6, 0.04, 3.9, 0.03],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2802 3a020801",
    },
    LevelDef {
        name: "Sharp bento high",
        defaults: &[11.5, 0.069, 4.15, 0.044, 5.3, 0.02],
        template: "0a140d @L1 1d @L1A 0d @L2 1d @L2A
                   120a0d @L3 1d @L3A
                   2803 3a020802",
    },
];

// L1..L4 triples each open with 0a0f0d; the L5 pair opens with 0a0a0d.
const BAYER_LUMA_LEVELS: &[LevelDef] = &[
    LevelDef {
        name: "Bayer luma denoise very low",
        defaults: &[
            1.0, 0.5, 0.25, 1.25, 0.55, 0.3, 1.5, 0.6, 0.35, 1.75, 0.65, 0.4, 2.0, 0.7,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2001",
    },
    LevelDef {
        name: "Bayer luma denoise low",
        defaults: &[
            1.5, 0.6, 0.3, 1.8, 0.65, 0.35, 2.1, 0.7, 0.4, 2.4, 0.75, 0.45, 2.7, 0.8,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2002",
    },
    LevelDef {
        name: "Bayer luma denoise medium",
        defaults: &[
            2.0, 0.7, 0.35, 2.4, 0.75, 0.4, 2.8, 0.8, 0.45, 3.2, 0.85, 0.5, 3.6, 0.9,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2003",
    },
    LevelDef {
        name: "Bayer luma denoise high",
        defaults: &[
            3.0, 0.8, 0.4, 3.5, 0.85, 0.45, 4.0, 0.9, 0.5, 4.5, 0.95, 0.55, 5.0, 1.0,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2004 2801",
    },
    LevelDef {
        name: "Bayer luma denoise very high",
        defaults: &[
            4.0, 0.9, 0.45, 4.6, 0.95, 0.5, 5.2, 1.0, 0.55, 5.8, 1.05, 0.6, 6.4, 1.1,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2005 2801",
    },
];

const BAYER_CHROMA_LEVELS: &[LevelDef] = &[
    LevelDef {
        name: "Bayer chroma denoise low",
        defaults: &[
            2.0, 0.4, 0.2, 2.5, 0.45, 0.25, 3.0, 0.5, 0.3, 3.5, 0.55, 0.35, 4.0, 0.6,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2001 3000",
    },
    LevelDef {
        name: "Bayer chroma denoise medium",
        defaults: &[
            3.0, 0.5, 0.25, 3.6, 0.55, 0.3, 4.2, 0.6, 0.35, 4.8, 0.65, 0.4, 5.4, 0.7,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2002 3000",
    },
    LevelDef {
        name: "Bayer chroma denoise high",
        defaults: &[
            4.5, 0.6, 0.3, 5.2, 0.65, 0.35, 5.9, 0.7, 0.4, 6.6, 0.75, 0.45, 7.3, 0.8,
        ],
        template: "0a0f0d @L1 15 @L1A 1d @L1B
                   0a0f0d @L2 15 @L2A 1d @L2B
                   0a0f0d @L3 15 @L3A 1d @L3B
                   0a0f0d @L4 15 @L4A 1d @L4B
                   0a0a0d @L5 15 @L5A
                   2003 3001",
    },
];

// Packed run of 17 floats (0x44 bytes), no separators between points.
const TONE_LEVELS: &[LevelDef] = &[
    LevelDef {
        name: "Tone curve linear",
        defaults: &[
            0.0, 0.0625, 0.125, 0.1875, 0.25, 0.3125, 0.375, 0.4375, 0.5, 0.5625, 0.625, 0.6875,
            0.75, 0.8125, 0.875, 0.9375, 1.0,
        ],
        template: "0a44 @P0 @P1 @P2 @P3 @P4 @P5 @P6 @P7 @P8
                   @P9 @P10 @P11 @P12 @P13 @P14 @P15 @P16
                   1001",
    },
    LevelDef {
        name: "Tone curve soft contrast",
        defaults: &[
            0.0, 0.045, 0.095, 0.15, 0.21, 0.275, 0.345, 0.42, 0.5, 0.58, 0.655, 0.725, 0.79,
            0.85, 0.905, 0.955, 1.0,
        ],
        template: "0a44 @P0 @P1 @P2 @P3 @P4 @P5 @P6 @P7 @P8
                   @P9 @P10 @P11 @P12 @P13 @P14 @P15 @P16
                   1002",
    },
    LevelDef {
        name: "Tone curve lifted shadows",
        defaults: &[
            0.04, 0.1, 0.16, 0.22, 0.28, 0.34, 0.4, 0.455, 0.51, 0.565, 0.62, 0.675, 0.73, 0.79,
            0.86, 0.93, 1.0,
        ],
        template: "0a44 @P0 @P1 @P2 @P3 @P4 @P5 @P6 @P7 @P8
                   @P9 @P10 @P11 @P12 @P13 @P14 @P15 @P16
                   1003",
    },
];

const FAMILIES: &[FamilyDef] = &[
    FamilyDef {
        name: "Sharp",
        fields: SHARP_FIELDS,
        header: "0a49",
        footer: "",
        levels: SHARP_LEVELS,
    },
    FamilyDef {
        name: "Sharp bento",
        fields: SHARP_FIELDS,
        header: "1a49",
        footer: "",
        levels: SHARP_BENTO_LEVELS,
    },
    FamilyDef {
        name: "Bayer luma denoise",
        fields: BAYER_FIELDS,
        header: "2aa401",
        footer: "",
        levels: BAYER_LUMA_LEVELS,
    },
    FamilyDef {
        name: "Bayer chroma denoise",
        fields: BAYER_FIELDS,
        header: "32a401",
        footer: "3800",
        levels: BAYER_CHROMA_LEVELS,
    },
    FamilyDef {
        name: "Tone curve",
        fields: TONE_FIELDS,
        header: "3a48",
        footer: "",
        levels: TONE_LEVELS,
    },
];

impl LevelDef {
    fn to_file(&self) -> LevelFile {
        LevelFile {
            name: self.name.to_string(),
            defaults: self.defaults.to_vec(),
            template: self.template.to_string(),
        }
    }
}

impl FamilyDef {
    fn to_file(&self) -> FamilyFile {
        FamilyFile {
            name: self.name.to_string(),
            fields: self.fields.iter().map(|f| f.to_string()).collect(),
            header: self.header.to_string(),
            footer: self.footer.to_string(),
            levels: self.levels.iter().map(LevelDef::to_file).collect(),
        }
    }
}

/// The builtin tables in the same shape a registry file has, so both go
/// through the same parser.
pub fn registry_file() -> RegistryFile {
    RegistryFile {
        version: VERSION.to_string(),
        families: FAMILIES.iter().map(FamilyDef::to_file).collect(),
    }
}

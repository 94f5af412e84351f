use crate::{domain::Preset, error::CatalogError};

pub const CUSTOM_PRESET_ID: &str = "custom";

pub static PRESETS: &[Preset] = &[
    Preset {
        id: "hello_world",
        name: "Simple Hello World",
        code: r#"print("Hello world!")"#,
    },
    Preset {
        id: "conditionals",
        name: "If/Else",
        code: "something = 2\n\nif something == 1:\n  print (\"Hello\")\nelif something == 2:\n  print (\"World\")\nelse:\n  print (\"Didn't understand...\")",
    },
    Preset {
        id: "loop",
        name: "Loop",
        code: "things = ['💻', '📷', '🧸']\n\nfor thing in things:\n  print(thing)\n",
    },
];

pub fn initial() -> &'static Preset {
    &PRESETS[0]
}

pub fn by_id(id: &str) -> Result<&'static Preset, CatalogError> {
    PRESETS
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| CatalogError::UnknownPreset(id.to_string()))
}

/// Id of the preset whose code is exactly `code`, otherwise `custom`.
pub fn preset_for(code: &str) -> &'static str {
    PRESETS
        .iter()
        .find(|p| p.code == code)
        .map(|p| p.id)
        .unwrap_or(CUSTOM_PRESET_ID)
}

#[cfg(test)]
#[path = "tests/presets_tests.rs"]
mod tests;

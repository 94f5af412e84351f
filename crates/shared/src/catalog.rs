use crate::{
    domain::{Language, TextDirection},
    error::CatalogError,
};

const EDITOR_FONT: &str = "Hack, 'Courier New', monospace";

/// Id of the pivot language every program is normalised to before it runs.
pub const CANONICAL_LANGUAGE_ID: &str = "EN";

pub static LANGUAGES: &[Language] = &[
    Language {
        id: "EN",
        code2: "en",
        code3: "eng",
        name: "English",
        native_name: "English",
        direction: TextDirection::Ltr,
        default_target: false,
        font_family: EDITOR_FONT,
    },
    Language {
        id: "HI",
        code2: "hi",
        code3: "hin",
        name: "Hindi",
        native_name: "हिन्दी",
        direction: TextDirection::Ltr,
        default_target: true,
        font_family: EDITOR_FONT,
    },
    Language {
        id: "UR",
        code2: "ur",
        code3: "urd",
        name: "Urdu",
        native_name: "اردو",
        direction: TextDirection::Rtl,
        default_target: false,
        font_family: EDITOR_FONT,
    },
    Language {
        id: "FR",
        code2: "fr",
        code3: "fra",
        name: "French",
        native_name: "Français",
        direction: TextDirection::Ltr,
        default_target: false,
        font_family: EDITOR_FONT,
    },
];

pub fn all() -> &'static [Language] {
    LANGUAGES
}

pub fn find<P>(predicate: P) -> Option<&'static Language>
where
    P: FnMut(&&'static Language) -> bool,
{
    LANGUAGES.iter().find(predicate)
}

pub fn by_id(id: &str) -> Option<&'static Language> {
    find(|l| l.id == id)
}

pub fn by_code2(code: &str) -> Option<&'static Language> {
    find(|l| l.code2.eq_ignore_ascii_case(code))
}

pub fn by_code3(code: &str) -> Option<&'static Language> {
    find(|l| l.code3.eq_ignore_ascii_case(code))
}

pub fn by_param(value: &str) -> Option<&'static Language> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    by_code2(value).or_else(|| find(|l| l.id.eq_ignore_ascii_case(value)))
}

pub fn require(value: &str) -> Result<&'static Language, CatalogError> {
    by_param(value).ok_or_else(|| CatalogError::UnknownLanguage(value.to_string()))
}

pub fn canonical() -> &'static Language {
    by_id(CANONICAL_LANGUAGE_ID).unwrap_or(&LANGUAGES[0])
}

pub fn default_target() -> &'static Language {
    find(|l| l.default_target)
        .or_else(|| find(|l| l.id != CANONICAL_LANGUAGE_ID))
        .unwrap_or(&LANGUAGES[0])
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    pub id: &'static str,
    pub code2: &'static str,
    pub code3: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub direction: TextDirection,
    pub default_target: bool,
    pub font_family: &'static str,
}

impl Language {
    pub fn is_rtl(&self) -> bool {
        self.direction == TextDirection::Rtl
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
}

//! Skin-tag classification: each raw token is normalized, alias-resolved and
//! assigned to at most one of three disjoint categories. Everything here is
//! declarative data plus pure functions so the rules are testable without a
//! browser.

const SKIN_TYPES: &[&str] = &[
    "지성",
    "건성",
    "복합성",
    "민감성",
    "약건성",
    "트러블성",
    "중성",
];

const SKIN_TONES: &[&str] = &[
    "쿨톤",
    "웜톤",
    "봄웜톤",
    "여름쿨톤",
    "가을웜톤",
    "겨울쿨톤",
];

const SKIN_CONCERNS: &[&str] = &[
    "잡티",
    "미백",
    "주름",
    "각질",
    "트러블",
    "블랙헤드",
    "피지과다",
    "민감성",
    "모공",
    "탄력",
    "홍조",
    "아토피",
    "다크서클",
];

// Site variants collapse onto the canonical vocabulary before lookup.
const ALIASES: &[(&str, &str)] = &[
    ("봄원톤", "봄웜톤"),
    ("여드름", "트러블"),
    ("여드름성", "트러블성"),
    ("트러블성피부", "트러블성"),
    ("민감성피부", "민감성"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkinTags {
    pub skin_type: String,
    pub skin_tone: String,
    pub concerns: Vec<String>,
}

impl SkinTags {
    pub fn concerns_joined(&self) -> String {
        self.concerns.join(" / ")
    }
}

/// Trim, strip inner whitespace, resolve aliases. Empty in, empty out.
pub fn normalize_token(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == stripped)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(stripped)
}

/// First-match-wins per category; duplicate and unrecognized tokens are
/// dropped silently. A "sensitive" skin type suppresses the identical
/// concern token so the trait is not classified twice.
pub fn split_skin_tags<I, S>(tokens: I) -> SkinTags
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags = SkinTags::default();
    let mut seen: Vec<String> = Vec::new();

    for raw in tokens {
        let token = normalize_token(raw.as_ref());
        if token.is_empty() || seen.iter().any(|t| t == &token) {
            continue;
        }
        seen.push(token.clone());

        if tags.skin_type.is_empty() && SKIN_TYPES.contains(&token.as_str()) {
            tags.skin_type = token;
            continue;
        }
        if tags.skin_tone.is_empty() && SKIN_TONES.contains(&token.as_str()) {
            tags.skin_tone = token;
            continue;
        }
        if SKIN_CONCERNS.contains(&token.as_str()) {
            tags.concerns.push(token);
        }
    }

    if tags.skin_type == "민감성" {
        tags.concerns.retain(|concern| concern != "민감성");
    }
    tags
}

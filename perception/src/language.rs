//! Language detection over the SPEC_FULL §3 closed subset: unique-script
//! matches scored higher than closed-class lexical markers, top score wins,
//! near ties resolved by disambiguation rules.

use common_types::Language;
use regex::Regex;
use std::sync::OnceLock;

struct LangSignal {
    lang: Language,
    script: Option<&'static Regex>,
    lexical: &'static Regex,
}

fn script_regexes() -> (&'static Regex, &'static Regex) {
    static DEVANAGARI: OnceLock<Regex> = OnceLock::new();
    static ARABIC: OnceLock<Regex> = OnceLock::new();
    (
        DEVANAGARI.get_or_init(|| Regex::new(r"[ऀ-ॿ]").unwrap()),
        ARABIC.get_or_init(|| Regex::new(r"[؀-ۿ]").unwrap()),
    )
}

fn lexical_regexes() -> &'static Vec<LangSignal> {
    static INIT: OnceLock<Vec<LangSignal>> = OnceLock::new();
    INIT.get_or_init(|| {
        static EN: OnceLock<Regex> = OnceLock::new();
        static IT: OnceLock<Regex> = OnceLock::new();
        static ES: OnceLock<Regex> = OnceLock::new();
        static PT: OnceLock<Regex> = OnceLock::new();
        static FR: OnceLock<Regex> = OnceLock::new();
        static DE: OnceLock<Regex> = OnceLock::new();
        static HI: OnceLock<Regex> = OnceLock::new();
        static AR: OnceLock<Regex> = OnceLock::new();

        let (devanagari, arabic) = script_regexes();

        vec![
            LangSignal {
                lang: Language::En,
                script: None,
                lexical: EN.get_or_init(|| Regex::new(r"(?i)\b(the|and|you|is|what|feel)\b").unwrap()),
            },
            LangSignal {
                lang: Language::It,
                script: None,
                lexical: IT.get_or_init(|| Regex::new(r"(?i)\b(che|sono|non|perch[eé]|mi sento|cosa)\b").unwrap()),
            },
            LangSignal {
                lang: Language::Es,
                script: None,
                lexical: ES.get_or_init(|| Regex::new(r"(?i)\b(que|soy|estoy|porque|me siento|c[oó]mo)\b").unwrap()),
            },
            LangSignal {
                lang: Language::Pt,
                script: None,
                lexical: PT.get_or_init(|| Regex::new(r"(?i)\b(que|sou|estou|porque|eu sinto|n[aã]o)\b").unwrap()),
            },
            LangSignal {
                lang: Language::Fr,
                script: None,
                lexical: FR.get_or_init(|| Regex::new(r"(?i)\b(je|suis|parce que|tu|qu'est-ce)\b").unwrap()),
            },
            LangSignal {
                lang: Language::De,
                script: None,
                lexical: DE.get_or_init(|| Regex::new(r"(?i)\b(ich|bin|warum|du|was|nicht)\b").unwrap()),
            },
            LangSignal {
                lang: Language::Hi,
                script: Some(devanagari),
                lexical: HI.get_or_init(|| Regex::new(r"(?i)\b(kya|hai|mujhe|kyun)\b").unwrap()),
            },
            LangSignal {
                lang: Language::Ar,
                script: Some(arabic),
                lexical: AR.get_or_init(|| Regex::new(r"(?i)\b(ana|hal|limadha)\b").unwrap()),
            },
        ]
    })
}

const SCRIPT_WEIGHT: f32 = 10.0;
const LEXICAL_WEIGHT: f32 = 1.0;

pub fn detect_language(text: &str) -> Language {
    if text.trim().is_empty() {
        return Language::Unknown;
    }

    let mut scores: Vec<(Language, f32)> = Vec::new();
    for signal in lexical_regexes() {
        let mut score = 0.0;
        if let Some(script) = signal.script {
            score += script.find_iter(text).count() as f32 * SCRIPT_WEIGHT;
        }
        score += signal.lexical.find_iter(text).count() as f32 * LEXICAL_WEIGHT;
        if score > 0.0 {
            scores.push((signal.lang, score));
        }
    }

    if scores.is_empty() {
        return Language::Unknown;
    }

    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    let top = scores[0];
    let runner_up = scores.get(1).copied();

    if let Some(second) = runner_up {
        let near_tie = (top.1 - second.1).abs() < 0.5;
        if near_tie {
            return disambiguate(top.0, second.0);
        }
        if scores.len() > 2 {
            // Multiple comparably-scored languages: treat as genuinely mixed input.
            let close_count = scores.iter().filter(|(_, s)| (top.1 - s).abs() < 0.5).count();
            if close_count >= 3 {
                return Language::Mixed;
            }
        }
    }

    top.0
}

fn disambiguate(a: Language, b: Language) -> Language {
    match (a, b) {
        (Language::Hi, _) | (_, Language::Hi) => Language::Hi,
        (Language::Ar, _) | (_, Language::Ar) => Language::Ar,
        (Language::Es, Language::Pt) | (Language::Pt, Language::Es) => Language::Es,
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        assert_eq!(detect_language("What do you feel about this?"), Language::En);
    }

    #[test]
    fn detects_italian() {
        assert_eq!(detect_language("Mi sento perso, non so cosa fare della mia vita"), Language::It);
    }

    #[test]
    fn empty_text_is_unknown() {
        assert_eq!(detect_language(""), Language::Unknown);
    }

    #[test]
    fn devanagari_script_wins_over_latin_noise() {
        assert_eq!(detect_language("\u{0915}\u{094d}\u{092f}\u{093e} \u{0939}\u{0948}"), Language::Hi);
    }
}

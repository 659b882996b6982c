//! Lexical marker tables for domain salience, arousal, valence, flags, and
//! temporal orientation. Grounded on the teacher's keyword-lexicon style
//! (`emotion_detection::classify_text_heuristic`), generalized from 6 emotion
//! buckets to 17 content domains plus the other field-state axes.

use common_types::Domain;
use regex::Regex;
use std::sync::OnceLock;

pub struct DomainMarkers {
    pub domain: Domain,
    pub regex: Regex,
    pub weight: f32,
}

pub fn domain_markers() -> &'static Vec<DomainMarkers> {
    static INIT: OnceLock<Vec<DomainMarkers>> = OnceLock::new();
    INIT.get_or_init(|| {
        let table: &[(Domain, &str, f32)] = &[
            (Domain::Survival, r"(?i)\b(can'?t breathe|heart( is)? pounding|panic attack|dying|non riesco a respirare)\b", 1.0),
            (Domain::Body, r"(?i)\b(body|pain|tired|exhausted|sleep|corpo|dolore|stanc[oa])\b", 0.6),
            (Domain::Health, r"(?i)\b(sick|illness|diagnosis|symptom|doctor|malatt[oia]|medico)\b", 0.7),
            (Domain::Safety, r"(?i)\b(unsafe|afraid|threat|danger|pericol[oi]|minacci)\b", 0.8),
            (Domain::Social, r"(?i)\b(friend|family|relationship|amic[oi]|famiglia|relazione)\b", 0.6),
            (Domain::Conflict, r"(?i)\b(fight|argument|conflict|litig|conflitto)\b", 0.7),
            (Domain::Loss, r"(?i)\b(lost|died|grief|breakup|perso|morto|lutto|lasciat[oa])\b", 0.8),
            (Domain::Emotion, r"(?i)\b(feel|feeling|sad|happy|angry|sento|provo|triste)\b", 0.5),
            (Domain::Work, r"(?i)\b(job|work|boss|career|lavoro|capo|carriera)\b", 0.6),
            (Domain::Decision, r"(?i)\b(decide|choice|choose|should i|decid|scegliere|dovrei)\b", 0.6),
            (Domain::Time, r"(?i)\b(deadline|running out of time|too late|tempo|scadenza)\b", 0.5),
            (Domain::Finance, r"(?i)\b(money|debt|rent|bill|soldi|debito|affitto)\b", 0.6),
            (Domain::Cognition, r"(?i)\b(think|understand|confused|figure out|cap[io]re|pensare)\b", 0.4),
            (Domain::Meaning, r"(?i)\b(meaning|purpose|point of (life|it all)|senso della vita|scopo)\b", 0.9),
            (Domain::Identity, r"(?i)\b(who (i|am) (i|really)|my identity|identit[aà]|chi sono)\b", 0.9),
            (Domain::Creativity, r"(?i)\b(creative|art|write|paint|creativit[aà]|dipingere)\b", 0.4),
            (Domain::Spirituality, r"(?i)\b(god|soul|spirit|universe|anima|spirito|universo)\b", 0.6),
        ];
        table
            .iter()
            .map(|(domain, pattern, weight)| DomainMarkers {
                domain: *domain,
                regex: Regex::new(pattern).unwrap(),
                weight: *weight,
            })
            .collect()
    })
}

pub fn crisis_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| {
        Regex::new(r"(?i)\b(kill myself|suicide|end my life|self harm|self-harm|non voglio piu vivere|farla finita)\b").unwrap()
    })
}

pub fn dependency_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| {
        Regex::new(r"(?i)\b(you'?re the only one|only you understand|i need you|non posso vivere senza di te)\b").unwrap()
    })
}

pub fn delegation_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| {
        Regex::new(r"(?i)\b(what should i do|tell me what to do|you decide|tu che dici|cosa dovrei fare|dimmi tu)\b").unwrap()
    })
}

pub fn numb_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| {
        Regex::new(r"(?i)\b(numb|empty inside|nothing matters|vuoto dentro|non provo niente)\b").unwrap()
    })
}

pub fn high_arousal_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(scared|terrified|panicking|furious|spaventat[oa]|terrorizzat[oa])\b").unwrap())
}

pub fn low_arousal_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(tired|flat|calm|numb|stanc[oa]|piatt[oa])\b").unwrap())
}

pub fn positive_lexicon() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(love|happy|grateful|hopeful|amo|felice|grato|speranz)\b").unwrap())
}

pub fn negative_lexicon() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(sad|angry|afraid|hopeless|triste|arrabbiat[oa]|disperat[oa])\b").unwrap())
}

pub fn past_markers() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(used to|was|were|happened|era|stato|successo)\b").unwrap())
}

pub fn future_markers() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(will|going to|tomorrow|plan to|sarà|domani|prevedo)\b").unwrap())
}

pub fn informative_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(what is|how does|can you explain|cos'?e'?|come funziona)\b").unwrap())
}

pub fn decisional_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(should i|which one|decide|decidere|quale scelgo)\b").unwrap())
}

pub fn exploratory_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(i wonder|what if|curious about|mi chiedo|chiss[aà])\b").unwrap())
}

pub fn regulatory_regex() -> &'static Regex {
    static INIT: OnceLock<Regex> = OnceLock::new();
    INIT.get_or_init(|| Regex::new(r"(?i)\b(i need to calm down|help me breathe|aiutami a calmarmi)\b").unwrap())
}

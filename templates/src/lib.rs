//! `TemplateStore`: the surface-tier runtime's only data source (SPEC_FULL §6).
//!
//! Grounded on the teacher's `VulnPolicy` static-table pattern: an immutable
//! table built once behind a `OnceLock` and cloned out to callers.

use std::collections::HashMap;
use std::sync::OnceLock;

use common_types::{Language, Primitive};

pub trait TemplateStore: Send + Sync {
    /// Look up a template for `primitive`/`language`, falling back to
    /// English when the requested language has no entry.
    fn get(&self, primitive: Primitive, language: Language) -> Option<String>;
}

/// Static, process-wide template table. This is a representative subset of
/// the operational table described in SPEC_FULL §1 — interfaces are the
/// contract, not the data volume.
pub struct StaticTemplateStore {
    table: &'static HashMap<(Primitive, Language), &'static str>,
}

impl Default for StaticTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticTemplateStore {
    pub fn new() -> Self {
        Self {
            table: default_table(),
        }
    }
}

impl TemplateStore for StaticTemplateStore {
    fn get(&self, primitive: Primitive, language: Language) -> Option<String> {
        self.table
            .get(&(primitive, language))
            .or_else(|| self.table.get(&(primitive, Language::En)))
            .map(|s| s.to_string())
    }
}

fn default_table() -> &'static HashMap<(Primitive, Language), &'static str> {
    static INIT: OnceLock<HashMap<(Primitive, Language), &'static str>> = OnceLock::new();
    INIT.get_or_init(|| {
        let mut m = HashMap::new();

        m.insert(
            (Primitive::Ground, Language::En),
            "Let's pause for a moment. Notice your breath, here, now. You can reply whenever you're ready.",
        );
        m.insert(
            (Primitive::Ground, Language::It),
            "Fermiamoci un momento. Nota il tuo respiro, qui, ora. Rispondi tu quando sei pronto.",
        );
        m.insert((Primitive::Ground, Language::Es), "Hagamos una pausa. Nota tu respiracion, aqui, ahora.");
        m.insert((Primitive::Ground, Language::Fr), "Prenons un instant. Remarque ton souffle, ici, maintenant.");

        m.insert(
            (Primitive::Validate, Language::En),
            "What you're feeling makes sense given what you're facing. You can reply in your own time.",
        );
        m.insert(
            (Primitive::Validate, Language::It),
            "Cio che provi ha senso, viste le cose che stai affrontando. Rispondi tu con i tuoi tempi.",
        );

        m.insert(
            (Primitive::Reflect, Language::En),
            "It sounds like this has been weighing on you. Your decision on what's next is yours.",
        );
        m.insert((Primitive::Reflect, Language::It), "Sembra che questo ti pesi addosso. Decidi tu cosa fare dopo.");

        m.insert(
            (Primitive::Open, Language::En),
            "What feels most present for you right now? You can reply whenever it feels right.",
        );
        m.insert(
            (Primitive::Open, Language::It),
            "Cosa senti piu presente per te in questo momento? Rispondi tu quando ti senti pronto.",
        );

        m.insert(
            (Primitive::Crystallize, Language::En),
            "So the core of it seems to be this. Up to you what you do with it.",
        );
        m.insert(
            (Primitive::Crystallize, Language::It),
            "Quindi il nucleo della questione sembra essere questo. Sta a te decidere cosa farne.",
        );

        m.insert(
            (Primitive::ReturnAgency, Language::En),
            "Only you can know what's right here. Up to you: what's your next step?",
        );
        m.insert(
            (Primitive::ReturnAgency, Language::It),
            "Solo tu puoi sapere cosa sia giusto qui. Sta a te: qual e il tuo prossimo passo?",
        );

        m.insert(
            (Primitive::HoldSpace, Language::En),
            "I'm here with you in this. You can reply whenever you're ready.",
        );
        m.insert((Primitive::HoldSpace, Language::It), "Sono qui con te in questo. Rispondi tu quando vuoi.");

        m.insert(
            (Primitive::MapDecision, Language::En),
            "Let's lay out the options you're weighing. What fits best is up to you.",
        );
        m.insert(
            (Primitive::MapDecision, Language::It),
            "Vediamo insieme le opzioni che stai valutando. Quale ti convince di piu sta a te.",
        );

        m.insert(
            (Primitive::Inform, Language::En),
            "Here is what's relevant to what you asked. You can reply if you'd like to go deeper.",
        );
        m.insert(
            (Primitive::Inform, Language::It),
            "Ecco cio che e rilevante per quello che hai chiesto. Rispondi tu se vuoi approfondire.",
        );

        m.insert(
            (Primitive::CompleteTask, Language::En),
            "Done. Here's a quick recap of what that covered. You can reply with anything else you need.",
        );
        m.insert(
            (Primitive::CompleteTask, Language::It),
            "Fatto. Ecco un rapido riepilogo. Rispondi tu se ti serve altro.",
        );

        m.insert(
            (Primitive::Invite, Language::En),
            "Would it help to say more about that? You can reply whenever you're ready.",
        );
        m.insert(
            (Primitive::Invite, Language::It),
            "Ti aiuterebbe dire qualcosa in piu su questo? Rispondi tu quando vuoi.",
        );

        m.insert((Primitive::Acknowledge, Language::En), "I hear you. You can reply whenever you're ready.");
        m.insert((Primitive::Acknowledge, Language::It), "Ti ascolto. Rispondi tu quando vuoi.");

        m.insert(
            (Primitive::ReflectRelation, Language::En),
            "It sounds like this connection matters a lot to you. How you want to handle it is up to your relationship to decide.",
        );
        m.insert(
            (Primitive::ReflectRelation, Language::It),
            "Sembra che questa relazione conti molto per te. La tua relazione, il modo di gestirla tocca a te.",
        );

        m.insert(
            (Primitive::HoldIdentity, Language::En),
            "That's something only you get to define for yourself. You can reply when you've sat with it.",
        );
        m.insert(
            (Primitive::HoldIdentity, Language::It),
            "Questo e qualcosa che solo tu puoi definire per te stesso. Rispondi tu quando ci hai riflettuto.",
        );

        m
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_has_an_english_template() {
        let store = StaticTemplateStore::new();
        for p in Primitive::ALL {
            assert!(
                store.get(p, Language::En).is_some(),
                "missing English template for {:?}",
                p
            );
        }
    }

    #[test]
    fn missing_language_falls_back_to_english() {
        let store = StaticTemplateStore::new();
        let en = store.get(Primitive::Ground, Language::En).unwrap();
        let de = store.get(Primitive::Ground, Language::De).unwrap();
        assert_eq!(en, de);
    }
}

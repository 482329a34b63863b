//! Trigger matching properties over realistic portal text.

use tender_radar::triggers::{any_trigger, match_triggers};

fn triggers() -> Vec<String> {
    [
        "licitación pública",
        "concurso de precios",
        "provisión de",
        "suministro de",
        "necesidad de tratamiento",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn result_is_an_ordered_subset_of_the_configured_list() {
    let text = "SUMINISTRO DE cloro. Llamado a Licitación Pública Nacional 1/2025 para la provisión de bombas.";
    let found = match_triggers(text, &triggers());
    assert_eq!(
        found,
        vec!["licitación pública", "provisión de", "suministro de"]
    );
    assert!(found.iter().all(|f| triggers().contains(f)));
}

#[test]
fn empty_result_iff_no_trigger_occurs() {
    let samples = [
        "Convocatoria a audiencia pública sobre tarifas.",
        "",
        "Concurso de Precios N° 44",
    ];
    for s in samples {
        let found = match_triggers(s, &triggers());
        assert_eq!(found.is_empty(), !any_trigger(s, &triggers()), "text: {s:?}");
    }
}

#[test]
fn accents_are_not_folded() {
    assert!(match_triggers("licitacion publica 3/2025", &triggers()).is_empty());
}

#[test]
fn empty_trigger_list_never_matches() {
    let none: Vec<String> = Vec::new();
    assert!(match_triggers("licitación pública", &none).is_empty());
}

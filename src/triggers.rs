//! Trigger phrase matching.
//!
//! A trigger matches when its lowercased form occurs anywhere in the
//! lowercased text. Nothing fancier: no word boundaries, no accent folding,
//! so "licitación" and "licitacion" are different triggers.

/// Return the triggers (as configured) that occur in `text`, case-insensitively.
///
/// Order follows `triggers`; a trigger listed twice is reported once.
/// Blank triggers never match.
pub fn match_triggers<S: AsRef<str>>(text: &str, triggers: &[S]) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for t in triggers {
        let t = t.as_ref();
        let needle = t.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if haystack.contains(&needle) && !out.iter().any(|m| m == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// Convenience for callers that only need a yes/no answer.
pub fn any_trigger<S: AsRef<str>>(text: &str, triggers: &[S]) -> bool {
    let haystack = text.to_lowercase();
    triggers.iter().any(|t| {
        let needle = t.as_ref().trim().to_lowercase();
        !needle.is_empty() && haystack.contains(&needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_insensitive_and_keeps_config_spelling() {
        let triggers = ["licitación pública", "concurso de precios"];
        let text = "LICITACIÓN PÚBLICA Nº 12/2025 para provisión de agua";
        assert_eq!(
            match_triggers(text, &triggers),
            vec!["licitación pública".to_string()]
        );
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let triggers = ["suministro de"];
        assert!(match_triggers("nada relevante", &triggers).is_empty());
        assert!(!any_trigger("nada relevante", &triggers));
    }

    #[test]
    fn duplicates_and_blank_triggers_are_ignored() {
        let triggers = ["provisión de", "", "Provisión de", "provisión de"];
        let out = match_triggers("provisión de equipos", &triggers);
        assert_eq!(out, vec!["provisión de".to_string(), "Provisión de".to_string()]);
    }
}

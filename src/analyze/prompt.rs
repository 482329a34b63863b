// src/analyze/prompt.rs
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

pub const PLACEHOLDER_KEYWORDS: &str = "{matched_keywords}";
pub const PLACEHOLDER_TEXT: &str = "{text_content}";

const FALLBACK_TEMPLATE: &str = "Analizá el siguiente texto de una posible licitación y respondé \
únicamente con un objeto JSON con los campos: MIA_Rubro, MIA_Score_IA (0-100), \
MIA_Resumen_Tecnico, MIA_Link_al_Pliego, MIA_Empresa_Asignada, MIA_Preguntas_Tecnicas.\n\
Respondé en castellano.\n\
Palabras clave detectadas: {matched_keywords}\n\
Texto: {text_content}";

#[derive(Deserialize)]
struct PromptsFile {
    analysis_prompt: AnalysisPrompt,
}

#[derive(Deserialize)]
struct AnalysisPrompt {
    template: String,
}

/// Prompt template with `{matched_keywords}` and `{text_content}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: FALLBACK_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Load `analysis_prompt.template` from a JSON file; built-in template on any failure.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<PromptsFile>(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(p) if !p.analysis_prompt.template.trim().is_empty() => {
                info!(path = %path.display(), "prompt template loaded");
                Self::new(&p.analysis_prompt.template)
            }
            Ok(_) => {
                error!(path = %path.display(), "prompt template is empty, using built-in");
                Self::default()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not load prompt template, using built-in");
                Self::default()
            }
        }
    }

    /// Fill the template. `text` is cut to `max_chars` characters first.
    pub fn render(&self, text: &str, triggers: &[String], max_chars: usize) -> String {
        let keywords = if triggers.is_empty() {
            "N/A".to_string()
        } else {
            triggers.join(", ")
        };
        let truncated = truncate_chars(text, max_chars);
        // Keywords first so a literal "{text_content}" inside page text is never re-expanded.
        self.template
            .replace(PLACEHOLDER_KEYWORDS, &keywords)
            .replace(PLACEHOLDER_TEXT, truncated)
    }
}

/// Longest prefix of `s` with at most `max` characters (never splits a code point).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

//! Prompt construction for the AI service. Both prompts pin the response to
//! a strict JSON contract so the parser can reject anything else.

/// Two-report comparison: the model judges whether the clinical picture
/// worsened, improved or stayed unchanged between the older and newer text.
pub fn build_comparison_prompt(previous: &str, current: &str) -> String {
    format!(
        r#"Sei un assistente clinico esperto. Hai due referti medici in italiano dello stesso paziente:

• Referto precedente:
"""{previous}"""

• Referto attuale:
"""{current}"""

Confrontali e indica se la situazione clinica è:
- "peggiorata"
- "migliorata"
- "invariata"

Rispondi ESCLUSIVAMENTE in JSON nel seguente formato:
{{
  "status": "peggiorata | migliorata | invariata",
  "explanation": "Breve spiegazione delle principali differenze cliniche"
}}
"#
    )
}

/// Single-report analysis: diagnosis plus a coarse severity class. The
/// response is opaque to the engine.
pub fn build_analysis_prompt(report_text: &str) -> String {
    format!(
        r#"Referto medico:
"""
{report_text}
"""

Fornisci la diagnosi principale e la classificazione del livello di gravità (lieve, moderato, grave). Rispondi solo in questo formato JSON:
{{
    "diagnosis": "...",
    "classification": "lieve | moderato | grave"
}}
"#
    )
}

//! Prompt assembly: persona template + conversation history + time context.
//!
//! Everything here is pure string building. The pipeline picks the persona,
//! reads history from the store and passes both in; nothing in this module
//! touches the clock, the network or the filesystem.

use chrono::{DateTime, Local};

use crate::bot::history::HistoryEntry;
use crate::config::Personas;

/// Pick the persona template for a requesting user.
///
/// The owner gets the primary template, everyone else the secondary one.
pub fn select_persona<'a>(personas: &'a Personas, user_id: i64, owner_id: i64) -> &'a str {
    if user_id == owner_id {
        &personas.owner
    } else {
        &personas.guest
    }
}

/// First name of a display name: split on whitespace, then on `_`, take the
/// first segment. "Maria Silva" and "maria_silva" both yield the first name.
pub fn first_name(display_name: &str) -> &str {
    display_name
        .split_whitespace()
        .next()
        .unwrap_or(display_name)
        .split('_')
        .next()
        .unwrap_or(display_name)
}

/// Substitute the `{user}` token in a persona template.
pub fn render_persona(template: &str, display_name: &str) -> String {
    template.replace("{user}", first_name(display_name))
}

/// Build the full system prompt: rendered persona followed by the history
/// block, date/time context and the literal question.
pub fn build_prompt(
    persona: &str,
    history: &[HistoryEntry],
    question: &str,
    now: DateTime<Local>,
) -> String {
    let historico = history
        .iter()
        .map(|e| format!("{} perguntou: {}\nResposta: {}", e.username, e.message, e.response))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{persona}\n\
         Histórico:\n\
         {historico}\n\
         \n\
         Data atual = ({data})\n\
         Hora atual = ({hora})\n\
         Dia da semana = ({dia})\n\
         \n\
         Pergunta: {question}\n",
        data = now.format("%d/%m/%Y"),
        hora = now.format("%H:%M"),
        dia = now.format("%A"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn personas() -> Personas {
        Personas {
            owner: "Oi {user}, você manda aqui.".to_string(),
            guest: "Olá {user}, como posso ajudar?".to_string(),
        }
    }

    fn noon_monday() -> DateTime<Local> {
        // 2024-01-15 was a Monday
        Local.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap()
    }

    fn entry(username: &str, message: &str, response: &str) -> HistoryEntry {
        HistoryEntry {
            username: username.to_string(),
            message: message.to_string(),
            response: response.to_string(),
        }
    }

    #[test]
    fn test_first_name_splits_on_whitespace() {
        assert_eq!(first_name("Maria Silva"), "Maria");
        assert_eq!(first_name("João Pedro Costa"), "João");
    }

    #[test]
    fn test_first_name_splits_on_underscore() {
        assert_eq!(first_name("maria_silva"), "maria");
        assert_eq!(first_name("Maria_Silva Costa"), "Maria");
    }

    #[test]
    fn test_first_name_plain() {
        assert_eq!(first_name("maria"), "maria");
    }

    #[test]
    fn test_render_persona_substitutes_user() {
        let rendered = render_persona("Oi {user}!", "Maria Silva");
        assert_eq!(rendered, "Oi Maria!");
    }

    #[test]
    fn test_owner_gets_primary_persona() {
        let p = personas();
        assert_eq!(select_persona(&p, 42, 42), p.owner);
    }

    #[test]
    fn test_everyone_else_gets_secondary_persona() {
        let p = personas();
        for user_id in [1, 41, 43, -42, 9_999_999] {
            assert_eq!(select_persona(&p, user_id, 42), p.guest);
        }
    }

    #[test]
    fn test_build_prompt_with_history() {
        let history = vec![
            entry("alice", "Oi", "Olá!"),
            entry("bob", "Tudo bem?", "Tudo ótimo."),
        ];
        let prompt = build_prompt("PERSONA", &history, "E agora?", noon_monday());

        assert!(prompt.starts_with("PERSONA\n"));
        assert!(prompt.contains("alice perguntou: Oi\nResposta: Olá!"));
        assert!(prompt.contains("bob perguntou: Tudo bem?\nResposta: Tudo ótimo."));
        assert!(prompt.contains("Data atual = (15/01/2024)"));
        assert!(prompt.contains("Hora atual = (12:30)"));
        assert!(prompt.contains("Dia da semana = (Monday)"));
        assert!(prompt.contains("Pergunta: E agora?"));
    }

    #[test]
    fn test_build_prompt_keeps_history_order() {
        let history = vec![
            entry("alice", "primeiro", "um"),
            entry("alice", "segundo", "dois"),
        ];
        let prompt = build_prompt("P", &history, "q", noon_monday());

        let first = prompt.find("primeiro").unwrap();
        let second = prompt.find("segundo").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_build_prompt_empty_history() {
        let prompt = build_prompt("PERSONA", &[], "Oi", noon_monday());

        // History block renders empty; everything else is still present
        assert!(prompt.contains("Histórico:\n\n"));
        assert!(prompt.contains("Data atual = (15/01/2024)"));
        assert!(prompt.contains("Pergunta: Oi"));
    }
}

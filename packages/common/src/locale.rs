//! Respondent-facing text.
//!
//! The locale is chosen once when a session is created and passed in
//! explicitly; nothing here inspects the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::retry::FailureKind;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-BR", alias = "pt")]
    PtBr,
    #[serde(rename = "es")]
    Es,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::PtBr => "pt-BR",
            Self::Es => "es",
        }
    }

    pub fn messages(&self) -> Messages {
        Messages { locale: *self }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "pt" | "pt-br" => Ok(Self::PtBr),
            "es" | "es-es" => Ok(Self::Es),
            _ => Err(format!(
                "Invalid locale '{}'. Must be 'en', 'pt-BR' or 'es'",
                s
            )),
        }
    }
}

/// Message catalog bound to one locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn score_required(&self) -> &'static str {
        match self.locale {
            Locale::En => "Please select a score from 0 to 10.",
            Locale::PtBr => "Selecione uma nota de 0 a 10.",
            Locale::Es => "Selecciona una puntuación de 0 a 10.",
        }
    }

    pub fn save_failed(&self) -> &'static str {
        match self.locale {
            Locale::En => "We could not save your response. Please try again.",
            Locale::PtBr => "Não foi possível salvar sua resposta. Tente novamente.",
            Locale::Es => "No pudimos guardar tu respuesta. Inténtalo de nuevo.",
        }
    }

    pub fn thank_you(&self) -> &'static str {
        match self.locale {
            Locale::En => "Thank you for your feedback!",
            Locale::PtBr => "Obrigado pelo seu feedback!",
            Locale::Es => "¡Gracias por tus comentarios!",
        }
    }

    /// Always appended to webhook failures: the response itself is safe.
    pub fn response_saved(&self) -> &'static str {
        match self.locale {
            Locale::En => "Your response was saved successfully.",
            Locale::PtBr => "Sua resposta foi salva com sucesso.",
            Locale::Es => "Tu respuesta se guardó correctamente.",
        }
    }

    /// Banner text for a failed webhook, including the saved-response note.
    pub fn webhook_failed(&self, kind: &FailureKind, origin: Option<&str>) -> String {
        let detail = match (self.locale, kind) {
            (Locale::En, FailureKind::InvalidUrl { url }) => {
                format!("The integration is misconfigured: \"{url}\" is not a valid URL.")
            }
            (Locale::PtBr, FailureKind::InvalidUrl { url }) => {
                format!("A integração está mal configurada: \"{url}\" não é uma URL válida.")
            }
            (Locale::Es, FailureKind::InvalidUrl { url }) => {
                format!("La integración está mal configurada: \"{url}\" no es una URL válida.")
            }
            (Locale::En, FailureKind::InvalidPayload { .. }) => {
                "The integration is misconfigured: the custom payload is not valid JSON.".into()
            }
            (Locale::PtBr, FailureKind::InvalidPayload { .. }) => {
                "A integração está mal configurada: o payload personalizado não é um JSON válido."
                    .into()
            }
            (Locale::Es, FailureKind::InvalidPayload { .. }) => {
                "La integración está mal configurada: el payload personalizado no es un JSON válido."
                    .into()
            }
            (Locale::En, FailureKind::InvalidHeader { name }) => {
                format!("The integration is misconfigured: header \"{name}\" is invalid.")
            }
            (Locale::PtBr, FailureKind::InvalidHeader { name }) => {
                format!("A integração está mal configurada: o cabeçalho \"{name}\" é inválido.")
            }
            (Locale::Es, FailureKind::InvalidHeader { name }) => {
                format!("La integración está mal configurada: la cabecera \"{name}\" no es válida.")
            }
            (Locale::En, FailureKind::Timeout) => {
                "The integration did not answer in time.".into()
            }
            (Locale::PtBr, FailureKind::Timeout) => {
                "A integração não respondeu a tempo.".into()
            }
            (Locale::Es, FailureKind::Timeout) => {
                "La integración no respondió a tiempo.".into()
            }
            (Locale::En, FailureKind::HttpStatus { status, text }) => {
                format!("The integration answered with an error ({status} {text}).")
            }
            (Locale::PtBr, FailureKind::HttpStatus { status, text }) => {
                format!("A integração respondeu com erro ({status} {text}).")
            }
            (Locale::Es, FailureKind::HttpStatus { status, text }) => {
                format!("La integración respondió con un error ({status} {text}).")
            }
            (Locale::En, FailureKind::Cors { .. }) => format!(
                "The receiving server blocked the request. It must allow requests from {}.",
                origin.unwrap_or("this survey's origin")
            ),
            (Locale::PtBr, FailureKind::Cors { .. }) => format!(
                "O servidor de destino bloqueou a requisição. Ele precisa permitir requisições de {}.",
                origin.unwrap_or("a origem desta pesquisa")
            ),
            (Locale::Es, FailureKind::Cors { .. }) => format!(
                "El servidor de destino bloqueó la solicitud. Debe permitir solicitudes desde {}.",
                origin.unwrap_or("el origen de esta encuesta")
            ),
        };
        format!("{} {}", detail, self.response_saved())
    }
}

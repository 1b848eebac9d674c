//! Message catalog for user-facing strings.
//!
//! The active locale is always passed in explicitly; nothing here reads
//! request-global state.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }

    /// First supported language in an `Accept-Language` value, honouring
    /// q-weights. Returns `None` when no listed language is supported.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut candidates: Vec<(f32, Locale)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.trim().split(';');
                let tag = parts.next()?.trim();
                let quality = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                let primary = tag.split(['-', '_']).next()?;
                primary.parse::<Locale>().ok().map(|l| (quality, l))
            })
            .filter(|(q, _)| *q > 0.0)
            .collect();
        // Stable sort keeps header order among equal weights.
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        candidates.first().map(|(_, l)| *l)
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            _ => Err(format!("Unsupported locale: {}", s)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers for every message the role update flow can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    AuthenticationRequired,
    SelfRoleUpdate,
    UnknownUser,
    UnknownOrganization,
    RequesterNotAffiliated,
    TargetNotAffiliated,
    InsufficientPrivilege,
    RoleUpdateFailed,
    RoleUpdated,
}

impl MessageId {
    pub const ALL: [MessageId; 9] = [
        MessageId::AuthenticationRequired,
        MessageId::SelfRoleUpdate,
        MessageId::UnknownUser,
        MessageId::UnknownOrganization,
        MessageId::RequesterNotAffiliated,
        MessageId::TargetNotAffiliated,
        MessageId::InsufficientPrivilege,
        MessageId::RoleUpdateFailed,
        MessageId::RoleUpdated,
    ];
}

pub trait Localizer: Send + Sync {
    fn message(&self, id: MessageId, locale: Locale) -> String;
}

/// Built-in English/French catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCatalog;

impl MessageCatalog {
    fn lookup(id: MessageId, locale: Locale) -> &'static str {
        match (locale, id) {
            (Locale::En, MessageId::AuthenticationRequired) => "Authentication error. Please sign in.",
            (Locale::Fr, MessageId::AuthenticationRequired) => {
                "Erreur d'authentification. Veuillez vous connecter."
            }
            (Locale::En, MessageId::SelfRoleUpdate) => "Unable to update your own role.",
            (Locale::Fr, MessageId::SelfRoleUpdate) => {
                "Impossible de mettre à jour votre propre rôle."
            }
            (Locale::En, MessageId::UnknownUser) => "Unable to update role: user unknown.",
            (Locale::Fr, MessageId::UnknownUser) => {
                "Impossible de mettre à jour le rôle : utilisateur inconnu."
            }
            (Locale::En, MessageId::UnknownOrganization) => {
                "Unable to update role: organization unknown."
            }
            (Locale::Fr, MessageId::UnknownOrganization) => {
                "Impossible de mettre à jour le rôle : organisation inconnue."
            }
            (Locale::En, MessageId::RequesterNotAffiliated) => {
                "Permission Denied: Please contact organization user for help with user role changes."
            }
            (Locale::Fr, MessageId::RequesterNotAffiliated) => {
                "Permission refusée : Veuillez contacter l'utilisateur de l'organisation pour obtenir de l'aide sur les changements de rôle des utilisateurs."
            }
            (Locale::En, MessageId::TargetNotAffiliated) => {
                "Unable to update role: user does not belong to organization."
            }
            (Locale::Fr, MessageId::TargetNotAffiliated) => {
                "Impossible de mettre à jour le rôle : l'utilisateur n'appartient pas à l'organisation."
            }
            (Locale::En, MessageId::InsufficientPrivilege) => {
                "Permission Denied: Please contact organization admin for help with user role changes."
            }
            (Locale::Fr, MessageId::InsufficientPrivilege) => {
                "Permission refusée : Veuillez contacter l'administrateur de l'organisation pour obtenir de l'aide sur les changements de rôle des utilisateurs."
            }
            (Locale::En, MessageId::RoleUpdateFailed) => {
                "Unable to update user's role. Please try again."
            }
            (Locale::Fr, MessageId::RoleUpdateFailed) => {
                "Impossible de mettre à jour le rôle de l'utilisateur. Veuillez réessayer."
            }
            (Locale::En, MessageId::RoleUpdated) => "User role was updated successfully.",
            (Locale::Fr, MessageId::RoleUpdated) => {
                "Le rôle de l'utilisateur a été mis à jour avec succès."
            }
        }
    }
}

impl Localizer for MessageCatalog {
    fn message(&self, id: MessageId, locale: Locale) -> String {
        Self::lookup(id, locale).to_string()
    }
}

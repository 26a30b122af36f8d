// src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::BotError;

/// Discord member identifier (snowflake)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MemberId {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// A guild member as seen through the directory
#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub is_bot: bool,
    /// Role names, excluding @everyone
    pub roles: Vec<String>,
    pub display_name: String,
}

/// Case-fold, strip accents and remove whitespace for vocabulary lookups
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c) && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => ($key:literal, $label:literal, $emoji:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant
            ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored key
            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn emoji(&self) -> &'static str {
                match self {
                    $($name::$variant => $emoji),+
                }
            }

            pub fn options() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.key())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl FromStr for $name {
            type Err = BotError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.key() == wanted)
                    .ok_or_else(|| BotError::InvalidProfile {
                        field: $field,
                        value: s.trim().to_string(),
                        options: Self::options(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

vocabulary! {
    /// Competitive rank
    Rank, "rank" {
        Bronce => ("bronce", "Bronce", "🥉"),
        Plata => ("plata", "Plata", "🥈"),
        Oro => ("oro", "Oro", "🥇"),
        Platino => ("platino", "Platino", "🔷"),
        Diamante => ("diamante", "Diamante", "💎"),
        Campeon => ("campeon", "Campeón", "🏆"),
        GranCampeon => ("grancampeon", "Gran Campeón", "👑"),
        Ssl => ("ssl", "SSL", "🚀"),
    }
}

vocabulary! {
    /// Division inside a rank
    Level, "level" {
        One => ("1", "1", "①"),
        Two => ("2", "2", "②"),
        Three => ("3", "3", "③"),
    }
}

vocabulary! {
    Country, "country" {
        Argentina => ("argentina", "Argentina", "🇦🇷"),
        Bolivia => ("bolivia", "Bolivia", "🇧🇴"),
        Brasil => ("brasil", "Brasil", "🇧🇷"),
        Canada => ("canada", "Canadá", "🇨🇦"),
        Chile => ("chile", "Chile", "🇨🇱"),
        Colombia => ("colombia", "Colombia", "🇨🇴"),
        CostaRica => ("costarica", "Costa Rica", "🇨🇷"),
        Cuba => ("cuba", "Cuba", "🇨🇺"),
        Ecuador => ("ecuador", "Ecuador", "🇪🇨"),
        ElSalvador => ("elsalvador", "El Salvador", "🇸🇻"),
        Espana => ("espana", "España", "🇪🇸"),
        EstadosUnidos => ("estadosunidos", "Estados Unidos", "🇺🇸"),
        Guatemala => ("guatemala", "Guatemala", "🇬🇹"),
        Honduras => ("honduras", "Honduras", "🇭🇳"),
        Mexico => ("mexico", "México", "🇲🇽"),
        Nicaragua => ("nicaragua", "Nicaragua", "🇳🇮"),
        Panama => ("panama", "Panamá", "🇵🇦"),
        Paraguay => ("paraguay", "Paraguay", "🇵🇾"),
        Peru => ("peru", "Perú", "🇵🇪"),
        PuertoRico => ("puertorico", "Puerto Rico", "🇵🇷"),
        RepublicaDominicana => ("republicadominicana", "República Dominicana", "🇩🇴"),
        Uruguay => ("uruguay", "Uruguay", "🇺🇾"),
        Venezuela => ("venezuela", "Venezuela", "🇻🇪"),
        Andorra => ("andorra", "Andorra", "🇦🇩"),
    }
}

/// Declared player data, owned by the member who registered it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// In-game identifier
    pub external_id: String,
    pub alias: String,
    pub rank: Rank,
    pub level: Level,
    pub country: Country,
}

impl PlayerProfile {
    /// Rank, level and flag emoji, e.g. "🥇②🇲🇽"
    pub fn decoration(&self) -> String {
        format!(
            "{}{}{}",
            self.rank.emoji(),
            self.level.emoji(),
            self.country.emoji()
        )
    }

    /// Nickname applied in the guild: alias followed by the decoration
    pub fn nickname(&self) -> String {
        format!("{} {}", self.alias, self.decoration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_spaces() {
        assert_eq!(normalize("  México "), "mexico");
        assert_eq!(normalize("Costa Rica"), "costarica");
        assert_eq!(normalize("República Dominicana"), "republicadominicana");
        assert_eq!(normalize("ESPAÑA"), "espana");
    }

    #[test]
    fn test_vocabulary_parsing() {
        assert_eq!("Oro".parse::<Rank>().unwrap(), Rank::Oro);
        assert_eq!("Gran Campeón".parse::<Rank>().unwrap(), Rank::GranCampeon);
        assert_eq!(" 2 ".parse::<Level>().unwrap(), Level::Two);
        assert_eq!("puerto rico".parse::<Country>().unwrap(), Country::PuertoRico);

        let err = "4".parse::<Level>().unwrap_err();
        match err {
            BotError::InvalidProfile { field, options, .. } => {
                assert_eq!(field, "level");
                assert_eq!(options, "1, 2, 3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!("atlantis".parse::<Country>().is_err());
        assert!("hierro".parse::<Rank>().is_err());
    }

    #[test]
    fn test_profile_decoration() {
        let profile = PlayerProfile {
            external_id: "epic-123".to_string(),
            alias: "Pollo".to_string(),
            rank: "oro".parse().unwrap(),
            level: "2".parse().unwrap(),
            country: "mexico".parse().unwrap(),
        };

        assert_eq!(profile.decoration(), "🥇②🇲🇽");
        assert_eq!(profile.nickname(), "Pollo 🥇②🇲🇽");
    }

    #[test]
    fn test_profile_serializes_vocabulary_keys() {
        let profile = PlayerProfile {
            external_id: "x".to_string(),
            alias: "y".to_string(),
            rank: Rank::GranCampeon,
            level: Level::Three,
            country: Country::CostaRica,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["rank"], "grancampeon");
        assert_eq!(json["level"], "3");
        assert_eq!(json["country"], "costarica");
    }
}

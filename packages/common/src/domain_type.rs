#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of domain object decoded from an item's content.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "note"))]
    Note,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "folder"))]
    Folder,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "resource"))]
    Resource,
    /// Content is not a decodable domain object (arbitrary blob, or a kind
    /// this service does not index).
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "unknown"))]
    Unknown,
}

impl DomainType {
    pub const ALL: &'static [DomainType] = &[
        Self::Note,
        Self::Folder,
        Self::Resource,
        Self::Unknown,
    ];

    /// Map the numeric `type_` code used by the serialization format.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Note,
            2 => Self::Folder,
            4 => Self::Resource,
            _ => Self::Unknown,
        }
    }

    /// Numeric `type_` code, `None` for [`DomainType::Unknown`].
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Note => Some(1),
            Self::Folder => Some(2),
            Self::Resource => Some(4),
            Self::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Folder => "folder",
            Self::Resource => "resource",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid domain type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDomainTypeError {
    invalid: String,
}

impl fmt::Display for ParseDomainTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid domain type '{}'. Valid values: {}",
            self.invalid,
            DomainType::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseDomainTypeError {}

impl FromStr for DomainType {
    type Err = ParseDomainTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(Self::Note),
            "folder" => Ok(Self::Folder),
            "resource" => Ok(Self::Resource),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseDomainTypeError {
                invalid: s.to_string(),
            }),
        }
    }
}

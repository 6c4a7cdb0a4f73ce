//! Platform and regional routing values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regional cluster serving account-v1 and match-v5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cluster {
    Americas,
    Asia,
    Europe,
    Sea,
}

impl Cluster {
    pub fn as_str(self) -> &'static str {
        match self {
            Cluster::Americas => "americas",
            Cluster::Asia => "asia",
            Cluster::Europe => "europe",
            Cluster::Sea => "sea",
        }
    }
}

/// A platform routing value. Summoner and mastery endpoints live on the
/// platform host; the region of a match is the prefix of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    Br1,
    Eun1,
    Euw1,
    Jp1,
    Kr,
    La1,
    La2,
    Me1,
    Na1,
    Oc1,
    Ph2,
    Ru,
    Sg2,
    Th2,
    Tr1,
    Tw2,
    Vn2,
}

impl Region {
    pub const ALL: [Region; 17] = [
        Region::Br1,
        Region::Eun1,
        Region::Euw1,
        Region::Jp1,
        Region::Kr,
        Region::La1,
        Region::La2,
        Region::Me1,
        Region::Na1,
        Region::Oc1,
        Region::Ph2,
        Region::Ru,
        Region::Sg2,
        Region::Th2,
        Region::Tr1,
        Region::Tw2,
        Region::Vn2,
    ];

    /// Platform id as used in hostnames and match id prefixes.
    pub fn platform(self) -> &'static str {
        match self {
            Region::Br1 => "BR1",
            Region::Eun1 => "EUN1",
            Region::Euw1 => "EUW1",
            Region::Jp1 => "JP1",
            Region::Kr => "KR",
            Region::La1 => "LA1",
            Region::La2 => "LA2",
            Region::Me1 => "ME1",
            Region::Na1 => "NA1",
            Region::Oc1 => "OC1",
            Region::Ph2 => "PH2",
            Region::Ru => "RU",
            Region::Sg2 => "SG2",
            Region::Th2 => "TH2",
            Region::Tr1 => "TR1",
            Region::Tw2 => "TW2",
            Region::Vn2 => "VN2",
        }
    }

    pub fn cluster(self) -> Cluster {
        match self {
            Region::Br1 | Region::La1 | Region::La2 | Region::Na1 => Cluster::Americas,
            Region::Jp1 | Region::Kr => Cluster::Asia,
            Region::Eun1 | Region::Euw1 | Region::Me1 | Region::Ru | Region::Tr1 => {
                Cluster::Europe
            }
            Region::Oc1 | Region::Ph2 | Region::Sg2 | Region::Th2 | Region::Tw2 | Region::Vn2 => {
                Cluster::Sea
            }
        }
    }

    /// Region encoded in a match id such as `EUW1_6712345678`.
    pub fn from_match_id(match_id: &str) -> Option<Region> {
        let (prefix, sequence) = match_id.split_once('_')?;
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        prefix.parse().ok()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown region '{0}'")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        // Short forms players actually type
        let region = match upper.as_str() {
            "BR" => Region::Br1,
            "EUNE" => Region::Eun1,
            "EUW" => Region::Euw1,
            "JP" => Region::Jp1,
            "LAN" => Region::La1,
            "LAS" => Region::La2,
            "ME" => Region::Me1,
            "NA" => Region::Na1,
            "OCE" => Region::Oc1,
            "TR" => Region::Tr1,
            other => Region::ALL
                .into_iter()
                .find(|r| r.platform() == other)
                .ok_or_else(|| UnknownRegion(s.to_owned()))?,
        };
        Ok(region)
    }
}

impl TryFrom<String> for Region {
    type Error = UnknownRegion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.platform().to_owned()
    }
}

// SQLx: stored as the platform id in a TEXT column
impl sqlx::Type<sqlx::Postgres> for Region {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for Region {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.platform(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Region {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse::<Region>()?)
    }
}

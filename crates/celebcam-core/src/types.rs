use serde::de::value::MapAccessDeserializer;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Response body of both recognition endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    /// One entry per detected face, in detection order.
    /// `None` (field missing or `null`) means no face was detected at all.
    #[serde(default)]
    pub celebrity_info: Option<Vec<FaceEntry>>,
    /// Name the server stored the upload under. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl RecognitionResponse {
    /// Number of faces the server reported, or `None` when detection found nothing.
    pub fn face_count(&self) -> Option<usize> {
        self.celebrity_info.as_ref().map(Vec::len)
    }
}

/// Recognition result for a single detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<CelebrityInfo>", into = "Option<CelebrityInfo>")]
pub enum FaceEntry {
    /// A face was found but matched no known celebrity (`null` on the wire).
    Unmatched,
    Matched(CelebrityInfo),
}

impl From<Option<CelebrityInfo>> for FaceEntry {
    fn from(value: Option<CelebrityInfo>) -> Self {
        match value {
            Some(info) => FaceEntry::Matched(info),
            None => FaceEntry::Unmatched,
        }
    }
}

impl From<FaceEntry> for Option<CelebrityInfo> {
    fn from(value: FaceEntry) -> Self {
        match value {
            FaceEntry::Matched(info) => Some(info),
            FaceEntry::Unmatched => None,
        }
    }
}

/// A matched celebrity record.
///
/// The server sends database rows as positional arrays
/// `[imdb_id, name, dob, dod, age, page_url, image_url, ...]`; columns past
/// the seventh are ignored. An object with the field names below is accepted
/// too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelebrityInfo {
    /// Catalogue id, e.g. `nm0000138`. Numeric ids are kept as their decimal text.
    pub id: String,
    pub name: String,
    /// Birth date as sent by the server (ISO-like, e.g. `1984-06-05`).
    pub born: Option<String>,
    /// Death date, present only for deceased celebrities.
    pub died: Option<String>,
    pub age: Option<u32>,
    /// External profile page (IMDb).
    pub profile_url: String,
    /// Portrait image URL.
    pub portrait_url: String,
}

impl<'de> Deserialize<'de> for CelebrityInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CelebrityVisitor)
    }
}

struct CelebrityVisitor;

impl<'de> Visitor<'de> for CelebrityVisitor {
    type Value = CelebrityInfo;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a celebrity row array or object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        fn next<'de, A: SeqAccess<'de>, T: Deserialize<'de>>(
            seq: &mut A,
            idx: usize,
        ) -> Result<T, A::Error> {
            seq.next_element()?
                .ok_or_else(|| de::Error::invalid_length(idx, &"at least 7 columns"))
        }

        let info = CelebrityInfo {
            id: next::<_, CelebrityId>(&mut seq, 0)?.0,
            name: next(&mut seq, 1)?,
            born: next(&mut seq, 2)?,
            died: next(&mut seq, 3)?,
            age: next(&mut seq, 4)?,
            profile_url: next(&mut seq, 5)?,
            portrait_url: next(&mut seq, 6)?,
        };
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(info)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        let n = CelebrityNamed::deserialize(MapAccessDeserializer::new(map))?;
        Ok(CelebrityInfo {
            id: n.id.0,
            name: n.name,
            born: n.born,
            died: n.died,
            age: n.age,
            profile_url: n.profile_url,
            portrait_url: n.portrait_url,
        })
    }
}

#[derive(Deserialize)]
struct CelebrityNamed {
    id: CelebrityId,
    name: String,
    #[serde(default)]
    born: Option<String>,
    #[serde(default)]
    died: Option<String>,
    #[serde(default)]
    age: Option<u32>,
    profile_url: String,
    portrait_url: String,
}

/// Id column: a string key, or an integer from older schemas.
struct CelebrityId(String);

impl<'de> Deserialize<'de> for CelebrityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = CelebrityId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(CelebrityId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(CelebrityId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(CelebrityId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

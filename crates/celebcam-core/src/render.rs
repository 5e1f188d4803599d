//! Rendering of a recognition response into a result view.
//!
//! [`render`] is pure: the same response always yields the same view, and
//! the view holds everything needed to produce HTML or text output.

use crate::date::format_long_date;
use crate::types::{CelebrityInfo, FaceEntry, RecognitionResponse};
use serde::Serialize;

pub const NO_FACES_MESSAGE: &str = "No faces detected in the uploaded image";
pub const PROFILE_LINK_TEXT: &str = "Go to IMDb";

/// The rendered content of the result panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultView {
    pub items: Vec<ResultItem>,
}

/// One rendered entry: a message or a celebrity card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultItem {
    NoFaces,
    /// Face at 1-based position `face` matched nobody.
    NoMatch { face: usize },
    Card(Card),
    /// A capture or upload failed.
    Error { message: String },
}

impl ResultItem {
    /// Text of a message item, `None` for cards.
    pub fn message(&self) -> Option<String> {
        match self {
            ResultItem::NoFaces => Some(NO_FACES_MESSAGE.to_string()),
            ResultItem::NoMatch { face } => {
                Some(format!("No matching celebrity found for face {face}."))
            }
            ResultItem::Error { message } => Some(message.clone()),
            ResultItem::Card(_) => None,
        }
    }
}

/// Summary card for one matched celebrity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// 1-based face position in the response.
    pub face: usize,
    pub portrait_url: String,
    pub name: String,
    pub born: String,
    pub died: Option<String>,
    pub age: String,
    pub profile_url: String,
}

impl Card {
    fn from_info(face: usize, info: &CelebrityInfo) -> Self {
        Self {
            face,
            portrait_url: info.portrait_url.clone(),
            name: info.name.clone(),
            born: info
                .born
                .as_deref()
                .map(format_long_date)
                .unwrap_or_else(|| "unknown".to_string()),
            died: info.died.as_deref().map(format_long_date),
            age: info
                .age
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            profile_url: info.profile_url.clone(),
        }
    }

    /// Text list items in display order, excluding the profile link.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.name.clone(), format!("Born: {}", self.born)];
        if let Some(died) = &self.died {
            lines.push(format!("Died: {died}"));
        }
        lines.push(format!("Age: {}", self.age));
        lines
    }
}

impl ResultView {
    /// A view consisting of a single failure message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            items: vec![ResultItem::Error {
                message: message.into(),
            }],
        }
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Card(card) => Some(card),
            _ => None,
        })
    }

    /// All message texts, in order.
    pub fn messages(&self) -> Vec<String> {
        self.items.iter().filter_map(ResultItem::message).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Build the result view for a response.
///
/// Emits one item per reported face, or a single "no faces" message when
/// the response carries no detection list.
pub fn render(response: &RecognitionResponse) -> ResultView {
    let Some(faces) = &response.celebrity_info else {
        return ResultView {
            items: vec![ResultItem::NoFaces],
        };
    };

    let items = faces
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let face = idx + 1;
            match entry {
                FaceEntry::Unmatched => ResultItem::NoMatch { face },
                FaceEntry::Matched(info) => ResultItem::Card(Card::from_info(face, info)),
            }
        })
        .collect();

    ResultView { items }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celeb(name: &str, born: &str, died: Option<&str>) -> CelebrityInfo {
        CelebrityInfo {
            id: "nm0000001".into(),
            name: name.into(),
            born: Some(born.into()),
            died: died.map(Into::into),
            age: Some(40),
            profile_url: "https://www.imdb.com/name/nm0000001/".into(),
            portrait_url: "https://images.example/1.jpg".into(),
        }
    }

    #[test]
    fn test_no_faces() {
        let view = render(&RecognitionResponse::default());
        assert_eq!(view.items, vec![ResultItem::NoFaces]);
        assert_eq!(view.messages(), vec![NO_FACES_MESSAGE.to_string()]);
        assert_eq!(view.cards().count(), 0);
    }

    #[test]
    fn test_unmatched_then_matched() {
        let resp = RecognitionResponse {
            celebrity_info: Some(vec![
                FaceEntry::Unmatched,
                FaceEntry::Matched(celeb("Jane Doe", "1984-06-05", None)),
            ]),
            filename: None,
        };
        let view = render(&resp);
        assert_eq!(
            view.messages(),
            vec!["No matching celebrity found for face 1.".to_string()]
        );
        let cards: Vec<_> = view.cards().collect();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].face, 2);
        assert_eq!(cards[0].name, "Jane Doe");
    }

    #[test]
    fn test_died_is_its_own_line() {
        let card = Card::from_info(1, &celeb("John Roe", "1920-01-02", Some("1990-03-04")));
        assert_eq!(
            card.lines(),
            vec![
                "John Roe".to_string(),
                "Born: January 2, 1920".to_string(),
                "Died: March 4, 1990".to_string(),
                "Age: 40".to_string(),
            ]
        );
    }

    #[test]
    fn test_living_card_has_no_died_line() {
        let card = Card::from_info(1, &celeb("Jane Doe", "1984-06-05", None));
        assert!(card.lines().iter().all(|l| !l.starts_with("Died:")));
        assert!(card.lines().contains(&"Born: June 5, 1984".to_string()));
    }

    #[test]
    fn test_missing_age_and_birth() {
        let mut info = celeb("Anon", "1984-06-05", None);
        info.born = None;
        info.age = None;
        let card = Card::from_info(1, &info);
        assert!(card.lines().contains(&"Born: unknown".to_string()));
        assert!(card.lines().contains(&"Age: unknown".to_string()));
    }

    #[test]
    fn test_item_count_matches_face_count() {
        let resp = RecognitionResponse {
            celebrity_info: Some(vec![
                FaceEntry::Matched(celeb("A", "1970-01-01", None)),
                FaceEntry::Unmatched,
                FaceEntry::Unmatched,
                FaceEntry::Matched(celeb("B", "1980-01-01", Some("2020-01-01"))),
            ]),
            filename: None,
        };
        let view = render(&resp);
        assert_eq!(view.items.len(), resp.face_count().unwrap());
        assert_eq!(view.cards().count(), 2);
    }

    #[test]
    fn test_empty_face_list_renders_nothing() {
        let resp = RecognitionResponse {
            celebrity_info: Some(Vec::new()),
            filename: None,
        };
        assert!(render(&resp).is_empty());
    }
}

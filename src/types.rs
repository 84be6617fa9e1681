use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The seven emotion classes recognised by default, in label-index order.
pub const DEFAULT_EMOTIONS: [&str; 7] = [
    "anger", "disgust", "fear", "happy", "neutral", "sadness", "surprise",
];

/// One emotion class. The index is its position in the owning [`Categories`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub index: usize,
    pub name: String,
}

/// The fixed, ordered set of categories a model is trained on.
///
/// Order defines label indices, so two sets with the same names in a
/// different order are different label spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    items: Vec<Category>,
}

impl Categories {
    /// Build a category set from names. Names must be non-empty, unique and
    /// free of surrounding whitespace.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::InvalidConfig("at least one category is required".into()));
        }

        let mut items: Vec<Category> = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if name.trim().is_empty() {
                return Err(Error::InvalidConfig(format!("category {} has an empty name", index)));
            }
            // Names double as directory names; they are used exactly as given.
            if name.trim() != name {
                return Err(Error::InvalidConfig(format!(
                    "category '{}' has leading or trailing whitespace",
                    name
                )));
            }
            if items.iter().any(|c| c.name == name) {
                return Err(Error::InvalidConfig(format!("duplicate category '{}'", name)));
            }
            items.push(Category {
                index,
                name: name.to_string(),
            });
        }

        Ok(Self { items })
    }

    pub fn emotions() -> Self {
        Self {
            items: DEFAULT_EMOTIONS
                .iter()
                .enumerate()
                .map(|(index, name)| Category {
                    index,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Category> {
        self.items.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Category> {
        self.items.iter().find(|c| c.name == name)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(|c| c.name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Categories {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The outcome of classifying one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the predicted category.
    pub category: usize,
    /// Euclidean distance to the nearest representative in discriminant space.
    pub distance: f64,
}

/// A face rectangle in frame coordinates, as reported by a face locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect this region with a `width`x`height` frame.
    ///
    /// Returns `(x, y, width, height)` in unsigned frame coordinates, or
    /// `None` when the region lies entirely outside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = (self.x as i64).clamp(0, width as i64);
        let y0 = (self.y as i64).clamp(0, height as i64);
        let x1 = (self.x as i64 + self.width as i64).clamp(0, width as i64);
        let y1 = (self.y as i64 + self.height as i64).clamp(0, height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_keep_order() {
        let cats = Categories::new(&["happy", "sad"]).unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats.name(0), Some("happy"));
        assert_eq!(cats.by_name("sad").map(|c| c.index), Some(1));
        assert!(cats.get(2).is_none());
    }

    #[test]
    fn categories_reject_duplicates_and_empty() {
        assert!(matches!(
            Categories::new(&["happy", "happy"]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Categories::new::<&str>(&[]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Categories::new(&["happy", " "]),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn categories_reject_padded_names() {
        assert!(matches!(
            Categories::new(&["happy ", "sad"]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Categories::new(&["happy", "\tsad"]),
            Err(Error::InvalidConfig(_))
        ));
        let cats = Categories::new(&["very happy", "sad"]).unwrap();
        assert_eq!(cats.name(0), Some("very happy"));
    }

    #[test]
    fn default_emotions() {
        let cats = Categories::emotions();
        assert_eq!(cats.len(), 7);
        assert_eq!(cats.name(0), Some("anger"));
        assert_eq!(cats.name(6), Some("surprise"));
    }

    #[test]
    fn region_clamping() {
        let region = FaceRegion::new(-10, 5, 30, 30);
        assert_eq!(region.clamp_to(100, 100), Some((0, 5, 20, 30)));

        let outside = FaceRegion::new(200, 200, 10, 10);
        assert_eq!(outside.clamp_to(100, 100), None);

        let overflow = FaceRegion::new(90, 90, 50, 50);
        assert_eq!(overflow.clamp_to(100, 100), Some((90, 90, 10, 10)));
    }

    #[test]
    fn dimensions_display() {
        let dims = Dimensions::new(350, 350);
        assert_eq!(dims.pixel_count(), 122_500);
        assert_eq!(dims.to_string(), "350x350");
    }
}

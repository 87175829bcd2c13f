//! Product entity and its embedded reviews.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::entity::Entity;
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Clothing,
    Food,
    Books,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Electronics,
        Category::Clothing,
        Category::Food,
        Category::Books,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Food => "Food",
            Category::Books => "Books",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

/// A hosted image reference. Only the URL and the host's identifier are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub public_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub user: UserId,
    /// Reviewer's display name at the time of the review.
    pub name: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: Category,
    /// Owning vendor.
    pub vendor: UserId,
    pub images: Vec<ProductImage>,
    /// Mean of all review ratings, 0 when there are none.
    pub ratings: f64,
    pub num_of_reviews: u32,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;
    const COLLECTION: &'static str = "products";
    const NAME: &'static str = "Product";

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Fields supplied when listing a new product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    pub category: Category,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::MissingField("name"));
        }
        if self.description.trim().is_empty() {
            return Err(CatalogError::MissingField("description"));
        }
        if self.price.is_negative() {
            return Err(CatalogError::NegativePrice);
        }
        Ok(())
    }
}

/// Partial edit of a listing; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub category: Option<Category>,
    pub images: Option<Vec<ProductImage>>,
}

impl Product {
    /// Creates a listing owned by `vendor`.
    pub fn new(vendor: UserId, draft: ProductDraft) -> Result<Self, CatalogError> {
        draft.validate()?;
        Ok(Self {
            id: ProductId::new(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            price: draft.price,
            stock: draft.stock,
            category: draft.category,
            vendor,
            images: draft.images,
            ratings: 0.0,
            num_of_reviews: 0,
            reviews: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Applies an edit, returning images that were replaced.
    pub fn apply(&mut self, update: ProductUpdate) -> Result<Vec<ProductImage>, CatalogError> {
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(CatalogError::MissingField("name"));
            }
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price {
            if price.is_negative() {
                return Err(CatalogError::NegativePrice);
            }
            self.price = price;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        match update.images {
            Some(images) => Ok(std::mem::replace(&mut self.images, images)),
            None => Ok(Vec::new()),
        }
    }

    /// Adds a review, or replaces the existing one from the same user.
    ///
    /// The rating mean and review count are recomputed from the full list.
    pub fn upsert_review(&mut self, review: Review) -> Result<(), CatalogError> {
        if !(1..=5).contains(&review.rating) {
            return Err(CatalogError::InvalidRating(review.rating));
        }

        match self.reviews.iter_mut().find(|r| r.user == review.user) {
            Some(existing) => {
                existing.rating = review.rating;
                existing.comment = review.comment;
            }
            None => self.reviews.push(review),
        }
        self.recompute_rating();
        Ok(())
    }

    fn recompute_rating(&mut self) {
        self.num_of_reviews = self.reviews.len() as u32;
        self.ratings = if self.reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
            sum as f64 / self.reviews.len() as f64
        };
    }

    /// First image URL, used as the order line snapshot.
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Desk Lamp".into(),
            description: "Warm light".into(),
            price: Money::from_cents(2599),
            stock: 4,
            category: Category::Electronics,
            images: vec![ProductImage {
                public_id: "products/lamp".into(),
                url: "https://img.example/lamp.jpg".into(),
            }],
        }
    }

    fn review(user: UserId, rating: u8) -> Review {
        Review {
            user,
            name: "Karim".into(),
            rating,
            comment: "ok".into(),
        }
    }

    #[test]
    fn new_product_has_no_reviews() {
        let product = Product::new(UserId::new(), draft()).unwrap();
        assert_eq!(product.num_of_reviews, 0);
        assert_eq!(product.ratings, 0.0);
        assert_eq!(product.thumbnail(), Some("https://img.example/lamp.jpg"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut d = draft();
        d.name = "  ".into();
        assert!(matches!(
            Product::new(UserId::new(), d),
            Err(CatalogError::MissingField("name"))
        ));
    }

    #[test]
    fn repeat_review_replaces_in_place() {
        let mut product = Product::new(UserId::new(), draft()).unwrap();
        let alice = UserId::new();
        let bob = UserId::new();

        product.upsert_review(review(alice, 2)).unwrap();
        product.upsert_review(review(bob, 4)).unwrap();
        assert_eq!(product.ratings, 3.0);

        product.upsert_review(review(alice, 5)).unwrap();
        assert_eq!(product.num_of_reviews, 2);
        assert_eq!(product.reviews.len(), 2);
        assert_eq!(product.ratings, 4.5);
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let mut product = Product::new(UserId::new(), draft()).unwrap();
        assert!(matches!(
            product.upsert_review(review(UserId::new(), 6)),
            Err(CatalogError::InvalidRating(6))
        ));
        assert!(product.upsert_review(review(UserId::new(), 0)).is_err());
        assert!(product.reviews.is_empty());
    }

    #[test]
    fn apply_returns_replaced_images() {
        let mut product = Product::new(UserId::new(), draft()).unwrap();
        let replaced = product
            .apply(ProductUpdate {
                price: Some(Money::from_cents(1999)),
                images: Some(vec![]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(product.price.cents(), 1999);
        assert!(product.images.is_empty());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("books".parse::<Category>().unwrap(), Category::Books);
        assert!("Toys".parse::<Category>().is_err());
    }
}

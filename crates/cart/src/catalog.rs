//! Catalog record adapter.
//!
//! The recipe catalog returns loosely shaped meal objects (every field
//! optional, most of them strings). This module is the only place that
//! knows that shape. It turns any [`CatalogRecord`] into a
//! [`NormalizedCatalogRecord`], the only thing the cart accepts.

use rust_decimal::Decimal;
use serde::Deserialize;

use recipe_box_core::{AddOutcome, InvalidRecord, ItemId, NormalizedCatalogRecord};

use crate::repository::{Applied, CartRepository};
use crate::store::CartStore;

/// Read access to the fields the cart needs from a catalog record.
pub trait CatalogRecord {
    fn id(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    fn image(&self) -> Option<&str>;

    /// Catalog price, if the catalog provides one.
    fn price(&self) -> Option<Decimal> {
        None
    }
}

/// Full meal record, as returned by the catalog's detail lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Meal {
    #[serde(rename = "idMeal")]
    pub id: Option<String>,
    #[serde(rename = "strMeal")]
    pub name: Option<String>,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: Option<String>,
    #[serde(rename = "strCategory")]
    pub category: Option<String>,
    #[serde(rename = "strArea")]
    pub area: Option<String>,
    #[serde(rename = "strTags")]
    pub tags: Option<String>,
    #[serde(rename = "strInstructions")]
    pub instructions: Option<String>,
    #[serde(rename = "strSource")]
    pub source: Option<String>,
    #[serde(rename = "strYoutube")]
    pub youtube: Option<String>,
    /// Not sent by the public catalog; honoured when a mirror adds one.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Abbreviated meal record, as returned by category listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MealSummary {
    #[serde(rename = "idMeal")]
    pub id: Option<String>,
    #[serde(rename = "strMeal")]
    pub name: Option<String>,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: Option<String>,
}

/// The catalog's response envelope: `{"meals": [...]}` or `{"meals": null}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MealsEnvelope<T> {
    #[serde(default)]
    pub meals: Option<Vec<T>>,
}

impl<T> MealsEnvelope<T> {
    /// Records in the response; `null` means none.
    #[must_use]
    pub fn into_meals(self) -> Vec<T> {
        self.meals.unwrap_or_default()
    }

    /// The first record, as the detail screen uses a lookup-by-id response.
    #[must_use]
    pub fn into_first(self) -> Option<T> {
        self.into_meals().into_iter().next()
    }
}

impl CatalogRecord for Meal {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn image(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    fn price(&self) -> Option<Decimal> {
        self.price
    }
}

impl CatalogRecord for MealSummary {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn image(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
}

impl<R: CatalogRecord + ?Sized> CatalogRecord for &R {
    fn id(&self) -> Option<&str> {
        (**self).id()
    }

    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn image(&self) -> Option<&str> {
        (**self).image()
    }

    fn price(&self) -> Option<Decimal> {
        (**self).price()
    }
}

/// Normalize a catalog record for the cart.
///
/// A missing image becomes an empty locator; a missing price becomes
/// `default_price`.
///
/// # Errors
///
/// Returns `InvalidRecord` if the record has no usable id or name, or a
/// negative price.
pub fn normalize<R: CatalogRecord>(
    record: &R,
    default_price: Decimal,
) -> Result<NormalizedCatalogRecord, InvalidRecord> {
    let id = ItemId::parse(record.id().unwrap_or_default())?;
    let name = record.name().ok_or(InvalidRecord::MissingName)?;
    NormalizedCatalogRecord::new(
        id,
        name,
        record.image().unwrap_or_default(),
        record.price().unwrap_or(default_price),
    )
}

/// Normalize a catalog record and add it to the cart.
///
/// # Errors
///
/// Returns `InvalidRecord` if the record cannot be normalized; the cart is
/// not touched in that case.
pub fn add_to_cart<S: CartStore, R: CatalogRecord>(
    repo: &CartRepository<S>,
    record: &R,
    default_price: Decimal,
) -> Result<Applied<AddOutcome>, InvalidRecord> {
    let normalized = normalize(record, default_price).inspect_err(|e| {
        tracing::warn!(error = %e, "Refusing to add catalog record");
    })?;
    Ok(repo.add(normalized))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use recipe_box_core::{DEFAULT_UNIT_PRICE, ItemIdError};

    use super::*;
    use crate::store::MemoryStore;

    const LOOKUP_RESPONSE: &str = r#"{
        "meals": [{
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strCategory": "Chicken",
            "strArea": "Japanese",
            "strInstructions": "Preheat oven to 350F.\r\nCombine soy sauce.",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg",
            "strTags": "Meat,Casserole, ",
            "strYoutube": "https://www.youtube.com/watch?v=4aZr5hZXP_s",
            "strIngredient1": "soy sauce",
            "strSource": null
        }]
    }"#;

    fn lookup_meal() -> Meal {
        serde_json::from_str::<MealsEnvelope<Meal>>(LOOKUP_RESPONSE)
            .unwrap()
            .into_first()
            .unwrap()
    }

    #[test]
    fn test_parse_lookup_response() {
        let meal = lookup_meal();
        assert_eq!(meal.id.as_deref(), Some("52772"));
        assert_eq!(meal.category.as_deref(), Some("Chicken"));
        assert_eq!(meal.tags.as_deref(), Some("Meat,Casserole, "));
        assert!(meal.source.is_none());
    }

    #[test]
    fn test_parse_null_meals() {
        let envelope: MealsEnvelope<MealSummary> = serde_json::from_str(r#"{"meals":null}"#).unwrap();
        assert!(envelope.into_meals().is_empty());
    }

    #[test]
    fn test_parse_listing_response() {
        let json = r#"{"meals":[
            {"strMeal":"Baked salmon","strMealThumb":"a.jpg","idMeal":"52959"},
            {"strMeal":"Kedgeree","strMealThumb":"b.jpg","idMeal":"52887"}
        ]}"#;
        let meals = serde_json::from_str::<MealsEnvelope<MealSummary>>(json)
            .unwrap()
            .into_meals();
        assert_eq!(meals.len(), 2);
    }

    #[test]
    fn test_normalize_applies_default_price() {
        let normalized = normalize(&lookup_meal(), DEFAULT_UNIT_PRICE).unwrap();
        assert_eq!(normalized.id().as_str(), "52772");
        assert_eq!(normalized.name(), "Teriyaki Chicken Casserole");
        assert!(normalized.image_ref().ends_with("wvpsxx1468256321.jpg"));
        assert_eq!(normalized.unit_price(), DEFAULT_UNIT_PRICE);
    }

    #[test]
    fn test_normalize_prefers_catalog_price() {
        let meal = Meal {
            price: Some(Decimal::from_str("3.25").unwrap()),
            ..lookup_meal()
        };
        let normalized = normalize(&meal, DEFAULT_UNIT_PRICE).unwrap();
        assert_eq!(normalized.unit_price(), Decimal::from_str("3.25").unwrap());
    }

    #[test]
    fn test_normalize_missing_image_is_empty() {
        let summary = MealSummary {
            id: Some("1".to_string()),
            name: Some("Soup".to_string()),
            thumbnail: None,
        };
        assert_eq!(normalize(&summary, Decimal::ONE).unwrap().image_ref(), "");
    }

    #[test]
    fn test_normalize_missing_id() {
        let summary = MealSummary {
            id: None,
            name: Some("Soup".to_string()),
            thumbnail: None,
        };
        assert_eq!(
            normalize(&summary, Decimal::ONE),
            Err(InvalidRecord::MissingId(ItemIdError::Empty))
        );
    }

    #[test]
    fn test_normalize_missing_or_blank_name() {
        for name in [None, Some("   ".to_string())] {
            let summary = MealSummary {
                id: Some("1".to_string()),
                name,
                thumbnail: None,
            };
            assert_eq!(
                normalize(&summary, Decimal::ONE),
                Err(InvalidRecord::MissingName)
            );
        }
    }

    #[test]
    fn test_add_to_cart_rejects_invalid_record_without_touching_cart() {
        let repo = CartRepository::open(MemoryStore::new(), "cart");
        let result = add_to_cart(&repo, &MealSummary::default(), DEFAULT_UNIT_PRICE);
        assert!(result.is_err());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_add_to_cart_twice() {
        let repo = CartRepository::open(MemoryStore::new(), "cart");
        let meal = lookup_meal();
        let first = add_to_cart(&repo, &meal, DEFAULT_UNIT_PRICE).unwrap();
        let second = add_to_cart(&repo, &meal, DEFAULT_UNIT_PRICE).unwrap();
        assert_eq!(first.outcome(), AddOutcome::Added);
        assert_eq!(second.outcome(), AddOutcome::AlreadyPresent);
        assert_eq!(repo.len(), 1);
    }
}

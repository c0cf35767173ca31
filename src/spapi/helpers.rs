//! Compositions of endpoint calls into local shapes.

use serde_json::Value;
use tracing::info;

use super::{CatalogItemParams, PrepInstructionsParams, SpApiClient, SpApiError};
use crate::model::{ProductInput, ShipmentPlan};

const CATALOG_INCLUDED_DATA: &[&str] = &["summaries", "images", "dimensions", "identifiers"];

impl SpApiClient {
    /// Look up `asin` in the catalog and map it onto a product draft. The
    /// draft carries no owner; the caller assigns one when inserting it.
    pub async fn import_product_from_amazon(
        &self,
        asin: &str,
        marketplace_id: &str,
    ) -> Result<ProductInput, SpApiError> {
        let item = self
            .get_catalog_item(&CatalogItemParams {
                asin: asin.to_string(),
                marketplace_ids: vec![marketplace_id.to_string()],
                included_data: CATALOG_INCLUDED_DATA.iter().map(|s| s.to_string()).collect(),
            })
            .await?;
        Ok(product_from_catalog_item(asin, &item))
    }

    /// Check prep instructions for each plan item in order; the plan is
    /// invalid as soon as one response carries a non-empty `errors` list.
    pub async fn validate_shipment_plan(
        &self,
        plan: &ShipmentPlan,
        ship_to_country_code: &str,
    ) -> Result<bool, SpApiError> {
        for item in &plan.items {
            let response = self
                .get_prep_instructions(&PrepInstructionsParams {
                    ship_to_country_code: ship_to_country_code.to_string(),
                    seller_sku_list: vec![item.sku.clone()],
                    asin_list: Vec::new(),
                })
                .await?;
            if has_errors(&response) {
                info!(plan_id = %plan.id, sku = %item.sku, "shipment plan failed prep validation");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub fn has_errors(response: &Value) -> bool {
    response
        .get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| !errors.is_empty())
}

/// Map a catalog item (2022-04-01 shape) onto a product draft, defaulting
/// whatever the response lacks.
pub fn product_from_catalog_item(asin: &str, item: &Value) -> ProductInput {
    let mut product = ProductInput::new(asin, asin);

    let summary = first(item, "summaries");
    if let Some(title) = summary.and_then(|s| s.get("itemName")).and_then(Value::as_str) {
        product.title = title.to_string();
    }
    product.brand = summary
        .and_then(|s| s.get("brand").or_else(|| s.get("brandName")))
        .and_then(Value::as_str)
        .map(str::to_string);

    product.image_url = first(item, "images")
        .and_then(|set| set.get("images"))
        .and_then(Value::as_array)
        .and_then(|images| {
            images
                .iter()
                .find(|img| img.get("variant").and_then(Value::as_str) == Some("MAIN"))
                .or_else(|| images.first())
        })
        .and_then(|img| img.get("link"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(package) = first(item, "dimensions").and_then(|d| d.get("package")) {
        product.length_in = package.get("length").and_then(to_inches);
        product.width_in = package.get("width").and_then(to_inches);
        product.height_in = package.get("height").and_then(to_inches);
        product.weight_lb = package.get("weight").and_then(to_pounds);
    }

    product
}

fn first<'a>(item: &'a Value, key: &str) -> Option<&'a Value> {
    item.get(key).and_then(Value::as_array).and_then(|a| a.first())
}

fn measurement(v: &Value) -> Option<(f64, String)> {
    let value = v.get("value").and_then(Value::as_f64)?;
    let unit = v
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    Some((value, unit))
}

fn to_inches(v: &Value) -> Option<f64> {
    let (value, unit) = measurement(v)?;
    match unit.as_str() {
        "inches" | "inch" | "in" => Some(value),
        "centimeters" | "cm" => Some(value / 2.54),
        "millimeters" | "mm" => Some(value / 25.4),
        _ => None,
    }
}

fn to_pounds(v: &Value) -> Option<f64> {
    let (value, unit) = measurement(v)?;
    match unit.as_str() {
        "pounds" | "pound" | "lb" | "lbs" => Some(value),
        "ounces" | "oz" => Some(value / 16.0),
        "kilograms" | "kg" => Some(value * 2.204_622_6),
        "grams" | "g" => Some(value / 453.592_37),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LabelPrepType, ProductCondition};
    use serde_json::json;

    #[test]
    fn maps_catalog_item_fields() {
        let item = json!({
            "asin": "B000000001",
            "summaries": [{ "marketplaceId": "ATVPDKIKX0DER", "itemName": "Steel Water Bottle", "brand": "Hydra" }],
            "images": [{ "images": [
                { "variant": "PT01", "link": "https://m.media/pt01.jpg" },
                { "variant": "MAIN", "link": "https://m.media/main.jpg" }
            ] }],
            "dimensions": [{ "package": {
                "length": { "value": 10.0, "unit": "inches" },
                "width": { "value": 5.08, "unit": "centimeters" },
                "height": { "value": 3.0, "unit": "inches" },
                "weight": { "value": 8.0, "unit": "ounces" }
            } }]
        });
        let product = product_from_catalog_item("B000000001", &item);
        assert_eq!(product.title, "Steel Water Bottle");
        assert_eq!(product.brand.as_deref(), Some("Hydra"));
        assert_eq!(product.image_url.as_deref(), Some("https://m.media/main.jpg"));
        assert_eq!(product.length_in, Some(10.0));
        assert!((product.width_in.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(product.weight_lb, Some(0.5));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let product = product_from_catalog_item("B0EMPTY000", &json!({ "asin": "B0EMPTY000" }));
        assert_eq!(product.sku, "B0EMPTY000");
        assert_eq!(product.asin, "B0EMPTY000");
        assert_eq!(product.title, "");
        assert_eq!(product.condition, ProductCondition::NewItem);
        assert_eq!(product.label_prep_type, LabelPrepType::SellerLabel);
        assert_eq!(product.cost, 0.0);
        assert_eq!(product.quantity, 0);
        assert!(product.image_url.is_none());
        assert!(product.weight_lb.is_none());
        assert!(product.prep_instructions.is_empty());
    }

    #[test]
    fn error_detection() {
        assert!(has_errors(&json!({ "errors": [{ "code": "InvalidInput" }] })));
        assert!(!has_errors(&json!({ "errors": [] })));
        assert!(!has_errors(&json!({ "payload": {} })));
        assert!(!has_errors(&Value::Null));
    }
}

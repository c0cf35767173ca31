//! Domain entities mirrored from the record store, plus the closed
//! string-valued vocabularies shared with SP-API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a closed string enum with `as_str`/`parse` for its wire values.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Listing condition as SP-API spells it.
    ProductCondition {
        NewItem => "NewItem",
        NewWithWarranty => "NewWithWarranty",
        NewOem => "NewOEM",
        NewOpenBox => "NewOpenBox",
        UsedLikeNew => "UsedLikeNew",
        UsedVeryGood => "UsedVeryGood",
        UsedGood => "UsedGood",
        UsedAcceptable => "UsedAcceptable",
        UsedPoor => "UsedPoor",
        Refurbished => "Refurbished",
        CollectibleLikeNew => "CollectibleLikeNew",
        CollectibleVeryGood => "CollectibleVeryGood",
        CollectibleGood => "CollectibleGood",
        CollectibleAcceptable => "CollectibleAcceptable",
    }
);

wire_enum!(
    ShipmentStatus {
        Working => "WORKING",
        ReadyToShip => "READY_TO_SHIP",
        Shipped => "SHIPPED",
        Receiving => "RECEIVING",
        Cancelled => "CANCELLED",
        Deleted => "DELETED",
        Closed => "CLOSED",
        Error => "ERROR",
        InTransit => "IN_TRANSIT",
        Delivered => "DELIVERED",
        CheckedIn => "CHECKED_IN",
    }
);

wire_enum!(
    LabelPrepType {
        NoLabel => "NO_LABEL",
        SellerLabel => "SELLER_LABEL",
        AmazonLabel => "AMAZON_LABEL",
    }
);

wire_enum!(
    PrepInstruction {
        Polybagging => "Polybagging",
        BubbleWrapping => "BubbleWrapping",
        Taping => "Taping",
        BlackShrinkWrapping => "BlackShrinkWrapping",
        Labeling => "Labeling",
        HangGarment => "HangGarment",
        SetCreation => "SetCreation",
        Boxing => "Boxing",
        RemoveFromHanger => "RemoveFromHanger",
        Debundle => "Debundle",
        SuffocationStickering => "SuffocationStickering",
        CapSealing => "CapSealing",
        SetStickering => "SetStickering",
        BlankStickering => "BlankStickering",
        NoPrep => "NoPrep",
    }
);

wire_enum!(
    PrepOwner {
        Amazon => "AMAZON",
        Seller => "SELLER",
    }
);

wire_enum!(
    ReportType {
        FbaInventory => "GET_FBA_MYI_UNSUPPRESSED_INVENTORY_DATA",
        FbaInventoryPlanning => "GET_FBA_INVENTORY_PLANNING_DATA",
        FbaInboundNoncompliance => "GET_FBA_FULFILLMENT_INBOUND_NONCOMPLIANCE_DATA",
        MerchantListings => "GET_MERCHANT_LISTINGS_ALL_DATA",
        FbaStorageFees => "GET_FBA_STORAGE_FEE_CHARGES_DATA",
    }
);

wire_enum!(
    ReportProcessingStatus {
        Cancelled => "CANCELLED",
        Done => "DONE",
        Fatal => "FATAL",
        InProgress => "IN_PROGRESS",
        InQueue => "IN_QUEUE",
    }
);

impl ReportProcessingStatus {
    /// Whether polling can stop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportProcessingStatus::Cancelled
                | ReportProcessingStatus::Done
                | ReportProcessingStatus::Fatal
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmazonCredentials {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: String,
    pub marketplace_id: String,
    pub refresh_token: String,
    pub access_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmazonCredentialsInput {
    pub seller_id: String,
    pub marketplace_id: String,
    pub refresh_token: String,
    pub access_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sku: String,
    pub asin: String,
    pub fnsku: Option<String>,
    pub title: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub condition: ProductCondition,
    pub cost: f64,
    pub price: f64,
    pub quantity: i64,
    pub weight_lb: Option<f64>,
    pub length_in: Option<f64>,
    pub width_in: Option<f64>,
    pub height_in: Option<f64>,
    pub prep_instructions: Vec<PrepInstruction>,
    pub label_prep_type: LabelPrepType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields as supplied on create. The owning user is passed separately
/// so a draft (e.g. one imported from the catalog) can exist before an owner is
/// known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInput {
    pub sku: String,
    pub asin: String,
    pub fnsku: Option<String>,
    pub title: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub condition: ProductCondition,
    pub cost: f64,
    pub price: f64,
    pub quantity: i64,
    pub weight_lb: Option<f64>,
    pub length_in: Option<f64>,
    pub width_in: Option<f64>,
    pub height_in: Option<f64>,
    pub prep_instructions: Vec<PrepInstruction>,
    pub label_prep_type: LabelPrepType,
}

impl ProductInput {
    /// A product with only identifiers set and every other field defaulted.
    pub fn new(sku: impl Into<String>, asin: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            asin: asin.into(),
            fnsku: None,
            title: String::new(),
            brand: None,
            image_url: None,
            condition: ProductCondition::NewItem,
            cost: 0.0,
            price: 0.0,
            quantity: 0,
            weight_lb: None,
            length_in: None,
            width_in: None,
            height_in: None,
            prep_instructions: Vec::new(),
            label_prep_type: LabelPrepType::SellerLabel,
        }
    }
}

/// Keeps an explicit JSON `null` as `Some(None)` so partial updates can tell
/// "clear this column" apart from an absent field. Pair with `#[serde(default)]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial product update; `None` leaves the stored value untouched. Nullable
/// columns take `Some(None)` to clear them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub asin: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub fnsku: Option<Option<String>>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub brand: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
    pub condition: Option<ProductCondition>,
    pub cost: Option<f64>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub weight_lb: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub length_in: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub width_in: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub height_in: Option<Option<f64>>,
    pub prep_instructions: Option<Vec<PrepInstruction>>,
    pub label_prep_type: Option<LabelPrepType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleComponent {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub sku: String,
    pub components: Vec<BundleComponent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleInput {
    pub name: String,
    pub sku: String,
    pub components: Vec<BundleComponent>,
}

/// `components`, when set, replaces the whole list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BundleUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub components: Option<Vec<BundleComponent>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Identifier Amazon assigned when the plan was accepted.
    pub shipment_id: Option<String>,
    pub plan_id: Option<Uuid>,
    pub status: ShipmentStatus,
    pub destination_fulfillment_center_id: Option<String>,
    pub label_prep_type: LabelPrepType,
    pub ship_from_address_id: Option<Uuid>,
    pub box_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentInput {
    pub name: String,
    pub shipment_id: Option<String>,
    pub plan_id: Option<Uuid>,
    pub status: ShipmentStatus,
    pub destination_fulfillment_center_id: Option<String>,
    pub label_prep_type: LabelPrepType,
    pub ship_from_address_id: Option<Uuid>,
    pub box_count: i64,
}

impl ShipmentInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shipment_id: None,
            plan_id: None,
            status: ShipmentStatus::Working,
            destination_fulfillment_center_id: None,
            label_prep_type: LabelPrepType::SellerLabel,
            ship_from_address_id: None,
            box_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub shipment_id: Option<Option<String>>,
    pub status: Option<ShipmentStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub destination_fulfillment_center_id: Option<Option<String>>,
    pub label_prep_type: Option<LabelPrepType>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub ship_from_address_id: Option<Option<Uuid>>,
    pub box_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipment_id: Uuid,
    pub product_id: Option<Uuid>,
    pub sku: String,
    pub fnsku: Option<String>,
    pub quantity_shipped: i64,
    pub quantity_received: i64,
    pub prep_owner: PrepOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentItemInput {
    pub product_id: Option<Uuid>,
    pub sku: String,
    pub fnsku: Option<String>,
    pub quantity_shipped: i64,
    pub prep_owner: PrepOwner,
}

/// Counts and labelling details that change as a shipment is packed and
/// received.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentItemUpdate {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub fnsku: Option<Option<String>>,
    pub quantity_shipped: Option<i64>,
    pub quantity_received: Option<i64>,
    pub prep_owner: Option<PrepOwner>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanItem {
    pub sku: String,
    pub asin: Option<String>,
    pub condition: ProductCondition,
    pub quantity: i64,
    pub prep_owner: PrepOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub ship_from_address_id: Option<Uuid>,
    pub label_prep_type: LabelPrepType,
    pub items: Vec<PlanItem>,
    /// Outcome of the last prep-instruction validation, if one ran.
    pub is_valid: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentPlanInput {
    pub name: String,
    pub ship_from_address_id: Option<Uuid>,
    pub label_prep_type: LabelPrepType,
    pub items: Vec<PlanItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentPlanUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub ship_from_address_id: Option<Option<Uuid>>,
    pub label_prep_type: Option<LabelPrepType>,
    pub items: Option<Vec<PlanItem>>,
    pub is_valid: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state_or_province_code: String,
    pub postal_code: String,
    pub country_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressInput {
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state_or_province_code: String,
    pub postal_code: String,
    pub country_code: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AddressUpdate {
    pub name: Option<String>,
    pub address_line1: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub address_line2: Option<Option<String>>,
    pub city: Option<String>,
    pub state_or_province_code: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Identifier Amazon returned from createReport.
    pub report_id: String,
    pub report_type: ReportType,
    pub processing_status: ReportProcessingStatus,
    pub report_document_id: Option<String>,
    pub marketplace_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalSettings {
    pub id: Uuid,
    pub user_id: Uuid,
    pub default_marketplace_id: String,
    pub default_prep_owner: PrepOwner,
    pub default_label_prep_type: LabelPrepType,
    pub default_ship_from_address_id: Option<Uuid>,
    pub low_stock_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalSettingsInput {
    pub default_marketplace_id: String,
    pub default_prep_owner: PrepOwner,
    pub default_label_prep_type: LabelPrepType,
    pub default_ship_from_address_id: Option<Uuid>,
    pub low_stock_threshold: i64,
}

impl Default for GlobalSettingsInput {
    fn default() -> Self {
        Self {
            default_marketplace_id: "ATVPDKIKX0DER".into(),
            default_prep_owner: PrepOwner::Seller,
            default_label_prep_type: LabelPrepType::SellerLabel,
            default_ship_from_address_id: None,
            low_stock_threshold: 10,
        }
    }
}

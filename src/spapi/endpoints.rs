//! Parameter objects and one method per remote endpoint.
//!
//! Each method issues exactly one logical call and hands back the response
//! body as parsed JSON, untouched.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::{ApiRequest, SpApiClient, SpApiError};
use crate::model::{LabelPrepType, PrepOwner, ProductCondition, ReportType, ShipmentStatus};

const CATALOG: &str = "catalog/2022-04-01";
const INBOUND: &str = "fba/inbound/v0";
const REPORTS: &str = "reports/2021-06-30";

fn csv<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

fn push_list<S: AsRef<str>>(query: &mut Vec<(String, String)>, key: &str, values: &[S]) {
    if !values.is_empty() {
        query.push((key.to_string(), csv(values)));
    }
}

fn push_opt(query: &mut Vec<(String, String)>, key: &str, value: Option<impl ToString>) {
    if let Some(v) = value {
        query.push((key.to_string(), v.to_string()));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSearchParams {
    pub keywords: Vec<String>,
    pub identifiers: Vec<String>,
    pub identifiers_type: Option<String>,
    pub marketplace_ids: Vec<String>,
    pub included_data: Vec<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl CatalogSearchParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        push_list(&mut q, "marketplaceIds", &self.marketplace_ids);
        push_list(&mut q, "keywords", &self.keywords);
        push_list(&mut q, "identifiers", &self.identifiers);
        push_opt(&mut q, "identifiersType", self.identifiers_type.as_deref());
        push_list(&mut q, "includedData", &self.included_data);
        push_opt(&mut q, "pageSize", self.page_size);
        push_opt(&mut q, "pageToken", self.page_token.as_deref());
        q
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogItemParams {
    pub asin: String,
    pub marketplace_ids: Vec<String>,
    pub included_data: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AddressBody {
    pub name: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state_or_province_code: String,
    pub postal_code: String,
    pub country_code: String,
}

impl From<&crate::model::Address> for AddressBody {
    fn from(a: &crate::model::Address) -> Self {
        Self {
            name: a.name.clone(),
            address_line1: a.address_line1.clone(),
            address_line2: a.address_line2.clone(),
            city: a.city.clone(),
            state_or_province_code: a.state_or_province_code.clone(),
            postal_code: a.postal_code.clone(),
            country_code: a.country_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PrepDetails {
    pub prep_instruction: crate::model::PrepInstruction,
    pub prep_owner: PrepOwner,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PlanRequestItem {
    #[serde(rename = "SellerSKU")]
    pub seller_sku: String,
    #[serde(rename = "ASIN", skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
    pub condition: ProductCondition,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prep_details_list: Vec<PrepDetails>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateInboundShipmentPlanParams {
    pub ship_from_address: AddressBody,
    pub label_prep_preference: String,
    pub ship_to_country_code: String,
    pub inbound_shipment_plan_request_items: Vec<PlanRequestItem>,
}

impl CreateInboundShipmentPlanParams {
    /// SP-API spells label preferences differently from the label type enum.
    pub fn label_preference(label: LabelPrepType) -> &'static str {
        match label {
            LabelPrepType::NoLabel | LabelPrepType::SellerLabel => "SELLER_LABEL",
            LabelPrepType::AmazonLabel => "AMAZON_LABEL_ONLY",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InboundShipmentHeader {
    pub shipment_name: String,
    pub ship_from_address: AddressBody,
    pub destination_fulfillment_center_id: String,
    pub label_prep_preference: String,
    pub shipment_status: ShipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_box_contents_source: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InboundShipmentItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
    #[serde(rename = "SellerSKU")]
    pub seller_sku: String,
    pub quantity_shipped: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prep_details_list: Vec<PrepDetails>,
}

/// Body shared by createInboundShipment and updateInboundShipment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InboundShipmentParams {
    #[serde(skip)]
    pub shipment_id: String,
    #[serde(rename = "InboundShipmentHeader")]
    pub header: InboundShipmentHeader,
    #[serde(rename = "InboundShipmentItems")]
    pub items: Vec<InboundShipmentItem>,
    #[serde(rename = "MarketplaceId")]
    pub marketplace_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentQuery {
    Shipment {
        statuses: Vec<ShipmentStatus>,
        shipment_ids: Vec<String>,
    },
    DateRange {
        last_updated_after: String,
        last_updated_before: String,
    },
    NextToken(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetShipmentsParams {
    pub marketplace_id: String,
    pub query: ShipmentQuery,
}

impl GetShipmentsParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = vec![("MarketplaceId".to_string(), self.marketplace_id.clone())];
        match &self.query {
            ShipmentQuery::Shipment {
                statuses,
                shipment_ids,
            } => {
                q.push(("QueryType".into(), "SHIPMENT".into()));
                let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
                push_list(&mut q, "ShipmentStatusList", &statuses);
                push_list(&mut q, "ShipmentIdList", shipment_ids);
            }
            ShipmentQuery::DateRange {
                last_updated_after,
                last_updated_before,
            } => {
                q.push(("QueryType".into(), "DATE_RANGE".into()));
                q.push(("LastUpdatedAfter".into(), last_updated_after.clone()));
                q.push(("LastUpdatedBefore".into(), last_updated_before.clone()));
            }
            ShipmentQuery::NextToken(token) => {
                q.push(("QueryType".into(), "NEXT_TOKEN".into()));
                q.push(("NextToken".into(), token.clone()));
            }
        }
        q
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetShipmentItemsParams {
    pub shipment_id: String,
    pub marketplace_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetLabelsParams {
    pub shipment_id: String,
    pub page_type: String,
    pub label_type: String,
    pub number_of_packages: Option<u32>,
    pub package_labels_to_print: Vec<String>,
}

impl GetLabelsParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = vec![
            ("PageType".to_string(), self.page_type.clone()),
            ("LabelType".to_string(), self.label_type.clone()),
        ];
        push_opt(&mut q, "NumberOfPackages", self.number_of_packages);
        push_list(&mut q, "PackageLabelsToPrint", &self.package_labels_to_print);
        q
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepInstructionsParams {
    pub ship_to_country_code: String,
    pub seller_sku_list: Vec<String>,
    pub asin_list: Vec<String>,
}

impl PrepInstructionsParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = vec![("ShipToCountryCode".to_string(), self.ship_to_country_code.clone())];
        push_list(&mut q, "SellerSKUList", &self.seller_sku_list);
        push_list(&mut q, "ASINList", &self.asin_list);
        q
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportParams {
    pub report_type: ReportType,
    pub marketplace_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_end_time: Option<String>,
}

impl SpApiClient {
    pub async fn search_catalog_items(
        &self,
        params: &CatalogSearchParams,
    ) -> Result<Value, SpApiError> {
        self.send(ApiRequest::get(format!("{CATALOG}/items")).with_query(params.to_query()))
            .await
    }

    pub async fn get_catalog_item(&self, params: &CatalogItemParams) -> Result<Value, SpApiError> {
        let mut q = Vec::new();
        push_list(&mut q, "marketplaceIds", &params.marketplace_ids);
        push_list(&mut q, "includedData", &params.included_data);
        self.send(ApiRequest::get(format!("{CATALOG}/items/{}", params.asin)).with_query(q))
            .await
    }

    pub async fn create_inbound_shipment_plan(
        &self,
        params: &CreateInboundShipmentPlanParams,
    ) -> Result<Value, SpApiError> {
        self.send(ApiRequest::post(
            format!("{INBOUND}/plans"),
            serde_json::to_value(params)?,
        ))
        .await
    }

    pub async fn create_inbound_shipment(
        &self,
        params: &InboundShipmentParams,
    ) -> Result<Value, SpApiError> {
        self.send(ApiRequest::post(
            format!("{INBOUND}/shipments/{}", params.shipment_id),
            serde_json::to_value(params)?,
        ))
        .await
    }

    pub async fn update_inbound_shipment(
        &self,
        params: &InboundShipmentParams,
    ) -> Result<Value, SpApiError> {
        self.send(ApiRequest::put(
            format!("{INBOUND}/shipments/{}", params.shipment_id),
            serde_json::to_value(params)?,
        ))
        .await
    }

    pub async fn get_shipments(&self, params: &GetShipmentsParams) -> Result<Value, SpApiError> {
        self.send(ApiRequest::get(format!("{INBOUND}/shipments")).with_query(params.to_query()))
            .await
    }

    pub async fn get_shipment_items(
        &self,
        params: &GetShipmentItemsParams,
    ) -> Result<Value, SpApiError> {
        let q = vec![("MarketplaceId".to_string(), params.marketplace_id.clone())];
        self.send(
            ApiRequest::get(format!("{INBOUND}/shipments/{}/items", params.shipment_id))
                .with_query(q),
        )
        .await
    }

    pub async fn get_labels(&self, params: &GetLabelsParams) -> Result<Value, SpApiError> {
        self.send(
            ApiRequest::get(format!("{INBOUND}/shipments/{}/labels", params.shipment_id))
                .with_query(params.to_query()),
        )
        .await
    }

    pub async fn get_prep_instructions(
        &self,
        params: &PrepInstructionsParams,
    ) -> Result<Value, SpApiError> {
        self.send(
            ApiRequest::get(format!("{INBOUND}/prepInstructions")).with_query(params.to_query()),
        )
        .await
    }

    pub async fn create_report(&self, params: &CreateReportParams) -> Result<Value, SpApiError> {
        self.send(ApiRequest::post(
            format!("{REPORTS}/reports"),
            serde_json::to_value(params)?,
        ))
        .await
    }

    pub async fn get_report(&self, report_id: &str) -> Result<Value, SpApiError> {
        self.send(ApiRequest::get(format!("{REPORTS}/reports/{report_id}")))
            .await
    }

    pub async fn get_report_document(&self, report_document_id: &str) -> Result<Value, SpApiError> {
        self.send(ApiRequest::get(format!(
            "{REPORTS}/documents/{report_document_id}"
        )))
        .await
    }

    /// Fetch the raw report contents from a document's pre-signed URL.
    pub async fn download_report(&self, document_url: &str) -> Result<String, SpApiError> {
        self.limiter.wait().await;
        let request = self
            .http
            .request(Method::GET, document_url)
            .build()?;
        let response = self.transport.execute(request).await?;
        if !response.status.is_success() {
            return Err(SpApiError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrepInstruction;

    #[test]
    fn catalog_search_query_uses_comma_lists() {
        let params = CatalogSearchParams {
            keywords: vec!["usb".into(), "cable".into()],
            marketplace_ids: vec!["ATVPDKIKX0DER".into()],
            included_data: vec!["summaries".into(), "images".into()],
            page_size: Some(10),
            ..Default::default()
        };
        let q = params.to_query();
        assert!(q.contains(&("keywords".into(), "usb,cable".into())));
        assert!(q.contains(&("includedData".into(), "summaries,images".into())));
        assert!(q.contains(&("pageSize".into(), "10".into())));
        assert!(!q.iter().any(|(k, _)| k == "identifiers"));
    }

    #[test]
    fn plan_body_uses_sp_api_casing() {
        let params = CreateInboundShipmentPlanParams {
            ship_from_address: AddressBody {
                name: "WH".into(),
                address_line1: "1 Dock St".into(),
                address_line2: None,
                city: "Reno".into(),
                state_or_province_code: "NV".into(),
                postal_code: "89501".into(),
                country_code: "US".into(),
            },
            label_prep_preference: CreateInboundShipmentPlanParams::label_preference(
                LabelPrepType::AmazonLabel,
            )
            .into(),
            ship_to_country_code: "US".into(),
            inbound_shipment_plan_request_items: vec![PlanRequestItem {
                seller_sku: "SKU-1".into(),
                asin: Some("B000000001".into()),
                condition: ProductCondition::NewItem,
                quantity: 10,
                prep_details_list: vec![PrepDetails {
                    prep_instruction: PrepInstruction::Polybagging,
                    prep_owner: PrepOwner::Seller,
                }],
            }],
        };
        let body = serde_json::to_value(&params).unwrap();
        assert_eq!(body["ShipFromAddress"]["AddressLine1"], "1 Dock St");
        assert!(body["ShipFromAddress"].get("AddressLine2").is_none());
        assert_eq!(body["LabelPrepPreference"], "AMAZON_LABEL_ONLY");
        let item = &body["InboundShipmentPlanRequestItems"][0];
        assert_eq!(item["SellerSKU"], "SKU-1");
        assert_eq!(item["ASIN"], "B000000001");
        assert_eq!(item["PrepDetailsList"][0]["PrepOwner"], "SELLER");
    }

    #[test]
    fn shipment_body_omits_path_id() {
        let params = InboundShipmentParams {
            shipment_id: "FBA15ABC".into(),
            header: InboundShipmentHeader {
                shipment_name: "Inbound #1".into(),
                ship_from_address: AddressBody {
                    name: "WH".into(),
                    address_line1: "1 Dock St".into(),
                    address_line2: None,
                    city: "Reno".into(),
                    state_or_province_code: "NV".into(),
                    postal_code: "89501".into(),
                    country_code: "US".into(),
                },
                destination_fulfillment_center_id: "RNO4".into(),
                label_prep_preference: "SELLER_LABEL".into(),
                shipment_status: ShipmentStatus::Working,
                intended_box_contents_source: None,
            },
            items: vec![],
            marketplace_id: "ATVPDKIKX0DER".into(),
        };
        let body = serde_json::to_value(&params).unwrap();
        assert!(body.get("shipment_id").is_none());
        assert_eq!(body["InboundShipmentHeader"]["ShipmentStatus"], "WORKING");
        assert_eq!(body["MarketplaceId"], "ATVPDKIKX0DER");
    }

    #[test]
    fn shipments_query_variants() {
        let params = GetShipmentsParams {
            marketplace_id: "M".into(),
            query: ShipmentQuery::Shipment {
                statuses: vec![ShipmentStatus::Working, ShipmentStatus::Shipped],
                shipment_ids: vec![],
            },
        };
        let q = params.to_query();
        assert!(q.contains(&("QueryType".into(), "SHIPMENT".into())));
        assert!(q.contains(&("ShipmentStatusList".into(), "WORKING,SHIPPED".into())));

        let next = GetShipmentsParams {
            marketplace_id: "M".into(),
            query: ShipmentQuery::NextToken("tok".into()),
        };
        assert!(next.to_query().contains(&("NextToken".into(), "tok".into())));
    }

    #[test]
    fn report_body_is_camel_case() {
        let body = serde_json::to_value(CreateReportParams {
            report_type: ReportType::FbaInventory,
            marketplace_ids: vec!["ATVPDKIKX0DER".into()],
            data_start_time: None,
            data_end_time: None,
        })
        .unwrap();
        assert_eq!(body["reportType"], "GET_FBA_MYI_UNSUPPRESSED_INVENTORY_DATA");
        assert_eq!(body["marketplaceIds"][0], "ATVPDKIKX0DER");
        assert!(body.get("dataStartTime").is_none());
    }
}

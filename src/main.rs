use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use fba_wms::config::{self, Config};
use fba_wms::db::{self, Pool};
use fba_wms::model::{
    AmazonCredentials, AmazonCredentialsInput, LabelPrepType, PlanItem, PrepOwner,
    ProductCondition, ReportProcessingStatus, ReportType, ShipmentPlanInput, ShipmentPlanUpdate,
    User,
};
use fba_wms::spapi::{CreateReportParams, Credentials, SpApiClient};
use fba_wms::state::AppState;

#[derive(Debug, Parser)]
#[command(author, version, about = "FBA warehouse manager")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database file and apply migrations
    InitDb,
    /// Register the account if needed and store its Amazon credentials
    SetCredentials {
        #[arg(long)]
        email: String,
        #[arg(long)]
        seller_id: String,
        #[arg(long)]
        marketplace_id: String,
        #[arg(long)]
        refresh_token: String,
    },
    /// Store a shipment plan; items are given as SKU=QUANTITY
    CreatePlan {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long = "item", value_parser = parse_plan_item, required = true)]
        items: Vec<PlanItem>,
    },
    /// Look up an ASIN in the catalog and store it as a product
    ImportProduct {
        #[arg(long)]
        email: String,
        #[arg(long)]
        asin: String,
    },
    /// Check prep instructions for every item of a stored plan
    ValidatePlan {
        #[arg(long)]
        email: String,
        #[arg(long)]
        plan_id: Uuid,
    },
    /// Ask Amazon to generate a report
    RequestReport {
        #[arg(long)]
        email: String,
        #[arg(long, value_parser = parse_report_type)]
        report_type: ReportType,
    },
    /// Poll a requested report; prints the document once it is done
    ReportStatus {
        #[arg(long)]
        email: String,
        #[arg(long)]
        report_id: String,
    },
}

fn parse_report_type(raw: &str) -> Result<ReportType, String> {
    ReportType::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ReportType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown report type; expected one of {}", known.join(", "))
    })
}

fn parse_plan_item(raw: &str) -> Result<PlanItem, String> {
    let (sku, quantity) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SKU=QUANTITY, got {raw:?}"))?;
    let sku = sku.trim();
    if sku.is_empty() {
        return Err(format!("missing SKU in {raw:?}"));
    }
    let quantity: i64 = quantity
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in {raw:?}"))?;
    if quantity <= 0 {
        return Err(format!("quantity must be positive in {raw:?}"));
    }
    Ok(PlanItem {
        sku: sku.to_string(),
        asin: None,
        condition: ProductCondition::NewItem,
        quantity,
        prep_owner: PrepOwner::Seller,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("loading {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;

    match args.command {
        Command::InitDb => {
            info!(url = %cfg.database_url(), "database ready");
        }
        Command::SetCredentials {
            email,
            seller_id,
            marketplace_id,
            refresh_token,
        } => {
            let mut state = AppState::default();
            let user = state.auth.sign_in(&pool, &email, None).await?;
            let input = AmazonCredentialsInput {
                seller_id,
                marketplace_id,
                refresh_token,
                access_token: None,
                token_expires_at: None,
            };
            let saved = state.auth.save_credentials(&pool, user.id, &input).await?;
            info!(user_id = %user.id, seller_id = %saved.seller_id, "stored Amazon credentials");
            println!("{}", user.id);
        }
        Command::CreatePlan { email, name, items } => {
            let mut state = AppState::default();
            let user = existing_user(&mut state, &pool, &email).await?;
            let label_prep_type = state
                .settings
                .fetch_settings(&pool, user.id)
                .await?
                .map(|s| s.default_label_prep_type)
                .unwrap_or(LabelPrepType::SellerLabel);
            let input = ShipmentPlanInput {
                name,
                ship_from_address_id: None,
                label_prep_type,
                items,
            };
            let plan = state.shipments.create_plan(&pool, user.id, &input).await?;
            info!(plan_id = %plan.id, items = plan.items.len(), "created shipment plan");
            println!("{}", plan.id);
        }
        Command::ImportProduct { email, asin } => {
            let mut session = Session::open(&pool, &cfg, &email).await?;
            let draft = session
                .client
                .import_product_from_amazon(&asin, &session.credentials.marketplace_id)
                .await
                .with_context(|| format!("catalog lookup for {asin}"))?;
            let product = session
                .state
                .products
                .create_product(&pool, session.user_id, &draft)
                .await?;
            session.persist_token(&pool).await?;
            info!(id = %product.id, sku = %product.sku, "imported product");
            println!("{}", serde_json::to_string_pretty(&product)?);
        }
        Command::ValidatePlan { email, plan_id } => {
            let mut session = Session::open(&pool, &cfg, &email).await?;
            let plan = db::plans::get_plan(&pool, session.user_id, plan_id)
                .await?
                .ok_or_else(|| anyhow!("shipment plan {plan_id} not found"))?;
            let valid = session
                .client
                .validate_shipment_plan(&plan, &cfg.spapi.ship_to_country_code)
                .await?;
            let update = ShipmentPlanUpdate {
                is_valid: Some(valid),
                ..ShipmentPlanUpdate::default()
            };
            session
                .state
                .shipments
                .update_plan(&pool, session.user_id, plan_id, &update)
                .await?;
            session.persist_token(&pool).await?;
            println!("{}", if valid { "valid" } else { "invalid" });
        }
        Command::RequestReport { email, report_type } => {
            let session = Session::open(&pool, &cfg, &email).await?;
            let marketplace_ids = vec![session.credentials.marketplace_id.clone()];
            let response = session
                .client
                .create_report(&CreateReportParams {
                    report_type,
                    marketplace_ids: marketplace_ids.clone(),
                    data_start_time: None,
                    data_end_time: None,
                })
                .await?;
            let report_id = str_field(&response, "reportId")
                .ok_or_else(|| anyhow!("createReport response carried no reportId"))?;
            let report = db::reports::insert_report(
                &pool,
                session.user_id,
                report_id,
                report_type,
                &marketplace_ids,
            )
            .await?;
            session.persist_token(&pool).await?;
            info!(report_id = %report.report_id, %report_type, "report requested");
            println!("{}", report.report_id);
        }
        Command::ReportStatus { email, report_id } => {
            let session = Session::open(&pool, &cfg, &email).await?;
            let response = session.client.get_report(&report_id).await?;
            let status = str_field(&response, "processingStatus")
                .and_then(ReportProcessingStatus::parse)
                .ok_or_else(|| anyhow!("getReport response carried no processingStatus"))?;
            let document_id = str_field(&response, "reportDocumentId");

            if db::reports::update_report_status(
                &pool,
                session.user_id,
                &report_id,
                status,
                document_id,
            )
            .await?
            .is_none()
            {
                warn!(%report_id, "report was not requested through this store");
            }

            match (status, document_id) {
                (ReportProcessingStatus::Done, Some(document_id)) => {
                    let document = session.client.get_report_document(document_id).await?;
                    if let Some(algorithm) = str_field(&document, "compressionAlgorithm") {
                        bail!("report document is {algorithm}-compressed; download it directly");
                    }
                    let url = str_field(&document, "url")
                        .ok_or_else(|| anyhow!("report document carried no url"))?;
                    let contents = session.client.download_report(url).await?;
                    session.persist_token(&pool).await?;
                    print!("{contents}");
                }
                _ if status.is_terminal() => {
                    session.persist_token(&pool).await?;
                    bail!("report {report_id} finished as {status} without a document");
                }
                _ => {
                    session.persist_token(&pool).await?;
                    info!(%report_id, %status, "report still processing");
                    println!("{status}");
                }
            }
        }
    }

    Ok(())
}

/// A signed-in user together with an API client holding their credentials.
struct Session {
    state: AppState,
    user_id: Uuid,
    credentials: AmazonCredentials,
    client: SpApiClient,
}

impl Session {
    async fn open(pool: &Pool, cfg: &Config, email: &str) -> Result<Self> {
        let mut state = AppState::default();
        let user = existing_user(&mut state, pool, email).await?;
        let credentials = state
            .auth
            .fetch_credentials(pool, user.id)
            .await?
            .ok_or_else(|| {
                anyhow!("no Amazon credentials stored for {email}; run set-credentials")
            })?;

        let client = SpApiClient::new(&cfg.spapi)?;
        let held = Credentials::from(&credentials);
        let expired = held.is_expired();
        client.set_credentials(held).await;
        if expired {
            info!("stored access token expired; refreshing before the first call");
            client.refresh_access_token().await?;
        }
        Ok(Self {
            state,
            user_id: user.id,
            credentials,
            client,
        })
    }

    /// Write back an access token the client obtained during this session.
    async fn persist_token(&self, pool: &Pool) -> Result<()> {
        let held = self.client.credentials().await;
        if let (Some(token), Some(expires_at)) = (held.access_token, held.expires_at) {
            if self.credentials.access_token.as_deref() != Some(token.as_str()) {
                db::credentials::update_access_token(pool, self.user_id, &token, expires_at)
                    .await?;
                info!(%expires_at, "stored refreshed access token");
            }
        }
        Ok(())
    }
}

/// Sign in an account that already exists; unknown emails are an error.
async fn existing_user(state: &mut AppState, pool: &Pool, email: &str) -> Result<User> {
    state
        .auth
        .sign_in_existing(pool, email)
        .await?
        .ok_or_else(|| anyhow!("no account for {email}; run set-credentials first"))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .or_else(|| value.get("payload").and_then(|p| p.get(key)))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_items_parse_from_sku_quantity_pairs() {
        let item = parse_plan_item("MUG-RED = 24").unwrap();
        assert_eq!(item.sku, "MUG-RED");
        assert_eq!(item.quantity, 24);
        assert_eq!(item.prep_owner, PrepOwner::Seller);

        assert!(parse_plan_item("MUG-RED").is_err());
        assert!(parse_plan_item("=3").is_err());
        assert!(parse_plan_item("MUG-RED=0").is_err());
        assert!(parse_plan_item("MUG-RED=lots").is_err());
    }

    #[test]
    fn setup_subcommands_parse() {
        let args = Args::try_parse_from([
            "fba-wms",
            "set-credentials",
            "--email",
            "ops@example.com",
            "--seller-id",
            "A1SELLER",
            "--marketplace-id",
            "ATVPDKIKX0DER",
            "--refresh-token",
            "Atzr|x",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::SetCredentials { ref seller_id, .. } if seller_id == "A1SELLER"
        ));

        let args = Args::try_parse_from([
            "fba-wms",
            "create-plan",
            "--email",
            "ops@example.com",
            "--name",
            "Restock",
            "--item",
            "A=2",
            "--item",
            "B=5",
        ])
        .unwrap();
        match args.command {
            Command::CreatePlan { items, .. } => {
                let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
                assert_eq!(skus, ["A", "B"]);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Args::try_parse_from([
            "fba-wms",
            "create-plan",
            "--email",
            "ops@example.com",
            "--name",
            "Restock",
        ])
        .is_err());
    }
}

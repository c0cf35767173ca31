use uuid::Uuid;

use super::{replace_by_id, run_thunk, RequestStatus, Slice};
use crate::db::{bundles, products, Pool, StoreError};
use crate::model::{Bundle, BundleInput, BundleUpdate, Product, ProductInput, ProductUpdate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductsState {
    pub products: Vec<Product>,
    pub bundles: Vec<Bundle>,
    pub selected: Option<Uuid>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductsAction {
    ProductsLoaded(Vec<Product>),
    ProductCreated(Product),
    ProductUpdated(Product),
    ProductDeleted(Uuid),
    Selected(Option<Uuid>),
    BundlesLoaded(Vec<Bundle>),
    BundleCreated(Bundle),
    BundleUpdated(Bundle),
    BundleDeleted(Uuid),
}

impl Slice for ProductsState {
    type Action = ProductsAction;

    fn reduce(&mut self, action: ProductsAction) {
        match action {
            ProductsAction::ProductsLoaded(products) => self.products = products,
            ProductsAction::ProductCreated(product) => self.products.push(product),
            ProductsAction::ProductUpdated(product) => {
                replace_by_id(&mut self.products, product, |p| p.id)
            }
            ProductsAction::ProductDeleted(id) => {
                self.products.retain(|p| p.id != id);
                if self.selected == Some(id) {
                    self.selected = None;
                }
            }
            ProductsAction::Selected(id) => self.selected = id,
            ProductsAction::BundlesLoaded(bundles) => self.bundles = bundles,
            ProductsAction::BundleCreated(bundle) => self.bundles.push(bundle),
            ProductsAction::BundleUpdated(bundle) => {
                replace_by_id(&mut self.bundles, bundle, |b| b.id)
            }
            ProductsAction::BundleDeleted(id) => self.bundles.retain(|b| b.id != id),
        }
    }

    fn status_mut(&mut self) -> &mut RequestStatus {
        &mut self.status
    }
}

impl ProductsState {
    pub fn selected_product(&self) -> Option<&Product> {
        let id = self.selected?;
        self.products.iter().find(|p| p.id == id)
    }

    pub fn select_product(&mut self, id: Option<Uuid>) {
        self.reduce(ProductsAction::Selected(id));
    }

    pub async fn fetch_products(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Vec<Product>, StoreError> {
        run_thunk(
            self,
            "fetch_products",
            products::list_products(pool, user_id),
            ProductsAction::ProductsLoaded,
        )
        .await
    }

    pub async fn create_product(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &ProductInput,
    ) -> Result<Product, StoreError> {
        run_thunk(
            self,
            "create_product",
            products::insert_product(pool, user_id, input),
            ProductsAction::ProductCreated,
        )
        .await
    }

    pub async fn update_product(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
        update: &ProductUpdate,
    ) -> Result<Product, StoreError> {
        run_thunk(
            self,
            "update_product",
            products::update_product(pool, user_id, id, update),
            ProductsAction::ProductUpdated,
        )
        .await
    }

    pub async fn delete_product(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(), StoreError> {
        run_thunk(
            self,
            "delete_product",
            products::delete_product(pool, user_id, id),
            move |()| ProductsAction::ProductDeleted(id),
        )
        .await
    }

    pub async fn fetch_bundles(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Vec<Bundle>, StoreError> {
        run_thunk(
            self,
            "fetch_bundles",
            bundles::list_bundles(pool, user_id),
            ProductsAction::BundlesLoaded,
        )
        .await
    }

    pub async fn create_bundle(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &BundleInput,
    ) -> Result<Bundle, StoreError> {
        run_thunk(
            self,
            "create_bundle",
            bundles::insert_bundle(pool, user_id, input),
            ProductsAction::BundleCreated,
        )
        .await
    }

    pub async fn update_bundle(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
        update: &BundleUpdate,
    ) -> Result<Bundle, StoreError> {
        run_thunk(
            self,
            "update_bundle",
            bundles::update_bundle(pool, user_id, id, update),
            ProductsAction::BundleUpdated,
        )
        .await
    }

    pub async fn delete_bundle(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(), StoreError> {
        run_thunk(
            self,
            "delete_bundle",
            bundles::delete_bundle(pool, user_id, id),
            move |()| ProductsAction::BundleDeleted(id),
        )
        .await
    }
}

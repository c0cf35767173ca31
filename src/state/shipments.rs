use uuid::Uuid;

use super::{replace_by_id, run_thunk, RequestStatus, Slice};
use crate::db::{plans, shipments, Pool, StoreError};
use crate::model::{
    Shipment, ShipmentInput, ShipmentItem, ShipmentItemInput, ShipmentItemUpdate, ShipmentPlan,
    ShipmentPlanInput, ShipmentPlanUpdate, ShipmentUpdate,
};

/// Shipments and plans are kept newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentsState {
    pub shipments: Vec<Shipment>,
    pub selected: Option<Uuid>,
    /// Items of the most recently fetched shipment.
    pub items: Vec<ShipmentItem>,
    pub plans: Vec<ShipmentPlan>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentsAction {
    ShipmentsLoaded(Vec<Shipment>),
    ShipmentCreated(Shipment),
    ShipmentUpdated(Shipment),
    ShipmentDeleted(Uuid),
    Selected(Option<Uuid>),
    ItemsLoaded(Vec<ShipmentItem>),
    ItemAdded(ShipmentItem),
    ItemUpdated(ShipmentItem),
    ItemRemoved(Uuid),
    PlansLoaded(Vec<ShipmentPlan>),
    PlanCreated(ShipmentPlan),
    PlanUpdated(ShipmentPlan),
    PlanDeleted(Uuid),
}

impl Slice for ShipmentsState {
    type Action = ShipmentsAction;

    fn reduce(&mut self, action: ShipmentsAction) {
        match action {
            ShipmentsAction::ShipmentsLoaded(shipments) => self.shipments = shipments,
            ShipmentsAction::ShipmentCreated(shipment) => self.shipments.insert(0, shipment),
            ShipmentsAction::ShipmentUpdated(shipment) => {
                replace_by_id(&mut self.shipments, shipment, |s| s.id)
            }
            ShipmentsAction::ShipmentDeleted(id) => {
                self.shipments.retain(|s| s.id != id);
                self.items.retain(|i| i.shipment_id != id);
                if self.selected == Some(id) {
                    self.selected = None;
                }
            }
            ShipmentsAction::Selected(id) => self.selected = id,
            ShipmentsAction::ItemsLoaded(items) => self.items = items,
            ShipmentsAction::ItemAdded(item) => self.items.push(item),
            ShipmentsAction::ItemUpdated(item) => replace_by_id(&mut self.items, item, |i| i.id),
            ShipmentsAction::ItemRemoved(id) => self.items.retain(|i| i.id != id),
            ShipmentsAction::PlansLoaded(plans) => self.plans = plans,
            ShipmentsAction::PlanCreated(plan) => self.plans.insert(0, plan),
            ShipmentsAction::PlanUpdated(plan) => replace_by_id(&mut self.plans, plan, |p| p.id),
            ShipmentsAction::PlanDeleted(id) => self.plans.retain(|p| p.id != id),
        }
    }

    fn status_mut(&mut self) -> &mut RequestStatus {
        &mut self.status
    }
}

impl ShipmentsState {
    pub fn selected_shipment(&self) -> Option<&Shipment> {
        let id = self.selected?;
        self.shipments.iter().find(|s| s.id == id)
    }

    pub fn select_shipment(&mut self, id: Option<Uuid>) {
        self.reduce(ShipmentsAction::Selected(id));
    }

    pub async fn fetch_shipments(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Vec<Shipment>, StoreError> {
        run_thunk(
            self,
            "fetch_shipments",
            shipments::list_shipments(pool, user_id),
            ShipmentsAction::ShipmentsLoaded,
        )
        .await
    }

    pub async fn create_shipment(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &ShipmentInput,
    ) -> Result<Shipment, StoreError> {
        run_thunk(
            self,
            "create_shipment",
            shipments::insert_shipment(pool, user_id, input),
            ShipmentsAction::ShipmentCreated,
        )
        .await
    }

    pub async fn update_shipment(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
        update: &ShipmentUpdate,
    ) -> Result<Shipment, StoreError> {
        run_thunk(
            self,
            "update_shipment",
            shipments::update_shipment(pool, user_id, id, update),
            ShipmentsAction::ShipmentUpdated,
        )
        .await
    }

    pub async fn delete_shipment(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(), StoreError> {
        run_thunk(
            self,
            "delete_shipment",
            shipments::delete_shipment(pool, user_id, id),
            move |()| ShipmentsAction::ShipmentDeleted(id),
        )
        .await
    }

    pub async fn fetch_shipment_items(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<Vec<ShipmentItem>, StoreError> {
        run_thunk(
            self,
            "fetch_shipment_items",
            shipments::list_shipment_items(pool, user_id, shipment_id),
            ShipmentsAction::ItemsLoaded,
        )
        .await
    }

    pub async fn add_shipment_item(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        shipment_id: Uuid,
        input: &ShipmentItemInput,
    ) -> Result<ShipmentItem, StoreError> {
        run_thunk(
            self,
            "add_shipment_item",
            shipments::insert_shipment_item(pool, user_id, shipment_id, input),
            ShipmentsAction::ItemAdded,
        )
        .await
    }

    pub async fn update_shipment_item(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
        update: &ShipmentItemUpdate,
    ) -> Result<ShipmentItem, StoreError> {
        run_thunk(
            self,
            "update_shipment_item",
            shipments::update_shipment_item(pool, user_id, id, update),
            ShipmentsAction::ItemUpdated,
        )
        .await
    }

    pub async fn remove_shipment_item(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(), StoreError> {
        run_thunk(
            self,
            "remove_shipment_item",
            shipments::delete_shipment_item(pool, user_id, id),
            move |()| ShipmentsAction::ItemRemoved(id),
        )
        .await
    }

    pub async fn fetch_plans(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
    ) -> Result<Vec<ShipmentPlan>, StoreError> {
        run_thunk(
            self,
            "fetch_plans",
            plans::list_plans(pool, user_id),
            ShipmentsAction::PlansLoaded,
        )
        .await
    }

    pub async fn create_plan(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        input: &ShipmentPlanInput,
    ) -> Result<ShipmentPlan, StoreError> {
        run_thunk(
            self,
            "create_plan",
            plans::insert_plan(pool, user_id, input),
            ShipmentsAction::PlanCreated,
        )
        .await
    }

    pub async fn update_plan(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
        update: &ShipmentPlanUpdate,
    ) -> Result<ShipmentPlan, StoreError> {
        run_thunk(
            self,
            "update_plan",
            plans::update_plan(pool, user_id, id, update),
            ShipmentsAction::PlanUpdated,
        )
        .await
    }

    pub async fn delete_plan(
        &mut self,
        pool: &Pool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(), StoreError> {
        run_thunk(
            self,
            "delete_plan",
            plans::delete_plan(pool, user_id, id),
            move |()| ShipmentsAction::PlanDeleted(id),
        )
        .await
    }
}

use async_trait::async_trait;
use larder_core::{
    CatalogError, CatalogSearch, PantryError, PantryReconciler, PreferenceError, PreferenceStore,
    RetailerClient, RetailerError,
};
use larder_order::{Pipeline, PipelineError};
use larder_shared::{
    BrandPreference, CartItem, CartSummary, FulfillmentType, IngredientCategory, OrderPayload,
    PriceSensitivity, Product, Provenance, ShoppingListItem,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum SubmitBehaviour {
    Respond(Value),
    Fail,
}

struct MockRetailer {
    authenticated: AtomicBool,
    auth_fails: bool,
    auth_calls: AtomicUsize,
    network_calls: AtomicUsize,
    closed: AtomicBool,
    submit: SubmitBehaviour,
    submitted: Mutex<Vec<OrderPayload>>,
}

impl MockRetailer {
    fn responding(response: Value) -> Self {
        Self::new(SubmitBehaviour::Respond(response))
    }

    fn new(submit: SubmitBehaviour) -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            auth_fails: false,
            auth_calls: AtomicUsize::new(0),
            network_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            submit,
            submitted: Mutex::new(Vec::new()),
        }
    }

    fn rejecting_login() -> Self {
        Self {
            auth_fails: true,
            ..Self::responding(json!({}))
        }
    }

    fn submissions(&self) -> Vec<OrderPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetailerClient for MockRetailer {
    fn store_id(&self) -> &str {
        "1502"
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn authenticate(&self) -> Result<(), RetailerError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_fails {
            return Err(RetailerError::Authentication("invalid credentials".to_string()));
        }
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn search(&self, _query: &str, _rows: u32) -> Result<Value, RetailerError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({}))
    }

    async fn fulfillment_options(&self) -> Result<Value, RetailerError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        Err(RetailerError::Transport("fulfillment endpoint unavailable".to_string()))
    }

    async fn submit_order(&self, payload: &OrderPayload) -> Result<Value, RetailerError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(payload.clone());
        match &self.submit {
            SubmitBehaviour::Respond(response) => Ok(response.clone()),
            SubmitBehaviour::Fail => Err(RetailerError::Transport("connection reset by peer".to_string())),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CatalogTable(HashMap<String, Vec<Product>>);

impl CatalogTable {
    fn with(mut self, term: &str, product: Product) -> Self {
        self.0.insert(term.to_string(), vec![product]);
        self
    }
}

#[async_trait]
impl CatalogSearch for CatalogTable {
    async fn search_or_cached(&self, search_term: &str) -> Result<Vec<Product>, CatalogError> {
        self.search_products(search_term).await
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        Ok(self.0.get(query).cloned().unwrap_or_default())
    }
}

struct NoPreferences;

#[async_trait]
impl PreferenceStore for NoPreferences {
    async fn brands_for_ingredient(
        &self,
        _ingredient: &str,
        _category: IngredientCategory,
    ) -> Result<Vec<BrandPreference>, PreferenceError> {
        Ok(Vec::new())
    }

    async fn price_sensitivity(&self) -> Result<PriceSensitivity, PreferenceError> {
        Ok(PriceSensitivity::Moderate)
    }
}

#[derive(Default)]
struct RecordingPantry {
    fail: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl PantryReconciler for RecordingPantry {
    async fn mark_restocked(&self, ingredients: &[String]) -> Result<u32, PantryError> {
        self.calls.lock().unwrap().push(ingredients.to_vec());
        if self.fail {
            return Err(PantryError::Storage("database is locked".to_string()));
        }
        Ok(ingredients.len() as u32)
    }
}

fn pipeline(
    client: Arc<MockRetailer>,
    catalog: CatalogTable,
    pantry: Arc<RecordingPantry>,
) -> Pipeline {
    Pipeline::from_parts(client, Arc::new(catalog), Arc::new(NoPreferences), pantry, None)
}

fn item(name: &str) -> ShoppingListItem {
    ShoppingListItem::new(name, 1.0, "each", IngredientCategory::Dairy)
}

fn cart_item(name: &str, product_id: &str, cost: f64) -> CartItem {
    CartItem {
        shopping_list_item: item(name),
        product: Product::new(product_id, name, cost, ""),
        quantity_to_order: 1,
        estimated_cost: cost,
    }
}

fn cart(items: Vec<CartItem>, restock_items: Vec<CartItem>, estimated_total: f64) -> CartSummary {
    CartSummary {
        items,
        failed_items: vec![],
        substituted_items: vec![],
        skipped_items: vec![],
        restock_items,
        subtotal: estimated_total,
        fulfillment_options: vec![],
        recommended_fulfillment: FulfillmentType::Pickup,
        estimated_total,
    }
}

#[tokio::test]
async fn test_single_item_order_confirmed() {
    let client = Arc::new(MockRetailer::responding(
        json!({"orderId": "ORD-1", "status": "confirmed", "total": 8.99}),
    ));
    let catalog = CatalogTable::default().with("milk", Product::new("M1", "Whole Milk", 3.49, "1 gal"));
    let pantry = Arc::new(RecordingPantry::default());
    let pipeline = pipeline(client.clone(), catalog, pantry.clone());

    let result = pipeline.run(&[item("milk")], None).await.unwrap();

    assert!(result.success());
    let confirmation = result.confirmation().unwrap();
    assert_eq!(confirmation.order_id, "ORD-1");
    assert_eq!(confirmation.item_count, 1);
    assert_eq!(confirmation.total, 8.99);
    assert_eq!(confirmation.fulfillment_type, FulfillmentType::Pickup);
    assert_eq!(result.items_restocked(), 0);
    assert!(pantry.calls.lock().unwrap().is_empty());

    let submitted = client.submissions();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].items[0].product_id, "M1");
    assert_eq!(submitted[0].fulfillment_type, "pickup");
}

#[tokio::test]
async fn test_empty_cart_makes_no_network_calls() {
    let client = Arc::new(MockRetailer::responding(json!({"orderId": "ORD-1"})));
    let pipeline = pipeline(client.clone(), CatalogTable::default(), Arc::new(RecordingPantry::default()));

    let result = pipeline.submit_cart(&cart(vec![], vec![], 0.0)).await;

    assert!(!result.success());
    assert!(result.error_message().contains("empty"));
    assert_eq!(client.network_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unresolvable_list_is_not_submitted() {
    let client = Arc::new(MockRetailer::responding(json!({"orderId": "ORD-1"})));
    let pipeline = pipeline(client.clone(), CatalogTable::default(), Arc::new(RecordingPantry::default()));

    let result = pipeline.run(&[item("dragonfruit")], None).await.unwrap();

    assert!(!result.success());
    assert!(result.error_message().contains("empty"));
    assert!(client.submissions().is_empty());
}

#[tokio::test]
async fn test_transport_failure_reported_generically() {
    let client = Arc::new(MockRetailer::new(SubmitBehaviour::Fail));
    let pipeline = pipeline(client, CatalogTable::default(), Arc::new(RecordingPantry::default()));

    let result = pipeline
        .submit_cart(&cart(vec![cart_item("milk", "M1", 3.49)], vec![], 3.49))
        .await;

    assert!(!result.success());
    assert!(result.error_message().contains("failed"));
    assert!(!result.error_message().contains("connection reset"));
    assert!(result.confirmation().is_none());
}

#[tokio::test]
async fn test_retailer_error_message_passed_through() {
    let client = Arc::new(MockRetailer::responding(json!({"status": "error", "error": "No slots"})));
    let pipeline = pipeline(client, CatalogTable::default(), Arc::new(RecordingPantry::default()));

    let result = pipeline
        .submit_cart(&cart(vec![cart_item("milk", "M1", 3.49)], vec![], 3.49))
        .await;

    assert!(!result.success());
    assert_eq!(result.error_message(), "No slots");
}

#[tokio::test]
async fn test_reconciliation_failure_keeps_order_successful() {
    let client = Arc::new(MockRetailer::responding(json!({"orderId": "ORD-2"})));
    let pantry = Arc::new(RecordingPantry {
        fail: true,
        ..RecordingPantry::default()
    });
    let pipeline = pipeline(client, CatalogTable::default(), pantry.clone());

    let result = pipeline
        .submit_cart(&cart(
            vec![],
            vec![cart_item("milk", "M1", 3.49), cart_item("eggs", "E1", 4.29)],
            7.78,
        ))
        .await;

    assert!(result.success());
    assert_eq!(result.items_restocked(), 0);
    assert_eq!(result.confirmation().unwrap().item_count, 2);
    assert_eq!(*pantry.calls.lock().unwrap(), vec![vec!["milk".to_string(), "eggs".to_string()]]);
}

#[tokio::test]
async fn test_restock_items_reconciled_after_order() {
    let client = Arc::new(MockRetailer::responding(json!({"orderId": 4417, "total": 12.23})));
    let catalog = CatalogTable::default()
        .with("milk", Product::new("M1", "Whole Milk", 3.49, "1 gal"))
        .with("butter", Product::new("B1", "Salted Butter", 5.25, "1 lb"));
    let pantry = Arc::new(RecordingPantry::default());
    let pipeline = pipeline(client.clone(), catalog, pantry.clone());
    let restock = vec![ShoppingListItem::new("butter", 1.0, "lb", IngredientCategory::Dairy)
        .with_provenance(Provenance::Restock)];

    let result = pipeline.run(&[item("milk")], Some(&restock)).await.unwrap();

    assert!(result.success());
    assert_eq!(result.confirmation().unwrap().order_id, "4417");
    assert_eq!(result.items_restocked(), 1);
    assert_eq!(*pantry.calls.lock().unwrap(), vec![vec!["butter".to_string()]]);

    let lines: Vec<String> = client.submissions()[0]
        .items
        .iter()
        .map(|line| line.product_id.clone())
        .collect();
    assert_eq!(lines, vec!["M1", "B1"]);
}

#[tokio::test]
async fn test_unparseable_total_falls_back_to_estimate() {
    let client = Arc::new(MockRetailer::responding(json!({"orderId": "ORD-1", "total": "N/A"})));
    let pipeline = pipeline(client, CatalogTable::default(), Arc::new(RecordingPantry::default()));

    let result = pipeline
        .submit_cart(&cart(vec![cart_item("milk", "M1", 5.0)], vec![], 5.0))
        .await;

    assert!(result.success());
    assert_eq!(result.confirmation().unwrap().total, 5.0);
}

#[tokio::test]
async fn test_authenticates_once_across_runs() {
    let client = Arc::new(MockRetailer::responding(json!({"orderId": "ORD-1"})));
    let catalog = CatalogTable::default().with("milk", Product::new("M1", "Whole Milk", 3.49, "1 gal"));
    let pipeline = pipeline(client.clone(), catalog, Arc::new(RecordingPantry::default()));

    let cart = pipeline.build_cart_only(&[item("milk")], None).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert!(client.submissions().is_empty());

    pipeline.run(&[item("milk")], None).await.unwrap();
    assert_eq!(client.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_authentication_failure_is_setup_error() {
    let client = Arc::new(MockRetailer::rejecting_login());
    let catalog = CatalogTable::default().with("milk", Product::new("M1", "Whole Milk", 3.49, "1 gal"));
    let pipeline = pipeline(client.clone(), catalog, Arc::new(RecordingPantry::default()));

    let err = pipeline.run(&[item("milk")], None).await.unwrap_err();

    assert!(matches!(err, PipelineError::Authentication(RetailerError::Authentication(_))));
    assert!(client.submissions().is_empty());
}

#[tokio::test]
async fn test_close_releases_client() {
    let client = Arc::new(MockRetailer::responding(json!({})));
    let pipeline = pipeline(client.clone(), CatalogTable::default(), Arc::new(RecordingPantry::default()));

    assert!(!pipeline.has_oracle());
    assert!(pipeline.restock_queue().await.unwrap().is_empty());
    pipeline.close().await;
    assert!(client.closed.load(Ordering::SeqCst));
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opizontas_registry::services::catalogue::{CatalogueStore, NewProduct};
use opizontas_registry::services::discovery::{DiscoveryClient, DiscoveryError};
use opizontas_registry::services::inventory::{
    CatalogueGateway, FetchFailure, GatewayConfig, GatewayError, InventoryGateway, LineItem, Product,
};
use opizontas_registry::services::registry::{RegistryStore, ServiceInstance};
use opizontas_registry::services::reservation::{
    InMemoryOrderStore, OrderStatus, OrderStore, ReservationError, ReservationWorkflow,
};

/// Catalogue stand-in that records every stock mutation.
#[derive(Default)]
struct FakeCatalogue {
    products: Mutex<HashMap<String, Product>>,
    failures: Mutex<HashMap<String, GatewayError>>,
    reservations: Mutex<Vec<(String, u32)>>,
}

impl FakeCatalogue {
    fn with(products: &[(&str, f64, u32)]) -> Arc<Self> {
        let catalogue = Self::default();
        {
            let mut map = catalogue.products.lock().unwrap();
            for (id, price, stock) in products {
                map.insert(
                    id.to_string(),
                    Product {
                        id: id.to_string(),
                        name: format!("Product {id}"),
                        price: *price,
                        stock: *stock,
                    },
                );
            }
        }
        Arc::new(catalogue)
    }

    fn fail(&self, product_id: &str, err: GatewayError) {
        self.failures.lock().unwrap().insert(product_id.to_string(), err);
    }

    fn set_stock(&self, product_id: &str, stock: u32) {
        self.products.lock().unwrap().get_mut(product_id).unwrap().stock = stock;
    }

    fn reservations(&self) -> Vec<(String, u32)> {
        self.reservations.lock().unwrap().clone()
    }
}

#[async_trait]
impl InventoryGateway for FakeCatalogue {
    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError> {
        if let Some(err) = self.failures.lock().unwrap().get(product_id) {
            return Err(err.clone());
        }
        self.products
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .ok_or_else(|| GatewayError::ProductFetchFailed {
                product_id: product_id.to_string(),
                cause: FetchFailure::NotFound,
            })
    }

    async fn reserve_stock(&self, product_id: &str, quantity: u32) -> Result<Product, GatewayError> {
        let mut products = self.products.lock().unwrap();
        let product = products.get_mut(product_id).unwrap();
        if product.stock < quantity {
            return Err(GatewayError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
            });
        }
        product.stock -= quantity;
        self.reservations
            .lock()
            .unwrap()
            .push((product_id.to_string(), quantity));
        Ok(product.clone())
    }
}

fn workflow(catalogue: Arc<FakeCatalogue>) -> (ReservationWorkflow, InMemoryOrderStore) {
    let orders = InMemoryOrderStore::new();
    (ReservationWorkflow::new(catalogue, Arc::new(orders.clone())), orders)
}

#[tokio::test]
async fn test_create_order_computes_total_and_stays_pending() {
    let catalogue = FakeCatalogue::with(&[("p1", 10.0, 5)]);
    let (workflow, orders) = workflow(catalogue.clone());

    let order = workflow
        .create_order("user-1", vec![LineItem::new("p1", 2)])
        .await
        .unwrap();

    assert_eq!(order.total_amount, 20.0);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.user_id, "user-1");
    assert_eq!(order.items, vec![LineItem::new("p1", 2)]);
    assert_eq!(catalogue.reservations(), vec![("p1".to_string(), 2)]);
    assert_eq!(orders.find_by_id(&order.id).await.unwrap(), Some(order));
}

#[tokio::test]
async fn test_total_uses_prices_observed_at_creation() {
    let catalogue = FakeCatalogue::with(&[("p1", 10.0, 5), ("p2", 1.5, 10)]);
    let (workflow, _orders) = workflow(catalogue.clone());

    let order = workflow
        .create_order("user-1", vec![LineItem::new("p1", 1), LineItem::new("p2", 4)])
        .await
        .unwrap();
    assert_eq!(order.total_amount, 16.0);

    // 之后的价格变化不影响已创建订单
    catalogue.products.lock().unwrap().get_mut("p1").unwrap().price = 99.0;
    assert_eq!(workflow.get_order(&order.id).await.unwrap().total_amount, 16.0);
}

#[tokio::test]
async fn test_insufficient_stock_fails_before_any_mutation() {
    let catalogue = FakeCatalogue::with(&[("p1", 10.0, 1)]);
    let (workflow, orders) = workflow(catalogue.clone());

    let items = vec![LineItem::new("p1", 2)];
    assert!(!catalogue.check_availability(&items).await.unwrap());

    let err = workflow.create_order("user-1", items).await.unwrap_err();
    assert_eq!(
        err,
        ReservationError::InsufficientStock {
            product_id: "p1".to_string(),
            requested: 2,
            available: 1,
        }
    );
    assert!(catalogue.reservations().is_empty());
    assert!(orders.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_product_fetch_failures_name_the_product() {
    let catalogue = FakeCatalogue::with(&[("p1", 10.0, 5)]);
    catalogue.fail(
        "p2",
        GatewayError::ProductFetchFailed {
            product_id: "p2".to_string(),
            cause: FetchFailure::Transport("timed out".to_string()),
        },
    );
    let (workflow, orders) = workflow(catalogue.clone());

    let err = workflow
        .create_order("user-1", vec![LineItem::new("p1", 1), LineItem::new("p2", 1)])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReservationError::ProductFetchFailed {
            product_id: "p2".to_string(),
            cause: FetchFailure::Transport("timed out".to_string()),
        }
    );
    assert_eq!(err.status_code(), 503);

    let err = workflow
        .create_order("user-1", vec![LineItem::new("ghost", 1)])
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        ReservationError::ProductFetchFailed { product_id, cause: FetchFailure::NotFound } if product_id == "ghost"
    ));
    assert_eq!(err.status_code(), 404);

    assert!(catalogue.reservations().is_empty());
    assert!(orders.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_catalogue_is_service_unavailable() {
    let catalogue = FakeCatalogue::with(&[]);
    catalogue.fail(
        "p1",
        GatewayError::Unresolved(DiscoveryError::ServiceUnresolved("catalogue-service".to_string())),
    );
    let (workflow, _orders) = workflow(catalogue);

    let err = workflow
        .create_order("user-1", vec![LineItem::new("p1", 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::ServiceUnavailable(_)));
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (workflow, _orders) = workflow(FakeCatalogue::with(&[("p1", 10.0, 5)]));

    for (user, items) in [
        ("", vec![LineItem::new("p1", 1)]),
        ("user-1", vec![]),
        ("user-1", vec![LineItem::new("p1", 0)]),
    ] {
        let err = workflow.create_order(user, items).await.unwrap_err();
        assert!(matches!(err, ReservationError::InvalidOrder(_)));
        assert_eq!(err.status_code(), 400);
    }
}

#[tokio::test]
async fn test_duplicate_lines_are_checked_as_one_total() {
    let catalogue = FakeCatalogue::with(&[("p1", 10.0, 1)]);
    let (workflow, orders) = workflow(catalogue.clone());

    let items = vec![LineItem::new("p1", 1), LineItem::new("p1", 1)];
    assert!(!catalogue.check_availability(&items).await.unwrap());

    let err = workflow.create_order("user-1", items).await.unwrap_err();
    assert_eq!(
        err,
        ReservationError::InsufficientStock {
            product_id: "p1".to_string(),
            requested: 2,
            available: 1,
        }
    );
    // 没有扣减库存，也没有持久化订单
    assert!(catalogue.reservations().is_empty());
    assert_eq!(catalogue.get_product("p1").await.unwrap().stock, 1);
    assert!(orders.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_lines_are_reserved_together() {
    let catalogue = FakeCatalogue::with(&[("p1", 10.0, 5), ("p2", 2.0, 5)]);
    let (workflow, _orders) = workflow(catalogue.clone());

    let items = vec![LineItem::new("p1", 2), LineItem::new("p2", 1), LineItem::new("p1", 1)];
    let order = workflow.create_order("user-1", items.clone()).await.unwrap();

    assert_eq!(order.total_amount, 32.0);
    assert_eq!(order.items, items);
    assert_eq!(
        catalogue.reservations(),
        vec![("p1".to_string(), 3), ("p2".to_string(), 1)]
    );
}

/// Stock drops between the read and the decrement: the order is kept
/// `PENDING` and items after the failing one are not touched.
struct RacingCatalogue {
    inner: Arc<FakeCatalogue>,
    drain: (&'static str, u32),
}

#[async_trait]
impl InventoryGateway for RacingCatalogue {
    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError> {
        self.inner.get_product(product_id).await
    }

    async fn reserve_stock(&self, product_id: &str, quantity: u32) -> Result<Product, GatewayError> {
        if product_id == self.drain.0 {
            self.inner.set_stock(self.drain.0, self.drain.1);
        }
        self.inner.reserve_stock(product_id, quantity).await
    }
}

#[tokio::test]
async fn test_reservation_failure_leaves_order_pending() {
    let inner = FakeCatalogue::with(&[("p1", 10.0, 5), ("p2", 5.0, 5), ("p3", 1.0, 5)]);
    let racing = Arc::new(RacingCatalogue {
        inner: inner.clone(),
        drain: ("p2", 0),
    });
    let orders = InMemoryOrderStore::new();
    let workflow = ReservationWorkflow::new(racing, Arc::new(orders.clone()));

    let err = workflow
        .create_order(
            "user-1",
            vec![LineItem::new("p1", 1), LineItem::new("p2", 1), LineItem::new("p3", 1)],
        )
        .await
        .unwrap_err();

    let ReservationError::ReservationFailed { order_id, product_id } = err else {
        panic!("expected a reservation failure");
    };
    assert_eq!(product_id, "p2");
    assert_eq!(inner.reservations(), vec![("p1".to_string(), 1)]);

    let order = workflow.get_order(&order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, 16.0);
}

#[tokio::test]
async fn test_confirm_and_cancel_transitions() {
    let (workflow, _orders) = workflow(FakeCatalogue::with(&[("p1", 10.0, 5)]));

    let first = workflow
        .create_order("user-1", vec![LineItem::new("p1", 1)])
        .await
        .unwrap();
    let second = workflow
        .create_order("user-2", vec![LineItem::new("p1", 1)])
        .await
        .unwrap();

    let confirmed = workflow.confirm_order(&first.id).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert!(confirmed.updated_at >= confirmed.created_at);

    let err = workflow.cancel_order(&first.id).await.unwrap_err();
    assert!(matches!(err, ReservationError::InvalidTransition { .. }));

    let cancelled = workflow.cancel_order(&second.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let err = workflow.confirm_order("missing").await.unwrap_err();
    assert_eq!(err, ReservationError::OrderNotFound("missing".to_string()));

    let listed = workflow.list_orders().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
}

#[tokio::test]
async fn test_end_to_end_against_catalogue_service() {
    let catalogue = CatalogueStore::new();
    catalogue
        .create(NewProduct {
            id: Some("p1".to_string()),
            name: "Keyboard".to_string(),
            description: String::new(),
            price: 10.0,
            stock: 5,
            category: "hardware".to_string(),
        })
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let router = opizontas_registry::services::catalogue::http_impl::router(catalogue.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let registry = RegistryStore::new(Duration::from_secs(90));
    registry.register(
        "catalogue-service",
        ServiceInstance::new("catalogue-service", "catalogue-1", "127.0.0.1", port),
    );
    let gateway = CatalogueGateway::new(
        DiscoveryClient::new(Arc::new(registry), HashMap::new()),
        GatewayConfig::default(),
    )
    .unwrap();
    let workflow = ReservationWorkflow::new(Arc::new(gateway), Arc::new(InMemoryOrderStore::new()));

    let order = workflow
        .create_order("user-1", vec![LineItem::new("p1", 2)])
        .await
        .unwrap();
    assert_eq!(order.total_amount, 20.0);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(catalogue.get("p1").unwrap().stock, 3);

    let err = workflow
        .create_order("user-1", vec![LineItem::new("p1", 4)])
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InsufficientStock { available: 3, .. }));
    assert_eq!(catalogue.get("p1").unwrap().stock, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirm_and_cancel_have_one_winner() {
    let (workflow, orders) = workflow(FakeCatalogue::with(&[("p1", 1.0, 100)]));

    for _ in 0..20 {
        let order = workflow
            .create_order("user-1", vec![LineItem::new("p1", 1)])
            .await
            .unwrap();

        let confirm = tokio::spawn({
            let workflow = workflow.clone();
            let id = order.id.clone();
            async move { workflow.confirm_order(&id).await }
        });
        let cancel = tokio::spawn({
            let workflow = workflow.clone();
            let id = order.id.clone();
            async move { workflow.cancel_order(&id).await }
        });
        let (confirmed, cancelled) = tokio::join!(confirm, cancel);
        let (confirmed, cancelled) = (confirmed.unwrap(), cancelled.unwrap());

        assert!(confirmed.is_ok() != cancelled.is_ok());
        let loser = if confirmed.is_ok() { &cancelled } else { &confirmed };
        assert!(matches!(loser, Err(ReservationError::InvalidTransition { .. })));

        let stored = orders.find_by_id(&order.id).await.unwrap().unwrap();
        let expected = if confirmed.is_ok() {
            OrderStatus::Confirmed
        } else {
            OrderStatus::Cancelled
        };
        assert_eq!(stored.status, expected);
    }
}

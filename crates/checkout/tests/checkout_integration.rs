//! Integration tests for checkout orchestration and compensation.

use checkout::{
    CheckoutCoordinator, CheckoutError, CheckoutState, CheckoutStep, InMemoryEmailDispatcher,
    InMemoryPaymentGateway,
};
use common::{CheckoutId, ProductId, Role, UserId};
use doc_store::InMemoryDocumentStore;
use domain::{
    AccountService, Actor, CartLine, CatalogService, Category, ErrorKind, Money, OrderStatus,
    PaymentMethod, PaymentStatus, PlaceOrder, ProductDraft, Registration, SetOrderStatus,
    ShippingInfo,
};

type TestCoordinator =
    CheckoutCoordinator<InMemoryDocumentStore, InMemoryPaymentGateway, InMemoryEmailDispatcher>;

struct TestHarness {
    coordinator: TestCoordinator,
    catalog: CatalogService<InMemoryDocumentStore>,
    accounts: AccountService<InMemoryDocumentStore>,
    payment: InMemoryPaymentGateway,
    email: InMemoryEmailDispatcher,
    vendor: Actor,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryDocumentStore::new();
        let payment = InMemoryPaymentGateway::new();
        let email = InMemoryEmailDispatcher::new();

        Self {
            coordinator: CheckoutCoordinator::new(store.clone(), payment.clone(), email.clone()),
            catalog: CatalogService::new(store.clone()),
            accounts: AccountService::new(store),
            payment,
            email,
            vendor: Actor::new(UserId::new(), Role::Vendor, "Vendor"),
        }
    }

    async fn product(&self, name: &str, units: i64, stock: u32) -> ProductId {
        self.catalog
            .create_product(
                &self.vendor,
                ProductDraft {
                    name: name.into(),
                    description: "For checkout".into(),
                    price: Money::from_units(units),
                    stock,
                    category: Category::Clothing,
                    images: vec![],
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn customer(&self) -> Actor {
        let user = self
            .accounts
            .register(Registration {
                name: "Sadia".into(),
                email: format!("sadia+{}@example.com", UserId::new()),
                credential_hash: String::new(),
            })
            .await
            .unwrap();
        Actor::new(user.id, user.role, user.name)
    }

    async fn stock(&self, product: ProductId) -> u32 {
        self.catalog.get_product(product).await.unwrap().stock
    }
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Sadia".into(),
        phone: "01600000000".into(),
        address: "3 Hill View".into(),
        city: "Sylhet".into(),
        region: "Sylhet".into(),
        postal_code: "3100".into(),
    }
}

fn cart(user: UserId, lines: Vec<CartLine>, method: PaymentMethod) -> PlaceOrder {
    PlaceOrder::new(user, lines, shipping(), method)
}

fn aborted_id(err: &CheckoutError) -> CheckoutId {
    match err {
        CheckoutError::Aborted { checkout, .. } => *checkout,
        other => panic!("expected an aborted checkout, got {other:?}"),
    }
}

#[tokio::test]
async fn card_checkout_reserves_charges_and_places() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let scarf = h.product("Scarf", 10, 5).await;
    let buyer = h.customer().await;

    let receipt = h
        .coordinator
        .checkout(cart(
            buyer.id,
            vec![CartLine::new(shirt, 2), CartLine::new(scarf, 1)],
            PaymentMethod::Card,
        ))
        .await
        .unwrap();

    assert_eq!(receipt.checkout.state, CheckoutState::Completed);
    assert_eq!(
        receipt.checkout.completed_steps,
        vec![
            CheckoutStep::ReserveStock,
            CheckoutStep::CapturePayment,
            CheckoutStep::PlaceOrder,
            CheckoutStep::SendConfirmation,
        ]
    );
    assert!(receipt.checkout.notification_sent);
    assert_eq!(receipt.checkout.order_id, Some(receipt.order.id));

    let order = &receipt.order;
    assert!(order.stock_reserved);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment.status, PaymentStatus::Success);
    assert!(order.paid_at.is_some());
    assert_eq!(order.prices.total, Money::from_units(50 + 50));

    assert_eq!(h.stock(shirt).await, 3);
    assert_eq!(h.stock(scarf).await, 4);
    assert_eq!(h.payment.payment_count(), 1);

    let sent = h.email.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains(&order.id.to_string()));

    let record = h.coordinator.get_checkout(&buyer, receipt.checkout.id).await.unwrap();
    assert_eq!(record, receipt.checkout);
}

#[tokio::test]
async fn cash_on_delivery_skips_payment_capture() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let buyer = h.customer().await;

    let receipt = h
        .coordinator
        .checkout(cart(buyer.id, vec![CartLine::new(shirt, 1)], PaymentMethod::Cod))
        .await
        .unwrap();

    assert!(!receipt.checkout.has_completed(CheckoutStep::CapturePayment));
    assert_eq!(receipt.order.payment.transaction_id.as_deref(), Some("COD"));
    assert_eq!(receipt.order.payment.status, PaymentStatus::Pending);
    assert!(receipt.order.paid_at.is_none());
    assert_eq!(h.payment.payment_count(), 0);
}

#[tokio::test]
async fn insufficient_stock_restores_earlier_lines() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let scarf = h.product("Scarf", 10, 1).await;
    let buyer = h.customer().await;

    let err = h
        .coordinator
        .checkout(cart(
            buyer.id,
            vec![CartLine::new(shirt, 2), CartLine::new(scarf, 3)],
            PaymentMethod::Card,
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(h.stock(shirt).await, 5);
    assert_eq!(h.stock(scarf).await, 1);
    assert_eq!(h.payment.payment_count(), 0);
    assert!(h.email.sent().is_empty());

    let record = h
        .coordinator
        .get_checkout(&buyer, aborted_id(&err))
        .await
        .unwrap();
    assert_eq!(record.state, CheckoutState::Failed);
    assert_eq!(record.failed_step, Some(CheckoutStep::ReserveStock));
    assert!(record.completed_steps.is_empty());
    assert!(record.order_id.is_none());
    assert!(h.coordinator.orders().my_orders(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn declined_payment_releases_stock() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let buyer = h.customer().await;
    h.payment.set_fail_on_charge(true);

    let err = h
        .coordinator
        .checkout(cart(buyer.id, vec![CartLine::new(shirt, 2)], PaymentMethod::Bkash))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(h.stock(shirt).await, 5);

    let record = h
        .coordinator
        .get_checkout(&buyer, aborted_id(&err))
        .await
        .unwrap();
    assert_eq!(record.state, CheckoutState::Failed);
    assert_eq!(record.completed_steps, vec![CheckoutStep::ReserveStock]);
    assert_eq!(record.failed_step, Some(CheckoutStep::CapturePayment));
    assert!(record.payment_id.is_none());
    assert!(record.compensation_failures.is_empty());
}

#[tokio::test]
async fn failed_confirmation_email_keeps_the_order() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let buyer = h.customer().await;
    h.email.set_fail_on_send(true);

    let receipt = h
        .coordinator
        .checkout(cart(buyer.id, vec![CartLine::new(shirt, 1)], PaymentMethod::Nagad))
        .await
        .unwrap();

    assert_eq!(receipt.checkout.state, CheckoutState::Completed);
    assert!(!receipt.checkout.notification_sent);
    assert_eq!(h.stock(shirt).await, 4);
    assert_eq!(h.payment.payment_count(), 1);
}

#[tokio::test]
async fn invalid_cart_records_nothing() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let buyer = h.customer().await;

    let mut cmd = cart(buyer.id, vec![CartLine::new(shirt, 1)], PaymentMethod::Card);
    cmd.shipping.phone = String::new();
    let err = h.coordinator.checkout(cmd).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Domain(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.stock(shirt).await, 5);
    assert_eq!(h.payment.payment_count(), 0);
}

#[tokio::test]
async fn cancelling_a_checked_out_order_restocks() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let buyer = h.customer().await;

    let receipt = h
        .coordinator
        .checkout(cart(buyer.id, vec![CartLine::new(shirt, 3)], PaymentMethod::Cod))
        .await
        .unwrap();
    assert_eq!(h.stock(shirt).await, 2);

    h.coordinator
        .orders()
        .set_status(
            &h.vendor,
            SetOrderStatus::new(receipt.order.id, OrderStatus::Cancelled),
        )
        .await
        .unwrap();
    assert_eq!(h.stock(shirt).await, 5);
}

#[tokio::test]
async fn checkout_records_are_private() {
    let h = TestHarness::new();
    let shirt = h.product("Shirt", 20, 5).await;
    let buyer = h.customer().await;
    let receipt = h
        .coordinator
        .checkout(cart(buyer.id, vec![CartLine::new(shirt, 1)], PaymentMethod::Cod))
        .await
        .unwrap();

    let stranger = h.customer().await;
    let err = h
        .coordinator
        .get_checkout(&stranger, receipt.checkout.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let admin = Actor::new(UserId::new(), Role::Admin, "Root");
    assert!(h.coordinator.get_checkout(&admin, receipt.checkout.id).await.is_ok());

    let err = h
        .coordinator
        .get_checkout(&admin, CheckoutId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let h = std::sync::Arc::new(TestHarness::new());
    let console = h.product("Console", 400, 3).await;
    let buyer = h.customer().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let h = std::sync::Arc::clone(&h);
            tokio::spawn(async move {
                h.coordinator
                    .checkout(cart(buyer.id, vec![CartLine::new(console, 1)], PaymentMethod::Card))
                    .await
            })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            placed += 1;
        }
    }

    assert_eq!(placed, 3);
    assert_eq!(h.stock(console).await, 0);
    assert_eq!(h.payment.payment_count(), 3);
}
